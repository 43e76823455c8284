//! CPUID, XGETBV and time-stamp counter instructions
//!
//! All of these are core-local and stateless, so they are safe to call
//! from any number of threads at once.

use crate::register::CpuidResult;

/// Execute CPUID with `leaf` in EAX and `subleaf` in ECX
///
/// There is no check that the leaf is implemented. Unsupported leaves return
/// whatever the processor defines for them, which decoders read as "absent".
///
/// RBX is reserved by LLVM, so it is saved around the instruction.
#[inline]
pub fn cpuid(leaf: u32, subleaf: u32) -> CpuidResult {
    let ebx: u64;
    let mut eax = leaf;
    let mut ecx = subleaf;
    let edx: u32;

    // SAFETY: CPUID is available on every x86-64 processor and only writes
    // the four registers declared here.
    unsafe {
        core::arch::asm!(
            "mov {0}, rbx",
            "cpuid",
            "xchg {0}, rbx",
            out(reg) ebx,
            inout("eax") eax,
            inout("ecx") ecx,
            out("edx") edx,
            options(nostack, preserves_flags)
        );
    }

    CpuidResult::new(eax, ebx as u32, ecx, edx)
}

/// Read extended control register `selector` (EDX:EAX of XGETBV)
///
/// # Safety
///
/// XGETBV raises #UD unless the OS has set CR4.OSXSAVE. Callers must check
/// CPUID.1:ECX.OSXSAVE[bit 27] before calling this.
#[inline]
pub unsafe fn xgetbv(selector: u32) -> u64 {
    let eax: u32;
    let edx: u32;

    core::arch::asm!(
        "xgetbv",
        in("ecx") selector,
        out("eax") eax,
        out("edx") edx,
        options(nomem, nostack, preserves_flags)
    );

    (u64::from(edx) << 32) | u64::from(eax)
}

/// Read the time-stamp counter (RDTSC)
///
/// Not ordered with respect to surrounding instructions.
#[inline]
pub fn rdtsc() -> u64 {
    // SAFETY: RDTSC is part of the x86-64 baseline.
    #[allow(unused_unsafe)]
    unsafe {
        core::arch::x86_64::_rdtsc()
    }
}

/// Read the time-stamp counter after all prior instructions retire (RDTSCP)
///
/// Only valid when CPUID.80000001H:EDX.RDTSCP[bit 27] is set. The processor
/// ID written to IA32_TSC_AUX is discarded.
#[inline]
pub fn rdtscp() -> u64 {
    let mut aux = 0u32;
    // SAFETY: the caller gates this on the RDTSCP feature bit; `aux` is a
    // valid location for the TSC_AUX output.
    #[allow(unused_unsafe)]
    unsafe {
        core::arch::x86_64::__rdtscp(&mut aux)
    }
}
