//! AArch64 generic timer registers
//!
//! The virtual counter is readable from EL0 on every OS the probe targets
//! (Linux and macOS both set CNTKCTL_EL1.EL0VCTEN).
//!
//! ## References
//!
//! - Arm® Architecture Reference Manual for A-profile, D11 "The Generic Timer"

/// Read CNTVCT_EL0 (virtual count)
///
/// May be sampled speculatively ahead of earlier instructions.
#[inline]
pub fn cntvct() -> u64 {
    let value: u64;
    // SAFETY: CNTVCT_EL0 is EL0-readable on supported operating systems.
    unsafe {
        core::arch::asm!(
            "mrs {}, cntvct_el0",
            out(reg) value,
            options(nomem, nostack, preserves_flags)
        );
    }
    value
}

/// Read CNTVCT_EL0 after an instruction synchronization barrier
#[inline]
pub fn cntvct_ordered() -> u64 {
    let value: u64;
    // SAFETY: as for `cntvct`; ISB has no side effects beyond ordering.
    unsafe {
        core::arch::asm!(
            "isb",
            "mrs {}, cntvct_el0",
            out(reg) value,
            options(nostack, preserves_flags)
        );
    }
    value
}

/// Read CNTFRQ_EL0 (counter frequency in Hz as programmed by firmware)
#[inline]
pub fn cntfrq() -> u64 {
    let value: u64;
    // SAFETY: CNTFRQ_EL0 is EL0-readable.
    unsafe {
        core::arch::asm!(
            "mrs {}, cntfrq_el0",
            out(reg) value,
            options(nomem, nostack, preserves_flags)
        );
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cntvct_progresses() {
        let a = cntvct();
        let b = cntvct_ordered();
        assert!(b >= a);
    }
}
