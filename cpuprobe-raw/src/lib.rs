//! # cpuprobe-raw
//!
//! Register-level primitives for CPU capability probing.
//!
//! This crate wraps the handful of instructions a capability probe needs
//! (CPUID, XGETBV, RDTSC/RDTSCP on x86-64; the generic timer registers on
//! AArch64) and gives typed layouts for the CPUID leaves and control
//! registers that are decoded from them. Nothing here caches, allocates or
//! logs: every call executes the instruction.
//!
//! ## Targets
//!
//! The register definitions for the compiled target are re-exported as
//! [`current_arch`]:
//! - `x86_64` - CPUID leaves, XCR0, time-stamp counter
//! - `aarch64` - virtual counter and counter frequency registers
//!
//! ## Usage
//!
//! ```ignore
//! use cpuprobe_raw::current_arch::{instr, leaf::FeatureInfo};
//! use cpuprobe_raw::CpuidLayout;
//!
//! let info = FeatureInfo::from_cpuid(instr::cpuid(FeatureInfo::LEAF, 0));
//! if info.osxsave && info.avx {
//!     // Safe to execute XGETBV now
//!     let xcr0 = unsafe { instr::xgetbv(0) };
//! }
//! ```

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod register;

pub use register::{CpuidLayout, CpuidResult, RegisterLayout};

#[cfg(target_arch = "x86_64")]
pub use arch::x86_64 as current_arch;

#[cfg(target_arch = "aarch64")]
pub use arch::aarch64 as current_arch;
