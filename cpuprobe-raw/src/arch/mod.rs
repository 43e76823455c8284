//! Architecture-specific register definitions
//!
//! Each CPU family exposes identification and timing through different
//! instructions. Only the module for the compiled target exists; asking an
//! x86-64 build about AArch64 registers (or the reverse) does not compile.
//!
//! ## Supported Architectures
//!
//! - **x86-64** - CPUID, XGETBV, RDTSC, RDTSCP
//! - **AArch64** - CNTVCT_EL0, CNTFRQ_EL0

#[cfg(target_arch = "x86_64")]
pub mod x86_64;

#[cfg(target_arch = "aarch64")]
pub mod aarch64;
