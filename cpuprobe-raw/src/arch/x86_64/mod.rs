//! x86-64 register definitions
//!
//! ## Contents
//!
//! - **instr** - CPUID, XGETBV, RDTSC and RDTSCP
//! - **leaf** - Typed layouts for the CPUID leaves used by feature detection
//! - **xcr** - Extended control register 0 (OS-enabled state components)
//!
//! ## References
//!
//! - Intel® 64 and IA-32 Architectures Software Developer's Manual, Volume 2A (CPUID)
//! - Intel® 64 and IA-32 Architectures Software Developer's Manual, Volume 1, Chapter 13 (XSAVE)
//! - AMD64 Architecture Programmer's Manual, Volume 3, Appendix E

pub mod instr;
pub mod leaf;
pub mod xcr;
