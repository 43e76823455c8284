//! # cpuprobe
//!
//! Cached hardware and OS capability queries: page size, cache line size,
//! core counts, CPU vendor, instruction-set features and a cycle counter.
//!
//! Everything expensive (CPUID is serializing, topology queries walk
//! sysfs) runs once per process and is then served from memory.
//!
//! ```no_run
//! use cpuprobe::platform::{cpu_cycle_counter, cpu_feature_available};
//! # #[cfg(target_arch = "x86_64")]
//! use cpuprobe::CpuFeature;
//!
//! # #[cfg(target_arch = "x86_64")]
//! if cpu_feature_available(CpuFeature::Avx2) {
//!     // AVX2 path
//! }
//!
//! let start = cpu_cycle_counter();
//! let _cycles = cpu_cycle_counter() - start;
//! ```

// Macros (must be first for visibility)
#[macro_use]
pub mod macros;

pub mod common;
pub mod config;
pub mod cpu;
pub mod error;
pub mod platform;
pub mod prom;
pub mod topology;

pub use config::ProbeConfig;
pub use cpu::{CpuCapabilities, CpuFeature, CpuVendor, CycleCounter, FeatureTable};
pub use error::{ProbeError, Result};
pub use platform::PlatformReport;
pub use prom::PlatformMetricExporter;
pub use topology::Topology;
