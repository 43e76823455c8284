//! CPU capability detection and caching
//!
//! - **feature** - per-architecture feature enum and the bitset it indexes
//! - **decoder** - register source abstraction and the one-pass feature decode
//! - **vendor** - vendor identification
//! - **cache** - lazily populated, process-wide capability container
//! - **counter** - cycle counter reads, invariance and frequency calibration

pub mod cache;
pub mod counter;
pub mod decoder;
pub mod feature;
pub mod vendor;

pub use cache::{CapabilitySource, CpuCapabilities};
pub use counter::CycleCounter;
pub use decoder::HardwareRegisters;
pub use feature::{CpuFeature, FeatureTable, FEATURE_MAX};
pub use vendor::{CpuVendor, VendorIdentity};

#[cfg(target_arch = "x86_64")]
pub use decoder::{FeatureDecoder, RegisterSource};
