#[cfg(target_os = "linux")]
pub mod affinity;
pub mod sysfs;

#[cfg(target_os = "linux")]
pub use affinity::AffinityGuard;
