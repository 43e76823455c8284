//! Process-wide query surface
//!
//! Every function here reads from the shared [`CpuCapabilities`],
//! [`CycleCounter`] and [`Topology`] instances. None of them fail: values
//! that cannot be determined are reported as 0, `false` or
//! `CpuVendor::Unknown`.

use serde::Serialize;

use crate::cpu::{CpuCapabilities, CpuFeature, CpuVendor, CycleCounter};
use crate::topology::Topology;

/// Memory page size in bytes
pub fn page_size() -> u32 {
    Topology::instance().page_size()
}

/// L1 data cache line size in bytes, 0 if undeterminable
pub fn cache_line_size() -> u32 {
    Topology::instance().cache_line_size()
}

/// Online logical processors, 0 if undeterminable
pub fn logical_core_count() -> u32 {
    Topology::instance().logical_core_count()
}

/// Physical cores, 0 if undeterminable
pub fn physical_core_count() -> u32 {
    Topology::instance().physical_core_count()
}

pub fn cpu_vendor() -> CpuVendor {
    CpuCapabilities::instance().vendor()
}

/// Current cycle counter value (no epoch)
#[inline]
pub fn cpu_cycle_counter() -> u64 {
    CycleCounter::instance().read()
}

/// Whether the counter ticks at a constant rate (x86-64 invariant TSC)
pub fn cpu_cycle_counter_is_invariant() -> bool {
    CycleCounter::instance().is_invariant()
}

/// Counter frequency in Hz, 0 until [`CycleCounter::calibrate`] succeeds
pub fn cpu_cycle_counter_frequency() -> u64 {
    CycleCounter::instance().frequency()
}

#[inline]
pub fn cpu_feature_available(feature: CpuFeature) -> bool {
    CpuCapabilities::instance().feature_available(feature)
}

/// Snapshot of every query
#[derive(Debug, Clone, Serialize)]
pub struct PlatformReport {
    pub arch: &'static str,
    pub os: &'static str,
    pub vendor: CpuVendor,
    pub vendor_string: Option<String>,
    pub page_size: u32,
    pub cache_line_size: u32,
    pub logical_cores: u32,
    pub physical_cores: u32,
    /// Every feature defined for this architecture, with its availability
    pub features: Vec<(&'static str, bool)>,
    pub cycle_counter_invariant: bool,
    pub cycle_counter_frequency_hz: u64,
}

impl PlatformReport {
    pub fn collect() -> Self {
        let caps = CpuCapabilities::instance().populate();
        let identity = caps.vendor_identity();

        Self {
            arch: std::env::consts::ARCH,
            os: std::env::consts::OS,
            vendor: identity.vendor,
            vendor_string: identity.raw_str().map(str::to_owned),
            page_size: page_size(),
            cache_line_size: cache_line_size(),
            logical_cores: logical_core_count(),
            physical_cores: physical_core_count(),
            features: CpuFeature::ALL
                .iter()
                .map(|&f| (f.name(), caps.feature_available(f)))
                .collect(),
            cycle_counter_invariant: cpu_cycle_counter_is_invariant(),
            cycle_counter_frequency_hz: cpu_cycle_counter_frequency(),
        }
    }

    pub fn available_features(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.features
            .iter()
            .filter(|(_, available)| *available)
            .map(|(name, _)| *name)
    }
}

impl std::fmt::Display for PlatformReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let unknown = |v: u64| {
            if v == 0 {
                "unknown".to_string()
            } else {
                v.to_string()
            }
        };

        writeln!(f, "Platform:          {}-{}", self.arch, self.os)?;
        match &self.vendor_string {
            Some(raw) => writeln!(f, "CPU vendor:        {} ({raw})", self.vendor)?,
            None => writeln!(f, "CPU vendor:        {}", self.vendor)?,
        }
        writeln!(f, "Page size:         {} bytes", self.page_size)?;
        writeln!(
            f,
            "Cache line size:   {}",
            unknown(u64::from(self.cache_line_size))
        )?;
        writeln!(
            f,
            "Logical cores:     {}",
            unknown(u64::from(self.logical_cores))
        )?;
        writeln!(
            f,
            "Physical cores:    {}",
            unknown(u64::from(self.physical_cores))
        )?;
        writeln!(
            f,
            "Features:          {}",
            self.available_features().collect::<Vec<_>>().join(" ")
        )?;
        writeln!(f, "Invariant counter: {}", self.cycle_counter_invariant)?;
        write!(
            f,
            "Counter frequency: {}",
            match self.cycle_counter_frequency_hz {
                0 => "unknown".to_string(),
                hz => format!("{hz} Hz"),
            }
        )
    }
}
