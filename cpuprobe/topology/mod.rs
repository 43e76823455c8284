//! OS topology adapter
//!
//! Page size, L1 data cache line size and core counts come from the OS, not
//! from CPUID. Every query is cached after the first call and every OS
//! failure is absorbed here: callers only ever see 0 for "undeterminable".

use once_cell::sync::OnceCell;

use crate::error::Result;

#[cfg(unix)]
mod unix;
#[cfg(unix)]
use unix::{logical_core_count, page_size};

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
use linux as os;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
use macos as os;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
use windows as os;
#[cfg(windows)]
use windows::page_size;

#[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
mod os {
    use crate::error::{ProbeError, Result};

    pub fn cache_line_size() -> Result<u32> {
        Err(ProbeError::Os("cache line size query not implemented".to_string()))
    }

    pub fn physical_core_count() -> Result<u32> {
        Err(ProbeError::Os("physical core query not implemented".to_string()))
    }
}

#[cfg(not(any(unix, windows)))]
fn page_size() -> Result<u32> {
    Err(crate::error::ProbeError::Os(
        "page size query not implemented".to_string(),
    ))
}

/// Processors available to this process, as reported by the standard library
#[cfg(not(unix))]
fn logical_core_count() -> Result<u32> {
    let count = std::thread::available_parallelism()?;
    Ok(u32::try_from(count.get()).unwrap_or(u32::MAX))
}

#[derive(Debug, Default)]
pub struct Topology {
    page_size: OnceCell<u32>,
    cache_line_size: OnceCell<u32>,
    logical_cores: OnceCell<u32>,
    physical_cores: OnceCell<u32>,
}

impl Topology {
    pub const fn new() -> Self {
        Self {
            page_size: OnceCell::new(),
            cache_line_size: OnceCell::new(),
            logical_cores: OnceCell::new(),
            physical_cores: OnceCell::new(),
        }
    }

    pub fn instance() -> &'static Topology {
        static INSTANCE: Topology = Topology::new();
        &INSTANCE
    }

    /// Memory page size in bytes
    ///
    /// # Panics
    ///
    /// Panics if the OS reports no page size, which no supported OS does.
    pub fn page_size(&self) -> u32 {
        *self.page_size.get_or_init(|| {
            let size = absorb("page size", page_size());
            assert!(size > 0, "OS reported no page size");
            size
        })
    }

    /// L1 data cache line size in bytes, or 0
    pub fn cache_line_size(&self) -> u32 {
        *self
            .cache_line_size
            .get_or_init(|| absorb("cache line size", os::cache_line_size()))
    }

    /// Online logical processors, or 0
    pub fn logical_core_count(&self) -> u32 {
        *self
            .logical_cores
            .get_or_init(|| absorb("logical core count", logical_core_count()))
    }

    /// Physical cores across all packages, or 0
    pub fn physical_core_count(&self) -> u32 {
        *self
            .physical_cores
            .get_or_init(|| absorb("physical core count", os::physical_core_count()))
    }
}

fn absorb(what: &str, result: Result<u32>) -> u32 {
    match result {
        Ok(value) => {
            tracing::debug!("{}: {}", what, value);
            value
        }
        Err(e) => {
            tracing::debug!("Could not determine {}: {}", what, e);
            0
        }
    }
}
