//! Cycle counter façade
//!
//! Readings have no epoch. Only the difference between two readings taken on
//! the same core is meaningful.
//!
//! - **x86-64** - RDTSCP when the processor has it, RDTSC otherwise
//! - **AArch64** - CNTVCT_EL0 behind an ISB
//! - **others** - nanoseconds of a monotonic clock since first use

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;

use crate::cpu::cache::CpuCapabilities;
use crate::error::{ProbeError, Result};

/// Lowest frequency a calibration may report (100 MHz)
pub const MIN_PLAUSIBLE_HZ: u64 = 100_000_000;

/// Highest frequency a calibration may report (10 GHz)
pub const MAX_PLAUSIBLE_HZ: u64 = 10_000_000_000;

/// Unordered counter read
#[inline]
pub fn read_raw() -> u64 {
    #[cfg(target_arch = "x86_64")]
    {
        cpuprobe_raw::current_arch::instr::rdtsc()
    }

    #[cfg(target_arch = "aarch64")]
    {
        cpuprobe_raw::current_arch::cntvct()
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        monotonic_nanos()
    }
}

/// Counter read ordered after all earlier instructions
///
/// On x86-64 this executes RDTSCP, which the caller must have confirmed.
#[inline]
pub fn read_serializing() -> u64 {
    #[cfg(target_arch = "x86_64")]
    {
        cpuprobe_raw::current_arch::instr::rdtscp()
    }

    #[cfg(target_arch = "aarch64")]
    {
        cpuprobe_raw::current_arch::cntvct_ordered()
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        monotonic_nanos()
    }
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn monotonic_nanos() -> u64 {
    static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);
    EPOCH.elapsed().as_nanos() as u64
}

/// Chooses the counter instruction and holds the calibrated frequency
///
/// A frequency of 0 means "not calibrated". Calibration only ever runs
/// when `calibrate` is called.
pub struct CycleCounter<'a> {
    capabilities: &'a CpuCapabilities,
    frequency_hz: AtomicU64,
}

impl<'a> CycleCounter<'a> {
    pub const fn new(capabilities: &'a CpuCapabilities) -> Self {
        Self {
            capabilities,
            frequency_hz: AtomicU64::new(0),
        }
    }

    pub fn instance() -> &'static CycleCounter<'static> {
        static INSTANCE: Lazy<CycleCounter<'static>> =
            Lazy::new(|| CycleCounter::new(CpuCapabilities::instance()));
        &INSTANCE
    }

    /// Current counter value, decided per call from the cached feature table
    #[inline]
    pub fn read(&self) -> u64 {
        if self.serializing_available() {
            read_serializing()
        } else {
            read_raw()
        }
    }

    #[cfg(target_arch = "x86_64")]
    fn serializing_available(&self) -> bool {
        self.capabilities
            .feature_available(crate::cpu::feature::CpuFeature::Rdtscp)
    }

    #[cfg(not(target_arch = "x86_64"))]
    fn serializing_available(&self) -> bool {
        true
    }

    pub fn is_invariant(&self) -> bool {
        self.capabilities.cycle_counter_is_invariant()
    }

    /// Calibrated frequency in Hz, or 0 if unknown
    pub fn frequency(&self) -> u64 {
        self.frequency_hz.load(Ordering::Acquire)
    }

    /// Measure the counter rate against the monotonic clock over `window`
    ///
    /// With `pin_cpu` set, the calling thread is bound to that CPU for the
    /// measurement. The result is stored only if it lies within
    /// [`MIN_PLAUSIBLE_HZ`, `MAX_PLAUSIBLE_HZ`].
    pub fn calibrate(&self, window: Duration, pin_cpu: Option<i32>) -> Result<u64> {
        if window.is_zero() {
            return Err(ProbeError::Calibration(
                "calibration window must be non-zero".to_string(),
            ));
        }

        let _affinity = pin(pin_cpu)?;

        // Keep the one-time CPUID decode out of the measured window
        self.capabilities.populate();

        if !self.is_invariant() {
            tracing::warn!("Calibrating a non-invariant cycle counter; rate may change with P-states");
        }

        let wall_start = Instant::now();
        let start = self.read();
        std::thread::sleep(window);
        let end = self.read();
        let elapsed = wall_start.elapsed();

        let ticks = end.checked_sub(start).ok_or_else(|| {
            ProbeError::Calibration(format!("counter went backwards: {start} -> {end}"))
        })?;

        let hz = ticks_to_hz(ticks, elapsed);
        if !(MIN_PLAUSIBLE_HZ..=MAX_PLAUSIBLE_HZ).contains(&hz) {
            return Err(ProbeError::Calibration(format!(
                "measured {hz} Hz over {elapsed:?}, outside {MIN_PLAUSIBLE_HZ}..={MAX_PLAUSIBLE_HZ}"
            )));
        }

        self.frequency_hz.store(hz, Ordering::Release);
        tracing::info!(
            "Cycle counter calibrated: {} Hz ({} ticks in {:?})",
            hz,
            ticks,
            elapsed
        );

        Ok(hz)
    }
}

fn ticks_to_hz(ticks: u64, elapsed: Duration) -> u64 {
    let nanos = elapsed.as_nanos().max(1);
    (u128::from(ticks) * 1_000_000_000 / nanos) as u64
}

#[cfg(target_os = "linux")]
fn pin(cpu: Option<i32>) -> Result<Option<crate::common::AffinityGuard>> {
    cpu.map(crate::common::AffinityGuard::new).transpose()
}

#[cfg(not(target_os = "linux"))]
fn pin(cpu: Option<i32>) -> Result<Option<()>> {
    match cpu {
        Some(cpu) => Err(ProbeError::Affinity(format!(
            "pinning to CPU {cpu} is not supported on this OS"
        ))),
        None => Ok(None),
    }
}
