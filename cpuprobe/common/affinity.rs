use nix::sched::{sched_getaffinity, sched_setaffinity, CpuSet};
use nix::unistd::Pid;

use crate::error::{ProbeError, Result};

/// Pins the calling thread to one CPU and restores the previous mask on drop
///
/// Cycle counters are per-core; pinning keeps both samples of a measurement
/// on the same counter.
pub struct AffinityGuard {
    old_affinity: CpuSet,
    cpu: usize,
}

impl AffinityGuard {
    pub fn new(cpu: i32) -> Result<Self> {
        let cpu = usize::try_from(cpu)
            .map_err(|_| ProbeError::Affinity(format!("Invalid CPU ID: {cpu}")))?;

        let old_affinity = sched_getaffinity(Pid::from_raw(0))
            .map_err(|e| ProbeError::Affinity(format!("Failed to get affinity: {e}")))?;

        let mut new_affinity = CpuSet::new();
        new_affinity
            .set(cpu)
            .map_err(|e| ProbeError::Affinity(format!("Failed to set CPU {cpu} in set: {e}")))?;

        sched_setaffinity(Pid::from_raw(0), &new_affinity).map_err(|e| {
            ProbeError::Affinity(format!("Failed to set affinity to CPU {cpu}: {e}"))
        })?;

        tracing::debug!("Pinned thread to CPU {}", cpu);

        Ok(Self { old_affinity, cpu })
    }

    pub fn cpu(&self) -> usize {
        self.cpu
    }
}

impl Drop for AffinityGuard {
    fn drop(&mut self) {
        if let Err(e) = sched_setaffinity(Pid::from_raw(0), &self.old_affinity) {
            tracing::warn!("Failed to restore affinity after CPU {}: {}", self.cpu, e);
        }
    }
}
