use std::collections::HashSet;

use crate::common::sysfs::{self, CPU_ROOT};
use crate::error::{ProbeError, Result};

pub fn cache_line_size() -> Result<u32> {
    #[cfg(target_env = "gnu")]
    {
        // SAFETY: sysconf has no memory-safety preconditions.
        let size = unsafe { libc::sysconf(libc::_SC_LEVEL1_DCACHE_LINESIZE) };
        if size > 0 {
            return super::unix::positive("_SC_LEVEL1_DCACHE_LINESIZE", size);
        }
        tracing::debug!("sysconf reported no L1d line size, falling back to sysfs");
    }

    // index0 is the L1 data cache on x86 and arm64
    sysfs::read_value(format!("{CPU_ROOT}/cpu0/cache/index0/coherency_line_size"))
}

pub fn physical_core_count() -> Result<u32> {
    count_physical_cores(CPU_ROOT)
}

/// Count distinct (package, core) pairs over the online CPUs under `root`
fn count_physical_cores(root: &str) -> Result<u32> {
    let mut cores = HashSet::new();

    for cpu in sysfs::online_cpus_in(root)? {
        let topology = format!("{root}/cpu{cpu}/topology");
        // Some arm64 kernels report -1 when the package is unknown
        let package: i32 = sysfs::read_value(format!("{topology}/physical_package_id"))?;
        let core: u32 = sysfs::read_value(format!("{topology}/core_id"))?;
        cores.insert((package, core));
    }

    if cores.is_empty() {
        return Err(ProbeError::Os("no online CPUs in sysfs".to_string()));
    }

    Ok(cores.len() as u32)
}
