//! Helpers for the Linux `/sys/devices/system/cpu` hierarchy

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ProbeError, Result};

pub const CPU_ROOT: &str = "/sys/devices/system/cpu";

/// Parse a CPU list like "0-3,8-11" into individual CPU IDs
pub fn parse_cpu_list(s: &str) -> Option<Vec<u32>> {
    let mut cpus = Vec::new();
    for part in s.trim().split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if let Some((start, end)) = part.split_once('-') {
            let start: u32 = start.trim().parse().ok()?;
            let end: u32 = end.trim().parse().ok()?;
            if end < start {
                return None;
            }
            cpus.extend(start..=end);
        } else {
            cpus.push(part.parse().ok()?);
        }
    }
    Some(cpus)
}

/// Read a sysfs attribute holding a single integer
pub fn read_value<T>(path: impl AsRef<Path>) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    content
        .trim()
        .parse()
        .map_err(|e| ProbeError::Parse(format!("{}: {e}", path.display())))
}

/// Online CPUs listed under `root`
pub fn online_cpus_in(root: &str) -> Result<Vec<u32>> {
    let path = format!("{root}/online");
    let content = std::fs::read_to_string(&path)?;
    parse_cpu_list(&content)
        .ok_or_else(|| ProbeError::Parse(format!("{path}: malformed CPU list {content:?}")))
}
