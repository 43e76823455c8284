use nix::unistd::{sysconf, SysconfVar};

use crate::error::{ProbeError, Result};

pub fn page_size() -> Result<u32> {
    let size = sysconf(SysconfVar::PAGE_SIZE)?
        .ok_or_else(|| ProbeError::Os("PAGE_SIZE is indeterminate".to_string()))?;
    positive("PAGE_SIZE", size)
}

pub fn logical_core_count() -> Result<u32> {
    // SAFETY: sysconf has no memory-safety preconditions.
    let count = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
    if count < 0 {
        return Err(std::io::Error::last_os_error().into());
    }
    positive("_SC_NPROCESSORS_ONLN", count)
}

pub(super) fn positive(name: &str, value: libc::c_long) -> Result<u32> {
    match u32::try_from(value) {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(ProbeError::Os(format!("{name} returned {value}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive() {
        assert_eq!(positive("x", 64).unwrap(), 64);
        assert!(positive("x", 0).is_err());
        assert!(positive("x", -1).is_err());
    }
}
