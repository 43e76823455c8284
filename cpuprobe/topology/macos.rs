use std::ffi::CStr;

use crate::error::{ProbeError, Result};

pub fn cache_line_size() -> Result<u32> {
    sysctl_u32(c"hw.cachelinesize")
}

pub fn physical_core_count() -> Result<u32> {
    sysctl_u32(c"hw.physicalcpu")
}

/// Read an integer sysctl, which may be 32 or 64 bits wide
fn sysctl_u32(name: &CStr) -> Result<u32> {
    let mut buf = [0u8; 8];
    let mut len = buf.len();

    // SAFETY: `buf` is valid for `len` bytes and `name` is NUL-terminated.
    let rc = unsafe {
        libc::sysctlbyname(
            name.as_ptr(),
            buf.as_mut_ptr().cast(),
            &mut len,
            std::ptr::null_mut(),
            0,
        )
    };
    if rc != 0 {
        return Err(std::io::Error::last_os_error().into());
    }

    let value = match len {
        4 => u64::from(u32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]])),
        8 => u64::from_ne_bytes(buf),
        _ => {
            return Err(ProbeError::Os(format!(
                "{}: unexpected value size {len}",
                name.to_string_lossy()
            )))
        }
    };

    u32::try_from(value)
        .ok()
        .filter(|&v| v > 0)
        .ok_or_else(|| ProbeError::Os(format!("{} returned {value}", name.to_string_lossy())))
}
