use std::io;
use std::mem;

use windows_sys::Win32::Foundation::ERROR_INSUFFICIENT_BUFFER;
use windows_sys::Win32::System::SystemInformation::{
    CacheData, CacheUnified, GetLogicalProcessorInformationEx, GetSystemInfo, RelationCache,
    RelationProcessorCore, LOGICAL_PROCESSOR_RELATIONSHIP, SYSTEM_INFO,
};

use crate::error::{ProbeError, Result};

/// Byte offsets into a SYSTEM_LOGICAL_PROCESSOR_INFORMATION_EX record
mod offsets {
    pub const RELATIONSHIP: usize = 0;
    pub const SIZE: usize = 4;
    /// CACHE_RELATIONSHIP starts after the 8-byte header
    pub const CACHE_LEVEL: usize = 8;
    pub const CACHE_LINE_SIZE: usize = 10;
    pub const CACHE_TYPE: usize = 16;
}

pub fn page_size() -> Result<u32> {
    // SAFETY: SYSTEM_INFO is plain data and GetSystemInfo always fills it.
    let info = unsafe {
        let mut info: SYSTEM_INFO = mem::zeroed();
        GetSystemInfo(&mut info);
        info
    };

    match info.dwPageSize {
        0 => Err(ProbeError::Os("GetSystemInfo reported no page size".to_string())),
        size => Ok(size),
    }
}

/// Line size of the first level 1 data (or unified) cache
pub fn cache_line_size() -> Result<u32> {
    let buffer = processor_information(RelationCache)?;

    records(&buffer)
        .filter(|record| read_i32(record, offsets::RELATIONSHIP) == Some(RelationCache))
        .find(|record| {
            let kind = read_i32(record, offsets::CACHE_TYPE);
            record.get(offsets::CACHE_LEVEL) == Some(&1)
                && matches!(kind, Some(t) if t == CacheData || t == CacheUnified)
        })
        .and_then(|record| read_u16(record, offsets::CACHE_LINE_SIZE))
        .map(u32::from)
        .filter(|&size| size > 0)
        .ok_or_else(|| ProbeError::Os("no L1 data cache reported".to_string()))
}

/// One RelationProcessorCore record per physical core
pub fn physical_core_count() -> Result<u32> {
    let buffer = processor_information(RelationProcessorCore)?;

    let cores = records(&buffer)
        .filter(|record| read_i32(record, offsets::RELATIONSHIP) == Some(RelationProcessorCore))
        .count();

    match cores {
        0 => Err(ProbeError::Os("no processor cores reported".to_string())),
        n => Ok(n as u32),
    }
}

/// Raw records for one relationship type
fn processor_information(relationship: LOGICAL_PROCESSOR_RELATIONSHIP) -> Result<Vec<u8>> {
    let mut length = 0u32;

    // SAFETY: a null buffer with zero length only asks for the required size.
    let ok = unsafe {
        GetLogicalProcessorInformationEx(relationship, std::ptr::null_mut(), &mut length)
    };
    if ok == 0 {
        let e = io::Error::last_os_error();
        if e.raw_os_error() != Some(ERROR_INSUFFICIENT_BUFFER as i32) {
            return Err(e.into());
        }
    }

    // u64 storage keeps the records 8-byte aligned
    let mut storage = vec![0u64; (length as usize).div_ceil(8)];

    // SAFETY: storage holds at least `length` writable bytes.
    let ok = unsafe {
        GetLogicalProcessorInformationEx(relationship, storage.as_mut_ptr().cast(), &mut length)
    };
    if ok == 0 {
        return Err(io::Error::last_os_error().into());
    }

    let mut buffer: Vec<u8> = storage.iter().flat_map(|word| word.to_ne_bytes()).collect();
    buffer.truncate(length as usize);
    Ok(buffer)
}

/// Split a buffer into records using each record's own Size field
fn records(buffer: &[u8]) -> impl Iterator<Item = &[u8]> {
    let mut rest = buffer;
    std::iter::from_fn(move || {
        let size = read_u32(rest, offsets::SIZE)? as usize;
        if size < 8 || size > rest.len() {
            return None;
        }
        let (record, tail) = rest.split_at(size);
        rest = tail;
        Some(record)
    })
}

fn read_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    let raw = bytes.get(offset..offset + 2)?;
    Some(u16::from_ne_bytes([raw[0], raw[1]]))
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let raw = bytes.get(offset..offset + 4)?;
    Some(u32::from_ne_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

fn read_i32(bytes: &[u8], offset: usize) -> Option<i32> {
    read_u32(bytes, offset).map(|v| v as i32)
}
