//! Extended control register 0 (XCR0)
//!
//! XCR0 tells which processor state components the OS saves and restores
//! on context switch. A SIMD extension is only usable when the OS has
//! enabled every component it touches.

use crate::register::RegisterLayout;

/// XGETBV selector for XCR0
pub const XCR0: u32 = 0;

/// State component masks
pub mod components {
    /// x87 FPU state
    pub const X87: u64 = 1 << 0;

    /// SSE state (XMM registers, MXCSR)
    pub const SSE: u64 = 1 << 1;

    /// AVX state (upper halves of YMM registers)
    pub const AVX: u64 = 1 << 2;

    /// Components required before AVX or AVX2 may be executed
    pub const AVX_REQUIRED: u64 = SSE | AVX;
}

/// XCR0 layout
///
/// ## Register Format
///
/// | Bits  | Field    | Description                    |
/// |-------|----------|--------------------------------|
/// | 0     | x87      | x87 FPU/MMX state              |
/// | 1     | sse      | XMM state                      |
/// | 2     | avx      | YMM upper-half state           |
/// | 3-63  | reserved | (MPX, AVX-512, AMX, ...)       |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Xcr0 {
    pub x87: bool,
    pub sse: bool,
    pub avx: bool,
}

impl Xcr0 {
    /// OS saves both XMM and YMM state
    pub fn avx_state_enabled(&self) -> bool {
        self.sse && self.avx
    }
}

impl RegisterLayout for Xcr0 {
    fn to_raw(&self) -> u64 {
        (if self.x87 { components::X87 } else { 0 })
            | (if self.sse { components::SSE } else { 0 })
            | (if self.avx { components::AVX } else { 0 })
    }

    fn from_raw(value: u64) -> Self {
        Self {
            x87: value & components::X87 != 0,
            sse: value & components::SSE != 0,
            avx: value & components::AVX != 0,
        }
    }
}
