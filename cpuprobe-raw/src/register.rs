//! Generic register abstractions for typed CPUID and control register decoding

/// Raw output of one CPUID invocation
///
/// Leaves that the processor does not implement still produce a value here
/// (usually zeros, sometimes the highest basic leaf's data). Decoders treat
/// every clear bit as "feature absent", so no validation happens at this level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuidResult {
    pub eax: u32,
    pub ebx: u32,
    pub ecx: u32,
    pub edx: u32,
}

impl CpuidResult {
    pub const fn new(eax: u32, ebx: u32, ecx: u32, edx: u32) -> Self {
        Self { eax, ebx, ecx, edx }
    }
}

/// Test a single bit of a 32-bit register
#[inline]
pub const fn bit(value: u32, index: u32) -> bool {
    (value >> index) & 1 != 0
}

/// Set or clear a single bit of a 32-bit register
#[inline]
pub const fn with_bit(value: u32, index: u32, set: bool) -> u32 {
    if set {
        value | (1 << index)
    } else {
        value & !(1 << index)
    }
}

/// Trait for 64-bit register layouts (XCR0 and similar control registers)
///
/// # Example
///
/// ```ignore
/// use cpuprobe_raw::register::RegisterLayout;
///
/// #[derive(Debug, Default)]
/// struct MyControl {
///     enable: bool,
/// }
///
/// impl RegisterLayout for MyControl {
///     fn to_raw(&self) -> u64 {
///         self.enable as u64
///     }
///
///     fn from_raw(value: u64) -> Self {
///         Self { enable: value & 1 != 0 }
///     }
/// }
/// ```
pub trait RegisterLayout: Sized {
    /// Convert this register layout to a raw register value
    fn to_raw(&self) -> u64;

    /// Parse a raw register value into this register layout
    fn from_raw(value: u64) -> Self;
}

/// Trait for layouts decoded from a CPUID leaf
///
/// `to_cpuid` is the inverse of `from_cpuid` for the bits the layout models;
/// every other bit comes back clear. It exists so that fake register sources
/// can be scripted from typed values.
pub trait CpuidLayout: Sized {
    /// Leaf (EAX input) this layout is read from
    const LEAF: u32;

    /// Subleaf (ECX input) this layout is read from
    const SUBLEAF: u32 = 0;

    fn from_cpuid(result: CpuidResult) -> Self;

    fn to_cpuid(&self) -> CpuidResult;
}
