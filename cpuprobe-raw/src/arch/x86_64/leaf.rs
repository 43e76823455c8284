//! CPUID leaf layouts used for vendor, feature and time-stamp counter detection
//!
//! Only the bits the probe acts on are modelled. Everything else in a leaf
//! is dropped by `from_cpuid` and written back as zero by `to_cpuid`.
//!
//! ## References
//!
//! - Intel® 64 and IA-32 Architectures Software Developer's Manual, Volume 2A, CPUID
//! - AMD CPUID Specification, publication #25481

use crate::register::{bit, with_bit, CpuidLayout, CpuidResult};

/// Leaf numbers
pub mod leaves {
    /// Highest basic leaf and vendor identification string
    pub const VENDOR_ID: u32 = 0x0000_0000;

    /// Version information and baseline feature flags
    pub const FEATURE_INFO: u32 = 0x0000_0001;

    /// Structured extended feature flags (subleaf 0)
    pub const EXTENDED_FEATURES: u32 = 0x0000_0007;

    /// Highest supported extended leaf
    pub const EXTENDED_MAX: u32 = 0x8000_0000;

    /// Extended processor signature and feature bits
    pub const EXTENDED_PROCESSOR_INFO: u32 = 0x8000_0001;

    /// Advanced power management information
    pub const POWER_MANAGEMENT: u32 = 0x8000_0007;
}

/// Vendor identification strings as returned in EBX, EDX, ECX
pub mod vendors {
    pub const INTEL: &[u8; 12] = b"GenuineIntel";
    pub const AMD: &[u8; 12] = b"AuthenticAMD";
}

/// Leaf 0: highest basic leaf and the 12-byte vendor string
///
/// The string is stored across EBX, EDX, ECX (in that order), each register
/// holding four ASCII bytes in little-endian order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VendorId {
    /// Highest supported basic leaf
    pub max_leaf: u32,

    /// Vendor string, e.g. `GenuineIntel`
    pub vendor: [u8; 12],
}

impl VendorId {
    /// Vendor string as UTF-8, if it is valid ASCII
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.vendor).ok()
    }
}

impl CpuidLayout for VendorId {
    const LEAF: u32 = leaves::VENDOR_ID;

    fn from_cpuid(result: CpuidResult) -> Self {
        let mut vendor = [0u8; 12];
        vendor[0..4].copy_from_slice(&result.ebx.to_le_bytes());
        vendor[4..8].copy_from_slice(&result.edx.to_le_bytes());
        vendor[8..12].copy_from_slice(&result.ecx.to_le_bytes());

        Self {
            max_leaf: result.eax,
            vendor,
        }
    }

    fn to_cpuid(&self) -> CpuidResult {
        let word = |i: usize| {
            u32::from_le_bytes([
                self.vendor[i],
                self.vendor[i + 1],
                self.vendor[i + 2],
                self.vendor[i + 3],
            ])
        };

        CpuidResult::new(self.max_leaf, word(0), word(8), word(4))
    }
}

/// Leaf 1: baseline feature flags
///
/// ## Register Format
///
/// | Register | Bit | Field      |
/// |----------|-----|------------|
/// | EDX      | 8   | cmpxchg8b  |
/// | EDX      | 25  | sse        |
/// | EDX      | 26  | sse2       |
/// | ECX      | 0   | sse3       |
/// | ECX      | 9   | ssse3      |
/// | ECX      | 12  | fma        |
/// | ECX      | 13  | cmpxchg16b |
/// | ECX      | 19  | sse41      |
/// | ECX      | 20  | sse42      |
/// | ECX      | 27  | osxsave    |
/// | ECX      | 28  | avx        |
/// | ECX      | 30  | rdrand     |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureInfo {
    pub cmpxchg8b: bool,
    pub sse: bool,
    pub sse2: bool,
    pub sse3: bool,
    pub ssse3: bool,
    pub fma: bool,
    pub cmpxchg16b: bool,
    pub sse41: bool,
    pub sse42: bool,

    /// OS has set CR4.OSXSAVE, so XGETBV may be executed
    pub osxsave: bool,

    /// Processor implements AVX. Says nothing about OS support.
    pub avx: bool,

    pub rdrand: bool,
}

impl CpuidLayout for FeatureInfo {
    const LEAF: u32 = leaves::FEATURE_INFO;

    fn from_cpuid(result: CpuidResult) -> Self {
        let (ecx, edx) = (result.ecx, result.edx);
        Self {
            cmpxchg8b: bit(edx, 8),
            sse: bit(edx, 25),
            sse2: bit(edx, 26),
            sse3: bit(ecx, 0),
            ssse3: bit(ecx, 9),
            fma: bit(ecx, 12),
            cmpxchg16b: bit(ecx, 13),
            sse41: bit(ecx, 19),
            sse42: bit(ecx, 20),
            osxsave: bit(ecx, 27),
            avx: bit(ecx, 28),
            rdrand: bit(ecx, 30),
        }
    }

    fn to_cpuid(&self) -> CpuidResult {
        let mut edx = 0;
        edx = with_bit(edx, 8, self.cmpxchg8b);
        edx = with_bit(edx, 25, self.sse);
        edx = with_bit(edx, 26, self.sse2);

        let mut ecx = 0;
        ecx = with_bit(ecx, 0, self.sse3);
        ecx = with_bit(ecx, 9, self.ssse3);
        ecx = with_bit(ecx, 12, self.fma);
        ecx = with_bit(ecx, 13, self.cmpxchg16b);
        ecx = with_bit(ecx, 19, self.sse41);
        ecx = with_bit(ecx, 20, self.sse42);
        ecx = with_bit(ecx, 27, self.osxsave);
        ecx = with_bit(ecx, 28, self.avx);
        ecx = with_bit(ecx, 30, self.rdrand);

        CpuidResult::new(0, 0, ecx, edx)
    }
}

/// Leaf 7, subleaf 0: structured extended feature flags
///
/// | Register | Bit | Field |
/// |----------|-----|-------|
/// | EBX      | 5   | avx2  |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtendedFeatures {
    /// Processor implements AVX2. Only usable when AVX state is OS-enabled.
    pub avx2: bool,
}

impl CpuidLayout for ExtendedFeatures {
    const LEAF: u32 = leaves::EXTENDED_FEATURES;
    const SUBLEAF: u32 = 0;

    fn from_cpuid(result: CpuidResult) -> Self {
        Self {
            avx2: bit(result.ebx, 5),
        }
    }

    fn to_cpuid(&self) -> CpuidResult {
        CpuidResult::new(0, with_bit(0, 5, self.avx2), 0, 0)
    }
}

/// Leaf 0x8000_0001: extended processor feature bits
///
/// | Register | Bit | Field     |
/// |----------|-----|-----------|
/// | EDX      | 8   | cmpxchg8b |
/// | EDX      | 27  | rdtscp    |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtendedProcessorInfo {
    /// Mirrors leaf 1 on AMD processors
    pub cmpxchg8b: bool,

    pub rdtscp: bool,
}

impl CpuidLayout for ExtendedProcessorInfo {
    const LEAF: u32 = leaves::EXTENDED_PROCESSOR_INFO;

    fn from_cpuid(result: CpuidResult) -> Self {
        Self {
            cmpxchg8b: bit(result.edx, 8),
            rdtscp: bit(result.edx, 27),
        }
    }

    fn to_cpuid(&self) -> CpuidResult {
        let mut edx = 0;
        edx = with_bit(edx, 8, self.cmpxchg8b);
        edx = with_bit(edx, 27, self.rdtscp);
        CpuidResult::new(0, 0, 0, edx)
    }
}

/// Leaf 0x8000_0007: advanced power management
///
/// | Register | Bit | Field         |
/// |----------|-----|---------------|
/// | EDX      | 8   | invariant_tsc |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PowerManagement {
    /// TSC runs at a constant rate in all ACPI P-, C- and T-states
    pub invariant_tsc: bool,
}

impl CpuidLayout for PowerManagement {
    const LEAF: u32 = leaves::POWER_MANAGEMENT;

    fn from_cpuid(result: CpuidResult) -> Self {
        Self {
            invariant_tsc: bit(result.edx, 8),
        }
    }

    fn to_cpuid(&self) -> CpuidResult {
        CpuidResult::new(0, 0, 0, with_bit(0, 8, self.invariant_tsc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_selectors() {
        assert_eq!((VendorId::LEAF, VendorId::SUBLEAF), (0, 0));
        assert_eq!((FeatureInfo::LEAF, FeatureInfo::SUBLEAF), (1, 0));
        assert_eq!((ExtendedFeatures::LEAF, ExtendedFeatures::SUBLEAF), (7, 0));
        assert_eq!(ExtendedProcessorInfo::LEAF, 0x8000_0001);
        assert_eq!(PowerManagement::LEAF, 0x8000_0007);
    }

    #[test]
    fn test_vendor_id_decodes_register_order() {
        // "GenuineIntel" as reported by real hardware
        let raw = CpuidResult::new(0x16, 0x756e_6547, 0x6c65_746e, 0x4965_6e69);
        let id = VendorId::from_cpuid(raw);

        assert_eq!(&id.vendor, vendors::INTEL);
        assert_eq!(id.as_str(), Some("GenuineIntel"));
        assert_eq!(id.max_leaf, 0x16);
        assert_eq!(id.to_cpuid(), raw);
    }

    #[test]
    fn test_vendor_id_amd() {
        let raw = CpuidResult::new(0x10, 0x6874_7541, 0x444d_4163, 0x6974_6e65);
        assert_eq!(&VendorId::from_cpuid(raw).vendor, vendors::AMD);
    }

    #[test]
    fn test_feature_info_bits() {
        let raw = CpuidResult::new(0, 0, (1 << 28) | (1 << 27), (1 << 25) | (1 << 26));
        let info = FeatureInfo::from_cpuid(raw);

        assert!(info.avx);
        assert!(info.osxsave);
        assert!(info.sse);
        assert!(info.sse2);
        assert!(!info.sse3);
        assert!(!info.rdrand);
    }

    #[test]
    fn test_feature_info_ignores_unmodelled_bits() {
        // EDX bit 4 (TSC) is not modelled and must not leak into to_cpuid
        let raw = CpuidResult::new(0x906EA, 0x0010_0800, 1 << 30, (1 << 4) | (1 << 8));
        let encoded = FeatureInfo::from_cpuid(raw).to_cpuid();

        assert_eq!(encoded.edx, 1 << 8);
        assert_eq!(encoded.ecx, 1 << 30);
        assert_eq!(encoded.eax, 0);
    }

    #[test]
    fn test_extended_leaves() {
        assert!(ExtendedFeatures::from_cpuid(CpuidResult::new(0, 1 << 5, 0, 0)).avx2);
        assert!(!ExtendedFeatures::from_cpuid(CpuidResult::new(0, 0, 1 << 5, 1 << 5)).avx2);

        let ext = ExtendedProcessorInfo::from_cpuid(CpuidResult::new(0, 0, 0, 1 << 27));
        assert!(ext.rdtscp);
        assert!(!ext.cmpxchg8b);

        let pm = PowerManagement::from_cpuid(CpuidResult::new(0, 0, 0, 1 << 8));
        assert!(pm.invariant_tsc);
    }
}
