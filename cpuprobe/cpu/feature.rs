//! Instruction-set features and the bitset that records them
//!
//! `CpuFeature` is a different enum on every target architecture. An
//! x86-64 build has no `Neon` variant and an AArch64 build has no `Avx`,
//! so a cross-architecture query cannot be written.

use crate::feature_enum;

#[cfg(target_arch = "x86_64")]
feature_enum! {
    /// x86-64 instruction-set extensions
    pub enum CpuFeature {
        Sse => "SSE",
        Sse2 => "SSE2",
        Sse3 => "SSE3",
        Ssse3 => "SSSE3",
        Sse41 => "SSE4.1",
        Sse42 => "SSE4.2",
        /// Implies the OS saves XMM and YMM state
        Avx => "AVX",
        /// Only reported together with `Avx`
        Avx2 => "AVX2",
        Fma => "FMA",
        Cmpxchg8b => "CMPXCHG8B",
        Cmpxchg16b => "CMPXCHG16B",
        Rdrand => "RDRAND",
        Rdtscp => "RDTSCP",
    }
}

#[cfg(target_arch = "aarch64")]
feature_enum! {
    /// AArch64 instruction-set extensions
    pub enum CpuFeature {
        Neon => "NEON",
        Crc32 => "CRC32",
        /// Large System Extensions (LSE) atomics
        Atomics => "ATOMICS",
    }
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
feature_enum! {
    /// No features are detected on this architecture
    pub enum CpuFeature {}
}

/// Number of features defined for the compiled target
pub const FEATURE_MAX: usize = CpuFeature::COUNT;

const FEATURE_BYTES: usize = FEATURE_MAX.div_ceil(8);

/// One bit per `CpuFeature`, packed into bytes
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureTable {
    bits: [u8; FEATURE_BYTES],
}

impl FeatureTable {
    /// A table with every feature absent
    pub const fn new() -> Self {
        Self {
            bits: [0; FEATURE_BYTES],
        }
    }

    pub fn set(&mut self, feature: CpuFeature) {
        let index = feature.index();
        self.bits[index / 8] |= 1 << (index % 8);
    }

    /// Set `feature` when `available` is true
    pub fn set_if(&mut self, feature: CpuFeature, available: bool) {
        if available {
            self.set(feature);
        }
    }

    pub fn contains(&self, feature: CpuFeature) -> bool {
        let index = feature.index();
        self.bits[index / 8] & (1 << (index % 8)) != 0
    }

    /// Available features in declaration order
    pub fn iter(&self) -> impl Iterator<Item = CpuFeature> + '_ {
        CpuFeature::ALL
            .iter()
            .copied()
            .filter(move |&f| self.contains(f))
    }

    pub fn len(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FeatureTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FeatureTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<CpuFeature> for FeatureTable {
    fn from_iter<I: IntoIterator<Item = CpuFeature>>(iter: I) -> Self {
        let mut table = Self::new();
        for feature in iter {
            table.set(feature);
        }
        table
    }
}

#[cfg(all(test, target_arch = "x86_64"))]
mod tests {
    use super::*;

    #[test]
    fn test_feature_indices_are_dense() {
        for (i, feature) in CpuFeature::all().into_iter().enumerate() {
            assert_eq!(feature.index(), i);
        }
        assert_eq!(FEATURE_MAX, 13);
        assert_eq!(FEATURE_BYTES, 2);
    }

    #[test]
    fn test_set_and_contains() {
        let mut table = FeatureTable::new();
        assert!(table.is_empty());

        table.set(CpuFeature::Sse);
        table.set(CpuFeature::Rdtscp);
        table.set_if(CpuFeature::Avx, false);

        assert!(table.contains(CpuFeature::Sse));
        assert!(table.contains(CpuFeature::Rdtscp));
        assert!(!table.contains(CpuFeature::Avx));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_iter_follows_declaration_order() {
        let table: FeatureTable = [CpuFeature::Rdtscp, CpuFeature::Sse2, CpuFeature::Avx]
            .into_iter()
            .collect();

        let names: Vec<_> = table.iter().map(|f| f.name()).collect();
        assert_eq!(names, ["SSE2", "AVX", "RDTSCP"]);
        assert_eq!(format!("{table:?}"), "{Sse2, Avx, Rdtscp}");
    }

    #[test]
    fn test_display_uses_name() {
        assert_eq!(CpuFeature::Sse41.to_string(), "SSE4.1");
    }
}
