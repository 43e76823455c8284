//! One-pass feature decoding
//!
//! On x86-64 the decoder reads CPUID leaves 1, 7 and 0x8000_0001 (and XCR0
//! when the OS allows it) through a [`RegisterSource`], so the gating logic
//! can be driven by scripted register values in tests. AArch64 relies on
//! the standard library's runtime detection.

use crate::cpu::feature::FeatureTable;

#[cfg(target_arch = "x86_64")]
pub use x86::{FeatureDecoder, HardwareRegisters, RegisterSource};

/// The processor the calling thread runs on, queried through the standard
/// library's runtime detection
#[cfg(not(target_arch = "x86_64"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct HardwareRegisters;

/// Decode the feature table of the running processor
#[cfg(target_arch = "x86_64")]
pub fn detect() -> FeatureTable {
    FeatureDecoder::new(&HardwareRegisters).decode()
}

/// Decode the feature table of the running processor
#[cfg(target_arch = "aarch64")]
pub fn detect() -> FeatureTable {
    use crate::cpu::feature::CpuFeature;

    let mut table = FeatureTable::new();
    table.set_if(
        CpuFeature::Neon,
        std::arch::is_aarch64_feature_detected!("neon"),
    );
    table.set_if(
        CpuFeature::Crc32,
        std::arch::is_aarch64_feature_detected!("crc"),
    );
    table.set_if(
        CpuFeature::Atomics,
        std::arch::is_aarch64_feature_detected!("lse"),
    );
    table
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
pub fn detect() -> FeatureTable {
    FeatureTable::new()
}

#[cfg(target_arch = "x86_64")]
mod x86 {
    use cpuprobe_raw::current_arch::leaf::{
        leaves, ExtendedFeatures, ExtendedProcessorInfo, FeatureInfo, VendorId,
    };
    use cpuprobe_raw::current_arch::{instr, xcr};
    use cpuprobe_raw::{CpuidLayout, CpuidResult, RegisterLayout};

    use crate::cpu::feature::{CpuFeature, FeatureTable};

    /// Where CPUID and XGETBV results come from
    pub trait RegisterSource {
        fn cpuid(&self, leaf: u32, subleaf: u32) -> CpuidResult;

        /// # Safety
        ///
        /// Only valid once CPUID.1:ECX.OSXSAVE has been observed set.
        unsafe fn xgetbv(&self, selector: u32) -> u64;

        /// Read and decode the leaf a layout describes
        fn read<T: CpuidLayout>(&self) -> T
        where
            Self: Sized,
        {
            T::from_cpuid(self.cpuid(T::LEAF, T::SUBLEAF))
        }

        /// Highest basic leaf (EAX of leaf 0)
        fn max_basic_leaf(&self) -> u32
        where
            Self: Sized,
        {
            self.read::<VendorId>().max_leaf
        }

        /// Highest extended leaf (EAX of leaf 0x8000_0000)
        fn max_extended_leaf(&self) -> u32 {
            self.cpuid(leaves::EXTENDED_MAX, 0).eax
        }
    }

    /// The processor the calling thread runs on
    #[derive(Debug, Clone, Copy, Default)]
    pub struct HardwareRegisters;

    impl RegisterSource for HardwareRegisters {
        #[inline]
        fn cpuid(&self, leaf: u32, subleaf: u32) -> CpuidResult {
            instr::cpuid(leaf, subleaf)
        }

        #[inline]
        unsafe fn xgetbv(&self, selector: u32) -> u64 {
            instr::xgetbv(selector)
        }
    }

    pub struct FeatureDecoder<'a, S: RegisterSource> {
        source: &'a S,
    }

    impl<'a, S: RegisterSource> FeatureDecoder<'a, S> {
        pub fn new(source: &'a S) -> Self {
            Self { source }
        }

        /// Populate every feature in one pass
        ///
        /// AVX needs the CPUID bit, OSXSAVE, and XCR0 with both XMM and YMM
        /// state enabled. XCR0 is only read after OSXSAVE is seen. AVX2 needs
        /// AVX. CMPXCHG8B falls back to the extended leaf.
        pub fn decode(&self) -> FeatureTable {
            let mut table = FeatureTable::new();
            let max_basic = self.source.max_basic_leaf();
            let max_extended = self.source.max_extended_leaf();

            let info: FeatureInfo = self.source.read();

            table.set_if(CpuFeature::Sse, info.sse);
            table.set_if(CpuFeature::Sse2, info.sse2);
            table.set_if(CpuFeature::Sse3, info.sse3);
            table.set_if(CpuFeature::Ssse3, info.ssse3);
            table.set_if(CpuFeature::Sse41, info.sse41);
            table.set_if(CpuFeature::Sse42, info.sse42);

            if info.avx && info.osxsave {
                // SAFETY: OSXSAVE is set, so XGETBV is enabled.
                let xcr0 = xcr::Xcr0::from_raw(unsafe { self.source.xgetbv(xcr::XCR0) });
                table.set_if(CpuFeature::Avx, xcr0.avx_state_enabled());
            }

            table.set_if(CpuFeature::Fma, info.fma);
            table.set_if(CpuFeature::Cmpxchg8b, info.cmpxchg8b);
            table.set_if(CpuFeature::Cmpxchg16b, info.cmpxchg16b);
            table.set_if(CpuFeature::Rdrand, info.rdrand);

            if max_basic >= leaves::EXTENDED_FEATURES {
                let ext: ExtendedFeatures = self.source.read();
                table.set_if(
                    CpuFeature::Avx2,
                    table.contains(CpuFeature::Avx) && ext.avx2,
                );
            }

            if max_extended >= leaves::EXTENDED_PROCESSOR_INFO {
                let ext: ExtendedProcessorInfo = self.source.read();
                if !table.contains(CpuFeature::Cmpxchg8b) {
                    table.set_if(CpuFeature::Cmpxchg8b, ext.cmpxchg8b);
                }
                table.set_if(CpuFeature::Rdtscp, ext.rdtscp);
            }

            tracing::debug!(
                "Decoded CPU features (max leaf {:#x}, max extended leaf {:#x}): {:?}",
                max_basic,
                max_extended,
                table
            );

            table
        }
    }
}

/// Scripted register source shared by the decoder, vendor and cache tests
#[cfg(all(test, target_arch = "x86_64"))]
pub(crate) mod fake {
    use std::cell::Cell;
    use std::collections::HashMap;

    use cpuprobe_raw::current_arch::leaf::{
        leaves, vendors, ExtendedFeatures, ExtendedProcessorInfo, FeatureInfo, PowerManagement,
        VendorId,
    };
    use cpuprobe_raw::{CpuidLayout, CpuidResult};

    use super::RegisterSource;

    /// Unscripted leaves read as zero, like reserved leaves on real parts
    #[derive(Default)]
    pub struct FakeRegisters {
        leaves: HashMap<(u32, u32), CpuidResult>,
        xcr0: Option<u64>,
        pub cpuid_calls: Cell<u32>,
        pub xgetbv_calls: Cell<u32>,
    }

    impl FakeRegisters {
        /// An Intel part implementing every leaf the decoder reads
        pub fn intel() -> Self {
            Self::default()
                .with(VendorId {
                    max_leaf: 0x16,
                    vendor: *vendors::INTEL,
                })
                .with_raw(leaves::EXTENDED_MAX, 0, CpuidResult::new(0x8000_0008, 0, 0, 0))
        }

        pub fn with<T: CpuidLayout>(self, layout: T) -> Self {
            self.with_raw(T::LEAF, T::SUBLEAF, layout.to_cpuid())
        }

        pub fn with_raw(mut self, leaf: u32, subleaf: u32, result: CpuidResult) -> Self {
            self.leaves.insert((leaf, subleaf), result);
            self
        }

        pub fn with_xcr0(mut self, xcr0: u64) -> Self {
            self.xcr0 = Some(xcr0);
            self
        }

        /// Leaf 1 with ECX bits 27/28 as given plus SSE/SSE2
        pub fn with_avx_bits(self, osxsave: bool, avx: bool) -> Self {
            self.with(FeatureInfo {
                sse: true,
                sse2: true,
                osxsave,
                avx,
                ..FeatureInfo::default()
            })
        }

        pub fn with_avx2_bit(self) -> Self {
            self.with(ExtendedFeatures { avx2: true })
        }

        pub fn with_rdtscp(self) -> Self {
            self.with(ExtendedProcessorInfo {
                rdtscp: true,
                ..ExtendedProcessorInfo::default()
            })
        }

        pub fn with_invariant_tsc(self) -> Self {
            self.with(PowerManagement {
                invariant_tsc: true,
            })
        }
    }

    impl RegisterSource for FakeRegisters {
        fn cpuid(&self, leaf: u32, subleaf: u32) -> CpuidResult {
            self.cpuid_calls.set(self.cpuid_calls.get() + 1);
            self.leaves
                .get(&(leaf, subleaf))
                .copied()
                .unwrap_or_default()
        }

        unsafe fn xgetbv(&self, _selector: u32) -> u64 {
            self.xgetbv_calls.set(self.xgetbv_calls.get() + 1);
            let info = FeatureInfo::from_cpuid(self.cpuid(1, 0));
            assert!(info.osxsave, "XGETBV executed without OSXSAVE");
            self.xcr0.expect("XCR0 not scripted")
        }
    }
}

#[cfg(all(test, target_arch = "x86_64"))]
mod tests {
    use cpuprobe_raw::current_arch::leaf::{ExtendedProcessorInfo, FeatureInfo};
    use cpuprobe_raw::CpuidResult;

    use super::fake::FakeRegisters;
    use super::*;
    use crate::cpu::feature::CpuFeature;

    #[test]
    fn test_avx_with_osxsave_and_ymm_state() {
        let regs = FakeRegisters::intel()
            .with_avx_bits(true, true)
            .with_xcr0(0b110);
        let table = FeatureDecoder::new(&regs).decode();

        assert!(table.contains(CpuFeature::Avx));
        assert_eq!(regs.xgetbv_calls.get(), 1);
    }

    #[test]
    fn test_no_avx_without_osxsave() {
        for avx in [true, false] {
            let regs = FakeRegisters::intel().with_avx_bits(false, avx);
            let table = FeatureDecoder::new(&regs).decode();

            assert!(!table.contains(CpuFeature::Avx));
            assert_eq!(regs.xgetbv_calls.get(), 0, "XCR0 must not be read");
        }
    }

    #[test]
    fn test_no_avx_when_os_skips_ymm_state() {
        let regs = FakeRegisters::intel()
            .with_avx_bits(true, true)
            .with_xcr0(0b011);
        let table = FeatureDecoder::new(&regs).decode();

        assert!(!table.contains(CpuFeature::Avx));
    }

    #[test]
    fn test_avx2_requires_confirmed_avx() {
        let regs = FakeRegisters::intel()
            .with_avx_bits(false, true)
            .with_avx2_bit();
        let table = FeatureDecoder::new(&regs).decode();

        assert!(!table.contains(CpuFeature::Avx));
        assert!(!table.contains(CpuFeature::Avx2));

        let regs = FakeRegisters::intel()
            .with_avx_bits(true, true)
            .with_xcr0(0b111)
            .with_avx2_bit();
        let table = FeatureDecoder::new(&regs).decode();

        assert!(table.contains(CpuFeature::Avx));
        assert!(table.contains(CpuFeature::Avx2));
    }

    #[test]
    fn test_cmpxchg8b_extended_leaf_fallback() {
        let regs = FakeRegisters::intel()
            .with(FeatureInfo::default())
            .with(ExtendedProcessorInfo {
                cmpxchg8b: true,
                rdtscp: true,
            });
        let table = FeatureDecoder::new(&regs).decode();

        assert!(table.contains(CpuFeature::Cmpxchg8b));
        assert!(table.contains(CpuFeature::Rdtscp));
    }

    #[test]
    fn test_baseline_leaf_bits() {
        let regs = FakeRegisters::intel().with_raw(
            1,
            0,
            CpuidResult::new(
                0,
                0,
                (1 << 0) | (1 << 9) | (1 << 12) | (1 << 13) | (1 << 19) | (1 << 20) | (1 << 30),
                (1 << 8) | (1 << 25) | (1 << 26),
            ),
        );
        let table = FeatureDecoder::new(&regs).decode();

        for feature in [
            CpuFeature::Sse,
            CpuFeature::Sse2,
            CpuFeature::Sse3,
            CpuFeature::Ssse3,
            CpuFeature::Sse41,
            CpuFeature::Sse42,
            CpuFeature::Fma,
            CpuFeature::Cmpxchg8b,
            CpuFeature::Cmpxchg16b,
            CpuFeature::Rdrand,
        ] {
            assert!(table.contains(feature), "{feature} missing");
        }
        assert!(!table.contains(CpuFeature::Avx));
        assert!(!table.contains(CpuFeature::Rdtscp));
    }

    #[test]
    fn test_unimplemented_leaves_are_not_read() {
        // Max basic leaf 1 and no extended leaves: leaf 7 and 0x8000_0001
        // must be ignored even if they hold set bits
        let regs = FakeRegisters::default()
            .with_raw(0, 0, CpuidResult::new(1, 0, 0, 0))
            .with_avx_bits(true, true)
            .with_xcr0(0b110)
            .with_avx2_bit()
            .with_rdtscp();
        let table = FeatureDecoder::new(&regs).decode();

        assert!(table.contains(CpuFeature::Avx));
        assert!(!table.contains(CpuFeature::Avx2));
        assert!(!table.contains(CpuFeature::Rdtscp));
    }

    #[test]
    fn test_all_zero_registers_decode_to_nothing() {
        let regs = FakeRegisters::default();
        assert!(FeatureDecoder::new(&regs).decode().is_empty());
    }

    #[test]
    fn test_hardware_baseline_features() {
        let table = detect();
        assert!(table.contains(CpuFeature::Sse));
        assert!(table.contains(CpuFeature::Sse2));
        if table.contains(CpuFeature::Avx2) {
            assert!(table.contains(CpuFeature::Avx));
        }
    }
}
