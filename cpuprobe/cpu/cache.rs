use once_cell::sync::OnceCell;

use crate::cpu::decoder::{self, HardwareRegisters};
use crate::cpu::feature::{CpuFeature, FeatureTable};
use crate::cpu::vendor::{self, CpuVendor, VendorIdentity};

/// Computes the values a [`CpuCapabilities`] container caches
///
/// Every method is called at most once per container.
pub trait CapabilitySource {
    fn vendor_identity(&self) -> VendorIdentity;

    fn features(&self) -> FeatureTable;

    fn cycle_counter_is_invariant(&self) -> bool;
}

#[cfg(target_arch = "x86_64")]
impl<R: decoder::RegisterSource> CapabilitySource for R {
    fn vendor_identity(&self) -> VendorIdentity {
        vendor::detect_from(self)
    }

    fn features(&self) -> FeatureTable {
        decoder::FeatureDecoder::new(self).decode()
    }

    fn cycle_counter_is_invariant(&self) -> bool {
        detect_invariant_tsc_from(self)
    }
}

#[cfg(not(target_arch = "x86_64"))]
impl CapabilitySource for HardwareRegisters {
    fn vendor_identity(&self) -> VendorIdentity {
        vendor::detect()
    }

    fn features(&self) -> FeatureTable {
        decoder::detect()
    }

    fn cycle_counter_is_invariant(&self) -> bool {
        false
    }
}

/// Lazily computed CPU capabilities
///
/// Each value is computed from the source on first query and published once
/// through a `OnceCell`. Concurrent first callers wait for a single
/// initializer, so every thread observes the same complete value. An empty
/// cell means "not yet computed"; a computed `CpuVendor::Unknown` is a final
/// answer.
///
/// `instance()` is the process-wide container used by the free query
/// functions. Independent containers can be created with `new()`, or over
/// any [`CapabilitySource`] with `with_source()`.
#[derive(Debug, Default)]
pub struct CpuCapabilities<S = HardwareRegisters> {
    source: S,
    vendor: OnceCell<VendorIdentity>,
    features: OnceCell<FeatureTable>,
    invariant_tsc: OnceCell<bool>,
}

impl CpuCapabilities {
    pub const fn new() -> Self {
        Self::with_source(HardwareRegisters)
    }

    pub fn instance() -> &'static CpuCapabilities {
        static INSTANCE: CpuCapabilities = CpuCapabilities::new();
        &INSTANCE
    }
}

impl<S: CapabilitySource> CpuCapabilities<S> {
    /// An empty container that computes from `source` on demand
    pub const fn with_source(source: S) -> Self {
        Self {
            source,
            vendor: OnceCell::new(),
            features: OnceCell::new(),
            invariant_tsc: OnceCell::new(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Compute every value now instead of on first query
    pub fn populate(&self) -> &Self {
        self.vendor_identity();
        self.features();
        self.cycle_counter_is_invariant();
        self
    }

    pub fn vendor(&self) -> CpuVendor {
        self.vendor_identity().vendor
    }

    pub fn vendor_identity(&self) -> &VendorIdentity {
        self.vendor.get_or_init(|| {
            let identity = self.source.vendor_identity();
            tracing::debug!("CPU vendor: {}", identity.vendor);
            identity
        })
    }

    /// Vendor if it has already been computed
    pub fn cached_vendor(&self) -> Option<CpuVendor> {
        self.vendor.get().map(|identity| identity.vendor)
    }

    /// The first call decodes every feature; later calls are table lookups
    pub fn feature_available(&self, feature: CpuFeature) -> bool {
        self.features().contains(feature)
    }

    pub fn features(&self) -> &FeatureTable {
        self.features.get_or_init(|| self.source.features())
    }

    pub fn cycle_counter_is_invariant(&self) -> bool {
        *self.invariant_tsc.get_or_init(|| {
            let invariant = self.source.cycle_counter_is_invariant();
            tracing::debug!("Cycle counter invariant: {}", invariant);
            invariant
        })
    }

    /// Invariance if it has already been computed
    pub fn cached_cycle_counter_is_invariant(&self) -> Option<bool> {
        self.invariant_tsc.get().copied()
    }
}

/// CPUID.80000007H:EDX[bit 8], when the leaf exists
#[cfg(target_arch = "x86_64")]
pub fn detect_invariant_tsc_from<S: decoder::RegisterSource>(source: &S) -> bool {
    use cpuprobe_raw::current_arch::leaf::{leaves, PowerManagement};

    if source.max_extended_leaf() < leaves::POWER_MANAGEMENT {
        return false;
    }

    source.read::<PowerManagement>().invariant_tsc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_is_singleton() {
        let a = CpuCapabilities::instance();
        let b = CpuCapabilities::instance();
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn test_queries_are_idempotent() {
        let caps = CpuCapabilities::new();
        assert_eq!(caps.cached_vendor(), None);
        assert_eq!(caps.cached_cycle_counter_is_invariant(), None);

        let vendor = caps.vendor();
        assert_eq!(caps.cached_vendor(), Some(vendor));
        assert_eq!(caps.vendor(), vendor);

        let invariant = caps.cycle_counter_is_invariant();
        assert_eq!(caps.cycle_counter_is_invariant(), invariant);

        for &feature in CpuFeature::ALL {
            assert_eq!(
                caps.feature_available(feature),
                caps.feature_available(feature)
            );
        }
    }

    #[test]
    fn test_concurrent_first_queries_agree() {
        let caps = CpuCapabilities::new();

        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        (
                            caps.vendor(),
                            *caps.features(),
                            caps.cycle_counter_is_invariant(),
                        )
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(results.windows(2).all(|w| w[0] == w[1]));
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn test_first_feature_query_decodes_everything() {
        use crate::cpu::decoder::fake::FakeRegisters;

        let caps = CpuCapabilities::with_source(
            FakeRegisters::intel()
                .with_avx_bits(true, true)
                .with_xcr0(0b110)
                .with_avx2_bit()
                .with_rdtscp(),
        );
        let regs = caps.source();
        assert_eq!(regs.cpuid_calls.get(), 0);

        assert!(caps.feature_available(CpuFeature::Sse));
        let decoded = regs.cpuid_calls.get();
        assert!(decoded > 0);
        assert_eq!(regs.xgetbv_calls.get(), 1);

        // Already set by the first query, no further CPUID
        assert!(caps.feature_available(CpuFeature::Avx2));
        assert!(caps.feature_available(CpuFeature::Rdtscp));
        for &feature in CpuFeature::ALL {
            caps.feature_available(feature);
        }
        assert_eq!(regs.cpuid_calls.get(), decoded);
        assert_eq!(regs.xgetbv_calls.get(), 1);
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn test_vendor_and_invariance_computed_once() {
        use crate::cpu::decoder::fake::FakeRegisters;

        let caps = CpuCapabilities::with_source(FakeRegisters::intel().with_invariant_tsc());
        let regs = caps.source();

        assert_eq!(caps.cached_vendor(), None);
        assert_eq!(caps.vendor(), CpuVendor::Intel);
        let after_vendor = regs.cpuid_calls.get();
        assert_eq!(caps.vendor(), CpuVendor::Intel);
        assert_eq!(caps.vendor_identity().raw_str(), Some("GenuineIntel"));
        assert_eq!(regs.cpuid_calls.get(), after_vendor);

        assert_eq!(caps.cached_cycle_counter_is_invariant(), None);
        assert!(caps.cycle_counter_is_invariant());
        let after_invariant = regs.cpuid_calls.get();
        assert!(caps.cycle_counter_is_invariant());
        assert_eq!(regs.cpuid_calls.get(), after_invariant);
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn test_populate_fills_every_cell() {
        use crate::cpu::decoder::fake::FakeRegisters;

        let caps = CpuCapabilities::with_source(FakeRegisters::intel());
        caps.populate();
        let calls = caps.source().cpuid_calls.get();

        assert_eq!(caps.cached_vendor(), Some(CpuVendor::Intel));
        assert_eq!(caps.cached_cycle_counter_is_invariant(), Some(false));
        assert!(!caps.feature_available(CpuFeature::Avx));
        assert_eq!(caps.source().cpuid_calls.get(), calls);
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn test_invariant_tsc_needs_extended_leaf() {
        use cpuprobe_raw::CpuidResult;

        use crate::cpu::decoder::fake::FakeRegisters;

        let regs = FakeRegisters::default()
            .with_raw(0x8000_0000, 0, CpuidResult::new(0x8000_0001, 0, 0, 0))
            .with_invariant_tsc();
        assert!(!detect_invariant_tsc_from(&regs));

        let regs = FakeRegisters::intel().with_invariant_tsc();
        assert!(detect_invariant_tsc_from(&regs));
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn test_avx2_implies_avx_on_hardware() {
        let caps = CpuCapabilities::instance();
        if caps.feature_available(CpuFeature::Avx2) {
            assert!(caps.feature_available(CpuFeature::Avx));
        }
        assert!(caps.feature_available(CpuFeature::Sse));
        assert!(caps.feature_available(CpuFeature::Sse2));
    }
}
