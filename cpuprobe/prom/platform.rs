use prometheus::{IntGauge, IntGaugeVec, Opts, Registry};
use std::sync::Arc;

use crate::cpu::{CpuCapabilities, CpuFeature, CycleCounter};
use crate::error::Result;
use crate::metric_enum;
use crate::topology::Topology;

metric_enum! {
    pub enum PlatformMetric {
        PageSize => "cpuprobe_page_size_bytes",
        CacheLineSize => "cpuprobe_cache_line_size_bytes",
        LogicalCores => "cpuprobe_logical_cores",
        PhysicalCores => "cpuprobe_physical_cores",
        CounterInvariant => "cpuprobe_cycle_counter_invariant",
        CounterFrequency => "cpuprobe_cycle_counter_frequency_hz",
    }
}

impl PlatformMetric {
    fn help(&self) -> &'static str {
        match self {
            PlatformMetric::PageSize => "Memory page size in bytes",
            PlatformMetric::CacheLineSize => "L1 data cache line size in bytes (0 = unknown)",
            PlatformMetric::LogicalCores => "Online logical processors (0 = unknown)",
            PlatformMetric::PhysicalCores => "Physical cores (0 = unknown)",
            PlatformMetric::CounterInvariant => "1 if the cycle counter runs at a constant rate",
            PlatformMetric::CounterFrequency => "Calibrated cycle counter frequency (0 = unknown)",
        }
    }
}

/// Exports the cached platform capabilities as Prometheus gauges
pub struct PlatformMetricExporter {
    registry: Arc<Registry>,
    capabilities: &'static CpuCapabilities,
    counter: &'static CycleCounter<'static>,
    topology: &'static Topology,
    gauges: Vec<(PlatformMetric, IntGauge)>,
    cpu_info: IntGaugeVec,
    features: IntGaugeVec,
}

impl PlatformMetricExporter {
    /// Exporter over the process-wide instances
    pub fn new() -> Result<Self> {
        Self::with_sources(
            CpuCapabilities::instance(),
            CycleCounter::instance(),
            Topology::instance(),
        )
    }

    pub fn with_sources(
        capabilities: &'static CpuCapabilities,
        counter: &'static CycleCounter<'static>,
        topology: &'static Topology,
    ) -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let mut gauges = Vec::new();
        for metric in PlatformMetric::all() {
            let gauge = IntGauge::with_opts(Opts::new(metric.name(), metric.help()))?;
            registry.register(Box::new(gauge.clone()))?;
            gauges.push((metric, gauge));
        }

        let cpu_info = IntGaugeVec::new(
            Opts::new("cpuprobe_cpu_info", "CPU identification (always 1)"),
            &["vendor", "arch"],
        )?;
        registry.register(Box::new(cpu_info.clone()))?;

        let features = IntGaugeVec::new(
            Opts::new("cpuprobe_cpu_feature", "1 if the instruction-set feature is usable"),
            &["feature"],
        )?;
        registry.register(Box::new(features.clone()))?;

        let exporter = Self {
            registry,
            capabilities,
            counter,
            topology,
            gauges,
            cpu_info,
            features,
        };

        exporter.refresh();

        Ok(exporter)
    }

    /// Re-read every value (the frequency changes after calibration)
    pub fn refresh(&self) {
        for (metric, gauge) in &self.gauges {
            let value = match metric {
                PlatformMetric::PageSize => i64::from(self.topology.page_size()),
                PlatformMetric::CacheLineSize => i64::from(self.topology.cache_line_size()),
                PlatformMetric::LogicalCores => i64::from(self.topology.logical_core_count()),
                PlatformMetric::PhysicalCores => i64::from(self.topology.physical_core_count()),
                PlatformMetric::CounterInvariant => i64::from(self.counter.is_invariant()),
                PlatformMetric::CounterFrequency => {
                    i64::try_from(self.counter.frequency()).unwrap_or(i64::MAX)
                }
            };
            gauge.set(value);
        }

        self.cpu_info
            .with_label_values(&[self.capabilities.vendor().name(), std::env::consts::ARCH])
            .set(1);

        for &feature in CpuFeature::ALL {
            self.features
                .with_label_values(&[feature.name()])
                .set(i64::from(self.capabilities.feature_available(feature)));
        }

        tracing::debug!("Platform metrics refreshed");
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }
}
