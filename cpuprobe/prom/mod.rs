pub mod platform;

pub use platform::PlatformMetricExporter;
