//! Declarative macros to reduce boilerplate across the cpuprobe codebase

/// Define a metric enum with automatic `name()` and `all()` implementations
///
/// # Example
/// ```
/// use cpuprobe::metric_enum;
///
/// metric_enum! {
///     pub enum DemoMetric {
///         PageSize => "page_size_bytes",
///         LogicalCores => "logical_cores",
///     }
/// }
///
/// assert_eq!(DemoMetric::PageSize.name(), "page_size_bytes");
/// assert_eq!(DemoMetric::all().len(), 2);
/// ```
#[macro_export]
macro_rules! metric_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident => $str:literal),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant,)*
        }

        impl $name {
            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $str,)*
                }
            }

            pub fn all() -> Vec<$name> {
                vec![$($name::$variant,)*]
            }
        }
    };
}

/// Define a closed feature enum with `name()`, `index()`, `all()`, `ALL` and `COUNT`
///
/// `index()` is the variant's position in declaration order, which makes it a
/// dense index into a bitset of `COUNT` bits. An empty variant list yields an
/// uninhabited enum.
///
/// # Example
/// ```
/// use cpuprobe::feature_enum;
///
/// feature_enum! {
///     pub enum DemoFeature {
///         Neon => "NEON",
///         Crc32 => "CRC32",
///     }
/// }
///
/// assert_eq!(DemoFeature::Crc32.name(), "CRC32");
/// assert_eq!(DemoFeature::Crc32.index(), 1);
/// assert_eq!(DemoFeature::COUNT, 2);
/// ```
///
/// Expands to:
/// - An enum with Debug, Clone, Copy, PartialEq, Eq, Hash derives
/// - `name(&self) -> &'static str` and `index(self) -> usize`
/// - `ALL: &[Self]`, `COUNT: usize` and `all() -> Vec<Self>`
/// - A `Display` impl printing `name()`
#[macro_export]
macro_rules! feature_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $str:literal),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($(#[$vmeta])* $variant,)*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)*];

            pub const COUNT: usize = Self::ALL.len();

            pub fn name(&self) -> &'static str {
                match *self {
                    $($name::$variant => $str,)*
                }
            }

            pub const fn index(self) -> usize {
                match self {
                    $($name::$variant => $name::$variant as usize,)*
                }
            }

            pub fn all() -> Vec<$name> {
                Self::ALL.to_vec()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

/// Encode an exporter's registry into a text buffer, logging failures
///
/// # Example
/// ```ignore
/// // In main.rs metrics handler
/// let mut buffer = Vec::new();
/// gather_metrics!(buffer, encoder, state.exporter, "platform");
/// ```
#[macro_export]
macro_rules! gather_metrics {
    ($buffer:expr, $encoder:expr, $exporter:expr, $name:literal) => {
        let metric_families = $exporter.registry().gather();
        if let Err(e) = $encoder.encode(&metric_families, &mut $buffer) {
            tracing::error!(concat!("Failed to encode ", $name, " metrics: {}"), e);
        }
    };
}
