// CPU vendor identification

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum CpuVendor {
    #[default]
    Unknown,
    Intel,
    Amd,
    Arm,
}

impl CpuVendor {
    pub fn name(&self) -> &'static str {
        match self {
            CpuVendor::Unknown => "Unknown",
            CpuVendor::Intel => "Intel",
            CpuVendor::Amd => "AMD",
            CpuVendor::Arm => "Arm",
        }
    }

    /// Map a CPUID leaf 0 vendor string to a vendor
    pub fn from_vendor_string(vendor: &[u8; 12]) -> Self {
        match vendor {
            b"GenuineIntel" => CpuVendor::Intel,
            b"AuthenticAMD" => CpuVendor::Amd,
            _ => CpuVendor::Unknown,
        }
    }
}

impl std::fmt::Display for CpuVendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A computed vendor, together with the raw identification it came from
///
/// `Unknown` here always means "computed and not recognised"; the cache
/// tracks "not yet computed" separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorIdentity {
    pub vendor: CpuVendor,
    /// CPUID leaf 0 vendor string (x86-64 only)
    pub raw: Option<[u8; 12]>,
}

impl VendorIdentity {
    pub fn raw_str(&self) -> Option<&str> {
        self.raw
            .as_ref()
            .and_then(|raw| std::str::from_utf8(raw).ok())
    }
}

#[cfg(target_arch = "x86_64")]
pub fn detect_from<S: crate::cpu::decoder::RegisterSource>(source: &S) -> VendorIdentity {
    use cpuprobe_raw::current_arch::leaf::VendorId;

    let id: VendorId = source.read();
    let vendor = CpuVendor::from_vendor_string(&id.vendor);

    if vendor == CpuVendor::Unknown {
        tracing::warn!(
            "Unrecognised CPU vendor string: {:?}",
            String::from_utf8_lossy(&id.vendor)
        );
    }

    VendorIdentity {
        vendor,
        raw: Some(id.vendor),
    }
}

#[cfg(target_arch = "x86_64")]
pub fn detect() -> VendorIdentity {
    detect_from(&crate::cpu::decoder::HardwareRegisters)
}

#[cfg(target_arch = "aarch64")]
pub fn detect() -> VendorIdentity {
    VendorIdentity {
        vendor: CpuVendor::Arm,
        raw: None,
    }
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
pub fn detect() -> VendorIdentity {
    VendorIdentity {
        vendor: CpuVendor::Unknown,
        raw: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_strings() {
        assert_eq!(CpuVendor::from_vendor_string(b"GenuineIntel"), CpuVendor::Intel);
        assert_eq!(CpuVendor::from_vendor_string(b"AuthenticAMD"), CpuVendor::Amd);
        assert_eq!(CpuVendor::from_vendor_string(b"HygonGenuine"), CpuVendor::Unknown);
        assert_eq!(CpuVendor::from_vendor_string(&[0; 12]), CpuVendor::Unknown);
    }

    #[test]
    fn test_vendor_names() {
        assert_eq!(CpuVendor::Amd.to_string(), "AMD");
        assert_eq!(CpuVendor::default(), CpuVendor::Unknown);
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn test_detect_from_registers() {
        use crate::cpu::decoder::fake::FakeRegisters;

        let identity = detect_from(&FakeRegisters::intel());
        assert_eq!(identity.vendor, CpuVendor::Intel);
        assert_eq!(identity.raw_str(), Some("GenuineIntel"));

        let identity = detect_from(&FakeRegisters::default());
        assert_eq!(identity.vendor, CpuVendor::Unknown);
        assert!(identity.raw.is_some());
    }

    #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
    #[test]
    fn test_real_hardware_vendor_is_known() {
        let identity = detect();
        println!("Detected vendor: {} ({:?})", identity.vendor, identity.raw_str());
        assert_ne!(identity.vendor, CpuVendor::Unknown);
    }
}
