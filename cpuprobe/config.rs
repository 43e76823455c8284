use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{ProbeError, Result};

/// Default cycle counter calibration window
pub const DEFAULT_CALIBRATION_WINDOW: Duration = Duration::from_millis(100);

/// Longest calibration window accepted
pub const MAX_CALIBRATION_WINDOW: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Calibrate the cycle counter frequency before reporting
    pub calibrate: bool,
    pub calibration_window: Duration,
    /// CPU to pin the calibrating thread to
    pub pin_cpu: Option<i32>,
    /// Serve `/metrics` on this address instead of printing once
    pub listen: Option<SocketAddr>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            calibrate: false,
            calibration_window: DEFAULT_CALIBRATION_WINDOW,
            pin_cpu: None,
            listen: None,
        }
    }
}

impl ProbeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.calibration_window.is_zero() {
            return Err(ProbeError::InvalidConfiguration(
                "calibration window must be non-zero".to_string(),
            ));
        }

        if self.calibration_window > MAX_CALIBRATION_WINDOW {
            return Err(ProbeError::InvalidConfiguration(format!(
                "calibration window {:?} exceeds {:?}",
                self.calibration_window, MAX_CALIBRATION_WINDOW
            )));
        }

        if let Some(cpu) = self.pin_cpu {
            if cpu < 0 {
                return Err(ProbeError::InvalidConfiguration(format!(
                    "invalid CPU ID: {cpu}"
                )));
            }
        }

        Ok(())
    }
}
