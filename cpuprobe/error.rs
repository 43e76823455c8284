use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Cycle counter calibration failed: {0}")]
    Calibration(String),

    #[error("Affinity operation failed: {0}")]
    Affinity(String),

    #[error("OS query failed: {0}")]
    Os(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[cfg(unix)]
    #[error("Nix error: {0}")]
    Nix(#[from] nix::Error),

    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

pub type Result<T> = std::result::Result<T, ProbeError>;
