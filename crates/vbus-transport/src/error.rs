use std::path::PathBuf;

/// Errors that can occur while opening or configuring a device.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the device path.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A terminal configuration call failed.
    #[error("{op} failed: {source}")]
    Configure {
        op: &'static str,
        source: std::io::Error,
    },

    /// The requested baud rate is not one of the supported rates.
    #[error("unsupported baud rate: {0}")]
    InvalidBaud(String),

    /// The operation is not available on this platform.
    #[error("not supported on this platform: {0}")]
    Unsupported(&'static str),
}

pub type Result<T> = std::result::Result<T, TransportError>;
