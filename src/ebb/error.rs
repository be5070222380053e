//! Error kinds surfaced by the EBB serial driver.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EbbError {
    #[error("serial I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("EBB rejected command: {0}")]
    Rejected(String),

    #[error("malformed EBB reply: {0}")]
    Malformed(String),

    #[error("serial connection closed by device")]
    Disconnected,

    #[error("timed out waiting for EBB reply")]
    Timeout,

    #[error("firmware does not support {0}; no fallback available")]
    CapabilityMismatch(&'static str),

    #[error("no EBB found among the available serial ports")]
    DeviceNotFound,
}

impl EbbError {
    /// `true` for a transport-level failure (the serial link itself is
    /// gone), as distinct from a protocol-level failure (malformed or
    /// rejected reply) that leaves the connection otherwise usable. The
    /// supervisor uses this to decide whether to recycle the serial port
    /// in addition to cancelling the current plot.
    pub fn is_transport(&self) -> bool {
        matches!(self, EbbError::Io(_) | EbbError::Disconnected | EbbError::Timeout)
    }
}
