use thiserror::Error;

/// Failures reported by a host-provided bridge (engine, logger sink).
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    /// The engine refused a command. The payload is the engine's own message,
    /// untouched, so callers can inspect it (e.g. for unresolvable track ids).
    #[error("Engine rejected command: {0}")]
    Rejected(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Raw message carried by the error, without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            BridgeError::NotAvailable(msg)
            | BridgeError::Rejected(msg)
            | BridgeError::OperationFailed(msg) => msg.clone(),
            BridgeError::Io(err) => err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
