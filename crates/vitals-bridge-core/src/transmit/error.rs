//! Transmission errors

use thiserror::Error;

/// Errors that can occur while forwarding a reading
#[derive(Error, Debug)]
pub enum TransmitError {
    #[error("Network not connected")]
    NotConnected,

    #[error("Network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    #[error("Failed to encode reading: {0}")]
    Encode(#[from] serde_json::Error),
}

impl TransmitError {
    /// Whether the request ran out of time
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransmitError::NetworkFailure(e) if e.is_timeout())
    }
}
