use thiserror::Error;

/// Errors that can occur while handing a notification to a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote endpoint answered with a non-success status.
    #[error("Rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    /// Every transport in a fan-out failed; carries the last error.
    #[error("All transports failed: {0}")]
    AllFailed(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;
