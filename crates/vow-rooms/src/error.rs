use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Room provider not configured")]
    NotConfigured,
}

pub type Result<T> = std::result::Result<T, RoomError>;
