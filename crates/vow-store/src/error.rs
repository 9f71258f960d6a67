use thiserror::Error;

/// Errors raised by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A TEXT column held a value outside its enum (status, mode, cadence…).
    #[error("Invalid value in column {column}: {value}")]
    InvalidValue { column: &'static str, value: String },

    #[error("Invalid timestamp in column {column}: {value}")]
    InvalidTimestamp { column: &'static str, value: String },

    /// A caller asked for a lifecycle move that is not strictly forward.
    #[error("Status regression refused: {from} -> {to}")]
    StatusRegression {
        from: vow_core::WillStatus,
        to: vow_core::WillStatus,
    },

    #[error("Will not found: {0}")]
    WillNotFound(String),

    /// Another thread panicked while holding the connection.
    #[error("Connection lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, StoreError>;
