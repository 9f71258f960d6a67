use thiserror::Error;

/// Errors shared across crates. Each subsystem (store, transport, rooms,
/// scheduler) has its own richer enum; this one covers configuration and
/// process-level failures.
#[derive(Debug, Error)]
pub enum VowError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VowError {
    /// Short stable code used in structured log fields.
    pub fn code(&self) -> &'static str {
        match self {
            VowError::Config(_) => "CONFIG_ERROR",
            VowError::Serialization(_) => "SERIALIZATION_ERROR",
            VowError::Io(_) => "IO_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, VowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(VowError::Config("x".into()).code(), "CONFIG_ERROR");
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(VowError::from(io).code(), "IO_ERROR");
    }
}
