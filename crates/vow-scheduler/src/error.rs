use thiserror::Error;

/// Errors that abort a whole scheduler step (a candidate query failing).
/// Per-will failures are logged and counted instead.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Store error: {0}")]
    Store(#[from] vow_store::StoreError),

    /// An external call ran past its deadline.
    #[error("Timed out after {ms}ms")]
    Timeout { ms: u64 },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
