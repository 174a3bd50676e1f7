/// Infrastructure-level store failures. Never surfaced as a wire-level
/// status code: a `StoreError` always means the transaction
/// should be rolled back and the message redelivered, not that the
/// business request was invalid.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("transaction could not be serialized against concurrent writers, retry")]
    SerializationConflict,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("row for key {0:?} not found")]
    NotFound(String),
}

impl StoreError {
    /// Whether the caller should retry with backoff rather than
    /// treat this as a terminal failure.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::SerializationConflict => true,
            StoreError::Database(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::Tls(_)
            ),
            StoreError::NotFound(_) => false,
        }
    }
}
