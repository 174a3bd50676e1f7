/// Infrastructure-level failures of the outbox read/publish path. Never a
/// wire-level status code: a failed publish means retry, not rejection.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("broker publish failed: {0}")]
    Publish(String),

    #[error("outbox row could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("broker connection error: {0}")]
    Broker(#[from] lapin::Error),
}

impl SinkError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SinkError::Decode(_))
    }
}
