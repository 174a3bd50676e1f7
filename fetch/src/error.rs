/// Infrastructure-level fetch failures. Never a wire-level status code
/// directly: `handle_prepare_transfer` maps any `FetchError` (after
/// retries are exhausted) to `RejectedTransfer{status_code:
/// "RECIPIENT_UNREACHABLE"}`.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to fetch API failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("fetch API returned an unexpected response: {0}")]
    UnexpectedResponse(String),
}
