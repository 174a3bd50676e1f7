use std::time::Duration;

use backoff::ExponentialBackoff;

/// Bounded exponential backoff shared by every retry loop in the core:
/// store serialization conflicts, transient broker publish failures, and
/// fetch-client transport errors. A single policy
/// keeps the retry *shape* consistent even though each caller wraps a
/// different fallible operation.
pub fn bounded_backoff() -> ExponentialBackoff {
    ExponentialBackoff {
        initial_interval: Duration::from_millis(50),
        multiplier: 2.0,
        max_interval: Duration::from_secs(5),
        max_elapsed_time: Some(Duration::from_secs(30)),
        ..ExponentialBackoff::default()
    }
}
