//! Policy defaults, bit positions, and broker topology constants shared
//! across the accounting authority core.

use std::time::Duration;

/// Calendar convention used by the chronometer's year-fraction computation:
/// `Δy = (t1 − t0) / 365.25 days`.
pub const DAYS_PER_YEAR: f64 = 365.25;
pub const MILLISECONDS_PER_DAY: i64 = 24 * 60 * 60 * 1000;
pub const MILLISECONDS_PER_YEAR: f64 = DAYS_PER_YEAR * MILLISECONDS_PER_DAY as f64;

/// Valid range for `Account::interest_rate` at ingress (percent per year).
pub const MIN_INTEREST_RATE_ALLOWED: f64 = -50.0;
pub const MAX_INTEREST_RATE_ALLOWED: f64 = 100.0;

/// Maximum length, in bytes, of a `coordinator_type` string.
pub const COORDINATOR_TYPE_MAX_LEN: usize = 30;
pub const COORDINATOR_TYPE_MIN_LEN: usize = 1;

/// Maximum length, in bytes, of an ASCII status code.
pub const STATUS_CODE_MAX_LEN: usize = 30;

/// `ConfigureAccount` messages older than this, for accounts that do not yet
/// exist, are ignored rather than creating an account.
pub const DEFAULT_STALE_CONFIG_HORIZON: Duration = Duration::from_secs(14 * 24 * 60 * 60);

/// Purge precondition 3: minimum age before an account scheduled
/// for deletion may be purged.
pub const DEFAULT_MINIMUM_ACCOUNT_LIFETIME: Duration = Duration::from_secs(2 * 24 * 60 * 60);

/// Idle time before the account scanner re-emits a heartbeat `AccountUpdate`.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Idle time before the prepared-transfer scanner re-emits an identical
/// `PreparedTransfer` as a finalization reminder.
pub const DEFAULT_FINALIZATION_REMINDER_INTERVAL: Duration =
    Duration::from_secs(7 * 24 * 60 * 60);

/// Default allowed delay between `PrepareTransfer` and its `FinalizeTransfer`.
pub const DEFAULT_COMMIT_PERIOD: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Default worst-case demurrage rate assumed for the life of a prepared
/// transfer, placed verbatim into `PreparedTransfer::demurrage_rate`.
pub const DEFAULT_DEMURRAGE_RATE: f64 = -50.0;

/// GC horizon for `RegisteredBalanceChange` rows. `1970-01-01` is treated as
/// a sentinel meaning "no GC configured" rather than "GC immediately", see
/// DESIGN.md.
pub const NO_GC_HORIZON_DATE: (i32, u8) = (1970, 1);

/// `ttl` placed in outgoing `AccountUpdate` messages; also the minimum wait
/// between account deletion and the `AccountPurge` emission.
pub const DEFAULT_ACCOUNT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Bit position within `Account::config_flags`.
pub mod config_flags {
    /// Account is scheduled for deletion.
    pub const SCHEDULED_FOR_DELETION: u32 = 1 << 0;
}

/// Bit position within `Account::status_flags`.
pub mod status_flags {
    /// The fetch client has reported this account unreachable.
    pub const UNREACHABLE: u32 = 1 << 0;
    /// A saturating arithmetic operation clamped instead of wrapping.
    pub const OVERFLOWN: u32 = 1 << 1;
}

/// Broker exchange names.
pub mod exchanges {
    pub const ACCOUNTS_IN: &str = "accounts_in";
    pub const TO_CREDITORS: &str = "to_creditors";
    pub const TO_DEBTORS: &str = "to_debtors";
    pub const TO_COORDINATORS: &str = "to_coordinators";
}

/// Number of high bits of `md5((debtor_id, creditor_id))` used as the shard
/// key.
pub const SHARD_KEY_BITS: u32 = 24;

/// The reserved `creditor_id` denoting a debtor's root (issuer) account.
pub const ROOT_CREDITOR_ID: i64 = 0;

/// Account scanner: capitalize `interest` into `principal` once its absolute
/// value passes this threshold, or immediately on interest-rate change.
pub const DEFAULT_INTEREST_CAPITALIZATION_THRESHOLD: f64 = 1.0;

/// Rows fetched per cursor page by the periodic scanners.
pub const DEFAULT_SCANNER_BATCH_SIZE: i64 = 1000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millisecond_year_matches_day_convention() {
        assert_eq!(MILLISECONDS_PER_YEAR, 365.25 * 86_400_000.0);
    }
}
