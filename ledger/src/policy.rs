use std::time::Duration;

use time::Date;

/// Per-debtor policy knobs recognized by the core. Loaded once
/// at startup by the binary crate and passed by reference into
/// [`crate::engine::LedgerEngine`]. There is no process-wide mutable
/// singleton.
///
/// A single `Policy` currently applies to every debtor the shard owns;
/// per-debtor overrides are a supplemental lookup the binary crate's
/// config layer can add without changing this type's shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    /// Clamp on `Account::interest_rate` at ingress, tighter than or equal
    /// to the wire-level `[-50, 100]` bound.
    pub min_interest_rate_allowed: f64,
    pub max_interest_rate_allowed: f64,

    /// Idle time before the account scanner re-emits a heartbeat
    /// `AccountUpdate`.
    pub heartbeat_interval: Duration,
    /// Idle time before the prepared-transfer scanner re-emits an
    /// identical `PreparedTransfer`.
    pub finalization_reminder_interval: Duration,
    /// Purge precondition 3.
    pub minimum_account_lifetime: Duration,
    /// Purge precondition 4; also the ignore-old-config rule of
    /// `handle_configure_account`.
    pub stale_config_horizon: Duration,
    /// GC horizon for `RegisteredBalanceChange` rows.
    /// `None` means "no GC configured", see DESIGN.md.
    pub registered_balance_change_retention: Option<Duration>,
    /// Value placed in outgoing `AccountUpdate.ttl`; also the minimum wait
    /// between account deletion and `AccountPurge` emission.
    pub account_ttl: Duration,
    /// Default allowed delay between prepare and commit.
    pub commit_period: Duration,
    /// Default worst-case rate placed in `PreparedTransfer::demurrage_rate`.
    pub demurrage_rate: f64,
    /// Account scanner: capitalize once `|interest|` passes this threshold.
    pub interest_capitalization_threshold: f64,
    /// Rows fetched per cursor page by the periodic scanners.
    pub scanner_batch_size: i64,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            min_interest_rate_allowed: accounts_constants::MIN_INTEREST_RATE_ALLOWED,
            max_interest_rate_allowed: accounts_constants::MAX_INTEREST_RATE_ALLOWED,
            heartbeat_interval: accounts_constants::DEFAULT_HEARTBEAT_INTERVAL,
            finalization_reminder_interval: accounts_constants::DEFAULT_FINALIZATION_REMINDER_INTERVAL,
            minimum_account_lifetime: accounts_constants::DEFAULT_MINIMUM_ACCOUNT_LIFETIME,
            stale_config_horizon: accounts_constants::DEFAULT_STALE_CONFIG_HORIZON,
            registered_balance_change_retention: None,
            account_ttl: accounts_constants::DEFAULT_ACCOUNT_TTL,
            commit_period: accounts_constants::DEFAULT_COMMIT_PERIOD,
            demurrage_rate: accounts_constants::DEFAULT_DEMURRAGE_RATE,
            interest_capitalization_threshold: accounts_constants::DEFAULT_INTEREST_CAPITALIZATION_THRESHOLD,
            scanner_batch_size: accounts_constants::DEFAULT_SCANNER_BATCH_SIZE,
        }
    }
}

impl Policy {
    /// Clamps a requested `interest_rate` into the debtor's allowed band.
    pub fn clamp_interest_rate(&self, requested: f64) -> f64 {
        requested.clamp(self.min_interest_rate_allowed, self.max_interest_rate_allowed)
    }

    /// GC cutoff date for `RegisteredBalanceChange` rows as of `today`, or
    /// `None` when GC is disabled.
    pub fn registered_balance_change_cutoff(&self, today: Date) -> Option<Date> {
        let retention = self.registered_balance_change_retention?;
        let days = (retention.as_secs() / 86_400) as i64;
        Some(today - time::Duration::days(days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_into_configured_band() {
        let policy = Policy {
            min_interest_rate_allowed: -10.0,
            max_interest_rate_allowed: 10.0,
            ..Policy::default()
        };
        assert_eq!(policy.clamp_interest_rate(-50.0), -10.0);
        assert_eq!(policy.clamp_interest_rate(50.0), 10.0);
        assert_eq!(policy.clamp_interest_rate(5.0), 5.0);
    }

    #[test]
    fn no_retention_means_no_gc() {
        let policy = Policy::default();
        assert_eq!(
            policy.registered_balance_change_cutoff(time::macros::date!(2026 - 07 - 28)),
            None
        );
    }
}
