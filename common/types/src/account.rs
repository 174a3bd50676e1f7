use time::{Date, OffsetDateTime};

use crate::flags::{ConfigFlags, StatusFlags};
use crate::ids::AccountKey;

/// Authoritative per-(debtor, creditor) balance record.
///
/// All mutation happens inside a single store transaction, driven by the
/// protocol state machine (`accounts-ledger`). Nothing here talks to the
/// store or the clock; `available_amount` below is the one accrual-free
/// derived quantity cheap enough to keep on the struct; anything that needs
/// "as of now" accrual goes through `accounts_chronometer::accrual`.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub key: AccountKey,

    pub creation_date: Date,

    /// Signed integer owed amount, excluding accrued interest.
    pub principal: i64,
    /// Real-valued accrued interest not yet capitalized.
    pub interest: f64,
    /// Annual rate in percent, bounded to `[-50, 100]` at ingress.
    pub interest_rate: f64,

    pub last_change_ts: OffsetDateTime,
    pub last_change_seqnum: i32,

    pub last_config_ts: OffsetDateTime,
    pub last_config_seqnum: i32,

    /// Non-negative real. Deletion-safety and notification-suppression
    /// threshold.
    pub negligible_amount: f64,

    pub config_flags: ConfigFlags,
    pub status_flags: StatusFlags,

    /// Opaque string echoed verbatim.
    pub config: String,

    /// Globally meaningful identifier; empty until known.
    pub account_id: String,

    /// Sum of `locked_amount` of all live prepared transfers with this
    /// account as sender. Never exceeds `principal + interest`.
    pub total_locked_amount: i64,
    /// Count of live prepared transfers with this account as sender.
    pub pending_transfers_count: i64,

    /// Monotone non-decreasing per account; assigned to each emitted
    /// `AccountTransfer`.
    pub last_transfer_number: i64,
    pub last_transfer_committed_at: Option<OffsetDateTime>,
    /// Calendar date of the most recent non-interest outgoing transfer.
    pub last_outgoing_transfer_date: Option<Date>,

    pub previous_interest_rate: f64,
    pub last_interest_rate_change_ts: OffsetDateTime,

    pub last_heartbeat_ts: OffsetDateTime,
}

impl Account {
    /// A freshly created account for `key`, dated `today`, with the
    /// supplied configuration.
    pub fn new(
        key: AccountKey,
        today: Date,
        now: OffsetDateTime,
        negligible_amount: f64,
        config_flags: ConfigFlags,
        config: String,
        config_ts: OffsetDateTime,
        config_seqnum: i32,
    ) -> Self {
        Self {
            key,
            creation_date: today,
            principal: 0,
            interest: 0.0,
            interest_rate: 0.0,
            last_change_ts: now,
            last_change_seqnum: 0,
            last_config_ts: config_ts,
            last_config_seqnum: config_seqnum,
            negligible_amount,
            config_flags,
            status_flags: StatusFlags::empty(),
            config,
            account_id: String::new(),
            total_locked_amount: 0,
            pending_transfers_count: 0,
            last_transfer_number: 0,
            last_transfer_committed_at: None,
            last_outgoing_transfer_date: None,
            previous_interest_rate: 0.0,
            last_interest_rate_change_ts: now,
            last_heartbeat_ts: now,
        }
    }

    /// `principal + interest − total_locked_amount`, without re-accruing
    /// interest to the current moment (glossary: "available amount"). Use
    /// `accounts_chronometer::accrual::project_available_amount` when the
    /// figure must reflect accrual up to an arbitrary timestamp.
    pub fn raw_available_amount(&self) -> f64 {
        (self.principal as f64 + self.interest) - self.total_locked_amount as f64
    }

    pub fn is_scheduled_for_deletion(&self) -> bool {
        self.config_flags
            .contains(ConfigFlags::SCHEDULED_FOR_DELETION)
    }

    pub fn is_unreachable(&self) -> bool {
        self.status_flags.contains(StatusFlags::UNREACHABLE)
    }

    /// `|amount| ≤ negligible_amount` (glossary: "negligible").
    pub fn is_negligible(&self, amount: f64) -> bool {
        amount.abs() <= self.negligible_amount
    }

    /// Invariant check used by tests and by the scanner before trusting a
    /// loaded row: `pending_transfers_count == 0 ⇒ total_locked_amount == 0`.
    pub fn locks_consistent(&self) -> bool {
        if self.pending_transfers_count == 0 {
            self.total_locked_amount == 0
        } else {
            true
        }
    }

    /// Advances `(last_change_ts, last_change_seqnum)` to a value strictly
    /// later than the current one under the wraparound comparator, called by
    /// every handler that mutates the account. `observed_at` is the
    /// wall-clock or message timestamp driving the change; when it hasn't
    /// advanced past `last_change_ts` the seqnum alone carries monotonicity.
    pub fn bump_change_version(&mut self, observed_at: OffsetDateTime) {
        if observed_at > self.last_change_ts {
            self.last_change_ts = observed_at;
        }
        self.last_change_seqnum = self.last_change_seqnum.wrapping_add(1);
    }

    /// Allocates the next per-account `transfer_number` for an
    /// `AccountTransfer` about to be emitted.
    pub fn next_transfer_number(&mut self, committed_at: OffsetDateTime) -> i64 {
        self.last_transfer_number += 1;
        self.last_transfer_committed_at = Some(committed_at);
        self.last_transfer_number
    }
}
