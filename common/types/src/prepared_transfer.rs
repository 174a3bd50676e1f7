use time::OffsetDateTime;

use crate::coordinator::CoordinatorType;
use crate::ids::{AccountKey, TransferId};

/// A reservation that locks funds on the sender, removed upon finalize.
/// Primary key: `(debtor_id, creditor_id, transfer_id)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedTransfer {
    pub sender: AccountKey,
    pub transfer_id: TransferId,

    pub coordinator_type: CoordinatorType,
    pub coordinator_id: String,
    pub coordinator_request_id: i64,

    /// Non-negative; subtracted from sender available amount.
    pub locked_amount: i64,
    /// String account identity of the destination.
    pub recipient: String,

    /// Worst-case negative accrual rate assumed valid over the prepared
    /// interval.
    pub demurrage_rate: f64,
    /// Latest timestamp at which the transfer may be committed.
    pub deadline: OffsetDateTime,
    /// If the sender's `interest_rate` drops below this, commit must fail.
    pub min_interest_rate: f64,

    pub prepared_at: OffsetDateTime,
}

impl PreparedTransfer {
    /// Matches the three coordinator-correlation fields carried on a
    /// `FinalizeTransfer` message.
    pub fn matches_coordinator(
        &self,
        coordinator_type: &str,
        coordinator_id: &str,
        coordinator_request_id: i64,
    ) -> bool {
        self.coordinator_type.as_str() == coordinator_type
            && self.coordinator_id == coordinator_id
            && self.coordinator_request_id == coordinator_request_id
    }
}
