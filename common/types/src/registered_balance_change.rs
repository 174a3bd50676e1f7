use time::OffsetDateTime;

use crate::ids::ChangeId;

/// Records that a committed transfer's effect on the recipient has already
/// been applied, making the second (asynchronous) half of a finalize
/// idempotent against broker redelivery. Primary key:
/// `(debtor_id, other_creditor_id, change_id)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredBalanceChange {
    pub debtor_id: i64,
    /// The sender's `creditor_id`, the counterparty of the account this
    /// row's recipient-side effect was applied to.
    pub other_creditor_id: i64,
    pub change_id: ChangeId,
    pub applied_at: OffsetDateTime,
}
