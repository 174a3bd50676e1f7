use accounts_chronometer::outbound_routing_key;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::wire::WireDate;

/// `RejectedConfig`: a `ConfigureAccount` that failed
/// validation (the account was not mutated).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedConfig {
    pub debtor_id: i64,
    pub creditor_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub config_ts: OffsetDateTime,
    pub config_seqnum: i32,
    pub status_code: String,
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
}

/// `RejectedTransfer`: a `PrepareTransfer` that could not
/// be honored. `total_locked_amount` is included so the coordinator can see
/// why `min_locked_amount` wasn't reachable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedTransfer {
    pub debtor_id: i64,
    pub creditor_id: i64,
    pub coordinator_type: String,
    pub coordinator_id: String,
    pub coordinator_request_id: i64,
    pub status_code: String,
    pub total_locked_amount: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
}

/// `PreparedTransfer`: confirms a lock was placed,
/// or re-announces one during the finalization-reminder scan, identical except for `ts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedTransfer {
    pub debtor_id: i64,
    pub creditor_id: i64,
    pub transfer_id: i64,
    pub coordinator_type: String,
    pub coordinator_id: String,
    pub coordinator_request_id: i64,
    pub locked_amount: i64,
    pub recipient: String,
    pub demurrage_rate: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub deadline: OffsetDateTime,
    pub min_interest_rate: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub prepared_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
}

/// `FinalizedTransfer`: the outcome of a
/// `FinalizeTransfer`, `status_code` one of `OK`, `TIMEOUT`,
/// `INSUFFICIENT_AVAILABLE_AMOUNT`, `NEWER_INTEREST_RATE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizedTransfer {
    pub debtor_id: i64,
    pub creditor_id: i64,
    pub transfer_id: i64,
    pub coordinator_type: String,
    pub coordinator_id: String,
    pub coordinator_request_id: i64,
    pub committed_amount: i64,
    pub status_code: String,
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
}

/// `AccountUpdate`: a full snapshot of an
/// account's configuration and balance, emitted on every mutation and,
/// idle permitting, as a periodic heartbeat. `ttl` is the client-side
/// freshness budget referenced by the purge delay rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountUpdate {
    pub debtor_id: i64,
    pub creditor_id: i64,
    pub creation_date: WireDate,
    #[serde(with = "time::serde::rfc3339")]
    pub last_change_ts: OffsetDateTime,
    pub last_change_seqnum: i32,
    pub principal: i64,
    pub interest: f64,
    pub interest_rate: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub last_interest_rate_change_ts: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_config_ts: OffsetDateTime,
    pub last_config_seqnum: i32,
    pub negligible_amount: f64,
    pub config_flags: i32,
    pub status_flags: i32,
    pub config: String,
    pub account_id: String,
    pub ttl_seconds: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
}

/// `AccountPurge`: irrevocable removal notice, emitted
/// only after the `ttl`-based delay past deletion has elapsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountPurge {
    pub debtor_id: i64,
    pub creditor_id: i64,
    pub creation_date: WireDate,
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
}

/// `AccountTransfer`: one per side of a committed
/// transfer, carrying the per-account monotone `transfer_number`. `amount`
/// is negative on the sender's copy, positive on the recipient's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountTransfer {
    pub debtor_id: i64,
    pub creditor_id: i64,
    pub creation_date: WireDate,
    pub other_creditor_id: i64,
    pub transfer_number: i64,
    pub coordinator_type: String,
    pub coordinator_id: String,
    pub coordinator_request_id: i64,
    pub amount: i64,
    pub is_negligible: bool,
    pub transfer_note: String,
    #[serde(with = "time::serde::rfc3339")]
    pub committed_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
}

/// Any message the core publishes, tagged by its wire `"type"` field.
/// Each variant corresponds to one outbox table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutgoingMessage {
    RejectedConfig(RejectedConfig),
    RejectedTransfer(RejectedTransfer),
    PreparedTransfer(PreparedTransfer),
    FinalizedTransfer(FinalizedTransfer),
    AccountUpdate(AccountUpdate),
    AccountPurge(AccountPurge),
    AccountTransfer(AccountTransfer),
}

impl OutgoingMessage {
    /// The outbox table / queue this message belongs in.
    pub fn queue_name(&self) -> &'static str {
        match self {
            OutgoingMessage::RejectedConfig(_) => "rejected_config",
            OutgoingMessage::RejectedTransfer(_) => "rejected_transfer",
            OutgoingMessage::PreparedTransfer(_) => "prepared_transfer",
            OutgoingMessage::FinalizedTransfer(_) => "finalized_transfer",
            OutgoingMessage::AccountUpdate(_) => "account_update",
            OutgoingMessage::AccountPurge(_) => "account_purge",
            OutgoingMessage::AccountTransfer(_) => "account_transfer",
        }
    }

    /// The broker exchange this message is published to.
    /// Account-state notices go to the creditor who owns the account;
    /// transfer-protocol replies go to the coordinator who drove the
    /// request, addressed by the account the request concerns since
    /// `coordinator_id` is free text, not a shard-routable id.
    pub fn exchange_name(&self) -> &'static str {
        match self {
            OutgoingMessage::RejectedConfig(_)
            | OutgoingMessage::AccountUpdate(_)
            | OutgoingMessage::AccountPurge(_)
            | OutgoingMessage::AccountTransfer(_) => "to_creditors",
            OutgoingMessage::RejectedTransfer(_)
            | OutgoingMessage::PreparedTransfer(_)
            | OutgoingMessage::FinalizedTransfer(_) => "to_coordinators",
        }
    }

    /// The 16-hex-char dot-separated routing key.
    pub fn routing_key(&self) -> String {
        let id = match self {
            OutgoingMessage::RejectedConfig(m) => m.creditor_id,
            OutgoingMessage::AccountUpdate(m) => m.creditor_id,
            OutgoingMessage::AccountPurge(m) => m.creditor_id,
            OutgoingMessage::AccountTransfer(m) => m.creditor_id,
            OutgoingMessage::RejectedTransfer(m) => m.debtor_id,
            OutgoingMessage::PreparedTransfer(m) => m.debtor_id,
            OutgoingMessage::FinalizedTransfer(m) => m.debtor_id,
        };
        outbound_routing_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn account_update_round_trips() {
        let msg = OutgoingMessage::AccountUpdate(AccountUpdate {
            debtor_id: 1,
            creditor_id: 2,
            creation_date: WireDate(date!(2026 - 07 - 28)),
            last_change_ts: datetime!(2026-07-28 12:00 UTC),
            last_change_seqnum: 0,
            principal: 0,
            interest: 0.0,
            interest_rate: 0.0,
            last_interest_rate_change_ts: datetime!(2026-07-28 12:00 UTC),
            last_config_ts: datetime!(2026-07-28 12:00 UTC),
            last_config_seqnum: 0,
            negligible_amount: 10.0,
            config_flags: 0,
            status_flags: 0,
            config: String::new(),
            account_id: String::new(),
            ttl_seconds: 604_800,
            ts: datetime!(2026-07-28 12:00 UTC),
        });
        assert_eq!(msg.queue_name(), "account_update");
        let json = serde_json::to_string(&msg).unwrap();
        let back: OutgoingMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
