//! Builds outgoing wire messages (`accounts-messages`) from domain records
//! (`accounts-types`). Kept as free functions in the handler crate rather
//! than on the domain types themselves, since `accounts-types` must not
//! depend on the wire-format crate.

use time::OffsetDateTime;

use accounts_messages::{
    AccountPurge, AccountTransfer, AccountUpdate, FinalizedTransfer, OutgoingMessage,
    PreparedTransferMessage, RejectedConfig, RejectedTransfer,
};
use accounts_types::{Account, PreparedTransfer};

pub fn account_update(account: &Account, ts: OffsetDateTime, ttl_seconds: i64) -> OutgoingMessage {
    OutgoingMessage::AccountUpdate(AccountUpdate {
        debtor_id: account.key.debtor_id,
        creditor_id: account.key.creditor_id,
        creation_date: account.creation_date.into(),
        last_change_ts: account.last_change_ts,
        last_change_seqnum: account.last_change_seqnum,
        principal: account.principal,
        interest: account.interest,
        interest_rate: account.interest_rate,
        last_interest_rate_change_ts: account.last_interest_rate_change_ts,
        last_config_ts: account.last_config_ts,
        last_config_seqnum: account.last_config_seqnum,
        negligible_amount: account.negligible_amount,
        config_flags: account.config_flags.bits() as i32,
        status_flags: account.status_flags.bits() as i32,
        config: account.config.clone(),
        account_id: account.account_id.clone(),
        ttl_seconds,
        ts,
    })
}

pub fn account_purge(account: &Account, ts: OffsetDateTime) -> OutgoingMessage {
    OutgoingMessage::AccountPurge(AccountPurge {
        debtor_id: account.key.debtor_id,
        creditor_id: account.key.creditor_id,
        creation_date: account.creation_date.into(),
        ts,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn rejected_config(
    debtor_id: i64,
    creditor_id: i64,
    config_ts: OffsetDateTime,
    config_seqnum: i32,
    status_code: &str,
    ts: OffsetDateTime,
) -> OutgoingMessage {
    OutgoingMessage::RejectedConfig(RejectedConfig {
        debtor_id,
        creditor_id,
        config_ts,
        config_seqnum,
        status_code: status_code.to_owned(),
        ts,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn rejected_transfer(
    debtor_id: i64,
    creditor_id: i64,
    coordinator_type: &str,
    coordinator_id: &str,
    coordinator_request_id: i64,
    status_code: &str,
    total_locked_amount: i64,
    ts: OffsetDateTime,
) -> OutgoingMessage {
    OutgoingMessage::RejectedTransfer(RejectedTransfer {
        debtor_id,
        creditor_id,
        coordinator_type: coordinator_type.to_owned(),
        coordinator_id: coordinator_id.to_owned(),
        coordinator_request_id,
        status_code: status_code.to_owned(),
        total_locked_amount,
        ts,
    })
}

pub fn prepared_transfer(transfer: &PreparedTransfer, ts: OffsetDateTime) -> OutgoingMessage {
    OutgoingMessage::PreparedTransfer(PreparedTransferMessage {
        debtor_id: transfer.sender.debtor_id,
        creditor_id: transfer.sender.creditor_id,
        transfer_id: transfer.transfer_id.0,
        coordinator_type: transfer.coordinator_type.as_str().to_owned(),
        coordinator_id: transfer.coordinator_id.clone(),
        coordinator_request_id: transfer.coordinator_request_id,
        locked_amount: transfer.locked_amount,
        recipient: transfer.recipient.clone(),
        demurrage_rate: transfer.demurrage_rate,
        deadline: transfer.deadline,
        min_interest_rate: transfer.min_interest_rate,
        prepared_at: transfer.prepared_at,
        ts,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn finalized_transfer(
    debtor_id: i64,
    creditor_id: i64,
    transfer_id: i64,
    coordinator_type: &str,
    coordinator_id: &str,
    coordinator_request_id: i64,
    committed_amount: i64,
    status_code: &str,
    ts: OffsetDateTime,
) -> OutgoingMessage {
    OutgoingMessage::FinalizedTransfer(FinalizedTransfer {
        debtor_id,
        creditor_id,
        transfer_id,
        coordinator_type: coordinator_type.to_owned(),
        coordinator_id: coordinator_id.to_owned(),
        coordinator_request_id,
        committed_amount,
        status_code: status_code.to_owned(),
        ts,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn account_transfer(
    account: &Account,
    other_creditor_id: i64,
    transfer_number: i64,
    coordinator_type: &str,
    coordinator_id: &str,
    coordinator_request_id: i64,
    amount: i64,
    is_negligible: bool,
    transfer_note: &str,
    committed_at: OffsetDateTime,
    ts: OffsetDateTime,
) -> OutgoingMessage {
    OutgoingMessage::AccountTransfer(AccountTransfer {
        debtor_id: account.key.debtor_id,
        creditor_id: account.key.creditor_id,
        creation_date: account.creation_date.into(),
        other_creditor_id,
        transfer_number,
        coordinator_type: coordinator_type.to_owned(),
        coordinator_id: coordinator_id.to_owned(),
        coordinator_request_id,
        amount,
        is_negligible,
        transfer_note: transfer_note.to_owned(),
        committed_at,
        ts,
    })
}
