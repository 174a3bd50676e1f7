use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// `ConfigureAccount`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigureAccount {
    pub debtor_id: i64,
    pub creditor_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
    pub seqnum: i32,
    pub negligible_amount: f64,
    pub config_flags: i32,
    pub config: String,
}

/// `PrepareTransfer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepareTransfer {
    pub debtor_id: i64,
    pub creditor_id: i64,
    pub coordinator_type: String,
    pub coordinator_id: String,
    pub coordinator_request_id: i64,
    pub min_locked_amount: i64,
    pub max_locked_amount: i64,
    pub recipient: String,
    pub min_interest_rate: f64,
    pub min_account_balance: i64,
    pub max_commit_delay: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
}

/// `FinalizeTransfer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizeTransfer {
    pub debtor_id: i64,
    pub creditor_id: i64,
    pub transfer_id: i64,
    pub coordinator_type: String,
    pub coordinator_id: String,
    pub coordinator_request_id: i64,
    pub committed_amount: i64,
    pub transfer_note: String,
    pub finalization_flags: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
}

/// Any message the core consumes off the `accounts_in` exchange, tagged by
/// its wire `"type"` field. Deserializing an unrecognized
/// `"type"` or a structurally invalid payload fails, which the dispatch
/// loop treats as a corrupt message: logged and dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IncomingMessage {
    ConfigureAccount(ConfigureAccount),
    PrepareTransfer(PrepareTransfer),
    FinalizeTransfer(FinalizeTransfer),
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn configure_account_tags_type_field() {
        let msg = IncomingMessage::ConfigureAccount(ConfigureAccount {
            debtor_id: 1,
            creditor_id: 2,
            ts: datetime!(2026-07-28 0:00 UTC),
            seqnum: 0,
            negligible_amount: 10.0,
            config_flags: 0,
            config: String::new(),
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "ConfigureAccount");
        assert_eq!(json["debtor_id"], 1);
    }

    #[test]
    fn rejects_unknown_type() {
        let raw = r#"{"type":"SomethingElse"}"#;
        assert!(serde_json::from_str::<IncomingMessage>(raw).is_err());
    }
}
