use serde::{Deserialize, Serialize};

/// Primary key of an `Account` row: `(debtor_id, creditor_id)`.
/// `creditor_id == 0` denotes the debtor's root account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountKey {
    pub debtor_id: i64,
    pub creditor_id: i64,
}

impl AccountKey {
    pub fn new(debtor_id: i64, creditor_id: i64) -> Self {
        Self {
            debtor_id,
            creditor_id,
        }
    }

    pub fn is_root(&self) -> bool {
        self.creditor_id == accounts_constants::ROOT_CREDITOR_ID
    }

    /// Renders the `swpt:{debtor_id}/{creditor_id}` account identity used
    /// on the wire as `PreparedTransfer::recipient` / `Account::account_id`.
    /// The fetch client and the finalize handler parse this back with
    /// [`AccountKey::parse_identity`] to resolve a same-debtor recipient
    /// without a second round trip to the fetch API.
    pub fn to_identity(self) -> String {
        format!("swpt:{}/{}", self.debtor_id, self.creditor_id)
    }

    /// Parses an identity produced by [`AccountKey::to_identity`]. Returns
    /// `None` for any other shape, including identities belonging to a
    /// peer accounting authority this shard cannot resolve locally.
    pub fn parse_identity(identity: &str) -> Option<Self> {
        let rest = identity.strip_prefix("swpt:")?;
        let (debtor, creditor) = rest.split_once('/')?;
        Some(Self {
            debtor_id: debtor.parse().ok()?,
            creditor_id: creditor.parse().ok()?,
        })
    }
}

/// Per-sender monotone counter identifying a `PreparedTransfer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransferId(pub i64);

/// Identifier of a committed transfer effect, unique within a
/// `(debtor_id, sender)` pair, used to deduplicate redelivered
/// balance-change notifications.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChangeId(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_round_trips() {
        let key = AccountKey::new(1, 2);
        assert_eq!(AccountKey::parse_identity(&key.to_identity()), Some(key));
    }

    #[test]
    fn rejects_foreign_identity_shapes() {
        assert_eq!(AccountKey::parse_identity("not-an-identity"), None);
        assert_eq!(AccountKey::parse_identity("swpt:1"), None);
        assert_eq!(AccountKey::parse_identity("swpt:x/2"), None);
    }
}
