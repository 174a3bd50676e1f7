//! Read-only projections over the store, for callers (an admin API, an
//! operational dashboard) that need to inspect account state without going
//! through the protocol state machine. Deliberately thin: every figure here
//! is a pure function over an already-loaded [`accounts_types::Account`]
//!, never a second source of truth.

use serde::Serialize;
use time::OffsetDateTime;

use accounts_chronometer::accrual::project_available_amount;
use accounts_chronometer::year_fraction;
use accounts_fetch::FetchClient;
use accounts_store::{Store, StoreError};
use accounts_types::{Account, AccountKey};

use crate::engine::LedgerEngine;

/// A point-in-time view of an account, with interest accrued up to the
/// moment the snapshot was taken rather than frozen at `last_change_ts`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AccountSnapshot {
    pub debtor_id: i64,
    pub creditor_id: i64,
    pub principal: i64,
    /// `principal + interest`, accrued to the snapshot time.
    pub principal_plus_interest: f64,
    /// `principal_plus_interest - total_locked_amount`.
    pub available_amount: f64,
    pub total_locked_amount: i64,
    pub pending_transfers_count: i64,
    pub interest_rate: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub as_of: OffsetDateTime,
}

impl AccountSnapshot {
    fn from_account(account: &Account, as_of: OffsetDateTime) -> Self {
        let delta_years = year_fraction(account.last_change_ts, as_of).max(0.0);
        let available_amount = project_available_amount(account, delta_years);
        let principal_plus_interest = available_amount + account.total_locked_amount as f64;
        Self {
            debtor_id: account.key.debtor_id,
            creditor_id: account.key.creditor_id,
            principal: account.principal,
            principal_plus_interest,
            available_amount,
            total_locked_amount: account.total_locked_amount,
            pending_transfers_count: account.pending_transfers_count,
            interest_rate: account.interest_rate,
            as_of,
        }
    }
}

impl<S, F> LedgerEngine<S, F>
where
    S: Store + 'static,
    F: FetchClient + 'static,
{
    /// Loads `key` and projects it to an [`AccountSnapshot`] as of now, or
    /// `None` if the account doesn't exist.
    pub async fn account_snapshot(&self, key: AccountKey) -> Result<Option<AccountSnapshot>, StoreError> {
        let mut tx = self.store.begin().await?;
        let account = tx.load_account(key).await?;
        tx.rollback().await?;
        let now = OffsetDateTime::now_utc();
        Ok(account.map(|a| AccountSnapshot::from_account(&a, now)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use accounts_store::InMemoryStore;
    use time::macros::datetime;

    use crate::policy::Policy;
    use crate::test_support::NeverReachableFetch;

    use super::*;

    #[tokio::test]
    async fn snapshot_reflects_accrued_available_amount() {
        let engine = LedgerEngine::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(NeverReachableFetch),
            Policy::default(),
        );
        engine
            .handle_configure_account(&accounts_messages::ConfigureAccount {
                debtor_id: 1,
                creditor_id: 2,
                ts: datetime!(2026-07-28 0:00 UTC),
                seqnum: 0,
                negligible_amount: 1.0,
                config_flags: 0,
                config: String::new(),
            })
            .await
            .unwrap();

        let snapshot = engine
            .account_snapshot(AccountKey::new(1, 2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.principal, 0);
        assert_eq!(snapshot.available_amount, 0.0);
    }

    #[tokio::test]
    async fn missing_account_yields_none() {
        let engine = LedgerEngine::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(NeverReachableFetch),
            Policy::default(),
        );
        assert!(engine
            .account_snapshot(AccountKey::new(9, 9))
            .await
            .unwrap()
            .is_none());
    }
}
