use accounts_chronometer::today;
use accounts_fetch::FetchClient;
use accounts_store::{Store, StoreError};

use crate::engine::LedgerEngine;

impl<S, F> LedgerEngine<S, F>
where
    S: Store + 'static,
    F: FetchClient + 'static,
{
    /// Deletes `RegisteredBalanceChange` rows past the retention horizon.
    /// A `None` retention (the default, see
    /// `Policy::registered_balance_change_retention`) disables GC entirely
    /// rather than collecting immediately. Returns the number of rows
    /// deleted.
    pub async fn scan_registered_balance_changes(&self) -> Result<u64, StoreError> {
        let Some(cutoff) = self.policy.registered_balance_change_cutoff(today()) else {
            return Ok(0);
        };
        let batch_size = self.policy.scanner_batch_size;
        let mut deleted = 0u64;

        loop {
            let removed = self
                .run_transaction(|mut tx| async move {
                    let removed = tx
                        .delete_registered_balance_changes_before(cutoff, batch_size)
                        .await?;
                    Ok((removed, tx))
                })
                .await?;

            if removed == 0 {
                return Ok(deleted);
            }
            deleted += removed;
            if (removed as i64) < batch_size {
                return Ok(deleted);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use accounts_store::InMemoryStore;
    use accounts_types::{ChangeId, RegisteredBalanceChange};
    use time::macros::datetime;

    use crate::policy::Policy;
    use crate::test_support::NeverReachableFetch;

    use super::*;

    #[tokio::test]
    async fn disabled_by_default() {
        let engine = LedgerEngine::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(NeverReachableFetch),
            Policy::default(),
        );
        assert_eq!(engine.scan_registered_balance_changes().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn deletes_rows_past_retention() {
        let store = InMemoryStore::new();
        let engine = LedgerEngine::new(
            Arc::new(store.clone()),
            Arc::new(NeverReachableFetch),
            Policy {
                registered_balance_change_retention: Some(std::time::Duration::from_secs(86_400)),
                ..Policy::default()
            },
        );

        let mut tx = store.begin().await.unwrap();
        tx.register_balance_change(&RegisteredBalanceChange {
            debtor_id: 1,
            other_creditor_id: 2,
            change_id: ChangeId("old".into()),
            applied_at: datetime!(2000-01-01 0:00 UTC),
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let deleted = engine.scan_registered_balance_changes().await.unwrap();
        assert_eq!(deleted, 1);
    }
}
