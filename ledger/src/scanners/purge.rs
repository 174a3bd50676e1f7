use time::OffsetDateTime;

use accounts_fetch::FetchClient;
use accounts_store::{Store, StoreError};
use accounts_types::AccountKey;

use crate::engine::LedgerEngine;
use crate::messages;

impl<S, F> LedgerEngine<S, F>
where
    S: Store + 'static,
    F: FetchClient + 'static,
{
    /// Applies the six purge preconditions and deletes
    /// satisfying accounts, emitting `AccountPurge` in the same
    /// transaction. Returns the number of accounts purged.
    ///
    /// Precondition 6 ("the debtor currency's policy signals that
    /// resurrection by pending inbound transfer is extremely unlikely") has
    /// no administrative side-channel in this core and is treated as always
    /// satisfied, see DESIGN.md.
    pub async fn scan_purge(&self) -> Result<u64, StoreError> {
        let mut cursor: Option<AccountKey> = None;
        let mut purged = 0u64;
        let batch_size = self.policy.scanner_batch_size;
        let minimum_account_lifetime =
            time::Duration::try_from(self.policy.minimum_account_lifetime).unwrap_or(time::Duration::MAX);
        let stale_config_horizon =
            time::Duration::try_from(self.policy.stale_config_horizon).unwrap_or(time::Duration::MAX);
        let account_ttl = time::Duration::try_from(self.policy.account_ttl).unwrap_or(time::Duration::MAX);

        loop {
            let page = self
                .run_transaction(|mut tx| async move { Ok((tx.scan_accounts(cursor, batch_size).await?, tx)) })
                .await?;
            if page.is_empty() {
                return Ok(purged);
            }

            let last_key = page.last().map(|a| a.key);
            let page_len = page.len();

            for account in page {
                let now = OffsetDateTime::now_utc();

                // Precondition 7 ("wait at least ttl before emitting
                // AccountPurge"): no purge until ttl has elapsed since the
                // last moment an
                // AccountUpdate would have been emitted for this account,
                // so any client still holding a prior AccountUpdate's ttl
                // has let it lapse.
                let last_update_at = account.last_change_ts.max(account.last_heartbeat_ts);

                let eligible = account.is_scheduled_for_deletion()
                    && account.pending_transfers_count == 0
                    && now - account.creation_date.midnight().assume_utc() >= minimum_account_lifetime
                    && now - account.last_config_ts >= stale_config_horizon
                    && account.principal.unsigned_abs() as f64 + account.interest.abs() <= account.negligible_amount
                    && now - last_update_at >= account_ttl;

                if eligible {
                    let key = account.key;
                    self.run_transaction(|mut tx| {
                        let account = account.clone();
                        async move {
                            tx.delete_account(key).await?;
                            tx.enqueue_outgoing(&messages::account_purge(&account, now)).await?;
                            Ok(((), tx))
                        }
                    })
                    .await?;
                    purged += 1;
                }
            }

            cursor = last_key;
            if (page_len as i64) < batch_size {
                return Ok(purged);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use accounts_store::InMemoryStore;
    use accounts_types::{AccountKey, ConfigFlags};
    use time::macros::datetime;

    use crate::policy::Policy;
    use crate::test_support::NeverReachableFetch;

    use super::*;

    fn instant_policy() -> Policy {
        Policy {
            minimum_account_lifetime: std::time::Duration::ZERO,
            stale_config_horizon: std::time::Duration::ZERO,
            account_ttl: std::time::Duration::ZERO,
            ..Policy::default()
        }
    }

    #[tokio::test]
    async fn purges_a_fully_eligible_account() {
        let store = InMemoryStore::new();
        let engine = LedgerEngine::new(Arc::new(store.clone()), Arc::new(NeverReachableFetch), instant_policy());
        engine
            .handle_configure_account(&accounts_messages::ConfigureAccount {
                debtor_id: 1,
                creditor_id: 2,
                ts: datetime!(2026-01-01 0:00 UTC),
                seqnum: 0,
                negligible_amount: 1.0,
                config_flags: ConfigFlags::SCHEDULED_FOR_DELETION.bits() as i32,
                config: String::new(),
            })
            .await
            .unwrap();
        store.drain_outbox().await;

        let purged = engine.scan_purge().await.unwrap();
        assert_eq!(purged, 1);

        let mut tx = store.begin().await.unwrap();
        assert!(tx.load_account(AccountKey::new(1, 2)).await.unwrap().is_none());

        let outbox = store.drain_outbox().await;
        assert!(matches!(&outbox[0], accounts_messages::OutgoingMessage::AccountPurge(_)));
    }

    #[tokio::test]
    async fn does_not_purge_accounts_not_scheduled_for_deletion() {
        let store = InMemoryStore::new();
        let engine = LedgerEngine::new(Arc::new(store.clone()), Arc::new(NeverReachableFetch), instant_policy());
        engine
            .handle_configure_account(&accounts_messages::ConfigureAccount {
                debtor_id: 1,
                creditor_id: 2,
                ts: datetime!(2026-01-01 0:00 UTC),
                seqnum: 0,
                negligible_amount: 1.0,
                config_flags: 0,
                config: String::new(),
            })
            .await
            .unwrap();

        let purged = engine.scan_purge().await.unwrap();
        assert_eq!(purged, 0);
    }

    #[tokio::test]
    async fn does_not_purge_nonnegligible_balance() {
        let store = InMemoryStore::new();
        let engine = LedgerEngine::new(Arc::new(store.clone()), Arc::new(NeverReachableFetch), instant_policy());
        engine
            .handle_configure_account(&accounts_messages::ConfigureAccount {
                debtor_id: 1,
                creditor_id: 2,
                ts: datetime!(2026-01-01 0:00 UTC),
                seqnum: 0,
                negligible_amount: 1.0,
                config_flags: ConfigFlags::SCHEDULED_FOR_DELETION.bits() as i32,
                config: String::new(),
            })
            .await
            .unwrap();

        let mut tx = store.begin().await.unwrap();
        let mut account = tx.load_account(AccountKey::new(1, 2)).await.unwrap().unwrap();
        account.principal = 1000;
        tx.save_account(&account).await.unwrap();
        tx.commit().await.unwrap();

        let purged = engine.scan_purge().await.unwrap();
        assert_eq!(purged, 0);
    }
}
