use time::OffsetDateTime;

use accounts_fetch::FetchClient;
use accounts_store::{Store, StoreError};
use accounts_types::{AccountKey, TransferId};

use crate::engine::LedgerEngine;
use crate::messages;

impl<S, F> LedgerEngine<S, F>
where
    S: Store + 'static,
    F: FetchClient + 'static,
{
    /// For each live `PreparedTransfer` older than the finalization
    /// reminder interval, re-emits `PreparedTransfer` identical except
    /// `ts`, a nudge to a coordinator that may have missed
    /// the original delivery. Returns the number of reminders sent.
    pub async fn scan_prepared_transfers(&self) -> Result<u64, StoreError> {
        let mut cursor: Option<(AccountKey, TransferId)> = None;
        let mut sent = 0u64;
        let batch_size = self.policy.scanner_batch_size;
        let reminder_interval = time::Duration::try_from(self.policy.finalization_reminder_interval)
            .unwrap_or(time::Duration::MAX);

        loop {
            let page = self
                .run_transaction(|mut tx| async move {
                    let now = OffsetDateTime::now_utc();
                    let cutoff = now - reminder_interval;
                    let page = tx
                        .scan_prepared_transfers_older_than(cutoff, cursor, batch_size)
                        .await?;
                    for transfer in &page {
                        tx.enqueue_outgoing(&messages::prepared_transfer(transfer, now))
                            .await?;
                    }
                    Ok((page, tx))
                })
                .await?;

            if page.is_empty() {
                return Ok(sent);
            }

            sent += page.len() as u64;
            let last = page.last().map(|t| (t.sender, t.transfer_id));
            let page_len = page.len();
            cursor = last;

            if (page_len as i64) < batch_size {
                return Ok(sent);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use accounts_store::InMemoryStore;
    use time::macros::datetime;

    use crate::policy::Policy;
    use crate::test_support::AlwaysReachableFetch;

    use super::*;

    #[tokio::test]
    async fn reminds_finalization_for_stale_prepared_transfers() {
        let store = InMemoryStore::new();
        let engine = LedgerEngine::new(
            Arc::new(store.clone()),
            Arc::new(AlwaysReachableFetch),
            Policy {
                finalization_reminder_interval: std::time::Duration::from_secs(1),
                ..Policy::default()
            },
        );
        for creditor_id in [2, 3] {
            engine
                .handle_configure_account(&accounts_messages::ConfigureAccount {
                    debtor_id: 1,
                    creditor_id,
                    ts: datetime!(2026-01-01 0:00 UTC),
                    seqnum: 0,
                    negligible_amount: 1.0,
                    config_flags: 0,
                    config: String::new(),
                })
                .await
                .unwrap();
        }
        let mut tx = store.begin().await.unwrap();
        let mut account = tx.load_account(AccountKey::new(1, 2)).await.unwrap().unwrap();
        account.principal = 100;
        tx.save_account(&account).await.unwrap();
        tx.commit().await.unwrap();
        store.drain_outbox().await;

        engine
            .handle_prepare_transfer(&accounts_messages::PrepareTransfer {
                debtor_id: 1,
                creditor_id: 2,
                coordinator_type: "direct".into(),
                coordinator_id: "c1".into(),
                coordinator_request_id: 1,
                min_locked_amount: 1,
                max_locked_amount: 40,
                recipient: AccountKey::new(1, 3).to_identity(),
                min_interest_rate: -100.0,
                min_account_balance: 0,
                max_commit_delay: 365 * 86_400_000,
                ts: datetime!(2020-01-01 0:00 UTC),
            })
            .await
            .unwrap();
        store.drain_outbox().await;

        let sent = engine.scan_prepared_transfers().await.unwrap();
        assert_eq!(sent, 1);

        let outbox = store.drain_outbox().await;
        assert!(matches!(
            &outbox[0],
            accounts_messages::OutgoingMessage::PreparedTransfer(p) if p.locked_amount == 40
        ));
    }
}
