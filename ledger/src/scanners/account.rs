use time::OffsetDateTime;

use accounts_chronometer::accrual::{capitalize, project_available_amount};
use accounts_chronometer::year_fraction;
use accounts_fetch::FetchClient;
use accounts_store::{Store, StoreError};
use accounts_types::{AccountKey, StatusFlags};

use crate::engine::LedgerEngine;
use crate::messages;

impl<S, F> LedgerEngine<S, F>
where
    S: Store + 'static,
    F: FetchClient + 'static,
{
    /// Walks every account once: re-emits a heartbeat
    /// `AccountUpdate` for idle accounts, capitalizes drifted interest or a
    /// changed rate, and initiates a zero-out transfer for
    /// scheduled-for-deletion accounts carrying a negligible but nonzero
    /// balance. Returns the number of accounts visited.
    pub async fn scan_accounts(&self) -> Result<u64, StoreError> {
        let mut cursor: Option<AccountKey> = None;
        let mut visited = 0u64;
        let batch_size = self.policy.scanner_batch_size;

        loop {
            let page = self
                .run_transaction(|mut tx| async move {
                    let page = tx.scan_accounts(cursor, batch_size).await?;
                    Ok((page, tx))
                })
                .await?;
            if page.is_empty() {
                return Ok(visited);
            }

            let last_key = page.last().map(|a| a.key);
            let page_len = page.len();

            for account in page {
                self.scan_one_account(account.key).await?;
                visited += 1;
            }

            cursor = last_key;
            if (page_len as i64) < batch_size {
                return Ok(visited);
            }
        }
    }

    async fn scan_one_account(&self, key: AccountKey) -> Result<(), StoreError> {
        self.run_transaction(|mut tx| async move {
            let now = OffsetDateTime::now_utc();
            let ttl_seconds = self.policy.account_ttl.as_secs() as i64;
            let Some(mut account) = tx.load_account(key).await? else {
                return Ok(((), tx));
            };

            let rate_changed = account.interest_rate != account.previous_interest_rate;
            let delta_years = year_fraction(account.last_change_ts, now).max(0.0);
            let grown = project_available_amount(&account, delta_years) + account.total_locked_amount as f64;
            account.interest = grown - account.principal as f64;

            let mut dirty = false;
            if rate_changed || account.interest.abs() >= self.policy.interest_capitalization_threshold {
                let cap = capitalize(account.principal, account.interest);
                account.principal = cap.new_principal;
                account.interest = cap.remaining_interest;
                if cap.overflowed {
                    account.status_flags.insert(StatusFlags::OVERFLOWN);
                }
                account.previous_interest_rate = account.interest_rate;
                account.last_interest_rate_change_ts = now;
                dirty = true;
            }

            let heartbeat_interval =
                time::Duration::try_from(self.policy.heartbeat_interval).unwrap_or(time::Duration::MAX);
            if now - account.last_heartbeat_ts > heartbeat_interval {
                account.last_heartbeat_ts = now;
                dirty = true;
            }

            let zero_out_due = account.is_scheduled_for_deletion()
                && account.principal != 0
                && account.is_negligible(account.principal as f64 + account.interest);

            if dirty || zero_out_due {
                account.bump_change_version(now);
                tx.save_account(&account).await?;
                tx.enqueue_outgoing(&messages::account_update(&account, now, ttl_seconds))
                    .await?;
            }

            if zero_out_due {
                // A scheduled-for-deletion account with a negligible but
                // nonzero balance never reaches purge precondition 5
                // through ordinary transfers (nobody prepares a transfer
                // against a closing account), so the scanner writes the
                // remainder off itself.
                let write_off = account.principal;
                account.principal = 0;
                account.interest = 0.0;
                account.bump_change_version(now);
                let transfer_number = account.next_transfer_number(now);
                tx.save_account(&account).await?;
                tx.enqueue_outgoing(&messages::account_transfer(
                    &account,
                    0,
                    transfer_number,
                    "scanner",
                    "",
                    0,
                    -write_off,
                    true,
                    "zero-out",
                    now,
                    now,
                ))
                .await?;
                tx.enqueue_outgoing(&messages::account_update(&account, now, ttl_seconds))
                    .await?;
            }

            Ok(((), tx))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use accounts_store::InMemoryStore;
    use accounts_types::ConfigFlags;
    use time::macros::datetime;

    use crate::policy::Policy;
    use crate::test_support::NeverReachableFetch;

    use super::*;

    fn engine() -> LedgerEngine<InMemoryStore, NeverReachableFetch> {
        LedgerEngine::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(NeverReachableFetch),
            Policy::default(),
        )
    }

    #[tokio::test]
    async fn capitalizes_drifted_interest() {
        let engine = engine();
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

        let mut tx = engine.store.begin().await.unwrap();
        let mut account = tx.load_account(AccountKey::new(1, 2)).await.unwrap().unwrap();
        account.principal = 10_000;
        account.interest_rate = 10.0;
        account.last_change_ts = datetime!(2026-01-01 0:00 UTC);
        tx.save_account(&account).await.unwrap();
        tx.commit().await.unwrap();
        engine.store.drain_outbox().await;

        engine.scan_one_account(AccountKey::new(1, 2)).await.unwrap();

        let mut tx = engine.store.begin().await.unwrap();
        let account = tx.load_account(AccountKey::new(1, 2)).await.unwrap().unwrap();
        assert!(account.principal >= 10_000, "drifted interest should have capitalized upward");
        assert!(account.interest.abs() < 1.0);
    }

    #[tokio::test]
    async fn zeroes_out_negligible_balance_on_scheduled_accounts() {
        let engine = engine();
        engine
            .handle_configure_account(&accounts_messages::ConfigureAccount {
                debtor_id: 1,
                creditor_id: 2,
                ts: datetime!(2026-01-01 0:00 UTC),
                seqnum: 0,
                negligible_amount: 5.0,
                config_flags: ConfigFlags::SCHEDULED_FOR_DELETION.bits() as i32,
                config: String::new(),
            })
            .await
            .unwrap();

        let mut tx = engine.store.begin().await.unwrap();
        let mut account = tx.load_account(AccountKey::new(1, 2)).await.unwrap().unwrap();
        account.principal = 2;
        tx.save_account(&account).await.unwrap();
        tx.commit().await.unwrap();
        engine.store.drain_outbox().await;

        engine.scan_one_account(AccountKey::new(1, 2)).await.unwrap();

        let mut tx = engine.store.begin().await.unwrap();
        let account = tx.load_account(AccountKey::new(1, 2)).await.unwrap().unwrap();
        assert_eq!(account.principal, 0);
    }
}
