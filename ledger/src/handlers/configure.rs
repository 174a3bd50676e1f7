use time::OffsetDateTime;

use accounts_chronometer::seqnum::Version;
use accounts_fetch::FetchClient;
use accounts_messages::ConfigureAccount;
use accounts_store::{Store, StoreError};
use accounts_types::{Account, AccountKey};

use crate::engine::LedgerEngine;
use crate::messages;

impl<S, F> LedgerEngine<S, F>
where
    S: Store + 'static,
    F: FetchClient + 'static,
{
    /// `ConfigureAccount`.
    ///
    /// Creates the account on first sight (unless the message is already
    /// stale), otherwise applies the update only if `(ts, seqnum)` is
    /// strictly later than the account's current configuration version.
    /// This is what makes redelivery and out-of-order delivery of
    /// `ConfigureAccount` safe.
    pub async fn handle_configure_account(&self, msg: &ConfigureAccount) -> Result<(), StoreError> {
        let key = AccountKey::new(msg.debtor_id, msg.creditor_id);
        let incoming_version = Version::new(msg.ts, msg.seqnum);

        self.run_transaction(|mut tx| async move {
            let now = OffsetDateTime::now_utc();
            let existing = tx.load_account(key).await?;

            match existing {
                None => {
                    let age = now - msg.ts;
                    let stale_config_horizon = time::Duration::try_from(self.policy.stale_config_horizon)
                        .unwrap_or(time::Duration::MAX);
                    if age > stale_config_horizon {
                        // Too old to found a new account on: ignored, no mutation, no message.
                        return Ok(((), tx));
                    }

                    if msg.negligible_amount < 0.0 {
                        tx.enqueue_outgoing(&messages::rejected_config(
                            msg.debtor_id,
                            msg.creditor_id,
                            msg.ts,
                            msg.seqnum,
                            accounts_errors::INVALID_NEGLIGIBLE_AMOUNT,
                            now,
                        ))
                        .await?;
                        return Ok(((), tx));
                    }

                    let account = Account::new(
                        key,
                        accounts_chronometer::today(),
                        now,
                        msg.negligible_amount,
                        accounts_types::ConfigFlags::from_bits_truncate(msg.config_flags as u32),
                        msg.config.clone(),
                        msg.ts,
                        msg.seqnum,
                    );
                    tx.save_account(&account).await?;
                    tx.enqueue_outgoing(&messages::account_update(
                        &account,
                        now,
                        self.policy.account_ttl.as_secs() as i64,
                    ))
                    .await?;
                    Ok(((), tx))
                }
                Some(mut account) => {
                    let current_version = Version::new(account.last_config_ts, account.last_config_seqnum);
                    if !incoming_version.is_later_than(&current_version) {
                        // Redelivered or out-of-order: ignore silently.
                        return Ok(((), tx));
                    }

                    if msg.negligible_amount < 0.0 {
                        tx.enqueue_outgoing(&messages::rejected_config(
                            msg.debtor_id,
                            msg.creditor_id,
                            msg.ts,
                            msg.seqnum,
                            accounts_errors::INVALID_NEGLIGIBLE_AMOUNT,
                            now,
                        ))
                        .await?;
                        return Ok(((), tx));
                    }

                    account.negligible_amount = msg.negligible_amount;
                    account.config_flags =
                        accounts_types::ConfigFlags::from_bits_truncate(msg.config_flags as u32);
                    account.config = msg.config.clone();
                    account.last_config_ts = msg.ts;
                    account.last_config_seqnum = msg.seqnum;
                    account.bump_change_version(now);

                    tx.save_account(&account).await?;
                    tx.enqueue_outgoing(&messages::account_update(
                        &account,
                        now,
                        self.policy.account_ttl.as_secs() as i64,
                    ))
                    .await?;
                    Ok(((), tx))
                }
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use accounts_store::InMemoryStore;
    use accounts_types::AccountKey;
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
    async fn creates_account_on_first_sight() {
        let engine = engine();
        let msg = ConfigureAccount {
            debtor_id: 1,
            creditor_id: 2,
            ts: datetime!(2026-07-28 0:00 UTC),
            seqnum: 0,
            negligible_amount: 10.0,
            config_flags: 0,
            config: String::new(),
        };
        engine.handle_configure_account(&msg).await.unwrap();

        let mut tx = engine.store.begin().await.unwrap();
        let account = tx.load_account(AccountKey::new(1, 2)).await.unwrap().unwrap();
        assert_eq!(account.principal, 0);
        assert_eq!(account.last_config_seqnum, 0);
    }

    #[tokio::test]
    async fn out_of_order_seqnum_is_ignored() {
        let engine = engine();
        let base = ConfigureAccount {
            debtor_id: 1,
            creditor_id: 2,
            ts: datetime!(2026-07-28 0:00 UTC),
            seqnum: 5,
            negligible_amount: 10.0,
            config_flags: 0,
            config: "first".into(),
        };
        engine.handle_configure_account(&base).await.unwrap();

        let stale = ConfigureAccount {
            seqnum: 3,
            config: "second".into(),
            ..base.clone()
        };
        engine.handle_configure_account(&stale).await.unwrap();

        let mut tx = engine.store.begin().await.unwrap();
        let account = tx.load_account(AccountKey::new(1, 2)).await.unwrap().unwrap();
        assert_eq!(account.last_config_seqnum, 5);
        assert_eq!(account.config, "first");
    }

    #[tokio::test]
    async fn rejects_negative_negligible_amount() {
        let engine = engine();
        let msg = ConfigureAccount {
            debtor_id: 1,
            creditor_id: 2,
            ts: datetime!(2026-07-28 0:00 UTC),
            seqnum: 0,
            negligible_amount: -1.0,
            config_flags: 0,
            config: String::new(),
        };
        engine.handle_configure_account(&msg).await.unwrap();

        let mut tx = engine.store.begin().await.unwrap();
        assert!(tx.load_account(AccountKey::new(1, 2)).await.unwrap().is_none());

        let outbox = engine.store.drain_outbox().await;
        assert_eq!(outbox.len(), 1);
        assert!(matches!(
            &outbox[0],
            accounts_messages::OutgoingMessage::RejectedConfig(r)
                if r.status_code == accounts_errors::INVALID_NEGLIGIBLE_AMOUNT
        ));
    }
}
