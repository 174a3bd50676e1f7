use time::OffsetDateTime;

use accounts_chronometer::accrual::project_available_amount;
use accounts_chronometer::year_fraction;
use accounts_fetch::FetchClient;
use accounts_messages::PrepareTransfer;
use accounts_store::{Store, StoreError};
use accounts_types::{AccountKey, CoordinatorType, PreparedTransfer};

use crate::engine::LedgerEngine;
use crate::messages;

impl<S, F> LedgerEngine<S, F>
where
    S: Store + 'static,
    F: FetchClient + 'static,
{
    /// `PrepareTransfer`: validates the request, accrues the
    /// sender up to `ts`, locks as much of `[min_locked_amount,
    /// max_locked_amount]` as is available, verifies the recipient is
    /// reachable, and either locks the funds (emitting `PreparedTransfer`)
    /// or rejects (emitting `RejectedTransfer`).
    pub async fn handle_prepare_transfer(&self, msg: &PrepareTransfer) -> Result<(), StoreError> {
        let sender_key = AccountKey::new(msg.debtor_id, msg.creditor_id);

        let coordinator_type = match CoordinatorType::new(msg.coordinator_type.clone()) {
            Ok(t) => t,
            Err(_) => {
                return self
                    .reject_prepare(msg, accounts_errors::INVALID_REQUEST, 0)
                    .await
            }
        };

        if msg.min_locked_amount < 0 || msg.max_locked_amount < msg.min_locked_amount {
            return self
                .reject_prepare(msg, accounts_errors::INVALID_REQUEST, 0)
                .await;
        }

        self.run_transaction(|mut tx| {
            let coordinator_type = coordinator_type.clone();
            async move {
                let now = OffsetDateTime::now_utc();
                let mut sender = match tx.load_account(sender_key).await? {
                    Some(a) => a,
                    None => {
                        tx.enqueue_outgoing(&messages::rejected_transfer(
                            msg.debtor_id,
                            msg.creditor_id,
                            coordinator_type.as_str(),
                            &msg.coordinator_id,
                            msg.coordinator_request_id,
                            accounts_errors::NO_SENDER,
                            0,
                            now,
                        ))
                        .await?;
                        return Ok(((), tx));
                    }
                };

                if sender.is_scheduled_for_deletion() {
                    tx.enqueue_outgoing(&messages::rejected_transfer(
                        msg.debtor_id,
                        msg.creditor_id,
                        coordinator_type.as_str(),
                        &msg.coordinator_id,
                        msg.coordinator_request_id,
                        accounts_errors::SENDER_SCHEDULED_FOR_DELETION,
                        sender.total_locked_amount,
                        now,
                    ))
                    .await?;
                    return Ok(((), tx));
                }

                if sender.key.to_identity() == msg.recipient {
                    tx.enqueue_outgoing(&messages::rejected_transfer(
                        msg.debtor_id,
                        msg.creditor_id,
                        coordinator_type.as_str(),
                        &msg.coordinator_id,
                        msg.coordinator_request_id,
                        accounts_errors::RECIPIENT_SAME_AS_SENDER,
                        sender.total_locked_amount,
                        now,
                    ))
                    .await?;
                    return Ok(((), tx));
                }

                // Step 3: accrue the sender up to `ts`, no commit yet
                // (recorded below once we know this prepare succeeds).
                let delta_years = year_fraction(sender.last_change_ts, msg.ts).max(0.0);
                let available = project_available_amount(&sender, delta_years) - msg.min_account_balance as f64;
                let locked_amount = (msg.max_locked_amount as f64).min(available).floor().max(0.0) as i64;

                if locked_amount < msg.min_locked_amount {
                    tx.enqueue_outgoing(&messages::rejected_transfer(
                        msg.debtor_id,
                        msg.creditor_id,
                        coordinator_type.as_str(),
                        &msg.coordinator_id,
                        msg.coordinator_request_id,
                        accounts_errors::INSUFFICIENT_AVAILABLE_AMOUNT,
                        sender.total_locked_amount,
                        now,
                    ))
                    .await?;
                    return Ok(((), tx));
                }

                let status = self
                    .fetch
                    .fetch_account_status(msg.debtor_id, &msg.recipient)
                    .await;
                let rejected = match status {
                    Ok(status) => status.should_reject(),
                    Err(_) => true,
                };
                if rejected {
                    tx.enqueue_outgoing(&messages::rejected_transfer(
                        msg.debtor_id,
                        msg.creditor_id,
                        coordinator_type.as_str(),
                        &msg.coordinator_id,
                        msg.coordinator_request_id,
                        accounts_errors::RECIPIENT_UNREACHABLE,
                        sender.total_locked_amount,
                        now,
                    ))
                    .await?;
                    return Ok(((), tx));
                }

                // Apply the accrual computed above and place the lock.
                let grown = project_available_amount(&sender, delta_years) + sender.total_locked_amount as f64;
                sender.interest = grown - sender.principal as f64;

                let transfer_id = tx.next_transfer_id(sender_key).await?;
                let max_commit_delay = time::Duration::milliseconds(msg.max_commit_delay);
                let commit_period =
                    time::Duration::try_from(self.policy.commit_period).unwrap_or(time::Duration::MAX);
                let deadline = msg.ts + max_commit_delay.min(commit_period);

                let prepared = PreparedTransfer {
                    sender: sender_key,
                    transfer_id,
                    coordinator_type: coordinator_type.clone(),
                    coordinator_id: msg.coordinator_id.clone(),
                    coordinator_request_id: msg.coordinator_request_id,
                    locked_amount,
                    recipient: msg.recipient.clone(),
                    demurrage_rate: self.policy.demurrage_rate,
                    deadline,
                    min_interest_rate: msg.min_interest_rate,
                    prepared_at: msg.ts,
                };

                sender.total_locked_amount += locked_amount;
                sender.pending_transfers_count += 1;
                sender.bump_change_version(now);

                tx.save_account(&sender).await?;
                tx.save_prepared_transfer(&prepared).await?;
                tx.enqueue_outgoing(&messages::prepared_transfer(&prepared, now)).await?;

                Ok(((), tx))
            }
        })
        .await
    }

    async fn reject_prepare(
        &self,
        msg: &PrepareTransfer,
        status_code: &str,
        total_locked_amount: i64,
    ) -> Result<(), StoreError> {
        self.run_transaction(|mut tx| async move {
            let now = OffsetDateTime::now_utc();
            tx.enqueue_outgoing(&messages::rejected_transfer(
                msg.debtor_id,
                msg.creditor_id,
                &msg.coordinator_type,
                &msg.coordinator_id,
                msg.coordinator_request_id,
                status_code,
                total_locked_amount,
                now,
            ))
            .await?;
            Ok(((), tx))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use accounts_store::{InMemoryStore, Store};
    use time::macros::datetime;

    use crate::policy::Policy;
    use crate::test_support::{AlwaysReachableFetch, NeverReachableFetch};

    use super::*;

    async fn funded_engine<F>(fetch: F, principal: i64) -> (LedgerEngine<InMemoryStore, F>, InMemoryStore)
    where
        F: FetchClient + 'static,
    {
        let store = InMemoryStore::new();
        let engine = LedgerEngine::new(Arc::new(store.clone()), Arc::new(fetch), Policy::default());
        for creditor_id in [2, 3] {
            engine
                .handle_configure_account(&accounts_messages::ConfigureAccount {
                    debtor_id: 1,
                    creditor_id,
                    ts: datetime!(2026-07-01 0:00 UTC),
                    seqnum: 0,
                    negligible_amount: 1.0,
                    config_flags: 0,
                    config: String::new(),
                })
                .await
                .unwrap();
        }

        let mut tx = store.begin().await.unwrap();
        let mut account = tx
            .load_account(accounts_types::AccountKey::new(1, 2))
            .await
            .unwrap()
            .unwrap();
        account.principal = principal;
        tx.save_account(&account).await.unwrap();
        tx.commit().await.unwrap();

        (engine, store)
    }

    #[tokio::test]
    async fn locks_requested_amount_when_available() {
        let (engine, store) = funded_engine(AlwaysReachableFetch, 100).await;
        store.drain_outbox().await;

        let msg = accounts_messages::PrepareTransfer {
            debtor_id: 1,
            creditor_id: 2,
            coordinator_type: "direct".into(),
            coordinator_id: "c1".into(),
            coordinator_request_id: 1,
            min_locked_amount: 1,
            max_locked_amount: 40,
            recipient: accounts_types::AccountKey::new(1, 3).to_identity(),
            min_interest_rate: -100.0,
            min_account_balance: 0,
            max_commit_delay: 86_400_000,
            ts: datetime!(2026-07-02 0:00 UTC),
        };
        engine.handle_prepare_transfer(&msg).await.unwrap();

        let outbox = store.drain_outbox().await;
        assert_eq!(outbox.len(), 1);
        match &outbox[0] {
            accounts_messages::OutgoingMessage::PreparedTransfer(p) => assert_eq!(p.locked_amount, 40),
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejects_when_recipient_unreachable() {
        let (engine, store) = funded_engine(NeverReachableFetch, 100).await;
        store.drain_outbox().await;

        let msg = accounts_messages::PrepareTransfer {
            debtor_id: 1,
            creditor_id: 2,
            coordinator_type: "direct".into(),
            coordinator_id: "c1".into(),
            coordinator_request_id: 1,
            min_locked_amount: 1,
            max_locked_amount: 40,
            recipient: accounts_types::AccountKey::new(1, 3).to_identity(),
            min_interest_rate: -100.0,
            min_account_balance: 0,
            max_commit_delay: 86_400_000,
            ts: datetime!(2026-07-02 0:00 UTC),
        };
        engine.handle_prepare_transfer(&msg).await.unwrap();

        let outbox = store.drain_outbox().await;
        assert_eq!(outbox.len(), 1);
        assert!(matches!(
            &outbox[0],
            accounts_messages::OutgoingMessage::RejectedTransfer(r)
                if r.status_code == accounts_errors::RECIPIENT_UNREACHABLE
        ));
    }

    #[tokio::test]
    async fn zero_available_can_still_prepare_zero_lock() {
        let (engine, store) = funded_engine(AlwaysReachableFetch, 0).await;
        store.drain_outbox().await;

        let msg = accounts_messages::PrepareTransfer {
            debtor_id: 1,
            creditor_id: 2,
            coordinator_type: "direct".into(),
            coordinator_id: "c1".into(),
            coordinator_request_id: 1,
            min_locked_amount: 0,
            max_locked_amount: 40,
            recipient: accounts_types::AccountKey::new(1, 3).to_identity(),
            min_interest_rate: -100.0,
            min_account_balance: 0,
            max_commit_delay: 86_400_000,
            ts: datetime!(2026-07-02 0:00 UTC),
        };
        engine.handle_prepare_transfer(&msg).await.unwrap();

        let outbox = store.drain_outbox().await;
        match &outbox[0] {
            accounts_messages::OutgoingMessage::PreparedTransfer(p) => assert_eq!(p.locked_amount, 0),
            other => panic!("unexpected message {other:?}"),
        }
    }
}
