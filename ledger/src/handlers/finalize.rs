use time::OffsetDateTime;

use accounts_chronometer::accrual::{
    demurrage_clamped_commit, project_available_amount, sat_add_i64, sat_sub_i64,
};
use accounts_chronometer::year_fraction;
use accounts_fetch::FetchClient;
use accounts_messages::FinalizeTransfer;
use accounts_store::{Store, StoreError};
use accounts_types::{AccountKey, ChangeId, RegisteredBalanceChange, StatusFlags, TransferId};

use crate::engine::LedgerEngine;
use crate::messages;

impl<S, F> LedgerEngine<S, F>
where
    S: Store + 'static,
    F: FetchClient + 'static,
{
    /// `FinalizeTransfer`: releases the sender's lock and,
    /// if the commit succeeds, debits the sender, credits the recipient
    /// (when it resolves to an account this shard owns; the cross-shard
    /// case self-posts the same effect as an internal message, out of scope
    /// here), and emits both `AccountTransfer` notices.
    pub async fn handle_finalize_transfer(&self, msg: &FinalizeTransfer) -> Result<(), StoreError> {
        let sender_key = AccountKey::new(msg.debtor_id, msg.creditor_id);
        let transfer_id = TransferId(msg.transfer_id);
        let ttl_seconds = self.policy.account_ttl.as_secs() as i64;

        self.run_transaction(|mut tx| async move {
            let now = OffsetDateTime::now_utc();

            let prepared = match tx.load_prepared_transfer(sender_key, transfer_id).await? {
                Some(p)
                    if p.matches_coordinator(
                        &msg.coordinator_type,
                        &msg.coordinator_id,
                        msg.coordinator_request_id,
                    ) =>
                {
                    p
                }
                // Not found, or a coordinator mismatch (most likely a stale
                // redelivery against a transfer_id that was already
                // finalized and whose row is gone): ignore.
                _ => return Ok(((), tx)),
            };

            let mut sender = tx
                .load_account(sender_key)
                .await?
                .expect("a live PreparedTransfer implies its sender account still exists");

            if msg.committed_amount == 0 {
                sender.total_locked_amount -= prepared.locked_amount;
                sender.pending_transfers_count -= 1;
                sender.bump_change_version(now);
                tx.delete_prepared_transfer(sender_key, transfer_id).await?;
                tx.save_account(&sender).await?;
                tx.enqueue_outgoing(&messages::finalized_transfer(
                    msg.debtor_id,
                    msg.creditor_id,
                    msg.transfer_id,
                    &msg.coordinator_type,
                    &msg.coordinator_id,
                    msg.coordinator_request_id,
                    0,
                    accounts_errors::OK,
                    now,
                ))
                .await?;
                tx.enqueue_outgoing(&messages::account_update(&sender, now, ttl_seconds))
                    .await?;
                return Ok(((), tx));
            }

            let delta_years = year_fraction(sender.last_change_ts, msg.ts).max(0.0);
            let grown = project_available_amount(&sender, delta_years) + sender.total_locked_amount as f64;
            sender.interest = grown - sender.principal as f64;

            let mut status = accounts_errors::OK;
            let mut commit_amount = 0i64;

            if msg.ts > prepared.deadline {
                status = accounts_errors::TIMEOUT;
            } else if sender.interest_rate < prepared.min_interest_rate {
                status = accounts_errors::NEWER_INTEREST_RATE;
            } else {
                let delta_years_since_prepared = year_fraction(prepared.prepared_at, msg.ts).max(0.0);
                match demurrage_clamped_commit(
                    msg.committed_amount,
                    prepared.locked_amount,
                    sender.principal as f64 + sender.interest,
                    prepared.demurrage_rate,
                    delta_years_since_prepared,
                ) {
                    Some(amount) => commit_amount = amount,
                    None => status = accounts_errors::INSUFFICIENT_AVAILABLE_AMOUNT,
                }
            }

            sender.total_locked_amount -= prepared.locked_amount;
            sender.pending_transfers_count -= 1;
            tx.delete_prepared_transfer(sender_key, transfer_id).await?;

            let recipient_key = AccountKey::parse_identity(&prepared.recipient);
            let other_creditor_id = recipient_key.map(|k| k.creditor_id).unwrap_or(0);

            if commit_amount > 0 {
                let (new_principal, overflowed) = sat_sub_i64(sender.principal, commit_amount);
                sender.principal = new_principal;
                if overflowed {
                    sender.status_flags.insert(StatusFlags::OVERFLOWN);
                }
                sender.last_outgoing_transfer_date = Some(msg.ts.date());
                let is_negligible = sender.is_negligible(commit_amount as f64);
                let transfer_number = sender.next_transfer_number(now);
                tx.enqueue_outgoing(&messages::account_transfer(
                    &sender,
                    other_creditor_id,
                    transfer_number,
                    &msg.coordinator_type,
                    &msg.coordinator_id,
                    msg.coordinator_request_id,
                    -commit_amount,
                    is_negligible,
                    &msg.transfer_note,
                    now,
                    now,
                ))
                .await?;
            }

            sender.bump_change_version(now);
            tx.save_account(&sender).await?;
            tx.enqueue_outgoing(&messages::finalized_transfer(
                msg.debtor_id,
                msg.creditor_id,
                msg.transfer_id,
                &msg.coordinator_type,
                &msg.coordinator_id,
                msg.coordinator_request_id,
                commit_amount,
                status,
                now,
            ))
            .await?;
            tx.enqueue_outgoing(&messages::account_update(&sender, now, ttl_seconds))
                .await?;

            if commit_amount > 0 {
                if let Some(recipient_key) = recipient_key {
                    let change_id = ChangeId(transfer_id.0.to_string());
                    let already_applied = tx
                        .balance_change_applied(msg.debtor_id, sender_key.creditor_id, &change_id)
                        .await?;
                    if !already_applied {
                        if let Some(mut recipient) = tx.load_account(recipient_key).await? {
                            let (new_principal, overflowed) = sat_add_i64(recipient.principal, commit_amount);
                            recipient.principal = new_principal;
                            if overflowed {
                                recipient.status_flags.insert(StatusFlags::OVERFLOWN);
                            }
                            let is_negligible = recipient.is_negligible(commit_amount as f64);
                            let transfer_number = recipient.next_transfer_number(now);
                            recipient.bump_change_version(now);
                            tx.save_account(&recipient).await?;
                            tx.register_balance_change(&RegisteredBalanceChange {
                                debtor_id: msg.debtor_id,
                                other_creditor_id: sender_key.creditor_id,
                                change_id,
                                applied_at: now,
                            })
                            .await?;
                            tx.enqueue_outgoing(&messages::account_transfer(
                                &recipient,
                                sender_key.creditor_id,
                                transfer_number,
                                &msg.coordinator_type,
                                &msg.coordinator_id,
                                msg.coordinator_request_id,
                                commit_amount,
                                is_negligible,
                                &msg.transfer_note,
                                now,
                                now,
                            ))
                            .await?;
                            tx.enqueue_outgoing(&messages::account_update(&recipient, now, ttl_seconds))
                                .await?;
                        }
                    }
                }
            }

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
    use crate::test_support::AlwaysReachableFetch;

    use super::*;

    async fn prepared_setup() -> (LedgerEngine<InMemoryStore, AlwaysReachableFetch>, InMemoryStore, i64) {
        let store = InMemoryStore::new();
        let engine = LedgerEngine::new(Arc::new(store.clone()), Arc::new(AlwaysReachableFetch), Policy::default());
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
            .load_account(AccountKey::new(1, 2))
            .await
            .unwrap()
            .unwrap();
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
                max_commit_delay: 86_400_000,
                ts: datetime!(2026-07-02 0:00 UTC),
            })
            .await
            .unwrap();
        store.drain_outbox().await;

        (engine, store, 1)
    }

    fn finalize_msg(transfer_id: i64, committed_amount: i64, ts: time::OffsetDateTime) -> FinalizeTransfer {
        FinalizeTransfer {
            debtor_id: 1,
            creditor_id: 2,
            transfer_id,
            coordinator_type: "direct".into(),
            coordinator_id: "c1".into(),
            coordinator_request_id: 1,
            committed_amount,
            transfer_note: String::new(),
            finalization_flags: 0,
            ts,
        }
    }

    #[tokio::test]
    async fn dismiss_releases_lock_without_moving_funds() {
        let (engine, store, transfer_id) = prepared_setup().await;
        let msg = finalize_msg(transfer_id, 0, datetime!(2026-07-02 1:00 UTC));
        engine.handle_finalize_transfer(&msg).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let sender = tx.load_account(AccountKey::new(1, 2)).await.unwrap().unwrap();
        assert_eq!(sender.total_locked_amount, 0);
        assert_eq!(sender.principal, 100);

        let outbox = store.drain_outbox().await;
        assert!(outbox.iter().any(|m| matches!(
            m,
            accounts_messages::OutgoingMessage::FinalizedTransfer(f)
                if f.status_code == accounts_errors::OK && f.committed_amount == 0
        )));
    }

    #[tokio::test]
    async fn commits_and_moves_funds_both_sides() {
        let (engine, store, transfer_id) = prepared_setup().await;
        let msg = finalize_msg(transfer_id, 40, datetime!(2026-07-02 1:00 UTC));
        engine.handle_finalize_transfer(&msg).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let sender = tx.load_account(AccountKey::new(1, 2)).await.unwrap().unwrap();
        let recipient = tx.load_account(AccountKey::new(1, 3)).await.unwrap().unwrap();
        assert_eq!(sender.principal, 60);
        assert_eq!(recipient.principal, 40);
        assert_eq!(sender.total_locked_amount, 0);

        let outbox = store.drain_outbox().await;
        let transfers: Vec<_> = outbox
            .iter()
            .filter_map(|m| match m {
                accounts_messages::OutgoingMessage::AccountTransfer(t) => Some(t),
                _ => None,
            })
            .collect();
        assert_eq!(transfers.len(), 2);
        assert!(transfers.iter().any(|t| t.amount == -40 && t.creditor_id == 2));
        assert!(transfers.iter().any(|t| t.amount == 40 && t.creditor_id == 3));
    }

    #[tokio::test]
    async fn redelivered_finalize_is_a_no_op() {
        let (engine, store, transfer_id) = prepared_setup().await;
        let msg = finalize_msg(transfer_id, 40, datetime!(2026-07-02 1:00 UTC));
        engine.handle_finalize_transfer(&msg).await.unwrap();
        store.drain_outbox().await;

        engine.handle_finalize_transfer(&msg).await.unwrap();
        let outbox = store.drain_outbox().await;
        assert!(outbox.is_empty(), "redelivered finalize must be a no-op: {outbox:?}");

        let mut tx = store.begin().await.unwrap();
        let sender = tx.load_account(AccountKey::new(1, 2)).await.unwrap().unwrap();
        let recipient = tx.load_account(AccountKey::new(1, 3)).await.unwrap().unwrap();
        assert_eq!(sender.principal, 60);
        assert_eq!(recipient.principal, 40);
    }

    #[tokio::test]
    async fn demurrage_squeeze_rejects_commit() {
        // Scenario 6: by the time the coordinator finalizes, the sender's
        // actual balance has been drawn down elsewhere to nothing, so even
        // though the lock reserved 100 units the commit must clamp to zero
        // rather than push the account negative.
        let store = InMemoryStore::new();
        let engine = LedgerEngine::new(Arc::new(store.clone()), Arc::new(AlwaysReachableFetch), Policy::default());
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
        account.interest_rate = -50.0;
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
                max_locked_amount: 100,
                recipient: AccountKey::new(1, 3).to_identity(),
                min_interest_rate: -100.0,
                min_account_balance: 0,
                max_commit_delay: 365 * 86_400_000,
                ts: datetime!(2026-01-01 0:00 UTC),
            })
            .await
            .unwrap();
        store.drain_outbox().await;

        let mut tx = store.begin().await.unwrap();
        let mut account = tx.load_account(AccountKey::new(1, 2)).await.unwrap().unwrap();
        account.principal = 0;
        account.interest = 0.0;
        tx.save_account(&account).await.unwrap();
        tx.commit().await.unwrap();

        let msg = finalize_msg(1, 100, datetime!(2026-01-01 0:00 UTC) + time::Duration::days(180));
        engine.handle_finalize_transfer(&msg).await.unwrap();

        let outbox = store.drain_outbox().await;
        let finalized = outbox
            .iter()
            .find_map(|m| match m {
                accounts_messages::OutgoingMessage::FinalizedTransfer(f) => Some(f),
                _ => None,
            })
            .unwrap();
        assert_eq!(finalized.committed_amount, 0);
        assert_ne!(finalized.status_code, accounts_errors::OK);
    }
}
