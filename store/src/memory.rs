use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use tokio::sync::{Mutex, OwnedMutexGuard};

use accounts_messages::OutgoingMessage;
use accounts_types::{Account, AccountKey, ChangeId, PreparedTransfer, RegisteredBalanceChange, TransferId};

use crate::error::StoreError;
use crate::transaction::{Store, Transaction};

#[derive(Default, Clone)]
struct State {
    accounts: BTreeMap<(i64, i64), Account>,
    prepared_transfers: BTreeMap<(i64, i64, i64), PreparedTransfer>,
    registered_balance_changes: BTreeMap<(i64, i64, String), Date>,
    outbox: Vec<OutgoingMessage>,
    next_transfer_id: BTreeMap<(i64, i64), i64>,
}

/// Test double for `Store`, backing the `accounts-ledger` integration
/// tests. A single mutex around the whole state plays the role of
/// serializable isolation: only one transaction is ever open at a time,
/// which is stronger than the production guarantee but never weaker, so
/// tests written against it stay valid against `PgStore`.
#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<Mutex<State>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Drains every message enqueued so far, across all committed
    /// transactions. Used by tests to assert on what would have been
    /// published to the broker.
    pub async fn drain_outbox(&self) -> Vec<OutgoingMessage> {
        let mut guard = self.inner.lock().await;
        std::mem::take(&mut guard.outbox)
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError> {
        let guard = self.inner.clone().lock_owned().await;
        let snapshot = guard.clone();
        Ok(Box::new(MemTransaction {
            guard,
            state: snapshot,
        }))
    }
}

struct MemTransaction {
    guard: OwnedMutexGuard<State>,
    state: State,
}

#[async_trait]
impl Transaction for MemTransaction {
    async fn load_account(&mut self, key: AccountKey) -> Result<Option<Account>, StoreError> {
        Ok(self.state.accounts.get(&(key.debtor_id, key.creditor_id)).cloned())
    }

    async fn save_account(&mut self, account: &Account) -> Result<(), StoreError> {
        self.state
            .accounts
            .insert((account.key.debtor_id, account.key.creditor_id), account.clone());
        Ok(())
    }

    async fn delete_account(&mut self, key: AccountKey) -> Result<(), StoreError> {
        self.state.accounts.remove(&(key.debtor_id, key.creditor_id));
        Ok(())
    }

    async fn scan_accounts(
        &mut self,
        after: Option<AccountKey>,
        limit: i64,
    ) -> Result<Vec<Account>, StoreError> {
        let after = after.map(|k| (k.debtor_id, k.creditor_id));
        Ok(self
            .state
            .accounts
            .iter()
            .filter(|(k, _)| after.map(|a| **k > a).unwrap_or(true))
            .take(limit.max(0) as usize)
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn load_prepared_transfer(
        &mut self,
        sender: AccountKey,
        transfer_id: TransferId,
    ) -> Result<Option<PreparedTransfer>, StoreError> {
        Ok(self
            .state
            .prepared_transfers
            .get(&(sender.debtor_id, sender.creditor_id, transfer_id.0))
            .cloned())
    }

    async fn save_prepared_transfer(&mut self, transfer: &PreparedTransfer) -> Result<(), StoreError> {
        self.state.prepared_transfers.insert(
            (
                transfer.sender.debtor_id,
                transfer.sender.creditor_id,
                transfer.transfer_id.0,
            ),
            transfer.clone(),
        );
        Ok(())
    }

    async fn delete_prepared_transfer(
        &mut self,
        sender: AccountKey,
        transfer_id: TransferId,
    ) -> Result<(), StoreError> {
        self.state
            .prepared_transfers
            .remove(&(sender.debtor_id, sender.creditor_id, transfer_id.0));
        Ok(())
    }

    async fn next_transfer_id(&mut self, sender: AccountKey) -> Result<TransferId, StoreError> {
        let key = (sender.debtor_id, sender.creditor_id);
        let next = self.state.next_transfer_id.entry(key).or_insert(0);
        *next += 1;
        Ok(TransferId(*next))
    }

    async fn scan_prepared_transfers_older_than(
        &mut self,
        cutoff: OffsetDateTime,
        after: Option<(AccountKey, TransferId)>,
        limit: i64,
    ) -> Result<Vec<PreparedTransfer>, StoreError> {
        let after = after.map(|(k, t)| (k.debtor_id, k.creditor_id, t.0));
        Ok(self
            .state
            .prepared_transfers
            .iter()
            .filter(|(k, v)| v.prepared_at < cutoff && after.map(|a| **k > a).unwrap_or(true))
            .take(limit.max(0) as usize)
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn balance_change_applied(
        &mut self,
        debtor_id: i64,
        other_creditor_id: i64,
        change_id: &ChangeId,
    ) -> Result<bool, StoreError> {
        Ok(self
            .state
            .registered_balance_changes
            .contains_key(&(debtor_id, other_creditor_id, change_id.0.clone())))
    }

    async fn register_balance_change(&mut self, change: &RegisteredBalanceChange) -> Result<(), StoreError> {
        self.state.registered_balance_changes.insert(
            (change.debtor_id, change.other_creditor_id, change.change_id.0.clone()),
            change.applied_at,
        );
        Ok(())
    }

    async fn delete_registered_balance_changes_before(
        &mut self,
        cutoff: Date,
        limit: i64,
    ) -> Result<u64, StoreError> {
        let victims: Vec<_> = self
            .state
            .registered_balance_changes
            .iter()
            .filter(|(_, applied_at)| **applied_at < cutoff)
            .take(limit.max(0) as usize)
            .map(|(k, _)| k.clone())
            .collect();
        let count = victims.len() as u64;
        for key in victims {
            self.state.registered_balance_changes.remove(&key);
        }
        Ok(count)
    }

    async fn enqueue_outgoing(&mut self, message: &OutgoingMessage) -> Result<(), StoreError> {
        self.state.outbox.push(message.clone());
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        *self.guard = std::mem::take(&mut self.state);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
