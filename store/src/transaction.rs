use async_trait::async_trait;
use time::{Date, OffsetDateTime};

use accounts_messages::OutgoingMessage;
use accounts_types::{Account, AccountKey, ChangeId, PreparedTransfer, RegisteredBalanceChange, TransferId};

use crate::error::StoreError;

/// Opens serializable transactions against the backing store.
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError>;
}

/// One serializable unit of work: every protocol handler and every scanner
/// batch runs entirely inside one `Transaction`, including the outbox rows
/// it decides to enqueue.
#[async_trait]
pub trait Transaction: Send {
    async fn load_account(&mut self, key: AccountKey) -> Result<Option<Account>, StoreError>;

    async fn save_account(&mut self, account: &Account) -> Result<(), StoreError>;

    async fn delete_account(&mut self, key: AccountKey) -> Result<(), StoreError>;

    /// Cursor-paginated scan over all accounts, ordered by key, for the
    /// periodic scanners.
    async fn scan_accounts(
        &mut self,
        after: Option<AccountKey>,
        limit: i64,
    ) -> Result<Vec<Account>, StoreError>;

    async fn load_prepared_transfer(
        &mut self,
        sender: AccountKey,
        transfer_id: TransferId,
    ) -> Result<Option<PreparedTransfer>, StoreError>;

    async fn save_prepared_transfer(&mut self, transfer: &PreparedTransfer) -> Result<(), StoreError>;

    async fn delete_prepared_transfer(
        &mut self,
        sender: AccountKey,
        transfer_id: TransferId,
    ) -> Result<(), StoreError>;

    /// Allocates the next per-sender transfer_id.
    async fn next_transfer_id(&mut self, sender: AccountKey) -> Result<TransferId, StoreError>;

    async fn scan_prepared_transfers_older_than(
        &mut self,
        cutoff: OffsetDateTime,
        after: Option<(AccountKey, TransferId)>,
        limit: i64,
    ) -> Result<Vec<PreparedTransfer>, StoreError>;

    /// True if a balance change with this id has already been applied.
    async fn balance_change_applied(
        &mut self,
        debtor_id: i64,
        other_creditor_id: i64,
        change_id: &ChangeId,
    ) -> Result<bool, StoreError>;

    async fn register_balance_change(
        &mut self,
        change: &RegisteredBalanceChange,
    ) -> Result<(), StoreError>;

    async fn delete_registered_balance_changes_before(
        &mut self,
        cutoff: Date,
        limit: i64,
    ) -> Result<u64, StoreError>;

    /// Enqueues an outgoing message into its outbox table, to be picked up
    /// by the flusher after this transaction commits.
    async fn enqueue_outgoing(&mut self, message: &OutgoingMessage) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
