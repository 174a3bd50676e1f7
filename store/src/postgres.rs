use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};

use accounts_messages::OutgoingMessage;
use accounts_types::{
    Account, AccountKey, ChangeId, ConfigFlags, CoordinatorType, PreparedTransfer,
    RegisteredBalanceChange, StatusFlags, TransferId,
};

use crate::error::StoreError;
use crate::transaction::{Store, Transaction};

/// Production `Store` backed by a Postgres connection pool.
///
/// Serializable isolation is requested per-transaction (`begin`), matching
/// 's "each message is handled within one serializable store
/// transaction." Retrying on `40001` (`serialization_failure`) is the
/// caller's job (`StoreError::is_retryable`); this type only classifies
/// the error.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;
        Ok(Box::new(PgTransaction { tx }))
    }
}

struct PgTransaction {
    tx: sqlx::Transaction<'static, sqlx::Postgres>,
}

#[derive(FromRow)]
struct AccountRow {
    debtor_id: i64,
    creditor_id: i64,
    creation_date: Date,
    principal: i64,
    interest: f64,
    interest_rate: f64,
    last_change_ts: OffsetDateTime,
    last_change_seqnum: i32,
    last_config_ts: OffsetDateTime,
    last_config_seqnum: i32,
    negligible_amount: f64,
    config_flags: i32,
    status_flags: i32,
    config: String,
    account_id: String,
    total_locked_amount: i64,
    pending_transfers_count: i64,
    last_transfer_number: i64,
    last_transfer_committed_at: Option<OffsetDateTime>,
    last_outgoing_transfer_date: Option<Date>,
    previous_interest_rate: f64,
    last_interest_rate_change_ts: OffsetDateTime,
    last_heartbeat_ts: OffsetDateTime,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            key: AccountKey::new(row.debtor_id, row.creditor_id),
            creation_date: row.creation_date,
            principal: row.principal,
            interest: row.interest,
            interest_rate: row.interest_rate,
            last_change_ts: row.last_change_ts,
            last_change_seqnum: row.last_change_seqnum,
            last_config_ts: row.last_config_ts,
            last_config_seqnum: row.last_config_seqnum,
            negligible_amount: row.negligible_amount,
            config_flags: ConfigFlags::from_bits_truncate(row.config_flags as u32),
            status_flags: StatusFlags::from_bits_truncate(row.status_flags as u32),
            config: row.config,
            account_id: row.account_id,
            total_locked_amount: row.total_locked_amount,
            pending_transfers_count: row.pending_transfers_count,
            last_transfer_number: row.last_transfer_number,
            last_transfer_committed_at: row.last_transfer_committed_at,
            last_outgoing_transfer_date: row.last_outgoing_transfer_date,
            previous_interest_rate: row.previous_interest_rate,
            last_interest_rate_change_ts: row.last_interest_rate_change_ts,
            last_heartbeat_ts: row.last_heartbeat_ts,
        }
    }
}

#[derive(FromRow)]
struct PreparedTransferRow {
    debtor_id: i64,
    creditor_id: i64,
    transfer_id: i64,
    coordinator_type: String,
    coordinator_id: String,
    coordinator_request_id: i64,
    locked_amount: i64,
    recipient: String,
    demurrage_rate: f64,
    deadline: OffsetDateTime,
    min_interest_rate: f64,
    prepared_at: OffsetDateTime,
}

impl TryFrom<PreparedTransferRow> for PreparedTransfer {
    type Error = StoreError;

    fn try_from(row: PreparedTransferRow) -> Result<Self, StoreError> {
        let coordinator_type = CoordinatorType::new(row.coordinator_type)
            .map_err(|e| StoreError::NotFound(e.to_string()))?;
        Ok(PreparedTransfer {
            sender: AccountKey::new(row.debtor_id, row.creditor_id),
            transfer_id: TransferId(row.transfer_id),
            coordinator_type,
            coordinator_id: row.coordinator_id,
            coordinator_request_id: row.coordinator_request_id,
            locked_amount: row.locked_amount,
            recipient: row.recipient,
            demurrage_rate: row.demurrage_rate,
            deadline: row.deadline,
            min_interest_rate: row.min_interest_rate,
            prepared_at: row.prepared_at,
        })
    }
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn load_account(&mut self, key: AccountKey) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT * FROM accounts WHERE debtor_id = $1 AND creditor_id = $2 FOR UPDATE",
        )
        .bind(key.debtor_id)
        .bind(key.creditor_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(Account::from))
    }

    async fn save_account(&mut self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (
                debtor_id, creditor_id, creation_date, principal, interest, interest_rate,
                last_change_ts, last_change_seqnum, last_config_ts, last_config_seqnum,
                negligible_amount, config_flags, status_flags, config, account_id,
                total_locked_amount, pending_transfers_count, last_transfer_number,
                last_transfer_committed_at, last_outgoing_transfer_date,
                previous_interest_rate, last_interest_rate_change_ts, last_heartbeat_ts
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                      $18, $19, $20, $21, $22, $23)
            ON CONFLICT (debtor_id, creditor_id) DO UPDATE SET
                creation_date = EXCLUDED.creation_date,
                principal = EXCLUDED.principal,
                interest = EXCLUDED.interest,
                interest_rate = EXCLUDED.interest_rate,
                last_change_ts = EXCLUDED.last_change_ts,
                last_change_seqnum = EXCLUDED.last_change_seqnum,
                last_config_ts = EXCLUDED.last_config_ts,
                last_config_seqnum = EXCLUDED.last_config_seqnum,
                negligible_amount = EXCLUDED.negligible_amount,
                config_flags = EXCLUDED.config_flags,
                status_flags = EXCLUDED.status_flags,
                config = EXCLUDED.config,
                account_id = EXCLUDED.account_id,
                total_locked_amount = EXCLUDED.total_locked_amount,
                pending_transfers_count = EXCLUDED.pending_transfers_count,
                last_transfer_number = EXCLUDED.last_transfer_number,
                last_transfer_committed_at = EXCLUDED.last_transfer_committed_at,
                last_outgoing_transfer_date = EXCLUDED.last_outgoing_transfer_date,
                previous_interest_rate = EXCLUDED.previous_interest_rate,
                last_interest_rate_change_ts = EXCLUDED.last_interest_rate_change_ts,
                last_heartbeat_ts = EXCLUDED.last_heartbeat_ts
            "#,
        )
        .bind(account.key.debtor_id)
        .bind(account.key.creditor_id)
        .bind(account.creation_date)
        .bind(account.principal)
        .bind(account.interest)
        .bind(account.interest_rate)
        .bind(account.last_change_ts)
        .bind(account.last_change_seqnum)
        .bind(account.last_config_ts)
        .bind(account.last_config_seqnum)
        .bind(account.negligible_amount)
        .bind(account.config_flags.bits() as i32)
        .bind(account.status_flags.bits() as i32)
        .bind(&account.config)
        .bind(&account.account_id)
        .bind(account.total_locked_amount)
        .bind(account.pending_transfers_count)
        .bind(account.last_transfer_number)
        .bind(account.last_transfer_committed_at)
        .bind(account.last_outgoing_transfer_date)
        .bind(account.previous_interest_rate)
        .bind(account.last_interest_rate_change_ts)
        .bind(account.last_heartbeat_ts)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_account(&mut self, key: AccountKey) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM accounts WHERE debtor_id = $1 AND creditor_id = $2")
            .bind(key.debtor_id)
            .bind(key.creditor_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn scan_accounts(
        &mut self,
        after: Option<AccountKey>,
        limit: i64,
    ) -> Result<Vec<Account>, StoreError> {
        let (after_debtor, after_creditor) = after
            .map(|k| (k.debtor_id, k.creditor_id))
            .unwrap_or((i64::MIN, i64::MIN));
        let rows = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT * FROM accounts
            WHERE (debtor_id, creditor_id) > ($1, $2)
            ORDER BY debtor_id, creditor_id
            LIMIT $3
            "#,
        )
        .bind(after_debtor)
        .bind(after_creditor)
        .bind(limit)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows.into_iter().map(Account::from).collect())
    }

    async fn load_prepared_transfer(
        &mut self,
        sender: AccountKey,
        transfer_id: TransferId,
    ) -> Result<Option<PreparedTransfer>, StoreError> {
        let row = sqlx::query_as::<_, PreparedTransferRow>(
            r#"
            SELECT * FROM prepared_transfers
            WHERE debtor_id = $1 AND creditor_id = $2 AND transfer_id = $3
            FOR UPDATE
            "#,
        )
        .bind(sender.debtor_id)
        .bind(sender.creditor_id)
        .bind(transfer_id.0)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(PreparedTransfer::try_from).transpose()
    }

    async fn save_prepared_transfer(&mut self, transfer: &PreparedTransfer) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO prepared_transfers (
                debtor_id, creditor_id, transfer_id, coordinator_type, coordinator_id,
                coordinator_request_id, locked_amount, recipient, demurrage_rate, deadline,
                min_interest_rate, prepared_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(transfer.sender.debtor_id)
        .bind(transfer.sender.creditor_id)
        .bind(transfer.transfer_id.0)
        .bind(transfer.coordinator_type.as_str())
        .bind(&transfer.coordinator_id)
        .bind(transfer.coordinator_request_id)
        .bind(transfer.locked_amount)
        .bind(&transfer.recipient)
        .bind(transfer.demurrage_rate)
        .bind(transfer.deadline)
        .bind(transfer.min_interest_rate)
        .bind(transfer.prepared_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_prepared_transfer(
        &mut self,
        sender: AccountKey,
        transfer_id: TransferId,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "DELETE FROM prepared_transfers WHERE debtor_id = $1 AND creditor_id = $2 AND transfer_id = $3",
        )
        .bind(sender.debtor_id)
        .bind(sender.creditor_id)
        .bind(transfer_id.0)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn next_transfer_id(&mut self, sender: AccountKey) -> Result<TransferId, StoreError> {
        let next: (i64,) = sqlx::query_as(
            r#"
            UPDATE accounts SET last_transfer_number = last_transfer_number
            WHERE debtor_id = $1 AND creditor_id = $2
            RETURNING COALESCE(
                (SELECT MAX(transfer_id) FROM prepared_transfers
                 WHERE debtor_id = $1 AND creditor_id = $2), 0) + 1
            "#,
        )
        .bind(sender.debtor_id)
        .bind(sender.creditor_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(TransferId(next.0))
    }

    async fn scan_prepared_transfers_older_than(
        &mut self,
        cutoff: OffsetDateTime,
        after: Option<(AccountKey, TransferId)>,
        limit: i64,
    ) -> Result<Vec<PreparedTransfer>, StoreError> {
        let (after_debtor, after_creditor, after_transfer) = after
            .map(|(k, t)| (k.debtor_id, k.creditor_id, t.0))
            .unwrap_or((i64::MIN, i64::MIN, i64::MIN));
        let rows = sqlx::query_as::<_, PreparedTransferRow>(
            r#"
            SELECT * FROM prepared_transfers
            WHERE prepared_at < $1 AND (debtor_id, creditor_id, transfer_id) > ($2, $3, $4)
            ORDER BY debtor_id, creditor_id, transfer_id
            LIMIT $5
            "#,
        )
        .bind(cutoff)
        .bind(after_debtor)
        .bind(after_creditor)
        .bind(after_transfer)
        .bind(limit)
        .fetch_all(&mut *self.tx)
        .await?;
        rows.into_iter().map(PreparedTransfer::try_from).collect()
    }

    async fn balance_change_applied(
        &mut self,
        debtor_id: i64,
        other_creditor_id: i64,
        change_id: &ChangeId,
    ) -> Result<bool, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT 1 FROM registered_balance_changes
            WHERE debtor_id = $1 AND other_creditor_id = $2 AND change_id = $3
            "#,
        )
        .bind(debtor_id)
        .bind(other_creditor_id)
        .bind(&change_id.0)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.is_some())
    }

    async fn register_balance_change(&mut self, change: &RegisteredBalanceChange) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO registered_balance_changes (debtor_id, other_creditor_id, change_id, applied_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(change.debtor_id)
        .bind(change.other_creditor_id)
        .bind(&change.change_id.0)
        .bind(change.applied_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_registered_balance_changes_before(
        &mut self,
        cutoff: Date,
        limit: i64,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM registered_balance_changes
            WHERE ctid IN (
                SELECT ctid FROM registered_balance_changes
                WHERE applied_at::date < $1
                LIMIT $2
            )
            "#,
        )
        .bind(cutoff)
        .bind(limit)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn enqueue_outgoing(&mut self, message: &OutgoingMessage) -> Result<(), StoreError> {
        let payload = serde_json::to_value(message)
            .map_err(|e| StoreError::NotFound(format!("unserializable outgoing message: {e}")))?;
        sqlx::query(
            "INSERT INTO outbox (queue, payload, created_at) VALUES ($1, $2, now())",
        )
        .bind(message.queue_name())
        .bind(payload)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("40001") => {
                StoreError::SerializationConflict
            }
            _ => StoreError::Database(e),
        })
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
