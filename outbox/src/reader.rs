use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use accounts_messages::OutgoingMessage;

use crate::error::SinkError;

/// One row pulled off an outbox queue, still carrying its primary key so
/// the flusher can delete exactly the rows it published.
pub struct OutboxRow {
    pub id: i64,
    pub message: OutgoingMessage,
}

/// The flusher's view of the outbox tables: pool-level batch read and
/// delete-on-ack, distinct from the per-handler
/// `accounts_store::Transaction::enqueue_outgoing` write path. Kept as a
/// trait so the flusher can be exercised against a fake in tests without
/// a live Postgres instance.
#[async_trait]
pub trait OutboxReader: Send + Sync {
    async fn fetch_batch(&self, queue: &str, limit: i64) -> Result<Vec<OutboxRow>, SinkError>;

    async fn ack(&self, queue: &str, ids: &[i64]) -> Result<(), SinkError>;
}

pub struct PgOutboxReader {
    pool: PgPool,
}

impl PgOutboxReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct Row {
    id: i64,
    payload: serde_json::Value,
}

#[async_trait]
impl OutboxReader for PgOutboxReader {
    async fn fetch_batch(&self, queue: &str, limit: i64) -> Result<Vec<OutboxRow>, SinkError> {
        let rows = sqlx::query_as::<_, Row>(
            "SELECT id, payload FROM outbox WHERE queue = $1 ORDER BY id LIMIT $2",
        )
        .bind(queue)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let message: OutgoingMessage = serde_json::from_value(row.payload)?;
                Ok(OutboxRow { id: row.id, message })
            })
            .collect()
    }

    async fn ack(&self, queue: &str, ids: &[i64]) -> Result<(), SinkError> {
        if ids.is_empty() {
            return Ok(());
        }
        sqlx::query("DELETE FROM outbox WHERE queue = $1 AND id = ANY($2)")
            .bind(queue)
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
