use std::sync::Arc;
use std::time::Duration;

use accounts_chronometer::retry::bounded_backoff;
use accounts_messages::OutgoingMessage;
use backoff::future::retry;

use crate::error::SinkError;
use crate::reader::OutboxReader;
use crate::sink::BrokerSink;

/// The seven outbox queues, one per `OutgoingMessage` variant.
pub const QUEUES: [&str; 7] = [
    "rejected_config",
    "rejected_transfer",
    "prepared_transfer",
    "finalized_transfer",
    "account_update",
    "account_purge",
    "account_transfer",
];

#[derive(Debug, Clone)]
pub struct FlusherConfig {
    pub batch_size: i64,
    pub poll_interval: Duration,
}

impl Default for FlusherConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            poll_interval: Duration::from_millis(200),
        }
    }
}

/// Drains each outbox queue in insertion order and publishes to the
/// broker, deleting a row only once its publish is confirmed. One
/// `Flusher` runs one worker per queue.
pub struct Flusher<R, B> {
    reader: Arc<R>,
    sink: Arc<B>,
    config: FlusherConfig,
}

impl<R, B> Flusher<R, B>
where
    R: OutboxReader + 'static,
    B: BrokerSink + 'static,
{
    pub fn new(reader: Arc<R>, sink: Arc<B>, config: FlusherConfig) -> Self {
        Self { reader, sink, config }
    }

    /// Runs forever, spawning one polling task per queue. Each task keeps
    /// retrying a failed publish with bounded backoff before moving on to
    /// the next poll tick rather than blocking the whole queue on one
    /// poisoned message's worst case.
    pub async fn run(self) {
        let mut handles = Vec::with_capacity(QUEUES.len());
        for queue in QUEUES {
            let reader = self.reader.clone();
            let sink = self.sink.clone();
            let config = self.config.clone();
            handles.push(tokio::spawn(async move {
                Self::run_queue(queue, reader, sink, config).await;
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }
    }

    async fn run_queue(queue: &'static str, reader: Arc<R>, sink: Arc<B>, config: FlusherConfig) {
        loop {
            match Self::flush_once(queue, &reader, &sink, config.batch_size).await {
                Ok(0) => tokio::time::sleep(config.poll_interval).await,
                Ok(_) => {}
                Err(error) => {
                    tracing::warn!(queue, %error, "outbox flush failed, backing off");
                    tokio::time::sleep(config.poll_interval).await;
                }
            }
        }
    }

    /// Publishes and acks one batch; returns how many rows were flushed.
    async fn flush_once(
        queue: &str,
        reader: &R,
        sink: &B,
        batch_size: i64,
    ) -> Result<usize, SinkError> {
        let batch = reader.fetch_batch(queue, batch_size).await?;
        if batch.is_empty() {
            return Ok(0);
        }

        let mut flushed = Vec::with_capacity(batch.len());
        for row in &batch {
            let published = publish_with_retry(sink, &row.message).await;
            match published {
                Ok(()) => flushed.push(row.id),
                Err(error) => {
                    tracing::warn!(queue, id = row.id, %error, "giving up on this row for now");
                }
            }
        }

        reader.ack(queue, &flushed).await?;
        Ok(flushed.len())
    }
}

async fn publish_with_retry<B: BrokerSink>(sink: &B, message: &OutgoingMessage) -> Result<(), SinkError> {
    let payload = serde_json::to_vec(message).map_err(SinkError::Decode)?;
    let exchange = message.exchange_name();
    let routing_key = message.routing_key();

    retry(bounded_backoff(), || async {
        sink.publish(exchange, &routing_key, &payload)
            .await
            .map_err(|error| {
                if error.is_retryable() {
                    backoff::Error::transient(error)
                } else {
                    backoff::Error::permanent(error)
                }
            })
    })
    .await
    .map_err(|e| match e {
        backoff::Error::Permanent(inner) => inner,
        backoff::Error::Transient { err, .. } => err,
    })
}
