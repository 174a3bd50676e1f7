//! Durable outbox: seven typed queues, one per `OutgoingMessage` variant,
//! turning "emit now" into "durably queue, then a separate process ships
//! it." The write side lives on
//! `accounts_store::Transaction::enqueue_outgoing`, committed atomically
//! with the state change that produced the message; this
//! crate owns the read side: the `Flusher` that drains each queue and
//! publishes to the broker.

mod error;
mod flusher;
mod reader;
mod sink;

pub use error::SinkError;
pub use flusher::{Flusher, FlusherConfig};
pub use reader::{OutboxReader, OutboxRow, PgOutboxReader};
pub use sink::{BrokerSink, LapinSink};
