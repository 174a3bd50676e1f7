//! Transactional key-value façade over three logical tables (Accounts,
//! PreparedTransfers, RegisteredBalanceChanges)
//! plus the outbox write path, since every outgoing message is enqueued
//! inside the very transaction that decided to send it.
//!
//! This crate specifies the façade and one production backend (`postgres`,
//! via `sqlx`) plus one in-memory test double (`memory`). The relational
//! engine underneath is out of scope beyond the invariants it
//! must preserve: serializable isolation, and atomic commit of a state
//! change together with its outbox rows.

mod error;
mod memory;
mod postgres;
mod transaction;

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use postgres::PgStore;
pub use transaction::{Store, Transaction};
