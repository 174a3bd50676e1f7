//! Core data model of the accounting authority: accounts, prepared-transfer
//! locks, and the idempotence ledger of applied balance changes.
//!
//! These are plain records, pure data, no behavior tied to a store or a
//! message bus. Mutating them is the job of `accounts-ledger`; computing
//! derived quantities that depend on the current time is the job of
//! `accounts-chronometer`. Keeping the two separate means the accrual
//! formula has exactly one implementation regardless of which handler or
//! view needs it.

mod account;
mod coordinator;
mod flags;
mod ids;
mod prepared_transfer;
mod registered_balance_change;

pub use account::Account;
pub use coordinator::{CoordinatorType, CoordinatorTypeError};
pub use flags::{ConfigFlags, StatusFlags};
pub use ids::{AccountKey, ChangeId, TransferId};
pub use prepared_transfer::PreparedTransfer;
pub use registered_balance_change::RegisteredBalanceChange;
