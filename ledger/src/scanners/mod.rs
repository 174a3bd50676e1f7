//! The periodic batch jobs: everything that isn't triggered
//! by an incoming message. Each scanner walks its table with cursor
//! pagination, one page per store transaction, so a table far larger than
//! memory is still safe to sweep.
//!
//! Kept as one function per scanner rather than a trait, mirroring the
//! handlers in [`crate::handlers`]: there's a fixed, small set of these and
//! no caller ever needs to treat them polymorphically.

//! One module per periodic job, each adding an inherent method to
//! [`crate::engine::LedgerEngine`] (`scan_accounts`, `scan_prepared_transfers`,
//! `scan_registered_balance_changes`, `scan_purge`) in the same style as
//! [`crate::handlers`].

mod account;
mod prepared_transfer;
mod purge;
mod registered_balance_change;
