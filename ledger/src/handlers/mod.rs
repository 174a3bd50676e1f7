//! One module per inbound message type, each adding an inherent method to
//! [`crate::engine::LedgerEngine`] (`handle_configure_account`,
//! `handle_prepare_transfer`, `handle_finalize_transfer`) rather than
//! exporting free functions: callers go through the engine, never the
//! handler module directly.

mod configure;
mod finalize;
mod prepare;
