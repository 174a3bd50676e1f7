//! Fetch client: verifies a recipient account exists and is
//! reachable before `handle_prepare_transfer` locks sender funds. There is
//! exactly one source (the peer shard's HTTP endpoint): a permanently
//! failed fetch rejects the transfer, it never defaults to reachable.

mod client;
mod error;

pub use client::{AccountStatus, FetchClient, HttpFetchClient};
pub use error::FetchError;
