//! Shared test doubles for the handler unit tests colocated in this crate.
//! Integration tests under `tests/` define their own copies in
//! `tests/setup/mod.rs` since they can't see crate-private items.

use async_trait::async_trait;

use accounts_fetch::{AccountStatus, FetchClient, FetchError};

pub struct AlwaysReachableFetch;

#[async_trait]
impl FetchClient for AlwaysReachableFetch {
    async fn fetch_account_status(
        &self,
        _debtor_id: i64,
        _recipient_identity: &str,
    ) -> Result<AccountStatus, FetchError> {
        Ok(AccountStatus::Reachable)
    }
}

pub struct NeverReachableFetch;

#[async_trait]
impl FetchClient for NeverReachableFetch {
    async fn fetch_account_status(
        &self,
        _debtor_id: i64,
        _recipient_identity: &str,
    ) -> Result<AccountStatus, FetchError> {
        Ok(AccountStatus::Unreachable)
    }
}
