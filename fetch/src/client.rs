use std::time::Duration;

use accounts_chronometer::retry::bounded_backoff;
use async_trait::async_trait;
use backoff::future::retry;
use moka::future::Cache;
use serde::Deserialize;

use crate::error::FetchError;

/// Outcome of a recipient-account lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Reachable,
    Unreachable,
    Unknown,
    ScheduledForDeletion,
}

impl AccountStatus {
    /// Whether `handle_prepare_transfer` should reject on this status.
    pub fn should_reject(self) -> bool {
        !matches!(self, AccountStatus::Reachable)
    }
}

#[async_trait]
pub trait FetchClient: Send + Sync {
    async fn fetch_account_status(
        &self,
        debtor_id: i64,
        recipient_identity: &str,
    ) -> Result<AccountStatus, FetchError>;
}

#[derive(Deserialize)]
struct StatusResponse {
    status: AccountStatus,
}

/// `FetchClient` backed by the external HTTP "fetch API" proxy layer.
/// Retries transport errors with the shared bounded backoff policy; a
/// short-lived cache fronts the HTTP call so a burst of prepares against
/// the same recipient doesn't hammer the peer shard.
pub struct HttpFetchClient {
    http: reqwest::Client,
    base_url: String,
    cache: Cache<(i64, String), AccountStatus>,
}

impl HttpFetchClient {
    pub fn new(base_url: impl Into<String>, cache_ttl: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            cache: Cache::builder().time_to_live(cache_ttl).build(),
        }
    }
}

#[async_trait]
impl FetchClient for HttpFetchClient {
    async fn fetch_account_status(
        &self,
        debtor_id: i64,
        recipient_identity: &str,
    ) -> Result<AccountStatus, FetchError> {
        let cache_key = (debtor_id, recipient_identity.to_owned());
        if let Some(status) = self.cache.get(&cache_key).await {
            return Ok(status);
        }

        let url = format!("{}/{}/accounts/{}", self.base_url, debtor_id, recipient_identity);
        let http = &self.http;

        let status = retry(bounded_backoff(), || async {
            let response = http.get(&url).send().await.map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    backoff::Error::transient(FetchError::Transport(e))
                } else {
                    backoff::Error::permanent(FetchError::Transport(e))
                }
            })?;

            let body: StatusResponse = response
                .json()
                .await
                .map_err(|e| backoff::Error::permanent(FetchError::Transport(e)))?;
            Ok(body.status)
        })
        .await
        .map_err(|e: backoff::Error<FetchError>| match e {
            backoff::Error::Permanent(inner) => inner,
            backoff::Error::Transient { err, .. } => err,
        })?;

        self.cache.insert(cache_key, status).await;
        Ok(status)
    }
}
