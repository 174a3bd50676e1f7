use std::sync::Arc;

use accounts_fetch::FetchClient;
use accounts_store::{Store, StoreError};
use backoff::future::retry;

use accounts_chronometer::retry::bounded_backoff;

use crate::policy::Policy;

/// Owns the collaborators every handler and scanner needs: the store, the
/// fetch client, and the debtor policy. Constructed once at startup and
/// handed to the broker consumer loop and the scanner scheduler.
pub struct LedgerEngine<S, F> {
    pub(crate) store: Arc<S>,
    pub(crate) fetch: Arc<F>,
    pub(crate) policy: Policy,
}

impl<S, F> LedgerEngine<S, F>
where
    S: Store + 'static,
    F: FetchClient + 'static,
{
    pub fn new(store: Arc<S>, fetch: Arc<F>, policy: Policy) -> Self {
        Self { store, fetch, policy }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Runs `body` inside one serializable store transaction, retrying on
    /// [`StoreError::SerializationConflict`] with the shared bounded
    /// backoff policy before giving up.
    ///
    /// `body` returns `Ok(R)` to commit or `Err(StoreError)` to roll back;
    /// only `SerializationConflict` is retried, everything else propagates
    /// immediately.
    pub(crate) async fn run_transaction<R, Fut>(
        &self,
        mut body: impl FnMut(Box<dyn accounts_store::Transaction>) -> Fut,
    ) -> Result<R, StoreError>
    where
        Fut: std::future::Future<Output = Result<(R, Box<dyn accounts_store::Transaction>), StoreError>>,
    {
        retry(bounded_backoff(), || async {
            let tx = self.store.begin().await.map_err(backoff::Error::permanent)?;
            match body(tx).await {
                Ok((result, tx)) => match tx.commit().await {
                    Ok(()) => Ok(result),
                    Err(error) if error.is_retryable() => Err(backoff::Error::transient(error)),
                    Err(error) => Err(backoff::Error::permanent(error)),
                },
                Err(error) if error.is_retryable() => Err(backoff::Error::transient(error)),
                Err(error) => Err(backoff::Error::permanent(error)),
            }
        })
        .await
        .map_err(|e| match e {
            backoff::Error::Permanent(inner) => inner,
            backoff::Error::Transient { err, .. } => err,
        })
    }
}
