//! Entry point for the broker consumer loop: decodes one
//! wire payload, routes it to its handler by `type`, and reports what
//! happened so the caller can decide whether to ack, retry, or park the
//! delivery.
//!
//! A `match` on the decoded enum variant plays the role of the dispatch
//! table; there is no framework registering handlers by name at import
//! time.

use thiserror::Error;

use accounts_fetch::FetchClient;
use accounts_messages::IncomingMessage;
use accounts_store::{Store, StoreError};

use crate::engine::LedgerEngine;

/// What became of one incoming delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler ran to completion inside a committed transaction. Ack
    /// the delivery.
    Handled,
    /// The payload didn't parse as a recognized message. Ack the delivery;
    /// redelivering it would never succeed.
    Dropped,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Decodes `payload` as an [`IncomingMessage`] and routes it to the
/// matching handler. A JSON or schema error is logged and reported as
/// [`DispatchOutcome::Dropped`] rather than propagated, since the broker
/// would only redeliver the same unparseable bytes forever. A store error
/// from inside the handler, meaning retries were already exhausted by
/// [`LedgerEngine::run_transaction`], propagates so the caller can nack
/// and let the broker redeliver.
pub async fn dispatch<S, F>(engine: &LedgerEngine<S, F>, payload: &[u8]) -> Result<DispatchOutcome, DispatchError>
where
    S: Store + 'static,
    F: FetchClient + 'static,
{
    let message: IncomingMessage = match serde_json::from_slice(payload) {
        Ok(message) => message,
        Err(error) => {
            tracing::warn!(%error, "dropping undecodable incoming message");
            return Ok(DispatchOutcome::Dropped);
        }
    };

    match message {
        IncomingMessage::ConfigureAccount(msg) => {
            engine.handle_configure_account(&msg).await?;
        }
        IncomingMessage::PrepareTransfer(msg) => {
            engine.handle_prepare_transfer(&msg).await?;
        }
        IncomingMessage::FinalizeTransfer(msg) => {
            engine.handle_finalize_transfer(&msg).await?;
        }
    }

    Ok(DispatchOutcome::Handled)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use accounts_store::InMemoryStore;

    use crate::policy::Policy;
    use crate::test_support::NeverReachableFetch;

    use super::*;

    fn engine() -> LedgerEngine<InMemoryStore, NeverReachableFetch> {
        LedgerEngine::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(NeverReachableFetch),
            Policy::default(),
        )
    }

    #[tokio::test]
    async fn drops_garbage_payloads() {
        let engine = engine();
        let outcome = dispatch(&engine, b"not json at all").await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Dropped);
    }

    #[tokio::test]
    async fn drops_unrecognized_type_field() {
        let engine = engine();
        let outcome = dispatch(&engine, br#"{"type":"SomethingElse"}"#).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Dropped);
    }

    #[tokio::test]
    async fn routes_configure_account_to_its_handler() {
        let engine = engine();
        let payload = br#"{
            "type": "ConfigureAccount",
            "debtor_id": 1,
            "creditor_id": 2,
            "ts": "2026-07-28T00:00:00Z",
            "seqnum": 0,
            "negligible_amount": 10.0,
            "config_flags": 0,
            "config": ""
        }"#;
        let outcome = dispatch(&engine, payload).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Handled);

        let mut tx = engine.store.begin().await.unwrap();
        let account = tx
            .load_account(accounts_types::AccountKey::new(1, 2))
            .await
            .unwrap();
        assert!(account.is_some());
    }
}
