//! Binary entry point: wires a store, a fetch client, the ledger engine,
//! the outbox flusher, and one broker consumer into a single process for
//! one shard of the accounting authority: parse CLI args, load config,
//! init logging, then run the consumer loop, the scanner loop, and the
//! flusher as concurrent tasks.

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions, ExchangeDeclareOptions,
    QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Connection, ConnectionProperties, ExchangeKind};

use accounts_chronometer::inbound_routing_key;
use accounts_fetch::HttpFetchClient;
use accounts_ledger::{dispatch, DispatchOutcome, LedgerEngine};
use accounts_outbox::{Flusher, FlusherConfig, LapinSink, PgOutboxReader};
use accounts_store::PgStore;
use config::Config;

#[derive(Parser, Debug)]
#[command(name = "accounts-server", about = "Accounting authority shard daemon")]
struct Args {
    /// Path to a TOML config file. Without one, every knob
    /// falls back to its built-in default, only useful against a local
    /// broker/database reachable at their own defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error("database connection failed: {0}")]
    Store(#[from] accounts_store::StoreError),
    #[error("broker connection failed: {0}")]
    Broker(#[from] lapin::Error),
    #[error("outbox sink failed: {0}")]
    Sink(#[from] accounts_outbox::SinkError),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;
    init_logging(&config.log_format);

    tracing::info!(
        shard_key_prefix = config.shard_key_prefix,
        shard_key_mask = config.shard_key_mask,
        "starting accounts-server"
    );

    run(config).await?;
    Ok(())
}

async fn run(config: Config) -> Result<(), StartupError> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(accounts_store::StoreError::from)?;

    let store = Arc::new(PgStore::from_pool(pool.clone()));
    let fetch = Arc::new(HttpFetchClient::new(
        config.fetch_base_url.clone(),
        Duration::from_secs(config.fetch_cache_ttl_seconds),
    ));
    let engine = Arc::new(LedgerEngine::new(store, fetch, config.to_policy()));

    let outbox_reader = Arc::new(PgOutboxReader::new(pool));
    let outbox_sink = Arc::new(LapinSink::connect(&config.amqp_url).await?);
    let flusher = Flusher::new(
        outbox_reader,
        outbox_sink,
        FlusherConfig {
            batch_size: config.outbox_batch_size,
            poll_interval: Duration::from_secs(config.outbox_poll_interval_seconds),
        },
    );
    tokio::spawn(flusher.run());

    tokio::spawn(run_scanner_loop(engine.clone(), Duration::from_secs(config.scanner_interval_seconds)));

    run_inbound_consumer(engine, &config).await
}

/// Periodically sweeps all four scanners in turn. A single loop is enough here: each scanner already
/// cursor-paginates internally and the sweep interval is coarse (default
/// one hour), so there is no need for independent per-scanner schedules.
async fn run_scanner_loop<S, F>(engine: Arc<LedgerEngine<S, F>>, interval: Duration)
where
    S: accounts_store::Store + 'static,
    F: accounts_fetch::FetchClient + 'static,
{
    loop {
        tokio::time::sleep(interval).await;

        match engine.scan_accounts().await {
            Ok(visited) => tracing::debug!(visited, "account scan complete"),
            Err(error) => tracing::warn!(%error, "account scan failed"),
        }
        match engine.scan_prepared_transfers().await {
            Ok(sent) => tracing::debug!(sent, "prepared-transfer reminder scan complete"),
            Err(error) => tracing::warn!(%error, "prepared-transfer scan failed"),
        }
        match engine.scan_purge().await {
            Ok(purged) => tracing::debug!(purged, "purge scan complete"),
            Err(error) => tracing::warn!(%error, "purge scan failed"),
        }
        match engine.scan_registered_balance_changes().await {
            Ok(deleted) => tracing::debug!(deleted, "registered balance change GC complete"),
            Err(error) => tracing::warn!(%error, "registered balance change GC failed"),
        }
    }
}

/// Consumes the `accounts_in` exchange on this shard's routing-key prefix
/// and routes every delivery through [`dispatch`].
/// Acks on [`DispatchOutcome::Handled`] or [`DispatchOutcome::Dropped`];
/// nacks with requeue on a propagated store error, since
/// [`LedgerEngine::run_transaction`] only propagates after its own
/// retries are exhausted and the broker is the next line of retry.
async fn run_inbound_consumer<S, F>(
    engine: Arc<LedgerEngine<S, F>>,
    config: &Config,
) -> Result<(), StartupError>
where
    S: accounts_store::Store + 'static,
    F: accounts_fetch::FetchClient + 'static,
{
    let connection = Connection::connect(&config.amqp_url, ConnectionProperties::default()).await?;
    let channel = connection.create_channel().await?;
    channel.basic_qos(config.prefetch as u16, BasicQosOptions::default()).await?;

    channel
        .exchange_declare(
            accounts_constants::exchanges::ACCOUNTS_IN,
            ExchangeKind::Topic,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;

    let queue_name = format!("accounts-server-shard-{:06x}", config.shard_key_prefix);
    channel
        .queue_declare(
            &queue_name,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;
    channel
        .queue_bind(
            &queue_name,
            accounts_constants::exchanges::ACCOUNTS_IN,
            &shard_binding_pattern(config.shard_key_prefix, config.shard_key_mask),
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await?;

    let mut consumer = channel
        .basic_consume(
            &queue_name,
            "accounts-server",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;

    tracing::info!(queue = %queue_name, "inbound consumer ready");

    while let Some(delivery) = consumer.next().await {
        let delivery = match delivery {
            Ok(delivery) => delivery,
            Err(error) => {
                tracing::warn!(%error, "broker delivery error");
                continue;
            }
        };

        match dispatch(&engine, &delivery.data).await {
            Ok(DispatchOutcome::Handled | DispatchOutcome::Dropped) => {
                if let Err(error) = delivery.ack(BasicAckOptions::default()).await {
                    tracing::warn!(%error, "failed to ack delivery");
                }
            }
            Err(error) => {
                tracing::warn!(%error, "dispatch failed, nacking for redelivery");
                if let Err(error) = delivery
                    .nack(BasicNackOptions {
                        requeue: true,
                        ..Default::default()
                    })
                    .await
                {
                    tracing::warn!(%error, "failed to nack delivery");
                }
            }
        }
    }

    Ok(())
}

/// The routing-key binding pattern for a shard owning every `shard_key`
/// whose top `popcount(mask)` bits equal `prefix`'s corresponding bits;
/// `mask == 0` (the single-shard default) binds the wildcard `#`.
fn shard_binding_pattern(prefix: u32, mask: u32) -> String {
    if mask == 0 {
        return "#".to_owned();
    }
    let full_key = inbound_routing_key(0, 0);
    let bit_count = full_key.split('.').count();
    (0..bit_count)
        .map(|i| {
            let shift = bit_count - 1 - i;
            if mask & (1 << shift) != 0 {
                if prefix & (1 << shift) != 0 { "1" } else { "0" }
            } else {
                "*"
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

fn init_logging(format: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
