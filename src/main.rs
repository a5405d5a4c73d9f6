//! Embedding process for the analytics core: loads configuration, wires
//! the store, analyzer, feed, and pipeline, and runs until ctrl-c.
//!
//! The core itself defines no CLI; this binary is the thin driver the
//! dashboard and other consumers sit next to.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use social_stream_analyzer::{Analyzer, Config, EventStore, FeedSource, Pipeline};

/// Compact tracing output; RUST_LOG overrides, DEBUG=true widens the
/// default filter.
fn init_tracing() {
    let debug = std::env::var("DEBUG")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let default = if debug {
        "social_stream_analyzer=debug,info"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = Config::from_env()?;
    let store = EventStore::open(&config.database_path).await?;
    let analyzer = Arc::new(Analyzer::with_sample_trends());
    let feed = Arc::new(FeedSource::new(config.live.clone()));
    let pipeline = Pipeline::new(Arc::clone(&analyzer), store.clone(), Arc::clone(&feed));

    pipeline.start(config.keywords.clone());
    info!(
        mode = ?feed.mode(),
        keywords = ?config.keywords,
        "ingestion running; press ctrl-c to stop"
    );

    tokio::signal::ctrl_c()
        .await
        .context("waiting for ctrl-c")?;

    pipeline.stop().await;
    store.close().await;
    Ok(())
}
