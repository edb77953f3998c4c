//! Standalone cache-invalidation daemon.
//!
//! Runs the Postgres NOTIFY listener so a deployment without an embedded
//! host process still drops its totals cache when the view refreshes.

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use budget_lines::config::Config;
use budget_lines::listener::run_refresh_listener;
use budget_lines::total_cache::TotalCache;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    info!(
        channel = %config.refresh_channel,
        cache_size = config.total_cache_size,
        "starting budget-lines refresh daemon"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    let cache = Arc::new(TotalCache::new(
        config.total_cache_size,
        config.total_cache_enabled,
    ));

    run_refresh_listener(&pool, &config.refresh_channel, cache).await?;
    Ok(())
}
