//! Cache invalidation driven by Postgres notifications.
//!
//! The ETL pipeline refreshes the materialized view and then emits a
//! NOTIFY on the configured channel; every running instance drops its
//! totals cache in response. The loop reconnects transparently through
//! `PgListener`.

use std::sync::Arc;

use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::error::Result;
use crate::total_cache::TotalCache;

/// Listen on `channel` and clear the totals cache on every notification.
/// Runs until the connection is irrecoverably lost; spawn it as a task.
pub async fn run_refresh_listener(
    pool: &PgPool,
    channel: &str,
    cache: Arc<TotalCache>,
) -> Result<()> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(channel).await?;
    info!(channel, "listening for view refresh notifications");

    loop {
        match listener.recv().await {
            Ok(notification) => {
                info!(
                    channel = notification.channel(),
                    "view refreshed, clearing totals cache"
                );
                cache.clear();
            }
            Err(e) => {
                warn!(error = %e, "refresh listener lost its connection");
                return Err(e.into());
            }
        }
    }
}
