//! Implementations of [`crate::service::CounterService`] that own the data

mod db;
mod memory;

pub use db::DbCounterStore;
pub use memory::MemoryCounterStore;

use crate::config::StorageConfig;
use crate::pool;
use crate::service::CounterService;
use anyhow::Context;
use slog::info;
use std::sync::Arc;

/// Set up the store described by `config`.  For PostgreSQL this connects and
/// creates the counter table if needed.
pub async fn create_store(
    log: &slog::Logger,
    config: &StorageConfig,
) -> anyhow::Result<Arc<dyn CounterService>> {
    match config {
        StorageConfig::Postgres { url, max_connections } => {
            let pool = pool::create_pool(log.clone(), url, *max_connections)
                .await
                .context("setting up database pool")?;
            pool::ensure_schema(log, &pool).await?;
            info!(log, "using PostgreSQL store";
                "max_connections" => *max_connections);
            Ok(Arc::new(DbCounterStore::new(log.clone(), pool)))
        }
        StorageConfig::Memory => {
            info!(log, "using in-memory store");
            Ok(Arc::new(MemoryCounterStore::new(log.clone())))
        }
    }
}
