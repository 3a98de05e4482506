//! Persistence of decoded purchases packages.
//!
//! # Data Flow
//! ```text
//! purchases processor / admin API
//!     → PurchaseStore trait (types.rs)
//!     → postgres.rs (deadpool + tokio-postgres) or memory.rs (DashMap)
//! ```
//!
//! # Design Decisions
//! - One record per unique content digest, enforced by the store itself
//! - The store is built once at startup and shared as `Arc<dyn PurchaseStore>`

pub mod memory;
pub mod postgres;
pub mod types;

use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use types::{
    ListQuery, NewPurchase, PurchaseRecord, PurchaseStore, PurchaseSummary, PurchaseUpdate,
    StoreError, StoreResult,
};

/// Build the configured store, preparing the schema where there is one.
pub async fn open_store(config: &StorageConfig) -> StoreResult<Arc<dyn PurchaseStore>> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; records are lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Postgres => {
            let store = PostgresStore::new(config)?;
            store.ping().await?;
            store.ensure_schema().await?;
            if let Err(e) = store.backfill_digests().await {
                tracing::error!(error = %e, "Digest backfill failed; continuing");
            }
            Ok(Arc::new(store))
        }
    }
}
