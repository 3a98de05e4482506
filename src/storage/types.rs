//! Record types and the store contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::purchases::fingerprint::ContentDigest;

/// A stored purchases package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub id: i32,
    /// Decoded document text.
    pub xml_content: String,
    pub version: Option<String>,
    /// Root `count` attribute, when the document had one.
    pub purchases_count: Option<i32>,
    pub content_hash: ContentDigest,
    pub created_at: DateTime<Utc>,
}

/// Listing row; omits the document body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseSummary {
    pub id: i32,
    pub purchases_count: Option<i32>,
    pub version: Option<String>,
    pub content_hash: ContentDigest,
    pub created_at: DateTime<Utc>,
}

impl From<&PurchaseRecord> for PurchaseSummary {
    fn from(record: &PurchaseRecord) -> Self {
        Self {
            id: record.id,
            purchases_count: record.purchases_count,
            version: record.version.clone(),
            content_hash: record.content_hash.clone(),
            created_at: record.created_at,
        }
    }
}

/// Input for a new record.
#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub xml_content: String,
    pub version: Option<String>,
    pub purchases_count: Option<i32>,
    pub content_hash: ContentDigest,
}

/// Administrative edit, replacing every editable field.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseUpdate {
    pub xml_content: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub purchases_count: Option<i32>,
}

/// Listing parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    /// Substring to search for in the document text.
    pub q: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            q: None,
            limit: 50,
            offset: 0,
        }
    }
}

impl ListQuery {
    /// Limit clamped to 1..=500, offset to >= 0.
    pub fn bounds(&self) -> (i64, i64) {
        (self.limit.clamp(1, 500), self.offset.max(0))
    }
}

/// Errors that can occur in a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with this digest already exists.
    #[error("record with content hash {0} already exists")]
    Duplicate(ContentDigest),

    #[error("record {0} not found")]
    NotFound(i32),

    /// Connection, pool or query failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence of purchases packages.
///
/// Implementations must enforce uniqueness of `content_hash` themselves;
/// callers rely on [`StoreError::Duplicate`] rather than on locking.
#[async_trait]
pub trait PurchaseStore: Send + Sync {
    async fn find_by_digest(&self, digest: &ContentDigest) -> StoreResult<Option<PurchaseRecord>>;

    async fn insert(&self, purchase: NewPurchase) -> StoreResult<PurchaseRecord>;

    async fn get(&self, id: i32) -> StoreResult<Option<PurchaseRecord>>;

    /// Newest first.
    async fn list(&self, query: &ListQuery) -> StoreResult<Vec<PurchaseSummary>>;

    async fn count(&self) -> StoreResult<i64>;

    async fn update(&self, id: i32, update: PurchaseUpdate) -> StoreResult<PurchaseRecord>;

    async fn delete(&self, id: i32) -> StoreResult<()>;
}
