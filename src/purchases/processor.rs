//! Decode, deduplicate and persist one purchases package.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::purchases::decoder::{decode_payload, DecodeError};
use crate::purchases::fingerprint::ContentDigest;
use crate::purchases::summary::summarize;
use crate::soap::extract::EnvelopeDescriptor;
use crate::storage::{NewPurchase, PurchaseRecord, PurchaseStore, StoreError};

/// Longest version label the schema stores.
pub const MAX_VERSION_LEN: usize = 50;

/// What happened to a package. Every variant is acknowledged to the client
/// as success; the distinction only matters to logs and metrics.
#[derive(Debug)]
pub enum ProcessOutcome {
    /// New content, persisted.
    Stored(PurchaseRecord),
    /// Content seen before. `existing` is `None` when the duplicate was only
    /// detected by losing an insert race.
    Duplicate {
        digest: ContentDigest,
        existing: Option<PurchaseRecord>,
    },
    /// Request had no `purchases` element.
    MissingPayload,
    DecodeFailed(DecodeError),
    StoreFailed(StoreError),
    /// The request body could not be read (over the size limit or a broken
    /// connection), so there was nothing to process.
    BodyUnreadable,
}

impl ProcessOutcome {
    /// Label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ProcessOutcome::Stored(_) => "stored",
            ProcessOutcome::Duplicate { .. } => "duplicate",
            ProcessOutcome::MissingPayload => "missing_payload",
            ProcessOutcome::DecodeFailed(_) => "decode_failed",
            ProcessOutcome::StoreFailed(_) => "store_failed",
            ProcessOutcome::BodyUnreadable => "body_unreadable",
        }
    }
}

/// Runs the storage half of the SOAP pipeline.
#[derive(Clone)]
pub struct PurchaseProcessor {
    store: Arc<dyn PurchaseStore>,
}

impl PurchaseProcessor {
    pub fn new(store: Arc<dyn PurchaseStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn PurchaseStore> {
        &self.store
    }

    /// Process whatever the extractor found. Never fails; failures are
    /// reported through the outcome and logged here.
    pub async fn process(&self, descriptor: &EnvelopeDescriptor) -> ProcessOutcome {
        let Some(payload) = descriptor.payload.as_deref() else {
            warn!("No purchases data in request, acknowledging anyway");
            return ProcessOutcome::MissingPayload;
        };

        let document = match decode_payload(payload) {
            Ok(document) => document,
            Err(e) => {
                error!(
                    kind = e.kind(),
                    error = %e,
                    payload_len = payload.len(),
                    method = ?descriptor.method,
                    "Payload decode failed"
                );
                return ProcessOutcome::DecodeFailed(e);
            }
        };

        let digest = ContentDigest::of(&document);

        match self.store.find_by_digest(&digest).await {
            Ok(Some(existing)) => {
                warn!(
                    hash = %digest.short(),
                    id = existing.id,
                    created_at = %existing.created_at,
                    "Duplicate package, already processed"
                );
                return ProcessOutcome::Duplicate {
                    digest,
                    existing: Some(existing),
                };
            }
            Ok(None) => {}
            Err(e) => {
                error!(hash = %digest.short(), error = %e, "Duplicate lookup failed");
                return ProcessOutcome::StoreFailed(e);
            }
        }

        let purchase = NewPurchase {
            purchases_count: summarize(&document),
            version: descriptor.version.as_deref().map(clamp_version),
            xml_content: document,
            content_hash: digest.clone(),
        };

        match self.store.insert(purchase).await {
            Ok(record) => {
                info!(
                    id = record.id,
                    hash = %digest.short(),
                    count = ?record.purchases_count,
                    version = ?record.version,
                    "Stored purchases package"
                );
                ProcessOutcome::Stored(record)
            }
            Err(StoreError::Duplicate(_)) => {
                warn!(hash = %digest.short(), "Duplicate package stored concurrently by another request");
                ProcessOutcome::Duplicate {
                    digest,
                    existing: None,
                }
            }
            Err(e) => {
                error!(hash = %digest.short(), error = %e, "Failed to store purchases package");
                ProcessOutcome::StoreFailed(e)
            }
        }
    }
}

fn clamp_version(version: &str) -> String {
    if version.chars().count() > MAX_VERSION_LEN {
        warn!(version, "Version label too long, truncating");
        version.chars().take(MAX_VERSION_LEN).collect()
    } else {
        version.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::soap::method::DEFAULT_NAMESPACE;
    use crate::storage::{
        ListQuery, MemoryStore, PurchaseSummary, PurchaseUpdate, StoreResult,
    };

    fn descriptor(payload: Option<&str>, version: Option<&str>) -> EnvelopeDescriptor {
        let mut d = EnvelopeDescriptor::empty(DEFAULT_NAMESPACE);
        d.payload = payload.map(str::to_string);
        d.version = version.map(str::to_string);
        d
    }

    #[tokio::test]
    async fn test_stores_then_detects_duplicate() {
        let store = MemoryStore::new();
        let processor = PurchaseProcessor::new(Arc::new(store.clone()));
        let d = descriptor(Some("SGVsbG8="), Some("2.1"));

        let first = processor.process(&d).await;
        let ProcessOutcome::Stored(record) = first else {
            panic!("expected stored");
        };
        assert_eq!(record.xml_content, "Hello");
        assert_eq!(record.version.as_deref(), Some("2.1"));
        assert_eq!(record.purchases_count, None);
        assert_eq!(record.content_hash, ContentDigest::of("Hello"));

        let second = processor.process(&d).await;
        assert!(matches!(
            second,
            ProcessOutcome::Duplicate { existing: Some(ref r), .. } if r.id == record.id
        ));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_summarizes_count() {
        let store = MemoryStore::new();
        let processor = PurchaseProcessor::new(Arc::new(store));
        // <purchases count="2"/>
        let outcome = processor
            .process(&descriptor(Some("PHB1cmNoYXNlcyBjb3VudD0iMiIvPg=="), None))
            .await;
        let ProcessOutcome::Stored(record) = outcome else {
            panic!("expected stored");
        };
        assert_eq!(record.purchases_count, Some(2));
    }

    #[tokio::test]
    async fn test_failures_persist_nothing() {
        let store = MemoryStore::new();
        let processor = PurchaseProcessor::new(Arc::new(store.clone()));

        assert_eq!(processor.process(&descriptor(None, None)).await.label(), "missing_payload");
        assert_eq!(processor.process(&descriptor(Some("%%%"), None)).await.label(), "decode_failed");
        assert_eq!(processor.process(&descriptor(Some("//79"), None)).await.label(), "decode_failed");
        assert!(store.is_empty());
        assert_eq!(ProcessOutcome::BodyUnreadable.label(), "body_unreadable");
    }

    #[tokio::test]
    async fn test_long_version_is_truncated() {
        let store = MemoryStore::new();
        let processor = PurchaseProcessor::new(Arc::new(store));
        let long = "v".repeat(80);
        let ProcessOutcome::Stored(record) =
            processor.process(&descriptor(Some("QQ=="), Some(&long))).await
        else {
            panic!("expected stored");
        };
        assert_eq!(record.version.map(|v| v.len()), Some(MAX_VERSION_LEN));
    }

    /// Store that never sees the digest on lookup but rejects the insert,
    /// as happens when a concurrent request wins the race.
    struct RacingStore;

    #[async_trait]
    impl PurchaseStore for RacingStore {
        async fn find_by_digest(&self, _: &ContentDigest) -> StoreResult<Option<PurchaseRecord>> {
            Ok(None)
        }
        async fn insert(&self, purchase: NewPurchase) -> StoreResult<PurchaseRecord> {
            Err(StoreError::Duplicate(purchase.content_hash))
        }
        async fn get(&self, _: i32) -> StoreResult<Option<PurchaseRecord>> {
            Ok(None)
        }
        async fn list(&self, _: &ListQuery) -> StoreResult<Vec<PurchaseSummary>> {
            Ok(Vec::new())
        }
        async fn count(&self) -> StoreResult<i64> {
            Ok(0)
        }
        async fn update(&self, id: i32, _: PurchaseUpdate) -> StoreResult<PurchaseRecord> {
            Err(StoreError::NotFound(id))
        }
        async fn delete(&self, id: i32) -> StoreResult<()> {
            Err(StoreError::NotFound(id))
        }
    }

    #[tokio::test]
    async fn test_lost_insert_race_is_duplicate() {
        let processor = PurchaseProcessor::new(Arc::new(RacingStore));
        let outcome = processor.process(&descriptor(Some("SGVsbG8="), None)).await;
        assert!(matches!(
            outcome,
            ProcessOutcome::Duplicate { existing: None, .. }
        ));
    }
}
