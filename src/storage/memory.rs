//! In-process store.
//!
//! Used by tests and by deployments without a database. Records live only as
//! long as the process.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::purchases::fingerprint::ContentDigest;
use crate::storage::types::{
    ListQuery, NewPurchase, PurchaseRecord, PurchaseStore, PurchaseSummary, PurchaseUpdate,
    StoreError, StoreResult,
};

/// A thread-safe in-memory purchases store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<DashMap<i32, PurchaseRecord>>,
    /// Digest -> record id. Claimed through the entry API so concurrent
    /// inserts of one digest cannot both win.
    digests: Arc<DashMap<ContentDigest, i32>>,
    next_id: Arc<AtomicI32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl PurchaseStore for MemoryStore {
    async fn find_by_digest(&self, digest: &ContentDigest) -> StoreResult<Option<PurchaseRecord>> {
        let id = match self.digests.get(digest) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.records.get(&id).map(|r| r.value().clone()))
    }

    async fn insert(&self, purchase: NewPurchase) -> StoreResult<PurchaseRecord> {
        let record = match self.digests.entry(purchase.content_hash.clone()) {
            Entry::Occupied(_) => return Err(StoreError::Duplicate(purchase.content_hash)),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                let record = PurchaseRecord {
                    id,
                    xml_content: purchase.xml_content,
                    version: purchase.version,
                    purchases_count: purchase.purchases_count,
                    content_hash: purchase.content_hash,
                    created_at: Utc::now(),
                };
                self.records.insert(id, record.clone());
                slot.insert(id);
                record
            }
        };
        Ok(record)
    }

    async fn get(&self, id: i32) -> StoreResult<Option<PurchaseRecord>> {
        Ok(self.records.get(&id).map(|r| r.value().clone()))
    }

    async fn list(&self, query: &ListQuery) -> StoreResult<Vec<PurchaseSummary>> {
        let (limit, offset) = query.bounds();
        let mut matching: Vec<PurchaseSummary> = self
            .records
            .iter()
            .filter(|r| match &query.q {
                Some(q) => r.value().xml_content.contains(q.as_str()),
                None => true,
            })
            .map(|r| PurchaseSummary::from(r.value()))
            .collect();

        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count(&self) -> StoreResult<i64> {
        Ok(self.records.len() as i64)
    }

    async fn update(&self, id: i32, update: PurchaseUpdate) -> StoreResult<PurchaseRecord> {
        let current = self
            .records
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or(StoreError::NotFound(id))?;

        let digest = ContentDigest::of(&update.xml_content);
        if digest != current.content_hash {
            match self.digests.entry(digest.clone()) {
                Entry::Occupied(_) => return Err(StoreError::Duplicate(digest)),
                Entry::Vacant(slot) => {
                    slot.insert(id);
                }
            }
            self.digests.remove(&current.content_hash);
        }

        let updated = PurchaseRecord {
            xml_content: update.xml_content,
            version: update.version,
            purchases_count: update.purchases_count,
            content_hash: digest,
            ..current
        };
        self.records.insert(id, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, id: i32) -> StoreResult<()> {
        let (_, record) = self.records.remove(&id).ok_or(StoreError::NotFound(id))?;
        self.digests.remove(&record.content_hash);
        Ok(())
    }
}
