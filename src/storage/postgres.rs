//! PostgreSQL-backed store.
//!
//! # Responsibilities
//! - Pooled connections to the `purchases_data` table
//! - Schema bootstrap, including the unique index on `content_hash`
//! - Backfill of digests for rows written before deduplication existed
//!
//! # Design Decisions
//! - Deduplication races are settled by the unique index; a unique
//!   violation on insert surfaces as [`StoreError::Duplicate`]
//! - Legacy `timestamp` columns hold naive UTC; bootstrap converts them to
//!   `timestamptz` reading the stored values as UTC

use async_trait::async_trait;
use std::time::Duration;

use deadpool_postgres::{
    Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime, Timeouts,
};
use tokio_postgres::{NoTls, Row};
use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::purchases::fingerprint::ContentDigest;
use crate::storage::types::{
    ListQuery, NewPurchase, PurchaseRecord, PurchaseStore, PurchaseSummary, PurchaseUpdate,
    StoreError, StoreResult,
};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS purchases_data (
        id SERIAL PRIMARY KEY,
        xml_content TEXT NOT NULL,
        version VARCHAR(50),
        purchases_count INTEGER,
        content_hash VARCHAR(64),
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    );
    ALTER TABLE purchases_data ADD COLUMN IF NOT EXISTS content_hash VARCHAR(64);
    CREATE UNIQUE INDEX IF NOT EXISTS ix_purchases_data_content_hash
        ON purchases_data (content_hash);
    DO $$
    BEGIN
        IF EXISTS (
            SELECT 1 FROM information_schema.columns
            WHERE table_name = 'purchases_data'
              AND column_name = 'created_at'
              AND data_type = 'timestamp without time zone'
        ) THEN
            ALTER TABLE purchases_data
                ALTER COLUMN created_at TYPE TIMESTAMPTZ
                USING created_at AT TIME ZONE 'UTC';
        END IF;
    END
    $$;
";

/// Legacy rows may lack a digest; it is derived on read until backfilled.
const RECORD_COLUMNS: &str = "id, xml_content, version, purchases_count, \
    COALESCE(content_hash, encode(sha256(convert_to(xml_content, 'UTF8')), 'hex')) AS content_hash, \
    created_at";

const SUMMARY_COLUMNS: &str = "id, version, purchases_count, \
    COALESCE(content_hash, encode(sha256(convert_to(xml_content, 'UTF8')), 'hex')) AS content_hash, \
    created_at";

/// PostgreSQL error code for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

/// Purchases store over a deadpool connection pool.
#[derive(Clone)]
pub struct PostgresStore {
    pool: Pool,
}

impl PostgresStore {
    /// Build the pool. Connections are opened lazily; waiting for or opening
    /// one fails after `connect_timeout_secs` with a backend error.
    pub fn new(config: &StorageConfig) -> StoreResult<Self> {
        let mut cfg = Config::new();
        cfg.url = Some(config.url.clone());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let wait = Some(Duration::from_secs(config.connect_timeout_secs));
        let mut pool_cfg = PoolConfig::new(config.max_pool_size);
        pool_cfg.timeouts = Timeouts {
            wait,
            create: wait,
            recycle: wait,
        };
        cfg.pool = Some(pool_cfg);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(backend)?;

        Ok(Self { pool })
    }

    async fn connection(&self) -> StoreResult<deadpool_postgres::Client> {
        self.pool.get().await.map_err(backend)
    }

    /// Verify connectivity.
    pub async fn ping(&self) -> StoreResult<()> {
        let conn = self.connection().await?;
        conn.execute("SELECT 1", &[]).await.map_err(backend)?;
        debug!("PostgreSQL connection successful");
        Ok(())
    }

    /// Create the table and dedup index if missing.
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        let conn = self.connection().await?;
        conn.batch_execute(SCHEMA).await.map_err(backend)?;
        info!("purchases_data schema ready");
        Ok(())
    }

    /// Compute `content_hash` for rows that lack one. Returns how many rows
    /// were filled in. Rows whose content duplicates an existing digest are
    /// left empty and logged.
    pub async fn backfill_digests(&self) -> StoreResult<u64> {
        let conn = self.connection().await?;
        let rows = conn
            .query(
                "SELECT id, xml_content FROM purchases_data WHERE content_hash IS NULL",
                &[],
            )
            .await
            .map_err(backend)?;

        if rows.is_empty() {
            debug!("No records need digest backfill");
            return Ok(0);
        }

        info!(records = rows.len(), "Backfilling content digests");
        let mut filled = 0;
        for row in rows {
            let id: i32 = row.get("id");
            let content: String = row.get("xml_content");
            let digest = ContentDigest::of(&content);

            match conn
                .execute(
                    "UPDATE purchases_data SET content_hash = $2 WHERE id = $1",
                    &[&id, &digest.as_str()],
                )
                .await
            {
                Ok(n) => filled += n,
                Err(e) if is_unique_violation(&e) => {
                    warn!(id, hash = %digest.short(), "Legacy record duplicates existing content; digest left empty");
                }
                Err(e) => return Err(backend(e)),
            }
        }

        info!(filled, "Digest backfill complete");
        Ok(filled)
    }
}

#[async_trait]
impl PurchaseStore for PostgresStore {
    async fn find_by_digest(&self, digest: &ContentDigest) -> StoreResult<Option<PurchaseRecord>> {
        let conn = self.connection().await?;
        let row = conn
            .query_opt(
                &format!("SELECT {RECORD_COLUMNS} FROM purchases_data WHERE content_hash = $1"),
                &[&digest.as_str()],
            )
            .await
            .map_err(backend)?;

        Ok(row.as_ref().map(record_from_row))
    }

    async fn insert(&self, purchase: NewPurchase) -> StoreResult<PurchaseRecord> {
        let conn = self.connection().await?;
        let result = conn
            .query_one(
                &format!(
                    "INSERT INTO purchases_data (xml_content, version, purchases_count, content_hash, created_at)
                     VALUES ($1, $2, $3, $4, now())
                     RETURNING {RECORD_COLUMNS}"
                ),
                &[
                    &purchase.xml_content,
                    &purchase.version,
                    &purchase.purchases_count,
                    &purchase.content_hash.as_str(),
                ],
            )
            .await;

        match result {
            Ok(row) => {
                let record = record_from_row(&row);
                debug!(id = record.id, hash = %record.content_hash.short(), "Inserted purchases record");
                Ok(record)
            }
            Err(e) if is_unique_violation(&e) => Err(StoreError::Duplicate(purchase.content_hash)),
            Err(e) => Err(backend(e)),
        }
    }

    async fn get(&self, id: i32) -> StoreResult<Option<PurchaseRecord>> {
        let conn = self.connection().await?;
        let row = conn
            .query_opt(
                &format!("SELECT {RECORD_COLUMNS} FROM purchases_data WHERE id = $1"),
                &[&id],
            )
            .await
            .map_err(backend)?;

        Ok(row.as_ref().map(record_from_row))
    }

    async fn list(&self, query: &ListQuery) -> StoreResult<Vec<PurchaseSummary>> {
        let (limit, offset) = query.bounds();
        let conn = self.connection().await?;
        let rows = conn
            .query(
                &format!(
                    "SELECT {SUMMARY_COLUMNS} FROM purchases_data
                     WHERE ($1::text IS NULL OR strpos(xml_content, $1) > 0)
                     ORDER BY created_at DESC, id DESC
                     LIMIT $2 OFFSET $3"
                ),
                &[&query.q, &limit, &offset],
            )
            .await
            .map_err(backend)?;

        Ok(rows.iter().map(summary_from_row).collect())
    }

    async fn count(&self) -> StoreResult<i64> {
        let conn = self.connection().await?;
        let row = conn
            .query_one("SELECT COUNT(*) FROM purchases_data", &[])
            .await
            .map_err(backend)?;
        Ok(row.get(0))
    }

    async fn update(&self, id: i32, update: PurchaseUpdate) -> StoreResult<PurchaseRecord> {
        let digest = ContentDigest::of(&update.xml_content);
        let conn = self.connection().await?;
        let result = conn
            .query_opt(
                &format!(
                    "UPDATE purchases_data
                     SET xml_content = $2, version = $3, purchases_count = $4, content_hash = $5
                     WHERE id = $1
                     RETURNING {RECORD_COLUMNS}"
                ),
                &[
                    &id,
                    &update.xml_content,
                    &update.version,
                    &update.purchases_count,
                    &digest.as_str(),
                ],
            )
            .await;

        match result {
            Ok(Some(row)) => Ok(record_from_row(&row)),
            Ok(None) => Err(StoreError::NotFound(id)),
            Err(e) if is_unique_violation(&e) => Err(StoreError::Duplicate(digest)),
            Err(e) => Err(backend(e)),
        }
    }

    async fn delete(&self, id: i32) -> StoreResult<()> {
        let conn = self.connection().await?;
        let deleted = conn
            .execute("DELETE FROM purchases_data WHERE id = $1", &[&id])
            .await
            .map_err(backend)?;

        if deleted == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

fn record_from_row(row: &Row) -> PurchaseRecord {
    PurchaseRecord {
        id: row.get("id"),
        xml_content: row.get("xml_content"),
        version: row.get("version"),
        purchases_count: row.get("purchases_count"),
        content_hash: ContentDigest::from_hex(row.get::<_, String>("content_hash")),
        created_at: row.get("created_at"),
    }
}

fn summary_from_row(row: &Row) -> PurchaseSummary {
    PurchaseSummary {
        id: row.get("id"),
        version: row.get("version"),
        purchases_count: row.get("purchases_count"),
        content_hash: ContentDigest::from_hex(row.get::<_, String>("content_hash")),
        created_at: row.get("created_at"),
    }
}

fn is_unique_violation(e: &tokio_postgres::Error) -> bool {
    e.as_db_error()
        .is_some_and(|db_err| db_err.code().code() == UNIQUE_VIOLATION)
}

fn backend(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}
