//! libSQL storage layer (offline mode).
//!
//! The [`Storage`] struct wraps a local libSQL database holding the import
//! ledger (which documents and chunks are already in the vector store),
//! import job history, and the answer cache.

mod migrations;

use std::path::Path;

use chrono::Utc;
use execadvisor_shared::{ExecAdvisorError, Language, Result};
use libsql::{Connection, Database, params};
use uuid::Uuid;

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

/// Per-collection ledger totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedgerCounts {
    pub documents: u64,
    pub chunks: u64,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ExecAdvisorError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| ExecAdvisorError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| ExecAdvisorError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` without write access.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| ExecAdvisorError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| ExecAdvisorError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        ExecAdvisorError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 before any migration ran.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            Err(_) => 0,
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(ExecAdvisorError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    async fn exists(&self, sql: &str, collection: &str, id: &str) -> Result<bool> {
        let mut rows = self
            .conn
            .query(sql, params![collection, id])
            .await
            .map_err(|e| ExecAdvisorError::Storage(e.to_string()))?;
        match rows.next().await {
            Ok(row) => Ok(row.is_some()),
            Err(e) => Err(ExecAdvisorError::Storage(e.to_string())),
        }
    }

    // -----------------------------------------------------------------------
    // Import ledger
    // -----------------------------------------------------------------------

    /// Whether a document was already imported into `collection`.
    pub async fn has_document(&self, collection: &str, document_id: &str) -> Result<bool> {
        self.exists(
            "SELECT 1 FROM ledger_documents WHERE collection = ?1 AND document_id = ?2",
            collection,
            document_id,
        )
        .await
    }

    /// Mark a document as imported.
    pub async fn record_document(
        &self,
        collection: &str,
        document_id: &str,
        source: &str,
        chunk_count: usize,
    ) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO ledger_documents (collection, document_id, source, chunk_count, imported_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(collection, document_id) DO UPDATE SET
                   chunk_count = excluded.chunk_count,
                   imported_at = excluded.imported_at",
                params![collection, document_id, source, chunk_count as i64, now.as_str()],
            )
            .await
            .map_err(|e| ExecAdvisorError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Whether a chunk with this id is already in `collection`.
    pub async fn has_chunk(&self, collection: &str, chunk_id: &str) -> Result<bool> {
        self.exists(
            "SELECT 1 FROM ledger_chunks WHERE collection = ?1 AND chunk_id = ?2",
            collection,
            chunk_id,
        )
        .await
    }

    /// Record chunk ids about to be imported for a document.
    pub async fn record_chunks(
        &self,
        collection: &str,
        document_id: &str,
        chunk_ids: &[String],
    ) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        for chunk_id in chunk_ids {
            self.conn
                .execute(
                    "INSERT OR IGNORE INTO ledger_chunks (collection, chunk_id, document_id, imported_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![collection, chunk_id.as_str(), document_id, now.as_str()],
                )
                .await
                .map_err(|e| ExecAdvisorError::Storage(e.to_string()))?;
        }
        Ok(())
    }

    /// Forget chunk ids, e.g. after they failed to import.
    pub async fn remove_chunks(&self, collection: &str, chunk_ids: &[String]) -> Result<()> {
        self.check_writable()?;
        for chunk_id in chunk_ids {
            self.conn
                .execute(
                    "DELETE FROM ledger_chunks WHERE collection = ?1 AND chunk_id = ?2",
                    params![collection, chunk_id.as_str()],
                )
                .await
                .map_err(|e| ExecAdvisorError::Storage(e.to_string()))?;
        }
        Ok(())
    }

    /// Drop every ledger entry for a collection.
    pub async fn clear_ledger(&self, collection: &str) -> Result<()> {
        self.check_writable()?;
        for sql in [
            "DELETE FROM ledger_chunks WHERE collection = ?1",
            "DELETE FROM ledger_documents WHERE collection = ?1",
        ] {
            self.conn
                .execute(sql, params![collection])
                .await
                .map_err(|e| ExecAdvisorError::Storage(e.to_string()))?;
        }
        tracing::info!(collection, "cleared import ledger");
        Ok(())
    }

    /// Number of recorded documents and chunks in a collection.
    pub async fn ledger_counts(&self, collection: &str) -> Result<LedgerCounts> {
        let mut rows = self
            .conn
            .query(
                "SELECT
                   (SELECT COUNT(*) FROM ledger_documents WHERE collection = ?1),
                   (SELECT COUNT(*) FROM ledger_chunks WHERE collection = ?1)",
                params![collection],
            )
            .await
            .map_err(|e| ExecAdvisorError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(LedgerCounts {
                documents: row.get::<i64>(0).unwrap_or(0).max(0) as u64,
                chunks: row.get::<i64>(1).unwrap_or(0).max(0) as u64,
            }),
            Ok(None) => Ok(LedgerCounts::default()),
            Err(e) => Err(ExecAdvisorError::Storage(e.to_string())),
        }
    }

    // -----------------------------------------------------------------------
    // Import jobs
    // -----------------------------------------------------------------------

    /// Insert a new import job. Returns the generated job ID.
    pub async fn insert_import_job(&self, kind: &str) -> Result<String> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO import_jobs (id, kind, started_at) VALUES (?1, ?2, ?3)",
                params![id.as_str(), kind, now.as_str()],
            )
            .await
            .map_err(|e| ExecAdvisorError::Storage(e.to_string()))?;
        Ok(id)
    }

    /// Mark an import job finished with its statistics.
    pub async fn update_import_job(&self, job_id: &str, stats_json: &str) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE import_jobs SET finished_at = ?1, stats_json = ?2 WHERE id = ?3",
                params![now.as_str(), stats_json, job_id],
            )
            .await
            .map_err(|e| ExecAdvisorError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Get an import job's `(kind, finished_at, stats_json)`.
    pub async fn get_import_job(
        &self,
        job_id: &str,
    ) -> Result<Option<(String, Option<String>, Option<String>)>> {
        let mut rows = self
            .conn
            .query(
                "SELECT kind, finished_at, stats_json FROM import_jobs WHERE id = ?1",
                params![job_id],
            )
            .await
            .map_err(|e| ExecAdvisorError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some((
                row.get::<String>(0)
                    .map_err(|e| ExecAdvisorError::Storage(e.to_string()))?,
                row.get::<String>(1).ok(),
                row.get::<String>(2).ok(),
            ))),
            Ok(None) => Ok(None),
            Err(e) => Err(ExecAdvisorError::Storage(e.to_string())),
        }
    }

    // -----------------------------------------------------------------------
    // Answer cache
    // -----------------------------------------------------------------------

    /// Cached value for `key`, ignoring expired entries.
    pub async fn cache_get(&self, key: &str) -> Result<Option<String>> {
        let now = Utc::now().timestamp();
        let mut rows = self
            .conn
            .query(
                "SELECT value_json FROM answer_cache WHERE key = ?1 AND expires_at > ?2",
                params![key, now],
            )
            .await
            .map_err(|e| ExecAdvisorError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let value: String = row
                    .get(0)
                    .map_err(|e| ExecAdvisorError::Storage(e.to_string()))?;
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(ExecAdvisorError::Storage(e.to_string())),
        }
    }

    /// Store a value that expires after `ttl_secs` (upserts).
    pub async fn cache_set(&self, key: &str, value_json: &str, ttl_secs: u64) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now();
        let expires_at = now.timestamp().saturating_add(ttl_secs.min(i64::MAX as u64) as i64);
        self.conn
            .execute(
                "INSERT INTO answer_cache (key, value_json, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(key) DO UPDATE SET
                   value_json = excluded.value_json,
                   created_at = excluded.created_at,
                   expires_at = excluded.expires_at",
                params![key, value_json, now.to_rfc3339(), expires_at],
            )
            .await
            .map_err(|e| ExecAdvisorError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Delete expired entries. Returns how many were removed.
    pub async fn cache_purge_expired(&self) -> Result<u64> {
        self.check_writable()?;
        let now = Utc::now().timestamp();
        self.conn
            .execute("DELETE FROM answer_cache WHERE expires_at <= ?1", params![now])
            .await
            .map_err(|e| ExecAdvisorError::Storage(e.to_string()))
    }

    /// Delete every cache entry. Returns how many were removed.
    pub async fn cache_clear(&self) -> Result<u64> {
        self.check_writable()?;
        let removed = self
            .conn
            .execute("DELETE FROM answer_cache", params![])
            .await
            .map_err(|e| ExecAdvisorError::Storage(e.to_string()))?;
        tracing::info!(removed, "cleared answer cache");
        Ok(removed)
    }
}

/// Cache key for a query: `cache:{lang}:{query}` with the query lowercased
/// and stripped to ASCII letters and digits.
pub fn cache_key(language: Language, query: &str) -> String {
    let normalized: String = query
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect();
    format!("cache:{language}:{normalized}")
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("execadvisor_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        assert_eq!(storage.get_schema_version().await, 2);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("execadvisor_test_{}.db", Uuid::now_v7()));
        let first = Storage::open(&tmp).await.expect("first open");
        drop(first);
        let second = Storage::open(&tmp).await.expect("second open");
        assert_eq!(second.get_schema_version().await, 2);
    }

    #[tokio::test]
    async fn document_ledger() {
        let storage = test_storage().await;
        assert!(!storage.has_document("Hsg_rag_content_en", "doc1").await.unwrap());

        storage
            .record_document("Hsg_rag_content_en", "doc1", "https://emba.unisg.ch", 3)
            .await
            .expect("record document");

        assert!(storage.has_document("Hsg_rag_content_en", "doc1").await.unwrap());
        // ledger entries are per collection
        assert!(!storage.has_document("Hsg_rag_content_de", "doc1").await.unwrap());

        // recording twice is fine
        storage
            .record_document("Hsg_rag_content_en", "doc1", "https://emba.unisg.ch", 4)
            .await
            .expect("record again");
        let counts = storage.ledger_counts("Hsg_rag_content_en").await.unwrap();
        assert_eq!(counts.documents, 1);
    }

    #[tokio::test]
    async fn chunk_ledger_add_and_remove() {
        let storage = test_storage().await;
        let ids = vec!["c1".to_string(), "c2".to_string(), "c3".to_string()];
        storage.record_chunks("col", "doc", &ids).await.unwrap();
        storage.record_chunks("col", "doc", &ids[..1]).await.unwrap();

        assert!(storage.has_chunk("col", "c2").await.unwrap());
        assert_eq!(storage.ledger_counts("col").await.unwrap().chunks, 3);

        storage.remove_chunks("col", &ids[1..2]).await.unwrap();
        assert!(!storage.has_chunk("col", "c2").await.unwrap());
        assert_eq!(storage.ledger_counts("col").await.unwrap().chunks, 2);

        storage.clear_ledger("col").await.unwrap();
        assert_eq!(
            storage.ledger_counts("col").await.unwrap(),
            LedgerCounts::default()
        );
    }

    #[tokio::test]
    async fn import_job_lifecycle() {
        let storage = test_storage().await;
        let job = storage.insert_import_job("index").await.unwrap();
        let (kind, finished, _) = storage.get_import_job(&job).await.unwrap().unwrap();
        assert_eq!(kind, "index");
        assert!(finished.is_none());

        storage
            .update_import_job(&job, r#"{"chunks":12}"#)
            .await
            .unwrap();
        let (_, finished, stats) = storage.get_import_job(&job).await.unwrap().unwrap();
        assert!(finished.is_some());
        assert_eq!(stats.as_deref(), Some(r#"{"chunks":12}"#));
    }

    #[tokio::test]
    async fn cache_roundtrip_and_expiry() {
        let storage = test_storage().await;
        storage.cache_set("k1", r#""answer""#, 3600).await.unwrap();
        assert_eq!(
            storage.cache_get("k1").await.unwrap().as_deref(),
            Some(r#""answer""#)
        );

        // zero TTL expires immediately
        storage.cache_set("k2", r#""stale""#, 0).await.unwrap();
        assert!(storage.cache_get("k2").await.unwrap().is_none());
        assert_eq!(storage.cache_purge_expired().await.unwrap(), 1);

        assert_eq!(storage.cache_clear().await.unwrap(), 1);
        assert!(storage.cache_get("k1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = std::env::temp_dir().join(format!("execadvisor_test_{}.db", Uuid::now_v7()));
        drop(Storage::open(&tmp).await.unwrap());
        let ro = Storage::open_readonly(&tmp).await.unwrap();
        assert!(ro.cache_set("k", "v", 10).await.is_err());
        assert!(ro.cache_get("k").await.unwrap().is_none());
    }

    #[test]
    fn cache_key_normalization() {
        assert_eq!(
            cache_key(Language::En, "What does the IEMBA cost?"),
            "cache:en:whatdoestheiembacost"
        );
        assert_eq!(
            cache_key(Language::De, "Wie viel kostet's?"),
            "cache:de:wievielkostets"
        );
    }
}
