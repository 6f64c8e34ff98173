//! SQL migration definitions for the ExecAdvisor database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Import ledger: documents, chunks, import_jobs",
            sql: r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Documents whose chunks were imported into a collection
CREATE TABLE IF NOT EXISTS ledger_documents (
    collection  TEXT NOT NULL,
    document_id TEXT NOT NULL,
    source      TEXT NOT NULL,
    chunk_count INTEGER NOT NULL,
    imported_at TEXT NOT NULL,
    PRIMARY KEY (collection, document_id)
);

-- Individual chunks, keyed by the MD5 of their text
CREATE TABLE IF NOT EXISTS ledger_chunks (
    collection  TEXT NOT NULL,
    chunk_id    TEXT NOT NULL,
    document_id TEXT NOT NULL,
    imported_at TEXT NOT NULL,
    PRIMARY KEY (collection, chunk_id)
);

CREATE INDEX IF NOT EXISTS idx_ledger_chunks_document ON ledger_chunks(document_id);

-- Index/import run history
CREATE TABLE IF NOT EXISTS import_jobs (
    id          TEXT PRIMARY KEY,
    kind        TEXT NOT NULL,
    started_at  TEXT NOT NULL,
    finished_at TEXT,
    stats_json  TEXT
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "Answer cache with expiry",
            sql: r#"
CREATE TABLE IF NOT EXISTS answer_cache (
    key        TEXT PRIMARY KEY,
    value_json TEXT NOT NULL,
    created_at TEXT NOT NULL,
    expires_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_answer_cache_expiry ON answer_cache(expires_at);

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
    ]
}
