//! Ledger-aware document import.
//!
//! A document already recorded in the ledger is skipped. Chunks recorded
//! for the collection are skipped. Chunk ids are recorded before the batch
//! is sent and removed again when the store rejects them; the document is
//! recorded once its chunks are in.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use execadvisor_shared::{IndexConfig, Language, Result};
use execadvisor_storage::Storage;

use crate::chunker::RecursiveChunker;
use crate::document::Document;
use crate::store::VectorStore;

/// What happened to one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentOutcome {
    /// Already in the ledger.
    Skipped,
    Imported {
        chunks: usize,
        duplicates: usize,
        failed: usize,
    },
}

/// Totals over an import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub documents_imported: usize,
    pub documents_skipped: usize,
    pub chunks_imported: usize,
    pub chunks_skipped: usize,
    pub chunks_failed: usize,
}

impl ImportStats {
    pub fn add(&mut self, outcome: DocumentOutcome) {
        match outcome {
            DocumentOutcome::Skipped => self.documents_skipped += 1,
            DocumentOutcome::Imported {
                chunks,
                duplicates,
                failed,
            } => {
                self.documents_imported += 1;
                self.chunks_imported += chunks;
                self.chunks_skipped += duplicates;
                self.chunks_failed += failed;
            }
        }
    }
}

/// Imports documents into a [`VectorStore`], tracking them in the ledger.
pub struct Importer<'a> {
    store: &'a dyn VectorStore,
    ledger: &'a Storage,
    chunker: RecursiveChunker,
    config: &'a IndexConfig,
}

impl<'a> Importer<'a> {
    pub fn new(store: &'a dyn VectorStore, ledger: &'a Storage, config: &'a IndexConfig) -> Self {
        Self {
            store,
            ledger,
            chunker: RecursiveChunker::new(config.chunk_size, config.chunk_overlap),
            config,
        }
    }

    #[instrument(skip_all, fields(source = %document.source, lang = %lang))]
    pub async fn import(&self, lang: Language, document: &Document) -> Result<DocumentOutcome> {
        let collection = self.config.collection_name(lang);
        let document_id = document.document_id();

        if self.ledger.has_document(&collection, &document_id).await? {
            debug!("document already imported");
            return Ok(DocumentOutcome::Skipped);
        }

        let mut seen = HashSet::new();
        let mut fresh = Vec::new();
        let mut duplicates = 0;
        for chunk in document.chunks(&self.chunker) {
            if !seen.insert(chunk.chunk_id.clone())
                || self.ledger.has_chunk(&collection, &chunk.chunk_id).await?
            {
                duplicates += 1;
                continue;
            }
            fresh.push(chunk);
        }

        let ids: Vec<String> = fresh.iter().map(|c| c.chunk_id.clone()).collect();
        self.ledger
            .record_chunks(&collection, &document_id, &ids)
            .await?;

        let failures = match self.store.store_batch(lang, &fresh).await {
            Ok(failures) => failures,
            Err(e) => {
                self.ledger.remove_chunks(&collection, &ids).await?;
                return Err(e);
            }
        };

        if !failures.is_empty() {
            let failed_ids: Vec<String> = failures.iter().map(|f| f.chunk_id.clone()).collect();
            self.ledger.remove_chunks(&collection, &failed_ids).await?;
            warn!(failed = failures.len(), "some chunks were not imported");
        }

        let imported = fresh.len().saturating_sub(failures.len());
        self.ledger
            .record_document(&collection, &document_id, &document.source, imported)
            .await?;

        info!(chunks = imported, duplicates, "document imported");
        Ok(DocumentOutcome::Imported {
            chunks: imported,
            duplicates,
            failed: failures.len(),
        })
    }
}
