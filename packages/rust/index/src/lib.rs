//! Chunking, program detection, and vector storage.
//!
//! Processed programs and imported documents are split into chunks by
//! [`RecursiveChunker`], tagged with the programs they mention, and stored
//! in one collection per language through the [`VectorStore`] trait.

pub mod chunker;
pub mod document;
pub mod import;
pub mod store;
pub mod weaviate;

pub use chunker::RecursiveChunker;
pub use document::{Chunk, Document, detect_programs, program_document, program_text};
pub use execadvisor_shared::detect_language;
pub use import::{DocumentOutcome, ImportStats, Importer};
pub use store::{
    CollectionHealth, HealthReport, ImportFailure, InMemoryStore, RetrievedChunk, VectorStore,
};
pub use weaviate::{BackupInfo, WeaviateStore, new_backup_id};
