//! The vector store seam and an in-memory implementation.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use execadvisor_shared::{ExecAdvisorError, Language, Result};

use crate::document::Chunk;

/// A chunk that the store refused during a batch import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportFailure {
    pub chunk_id: String,
    pub message: String,
}

/// A search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub body: String,
    pub chunk_id: String,
    pub document_id: String,
    pub programs: Vec<String>,
    pub source: String,
    pub date: String,
    /// Relevance reported by the store, higher is better.
    pub score: Option<f64>,
}

impl RetrievedChunk {
    /// Context block handed to the language model.
    pub fn context_block(&self) -> String {
        format!(
            "Source: {}\nPrograms: {}\nContent: {}",
            self.source,
            self.programs.join(", "),
            self.body
        )
    }
}

impl From<&Chunk> for RetrievedChunk {
    fn from(chunk: &Chunk) -> Self {
        Self {
            body: chunk.body.clone(),
            chunk_id: chunk.chunk_id.clone(),
            document_id: chunk.document_id.clone(),
            programs: chunk.programs.clone(),
            source: chunk.source.clone(),
            date: chunk.date.clone(),
            score: None,
        }
    }
}

/// State of one collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionHealth {
    pub name: String,
    pub exists: bool,
    pub objects: u64,
}

/// Result of a store health check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub ready: bool,
    pub collections: Vec<CollectionHealth>,
}

impl HealthReport {
    /// Ready and every collection present.
    pub fn is_healthy(&self) -> bool {
        self.ready && self.collections.iter().all(|c| c.exists)
    }
}

/// One collection per language holding chunk objects.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create missing collections. Returns the names that were created.
    async fn ensure_collections(&self) -> Result<Vec<String>>;

    /// Drop all collections with their objects.
    async fn delete_collections(&self) -> Result<()>;

    /// Import chunks into the collection for `lang`.
    async fn store_batch(&self, lang: Language, chunks: &[Chunk]) -> Result<Vec<ImportFailure>>;

    /// Best `limit` chunks for `query`, most relevant first.
    async fn search(&self, lang: Language, query: &str, limit: usize)
    -> Result<Vec<RetrievedChunk>>;

    /// Number of objects in the collection for `lang`.
    async fn count(&self, lang: Language) -> Result<u64>;

    async fn health(&self) -> Result<HealthReport>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Keeps chunks in memory and ranks them by keyword overlap.
///
/// Re-importing a chunk id replaces the stored chunk.
pub struct InMemoryStore {
    languages: Vec<Language>,
    collections: RwLock<HashMap<Language, Vec<Chunk>>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(Language::ALL.to_vec())
    }
}

fn lock_error(e: impl std::fmt::Display) -> ExecAdvisorError {
    ExecAdvisorError::VectorStore(format!("lock poisoned: {e}"))
}

fn keywords(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 2)
        .map(str::to_lowercase)
        .collect()
}

/// Share of query keywords found in `body`.
fn overlap_score(query: &HashSet<String>, body: &str) -> f64 {
    if query.is_empty() {
        return 0.0;
    }
    let words = keywords(body);
    let hits = query.iter().filter(|w| words.contains(*w)).count();
    hits as f64 / query.len() as f64
}

impl InMemoryStore {
    pub fn new(languages: Vec<Language>) -> Self {
        Self {
            languages,
            collections: RwLock::new(HashMap::new()),
        }
    }

    fn name(lang: Language) -> String {
        format!("memory_{lang}")
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn ensure_collections(&self) -> Result<Vec<String>> {
        let mut collections = self.collections.write().map_err(lock_error)?;
        let mut created = Vec::new();
        for lang in &self.languages {
            if !collections.contains_key(lang) {
                collections.insert(*lang, Vec::new());
                created.push(Self::name(*lang));
            }
        }
        Ok(created)
    }

    async fn delete_collections(&self) -> Result<()> {
        self.collections.write().map_err(lock_error)?.clear();
        Ok(())
    }

    async fn store_batch(&self, lang: Language, chunks: &[Chunk]) -> Result<Vec<ImportFailure>> {
        let mut collections = self.collections.write().map_err(lock_error)?;
        let Some(collection) = collections.get_mut(&lang) else {
            return Ok(chunks
                .iter()
                .map(|c| ImportFailure {
                    chunk_id: c.chunk_id.clone(),
                    message: format!("collection {} does not exist", Self::name(lang)),
                })
                .collect());
        };

        for chunk in chunks {
            collection.retain(|c| c.chunk_id != chunk.chunk_id);
            collection.push(chunk.clone());
        }
        Ok(Vec::new())
    }

    async fn search(
        &self,
        lang: Language,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let collections = self.collections.read().map_err(lock_error)?;
        let Some(collection) = collections.get(&lang) else {
            return Err(ExecAdvisorError::VectorStore(format!(
                "collection {} does not exist",
                Self::name(lang)
            )));
        };

        let query = keywords(query);
        let mut hits: Vec<RetrievedChunk> = collection
            .iter()
            .filter_map(|chunk| {
                let score = overlap_score(&query, &chunk.body);
                (score > 0.0).then(|| RetrievedChunk {
                    score: Some(score),
                    ..RetrievedChunk::from(chunk)
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .unwrap_or(0.0)
                .total_cmp(&a.score.unwrap_or(0.0))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn count(&self, lang: Language) -> Result<u64> {
        let collections = self.collections.read().map_err(lock_error)?;
        Ok(collections.get(&lang).map_or(0, |c| c.len() as u64))
    }

    async fn health(&self) -> Result<HealthReport> {
        let collections = self.collections.read().map_err(lock_error)?;
        Ok(HealthReport {
            ready: true,
            collections: self
                .languages
                .iter()
                .map(|lang| CollectionHealth {
                    name: Self::name(*lang),
                    exists: collections.contains_key(lang),
                    objects: collections.get(lang).map_or(0, |c| c.len() as u64),
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::RecursiveChunker;
    use crate::document::Document;

    fn chunks(text: &str) -> Vec<Chunk> {
        Document::new("test", text).chunks(&RecursiveChunker::new(80, 0))
    }

    #[tokio::test]
    async fn search_ranks_by_keyword_overlap() {
        let store = InMemoryStore::default();
        store.ensure_collections().await.unwrap();
        let mut all = chunks("The EMBA tuition fee is paid in installments.");
        all.extend(chunks("The IEMBA curriculum covers international strategy."));
        all.extend(chunks("Campus parking is free on weekends."));
        store.store_batch(Language::En, &all).await.unwrap();

        let hits = store
            .search(Language::En, "What does the IEMBA curriculum cover?", 5)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].body.contains("IEMBA curriculum"));
        assert!(hits.iter().all(|h| !h.body.contains("parking")));
        assert_eq!(hits[0].programs, vec!["iemba"]);

        assert!(
            store
                .search(Language::De, "curriculum", 5)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn missing_collection_rejects_chunks() {
        let store = InMemoryStore::default();
        let failures = store
            .store_batch(Language::En, &chunks("EMBA overview"))
            .await
            .unwrap();
        assert_eq!(failures.len(), 1);
        assert!(store.search(Language::En, "emba", 3).await.is_err());
        assert!(!store.health().await.unwrap().is_healthy());
    }

    #[tokio::test]
    async fn reimport_replaces_and_counts() {
        let store = InMemoryStore::new(vec![Language::En]);
        assert_eq!(store.ensure_collections().await.unwrap(), vec!["memory_en"]);
        assert!(store.ensure_collections().await.unwrap().is_empty());

        let batch = chunks("EMBA X focuses on digital innovation.");
        store.store_batch(Language::En, &batch).await.unwrap();
        store.store_batch(Language::En, &batch).await.unwrap();
        assert_eq!(store.count(Language::En).await.unwrap(), 1);
        assert!(store.health().await.unwrap().is_healthy());

        store.delete_collections().await.unwrap();
        assert_eq!(store.count(Language::En).await.unwrap(), 0);
    }

    #[test]
    fn context_block_format() {
        let hit = RetrievedChunk {
            body: "Tuition covers all modules.".into(),
            chunk_id: "c".into(),
            document_id: "d".into(),
            programs: vec!["emba".into(), "iemba".into()],
            source: "https://emba.unisg.ch".into(),
            date: "2024-01-01T00:00:00Z".into(),
            score: Some(0.5),
        };
        assert_eq!(
            hit.context_block(),
            "Source: https://emba.unisg.ch\nPrograms: emba, iemba\nContent: Tuition covers all modules."
        );
    }
}
