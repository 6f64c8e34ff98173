//! Weaviate REST client.
//!
//! Talks to the schema, batch, GraphQL, readiness and backup endpoints
//! directly over HTTP. Embeddings are computed inside Weaviate by the
//! configured vectorizer module.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use execadvisor_shared::{ExecAdvisorError, IndexConfig, Language, Result};

use crate::document::Chunk;
use crate::store::{CollectionHealth, HealthReport, ImportFailure, RetrievedChunk, VectorStore};

/// Default timeout for Weaviate requests.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Properties requested from every search hit.
const RETURN_FIELDS: &str = "body chunk_id document_id programs source date _additional { score }";

// ---------------------------------------------------------------------------
// Backups
// ---------------------------------------------------------------------------

/// Status of a backup or restore operation as reported by Weaviate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupInfo {
    pub id: String,
    #[serde(default)]
    pub backend: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub path: Option<String>,
}

/// Backup id for the current time, e.g. `hsg_wvtdb_backup_20240101120000123456`.
pub fn new_backup_id() -> String {
    format!("hsg_wvtdb_backup_{}", Utc::now().format("%Y%m%d%H%M%S%6f"))
}

// ---------------------------------------------------------------------------
// WeaviateStore
// ---------------------------------------------------------------------------

/// [`VectorStore`] backed by a Weaviate instance.
pub struct WeaviateStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    config: IndexConfig,
}

/// Weaviate class names must start with an uppercase letter.
pub fn class_name(config: &IndexConfig, lang: Language) -> String {
    let name = config.collection_name(lang);
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => name,
    }
}

impl WeaviateStore {
    pub fn new(config: &IndexConfig, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ExecAdvisorError::VectorStore(format!("failed to build client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.weaviate_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            config: config.clone(),
        })
    }

    /// Build a store, reading the API key from the configured env var if set.
    pub fn from_config(config: &IndexConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).ok();
        Self::new(config, api_key)
    }

    pub fn class_name(&self, lang: Language) -> String {
        class_name(&self.config, lang)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach auth, send, and turn non-success statuses into errors.
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request = match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        };
        let response = request
            .send()
            .await
            .map_err(|e| ExecAdvisorError::Network(format!("weaviate request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ExecAdvisorError::VectorStore(format!(
            "weaviate returned {status}: {body}"
        )))
    }

    async fn json(&self, request: RequestBuilder) -> Result<Value> {
        self.send(request)
            .await?
            .json::<Value>()
            .await
            .map_err(|e| ExecAdvisorError::VectorStore(format!("invalid weaviate response: {e}")))
    }

    async fn graphql(&self, query: String) -> Result<Value> {
        let body = self
            .json(self.client.post(self.url("/v1/graphql")).json(&json!({ "query": query })))
            .await?;

        if let Some(errors) = body.get("errors").and_then(Value::as_array) {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.get("message").and_then(Value::as_str))
                .collect();
            if !messages.is_empty() {
                return Err(ExecAdvisorError::VectorStore(format!(
                    "graphql error: {}",
                    messages.join("; ")
                )));
            }
        }
        Ok(body)
    }

    /// Whether a class exists in the schema.
    pub async fn collection_exists(&self, class: &str) -> Result<bool> {
        let request = self.client.get(self.url(&format!("/v1/schema/{class}")));
        let request = match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        };
        let response = request
            .send()
            .await
            .map_err(|e| ExecAdvisorError::Network(format!("weaviate request failed: {e}")))?;

        match response.status().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            status => Err(ExecAdvisorError::VectorStore(format!(
                "unexpected status {status} checking class {class}"
            ))),
        }
    }

    fn class_definition(&self, class: &str) -> Value {
        let text = |name: &str| json!({ "name": name, "dataType": ["text"] });
        json!({
            "class": class,
            "vectorizer": self.config.vectorizer,
            "moduleConfig": {
                self.config.vectorizer.as_str(): {
                    "apiEndpoint": self.config.embedding_endpoint,
                    "model": self.config.embedding_model,
                }
            },
            "properties": [
                text("body"),
                text("chunk_id"),
                text("document_id"),
                { "name": "programs", "dataType": ["text[]"] },
                text("source"),
                { "name": "date", "dataType": ["date"] },
            ],
        })
    }

    /// Create a backup of all collections.
    #[instrument(skip_all)]
    pub async fn create_backup(&self) -> Result<BackupInfo> {
        let id = new_backup_id();
        let include: Vec<String> = self
            .config
            .languages
            .iter()
            .map(|lang| self.class_name(*lang))
            .collect();

        info!(backup_id = %id, backend = %self.config.backup_backend, "creating backup");
        let body = self
            .json(
                self.client
                    .post(self.url(&format!("/v1/backups/{}", self.config.backup_backend)))
                    .json(&json!({ "id": id, "include": include })),
            )
            .await?;
        parse_backup(body)
    }

    /// Restore collections from a backup.
    #[instrument(skip_all, fields(backup_id = %id))]
    pub async fn restore_backup(&self, id: &str) -> Result<BackupInfo> {
        info!(backend = %self.config.backup_backend, "restoring backup");
        let body = self
            .json(
                self.client
                    .post(self.url(&format!(
                        "/v1/backups/{}/{id}/restore",
                        self.config.backup_backend
                    )))
                    .json(&json!({})),
            )
            .await?;
        parse_backup(body)
    }
}

fn parse_backup(body: Value) -> Result<BackupInfo> {
    serde_json::from_value(body)
        .map_err(|e| ExecAdvisorError::VectorStore(format!("invalid backup response: {e}")))
}

/// Weaviate reports scores as strings in GraphQL results.
fn parse_score(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn str_field(object: &Value, name: &str) -> String {
    object
        .get(name)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn parse_hit(object: &Value) -> RetrievedChunk {
    RetrievedChunk {
        body: str_field(object, "body"),
        chunk_id: str_field(object, "chunk_id"),
        document_id: str_field(object, "document_id"),
        programs: object
            .get("programs")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        source: str_field(object, "source"),
        date: str_field(object, "date"),
        score: parse_score(object.pointer("/_additional/score")),
    }
}

/// Collect per-object errors from a batch response.
fn batch_failures(response: &Value) -> Vec<ImportFailure> {
    let Some(objects) = response.as_array() else {
        return Vec::new();
    };
    objects
        .iter()
        .filter_map(|object| {
            let errors = object.pointer("/result/errors/error")?.as_array()?;
            let message = errors
                .iter()
                .filter_map(|e| e.get("message").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("; ");
            if message.is_empty() {
                return None;
            }
            Some(ImportFailure {
                chunk_id: object
                    .pointer("/properties/chunk_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                message,
            })
        })
        .collect()
}

#[async_trait]
impl VectorStore for WeaviateStore {
    #[instrument(skip_all)]
    async fn ensure_collections(&self) -> Result<Vec<String>> {
        let mut created = Vec::new();
        for lang in &self.config.languages {
            let class = self.class_name(*lang);
            if self.collection_exists(&class).await? {
                debug!(class = %class, "collection exists");
                continue;
            }
            self.send(
                self.client
                    .post(self.url("/v1/schema"))
                    .json(&self.class_definition(&class)),
            )
            .await?;
            info!(class = %class, "created collection");
            created.push(class);
        }
        Ok(created)
    }

    #[instrument(skip_all)]
    async fn delete_collections(&self) -> Result<()> {
        for lang in &self.config.languages {
            let class = self.class_name(*lang);
            if !self.collection_exists(&class).await? {
                continue;
            }
            self.send(self.client.delete(self.url(&format!("/v1/schema/{class}"))))
                .await?;
            info!(class = %class, "deleted collection");
        }
        Ok(())
    }

    #[instrument(skip_all, fields(lang = %lang, chunks = chunks.len()))]
    async fn store_batch(&self, lang: Language, chunks: &[Chunk]) -> Result<Vec<ImportFailure>> {
        let class = self.class_name(lang);
        let mut failures = Vec::new();

        for batch in chunks.chunks(self.config.batch_size.max(1)) {
            let objects: Vec<Value> = batch
                .iter()
                .map(|chunk| json!({ "class": class, "properties": chunk }))
                .collect();
            let response = self
                .json(
                    self.client
                        .post(self.url("/v1/batch/objects"))
                        .json(&json!({ "objects": objects })),
                )
                .await?;

            let batch_failures = batch_failures(&response);
            if !batch_failures.is_empty() {
                warn!(
                    class = %class,
                    failed = batch_failures.len(),
                    first = %batch_failures[0].message,
                    "batch import had failures"
                );
            }
            failures.extend(batch_failures);
        }

        info!(
            class = %class,
            imported = chunks.len().saturating_sub(failures.len()),
            failed = failures.len(),
            "batch import finished"
        );
        Ok(failures)
    }

    async fn search(
        &self,
        lang: Language,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let class = self.class_name(lang);
        let escaped = serde_json::to_string(query)
            .map_err(|e| ExecAdvisorError::Conversion(e.to_string()))?;
        let graphql = format!(
            "{{ Get {{ {class}(hybrid: {{query: {escaped}}}, limit: {limit}) {{ {RETURN_FIELDS} }} }} }}"
        );

        let body = self.graphql(graphql).await?;
        let hits = body
            .pointer(&format!("/data/Get/{class}"))
            .and_then(Value::as_array)
            .map(|objects| objects.iter().map(parse_hit).collect::<Vec<_>>())
            .unwrap_or_default();
        debug!(class = %class, hits = hits.len(), "hybrid query");
        Ok(hits)
    }

    async fn count(&self, lang: Language) -> Result<u64> {
        let class = self.class_name(lang);
        let body = self
            .graphql(format!("{{ Aggregate {{ {class} {{ meta {{ count }} }} }} }}"))
            .await?;
        Ok(body
            .pointer(&format!("/data/Aggregate/{class}/0/meta/count"))
            .and_then(Value::as_u64)
            .unwrap_or(0))
    }

    #[instrument(skip_all)]
    async fn health(&self) -> Result<HealthReport> {
        let ready = match self
            .send(self.client.get(self.url("/v1/.well-known/ready")))
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "weaviate is not ready");
                false
            }
        };
        if !ready {
            return Ok(HealthReport {
                ready,
                collections: Vec::new(),
            });
        }

        let mut collections = Vec::new();
        for lang in &self.config.languages {
            let name = self.class_name(*lang);
            let exists = self.collection_exists(&name).await?;
            let objects = if exists { self.count(*lang).await? } else { 0 };
            collections.push(CollectionHealth {
                name,
                exists,
                objects,
            });
        }
        Ok(HealthReport { ready, collections })
    }
}
