//! Indexing pipelines: processed programs and ad-hoc sources into the
//! vector store, tracked as import jobs in the local database.

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};
use url::Url;

use execadvisor_index::{
    Document, ImportStats, Importer, VectorStore, detect_language, program_document,
};
use execadvisor_markdown::{SourceKind, convert};
use execadvisor_scraper::{HttpFetcher, PageFetcher};
use execadvisor_shared::{
    ExecAdvisorError, IndexConfig, Language, ProgramRecord, Result, ScrapeConfig,
};
use execadvisor_storage::Storage;

/// Outcome of one pipeline run.
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub job_id: String,
    pub stats: ImportStats,
    /// `(source, message)` for every document that could not be imported.
    pub failures: Vec<(String, String)>,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each document, imported or not.
    fn document_done(&self, source: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, report: &ImportReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn document_done(&self, _source: &str, _current: usize, _total: usize) {}
    fn done(&self, _report: &ImportReport) {}
}

/// Import the processed program records.
#[instrument(skip_all, fields(programs = records.len()))]
pub async fn index_programs(
    records: &[ProgramRecord],
    store: &dyn VectorStore,
    ledger: &Storage,
    config: &IndexConfig,
    progress: &dyn ProgressReporter,
) -> Result<ImportReport> {
    let documents = records
        .iter()
        .map(|r| (r.url.clone(), Ok(program_document(r))))
        .collect();
    run_import("programs", documents, store, ledger, config, progress).await
}

/// Import HTML, Markdown or text files and web pages.
#[instrument(skip_all, fields(sources = sources.len()))]
pub async fn import_sources(
    sources: &[String],
    store: &dyn VectorStore,
    ledger: &Storage,
    config: &IndexConfig,
    scrape: &ScrapeConfig,
    progress: &dyn ProgressReporter,
) -> Result<ImportReport> {
    progress.phase("Loading sources");
    let fetcher = HttpFetcher::new(scrape)?;
    let mut documents = Vec::with_capacity(sources.len());
    for source in sources {
        documents.push((source.clone(), load_source(source, &fetcher).await));
    }
    run_import("documents", documents, store, ledger, config, progress).await
}

/// Read or fetch a source and convert it to a Markdown document.
pub async fn load_source(source: &str, fetcher: &dyn PageFetcher) -> Result<Document> {
    let content = match Url::parse(source) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => fetcher.fetch(&url).await?,
        _ => std::fs::read_to_string(Path::new(source))
            .map_err(|e| ExecAdvisorError::io(source, e))?,
    };
    let converted = convert(&content, SourceKind::detect(source), source)?;
    if converted.word_count == 0 {
        return Err(ExecAdvisorError::validation(format!(
            "{source} contains no text"
        )));
    }
    info!(source, title = %converted.title, words = converted.word_count, "source converted");
    Ok(Document::new(source, converted.markdown))
}

/// Collection language for a document, if that language is configured.
fn document_language(document: &Document, config: &IndexConfig) -> Option<Language> {
    let detected = detect_language(&document.content);
    config.languages.contains(&detected).then_some(detected)
}

async fn run_import(
    kind: &str,
    documents: Vec<(String, Result<Document>)>,
    store: &dyn VectorStore,
    ledger: &Storage,
    config: &IndexConfig,
    progress: &dyn ProgressReporter,
) -> Result<ImportReport> {
    let start = Instant::now();

    progress.phase("Preparing collections");
    let created = store.ensure_collections().await?;
    if !created.is_empty() {
        info!(collections = ?created, "created collections");
    }

    let job_id = ledger.insert_import_job(kind).await?;
    let importer = Importer::new(store, ledger, config);
    let mut stats = ImportStats::default();
    let mut failures = Vec::new();
    let total = documents.len();

    progress.phase("Importing documents");
    for (i, (source, document)) in documents.into_iter().enumerate() {
        match document.map(|d| {
            let lang = document_language(&d, config);
            (d, lang)
        }) {
            Err(e) => {
                warn!(source = %source, error = %e, "skipping source");
                failures.push((source.clone(), e.to_string()));
            }
            Ok((document, Some(lang))) => match importer.import(lang, &document).await {
                Ok(outcome) => stats.add(outcome),
                Err(e) => {
                    warn!(source = %source, error = %e, "import failed");
                    failures.push((source.clone(), e.to_string()));
                }
            },
            Ok((_, None)) => {
                warn!(source = %source, "document language is not configured");
                failures.push((source.clone(), "document language is not configured".into()));
            }
        }
        progress.document_done(&source, i + 1, total);
    }

    let stats_json = serde_json::to_string(&stats)
        .map_err(|e| ExecAdvisorError::Conversion(format!("failed to encode stats: {e}")))?;
    ledger.update_import_job(&job_id, &stats_json).await?;

    let report = ImportReport {
        job_id,
        stats,
        failures,
        elapsed: start.elapsed(),
    };
    info!(
        kind,
        documents = report.stats.documents_imported,
        skipped = report.stats.documents_skipped,
        chunks = report.stats.chunks_imported,
        failed = report.failures.len(),
        elapsed_ms = report.elapsed.as_millis(),
        "import complete"
    );
    progress.done(&report);
    Ok(report)
}
