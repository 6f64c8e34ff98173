//! CLI command definitions, routing, and tracing setup.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use execadvisor_conversation::ConversationEngine;
use execadvisor_core::{
    AnswerCache, ChatCompletionsClient, ChatSession, ImportReport, ProgressReporter, RagChain,
    ReplyKind, import_sources, index_programs,
};
use execadvisor_index::{InMemoryStore, VectorStore, WeaviateStore};
use execadvisor_processor::{
    generate_stats, load_processed, load_raw, process_all, save_processed,
};
use execadvisor_scraper::{Scraper, save_raw};
use execadvisor_shared::{
    AppConfig, Language, ScrapeConfig, init_config, load_config, load_config_from,
    validate_api_key,
};
use execadvisor_storage::Storage;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ExecAdvisor: program advisor for the HSG Executive MBA programs.
#[derive(Parser)]
#[command(
    name = "execadvisor",
    version,
    about = "Scrape, index and chat about the HSG Executive MBA programs.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.execadvisor/execadvisor.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Scrape the program pages and save the raw records.
    Scrape {
        /// Output file (defaults to the configured raw data file).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Fall back to a headless browser when plain HTTP fails.
        #[arg(long)]
        browser: bool,
    },

    /// Normalize raw records and print statistics.
    Process {
        /// Raw records (defaults to the configured raw data file).
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Backup records used when the input is missing or empty.
        #[arg(long)]
        backup: Option<PathBuf>,

        /// Output file (defaults to the configured processed data file).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Chunk processed programs and import them into the vector store.
    Index {
        /// Processed records (defaults to the configured processed data file).
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Import into an in-memory store and a throwaway ledger.
        #[arg(long)]
        dry_run: bool,
    },

    /// Import HTML, Markdown or text files and web pages.
    Import {
        /// File paths or http(s) URLs.
        #[arg(required = true)]
        sources: Vec<String>,
    },

    /// Print statistics over processed programs.
    Stats {
        /// Processed records (defaults to the configured processed data file).
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Vector database management.
    Db {
        #[command(subcommand)]
        action: DbAction,
    },

    /// Chat with the advisor on stdin.
    Chat {
        /// Fix the conversation language instead of detecting it.
        #[arg(short, long)]
        language: Option<Language>,

        /// Identifier used for profile snapshots.
        #[arg(long, default_value = "cli")]
        user_id: String,
    },

    /// Answer cache management.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Vector database subcommands.
#[derive(Subcommand)]
pub(crate) enum DbAction {
    /// Create the per-language collections.
    Init,
    /// Drop all collections and clear the import ledger.
    Delete,
    /// Drop, recreate and re-import the processed programs.
    Redo,
    /// Report readiness and object counts.
    Checkhealth,
    /// Create a backup of all collections.
    Backup,
    /// Restore a backup by id.
    Restore {
        /// Backup id as printed by `db backup`.
        id: String,
    },
}

/// Cache subcommands.
#[derive(Subcommand)]
pub(crate) enum CacheAction {
    /// Remove all cached answers.
    Clear,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "execadvisor=info",
        1 => "execadvisor=debug",
        _ => "execadvisor=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    if let Command::Config { action } = &cli.command {
        return match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(cli.config.as_deref()),
        };
    }

    let config = resolve_config(cli.config.as_deref())?;
    match cli.command {
        Command::Scrape { out, browser } => cmd_scrape(&config, out, browser).await,
        Command::Process { input, backup, out } => cmd_process(&config, input, backup, out),
        Command::Index { input, dry_run } => cmd_index(&config, input, dry_run).await,
        Command::Import { sources } => cmd_import(&config, &sources).await,
        Command::Stats { input } => cmd_stats(&config, input),
        Command::Db { action } => cmd_db(&config, action).await,
        Command::Chat { language, user_id } => cmd_chat(&config, language, user_id).await,
        Command::Cache {
            action: CacheAction::Clear,
        } => cmd_cache_clear(&config).await,
        Command::Config { .. } => Ok(()),
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn document_done(&self, source: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Importing [{current}/{total}] {source}"));
    }

    fn done(&self, _report: &ImportReport) {
        self.spinner.finish_and_clear();
    }
}

fn print_report(report: &ImportReport) {
    let stats = &report.stats;
    println!();
    println!("  Import complete!");
    println!("  Job:        {}", report.job_id);
    println!("  Documents:  {} imported, {} skipped", stats.documents_imported, stats.documents_skipped);
    println!(
        "  Chunks:     {} imported, {} duplicates, {} failed",
        stats.chunks_imported, stats.chunks_skipped, stats.chunks_failed
    );
    for (source, message) in &report.failures {
        println!("  Failed:     {source}: {message}");
    }
    println!("  Time:       {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// Data commands
// ---------------------------------------------------------------------------

async fn cmd_scrape(config: &AppConfig, out: Option<PathBuf>, browser: bool) -> Result<()> {
    let mut scrape = ScrapeConfig::from(config);
    scrape.use_browser |= browser;
    let out = out.unwrap_or_else(|| config.data.raw_path());

    info!(base_url = %scrape.base_url, browser = scrape.use_browser, "starting scrape");
    let result = Scraper::new(scrape)?.scrape().await?;
    save_raw(&result.programs, &out)?;

    println!();
    println!("  Scrape complete!");
    println!("  Programs:  {}", result.programs.len());
    println!("  Fetched:   {}", result.pages_fetched);
    println!("  Skipped:   {}", result.pages_skipped);
    for (url, message) in &result.errors {
        println!("  Failed:    {url}: {message}");
    }
    println!("  Output:    {}", out.display());
    println!("  Time:      {:.1}s", result.duration.as_secs_f64());
    println!();
    Ok(())
}

fn cmd_process(
    config: &AppConfig,
    input: Option<PathBuf>,
    backup: Option<PathBuf>,
    out: Option<PathBuf>,
) -> Result<()> {
    let input = input.unwrap_or_else(|| config.data.raw_path());
    let backup = backup.unwrap_or_else(|| config.data.backup_path());
    let out = out.unwrap_or_else(|| config.data.processed_path());

    let raws = load_raw(&input, &backup);
    if raws.is_empty() {
        return Err(eyre!(
            "no program data in {} or {}",
            input.display(),
            backup.display()
        ));
    }
    let records = process_all(&raws);
    save_processed(&records, &out)?;

    println!("Processed {} programs into {}", records.len(), out.display());
    println!();
    print!("{}", generate_stats(&records));
    Ok(())
}

fn cmd_stats(config: &AppConfig, input: Option<PathBuf>) -> Result<()> {
    let input = input.unwrap_or_else(|| config.data.processed_path());
    let records = load_processed(&input)?;
    print!("{}", generate_stats(&records));
    Ok(())
}

async fn cmd_index(config: &AppConfig, input: Option<PathBuf>, dry_run: bool) -> Result<()> {
    let input = input.unwrap_or_else(|| config.data.processed_path());
    let records = load_processed(&input)?;

    if dry_run {
        let db = std::env::temp_dir().join(format!("execadvisor_dry_run_{}.db", std::process::id()));
        let ledger = Storage::open(&db).await?;
        let store = InMemoryStore::new(config.index.languages.clone());
        let reporter = CliProgress::new();
        let report = index_programs(&records, &store, &ledger, &config.index, &reporter).await;
        drop(ledger);
        if let Err(e) = std::fs::remove_file(&db) {
            warn!(path = %db.display(), error = %e, "failed to remove dry-run ledger");
        }
        print_report(&report?);
        return Ok(());
    }

    let store = WeaviateStore::from_config(&config.index)?;
    let ledger = Storage::open(&config.data.database_path()).await?;
    let reporter = CliProgress::new();
    let report = index_programs(&records, &store, &ledger, &config.index, &reporter).await?;
    print_report(&report);
    Ok(())
}

async fn cmd_import(config: &AppConfig, sources: &[String]) -> Result<()> {
    let store = WeaviateStore::from_config(&config.index)?;
    let ledger = Storage::open(&config.data.database_path()).await?;
    let scrape = ScrapeConfig::from(config);
    let reporter = CliProgress::new();
    let report =
        import_sources(sources, &store, &ledger, &config.index, &scrape, &reporter).await?;
    print_report(&report);
    Ok(())
}

// ---------------------------------------------------------------------------
// Database commands
// ---------------------------------------------------------------------------

async fn cmd_db(config: &AppConfig, action: DbAction) -> Result<()> {
    let store = WeaviateStore::from_config(&config.index)?;
    match action {
        DbAction::Init => {
            let created = store.ensure_collections().await?;
            if created.is_empty() {
                println!("All collections already exist.");
            } else {
                println!("Created collections: {}", created.join(", "));
            }
        }
        DbAction::Delete => {
            delete_all(config, &store).await?;
            println!("Deleted all collections and cleared the import ledger.");
        }
        DbAction::Redo => {
            let records = load_processed(&config.data.processed_path())?;
            delete_all(config, &store).await?;
            let ledger = Storage::open(&config.data.database_path()).await?;
            let reporter = CliProgress::new();
            let report =
                index_programs(&records, &store, &ledger, &config.index, &reporter).await?;
            print_report(&report);
        }
        DbAction::Checkhealth => {
            let health = store.health().await?;
            println!("Ready: {}", health.ready);
            for c in &health.collections {
                if c.exists {
                    println!("  {}: {} objects", c.name, c.objects);
                } else {
                    println!("  {}: missing", c.name);
                }
            }
            if !health.is_healthy() {
                return Err(eyre!("vector database is not healthy"));
            }
        }
        DbAction::Backup => {
            let backup = store.create_backup().await?;
            println!("Backup {} on {}: {}", backup.id, backup.backend, backup.status);
        }
        DbAction::Restore { id } => {
            let restore = store.restore_backup(&id).await?;
            println!("Restore {} on {}: {}", restore.id, restore.backend, restore.status);
        }
    }
    Ok(())
}

async fn delete_all(config: &AppConfig, store: &dyn VectorStore) -> Result<()> {
    store.delete_collections().await?;
    let ledger = Storage::open(&config.data.database_path()).await?;
    for lang in &config.index.languages {
        ledger.clear_ledger(&config.index.collection_name(*lang)).await?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

async fn cmd_chat(config: &AppConfig, language: Option<Language>, user_id: String) -> Result<()> {
    let api_key = validate_api_key(config)?;
    let llm = Arc::new(ChatCompletionsClient::new(&config.llm, api_key)?);
    let store: Arc<dyn VectorStore> = Arc::new(WeaviateStore::from_config(&config.index)?);
    let chain = Arc::new(RagChain::new(
        store,
        llm,
        config.conversation.top_k_retrieval,
    ));
    let engine = Arc::new(ConversationEngine::new(config.conversation.clone()));

    let cache = if config.cache.enabled {
        let storage = Arc::new(Storage::open(&config.data.database_path()).await?);
        if let Err(e) = storage.cache_purge_expired().await {
            warn!(error = %e, "failed to purge expired cache entries");
        }
        AnswerCache::new(storage, &config.cache)
    } else {
        None
    };

    let mut session = ChatSession::new(user_id, engine, chain).with_cache(cache);
    if let Some(lang) = language {
        session = session.with_language(lang);
    }

    println!("{}", session.greeting());
    println!("(type 'exit' to quit)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if matches!(line.trim(), "exit" | "quit") {
            break;
        }

        let reply = session.respond(&line).await;
        println!("\n{}", reply.render());
        if reply.kind == ReplyKind::ConversationEnd {
            break;
        }
    }

    info!(
        messages = session.state().message_count,
        handover = session.state().handover_requested,
        "chat ended"
    );
    Ok(())
}

async fn cmd_cache_clear(config: &AppConfig) -> Result<()> {
    let storage = Storage::open(&config.data.database_path()).await?;
    let removed = storage.cache_clear().await?;
    println!("Removed {removed} cached answers.");
    Ok(())
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
