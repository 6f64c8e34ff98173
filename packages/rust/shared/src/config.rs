//! Application configuration for ExecAdvisor.
//!
//! User config lives at `~/.execadvisor/execadvisor.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ExecAdvisorError, Result};
use crate::types::Language;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "execadvisor.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".execadvisor";

// ---------------------------------------------------------------------------
// Config structs (matching execadvisor.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Program website scraping.
    #[serde(default)]
    pub scraper: ScraperSection,

    /// Local data files.
    #[serde(default)]
    pub data: DataConfig,

    /// Vector database and chunking.
    #[serde(default)]
    pub index: IndexConfig,

    /// Language model provider.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Conversation engine and profile tracking.
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Answer cache.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// `[scraper]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperSection {
    /// Program overview page the scrape starts from.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Links outside this domain (and its subdomains) are ignored.
    #[serde(default = "default_allowed_domain")]
    pub allowed_domain: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Delay between page fetches in milliseconds.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_ms: u64,

    /// Fall back to a headless browser when plain HTTP fails.
    #[serde(default)]
    pub use_browser: bool,

    /// Browser executable used for the fallback.
    #[serde(default = "default_browser_cmd")]
    pub browser_cmd: String,
}

impl Default for ScraperSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            allowed_domain: default_allowed_domain(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            rate_limit_ms: default_rate_limit(),
            use_browser: false,
            browser_cmd: default_browser_cmd(),
        }
    }
}

fn default_base_url() -> String {
    "https://emba.unisg.ch/programm".into()
}
fn default_allowed_domain() -> String {
    "unisg.ch".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0.4472.124 Safari/537.36"
        .into()
}
fn default_rate_limit() -> u64 {
    1000
}
fn default_browser_cmd() -> String {
    "chromium".into()
}

/// `[data]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding all data files.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Raw scrape output, relative to `data_dir`.
    #[serde(default = "default_raw_file")]
    pub raw_file: String,

    /// Processed records, relative to `data_dir`.
    #[serde(default = "default_processed_file")]
    pub processed_file: String,

    /// Hand-maintained backup used when the raw file is empty.
    #[serde(default = "default_backup_file")]
    pub backup_file: String,

    /// libSQL database for the import ledger and answer cache.
    #[serde(default = "default_database_file")]
    pub database_file: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            raw_file: default_raw_file(),
            processed_file: default_processed_file(),
            backup_file: default_backup_file(),
            database_file: default_database_file(),
        }
    }
}

impl DataConfig {
    pub fn raw_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.raw_file)
    }

    pub fn processed_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.processed_file)
    }

    pub fn backup_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.backup_file)
    }

    pub fn database_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.database_file)
    }
}

fn default_data_dir() -> String {
    "data".into()
}
fn default_raw_file() -> String {
    "raw_data.json".into()
}
fn default_processed_file() -> String {
    "processed_data.json".into()
}
fn default_backup_file() -> String {
    "manual_data.json".into()
}
fn default_database_file() -> String {
    "execadvisor.db".into()
}

/// `[index]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Weaviate REST endpoint.
    #[serde(default = "default_weaviate_url")]
    pub weaviate_url: String,

    /// Name of the env var holding a Weaviate API key (optional).
    #[serde(default = "default_weaviate_key_env")]
    pub api_key_env: String,

    /// Collection name prefix; the language code is appended.
    #[serde(default = "default_collection_basename")]
    pub collection_basename: String,

    /// Languages with their own collection.
    #[serde(default = "default_languages")]
    pub languages: Vec<Language>,

    /// Maximum chunk length in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared between neighbouring chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Objects per batch request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Weaviate backup backend (e.g. `filesystem`).
    #[serde(default = "default_backup_backend")]
    pub backup_backend: String,

    /// Weaviate vectorizer module used when creating collections.
    #[serde(default = "default_vectorizer")]
    pub vectorizer: String,

    /// Endpoint the vectorizer module calls, as seen from Weaviate.
    #[serde(default = "default_embedding_endpoint")]
    pub embedding_endpoint: String,

    /// Embedding model name.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            weaviate_url: default_weaviate_url(),
            api_key_env: default_weaviate_key_env(),
            collection_basename: default_collection_basename(),
            languages: default_languages(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            batch_size: default_batch_size(),
            backup_backend: default_backup_backend(),
            vectorizer: default_vectorizer(),
            embedding_endpoint: default_embedding_endpoint(),
            embedding_model: default_embedding_model(),
        }
    }
}

impl IndexConfig {
    /// Collection name for one language, e.g. `hsg_rag_content_en`.
    pub fn collection_name(&self, lang: Language) -> String {
        format!("{}_{}", self.collection_basename, lang.as_str())
    }
}

fn default_weaviate_url() -> String {
    "http://localhost:8080".into()
}
fn default_weaviate_key_env() -> String {
    "WEAVIATE_API_KEY".into()
}
fn default_collection_basename() -> String {
    "hsg_rag_content".into()
}
fn default_languages() -> Vec<Language> {
    Language::ALL.to_vec()
}
fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}
fn default_batch_size() -> usize {
    100
}
fn default_backup_backend() -> String {
    "filesystem".into()
}
fn default_vectorizer() -> String {
    "text2vec-ollama".into()
}
fn default_embedding_endpoint() -> String {
    "http://ollama:11434".into()
}
fn default_embedding_model() -> String {
    "nomic-embed-text".into()
}

/// Supported chat-completion providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Openai,
    Groq,
    #[default]
    Ollama,
    OpenRouter,
}

impl LlmProvider {
    /// Base URL of the provider's OpenAI-compatible API.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Openai => "https://api.openai.com/v1",
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::Ollama => "http://localhost:11434/v1",
            Self::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Openai => "gpt-3.5-turbo",
            Self::Groq => "mixtral-8x7b-32768",
            Self::Ollama => "llama3.2",
            Self::OpenRouter => "openai/gpt-4o-mini",
        }
    }

    /// Env var holding the API key, `None` for keyless local providers.
    pub fn default_api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::Openai => Some("OPENAI_API_KEY"),
            Self::Groq => Some("GROQ_API_KEY"),
            Self::Ollama => None,
            Self::OpenRouter => Some("OPENROUTER_API_KEY"),
        }
    }
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider; selects default base URL, model and key variable.
    #[serde(default)]
    pub provider: LlmProvider,

    /// Model override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Base URL override (e.g. a remote Ollama host).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Attempts per completion before giving up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: None,
            base_url: None,
            api_key_env: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_retries: default_max_retries(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl LlmConfig {
    pub fn model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
    }

    pub fn api_key_env(&self) -> Option<String> {
        self.api_key_env
            .clone()
            .or_else(|| self.provider.default_api_key_env().map(String::from))
    }
}

fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_max_retries() -> u32 {
    3
}
fn default_llm_timeout() -> u64 {
    60
}

/// `[conversation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Master switch for profile extraction and snapshot logging.
    #[serde(default = "default_true")]
    pub track_user_profile: bool,

    /// Directory receiving `profile_{user_id}_{timestamp}.json` files.
    #[serde(default = "default_profile_log_dir")]
    pub profile_log_dir: String,

    /// A snapshot is written every N user messages.
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval: usize,

    /// User turns before the session is handed to a human.
    #[serde(default = "default_max_turns")]
    pub max_conversation_turns: usize,

    /// Chunks retrieved per question.
    #[serde(default = "default_top_k")]
    pub top_k_retrieval: usize,

    /// Longer answers are cut with a continuation prompt.
    #[serde(default = "default_max_response_words")]
    pub max_response_words: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            track_user_profile: true,
            profile_log_dir: default_profile_log_dir(),
            snapshot_interval: default_snapshot_interval(),
            max_conversation_turns: default_max_turns(),
            top_k_retrieval: default_top_k(),
            max_response_words: default_max_response_words(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_profile_log_dir() -> String {
    "logs/profiles".into()
}
fn default_snapshot_interval() -> usize {
    5
}
fn default_max_turns() -> usize {
    30
}
fn default_top_k() -> usize {
    8
}
fn default_max_response_words() -> usize {
    250
}

/// `[cache]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Entry lifetime in seconds.
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_ttl(),
        }
    }
}

fn default_ttl() -> u64 {
    3600
}

// ---------------------------------------------------------------------------
// Scrape config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime scrape configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub base_url: String,
    pub allowed_domain: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub rate_limit_ms: u64,
    pub use_browser: bool,
    pub browser_cmd: String,
}

impl From<&AppConfig> for ScrapeConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_url: config.scraper.base_url.clone(),
            allowed_domain: config.scraper.allowed_domain.clone(),
            timeout_secs: config.scraper.timeout_secs,
            user_agent: config.scraper.user_agent.clone(),
            rate_limit_ms: config.scraper.rate_limit_ms,
            use_browser: config.scraper.use_browser,
            browser_cmd: config.scraper.browser_cmd.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.execadvisor/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ExecAdvisorError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.execadvisor/execadvisor.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ExecAdvisorError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        ExecAdvisorError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Reject settings that would make chunking or retrieval meaningless.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.index.chunk_size == 0 {
        return Err(ExecAdvisorError::config("index.chunk_size must be positive"));
    }
    if config.index.chunk_overlap >= config.index.chunk_size {
        return Err(ExecAdvisorError::config(
            "index.chunk_overlap must be smaller than index.chunk_size",
        ));
    }
    if config.index.languages.is_empty() {
        return Err(ExecAdvisorError::config("index.languages must not be empty"));
    }
    if config.conversation.snapshot_interval == 0 {
        return Err(ExecAdvisorError::config(
            "conversation.snapshot_interval must be positive",
        ));
    }
    Ok(())
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ExecAdvisorError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ExecAdvisorError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ExecAdvisorError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the provider API key, failing if the provider needs one and it is unset.
///
/// Returns `Ok(None)` for keyless providers such as Ollama.
pub fn validate_api_key(config: &AppConfig) -> Result<Option<String>> {
    let Some(var_name) = config.llm.api_key_env() else {
        return Ok(None);
    };
    match std::env::var(&var_name) {
        Ok(val) if !val.is_empty() => Ok(Some(val)),
        _ => Err(ExecAdvisorError::config(format!(
            "API key for provider {:?} not found. Set the {var_name} environment variable.",
            config.llm.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("base_url"));
        assert!(toml_str.contains("hsg_rag_content"));
        assert!(toml_str.contains("track_user_profile = true"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.index.chunk_size, 1000);
        assert_eq!(parsed.index.chunk_overlap, 200);
        assert_eq!(parsed.index.languages, vec![Language::En, Language::De]);
        assert_eq!(parsed.conversation.snapshot_interval, 5);
        assert_eq!(parsed.llm.provider, LlmProvider::Ollama);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[llm]
provider = "open_router"
model = "mistralai/mistral-small"

[conversation]
track_user_profile = false
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.llm.provider, LlmProvider::OpenRouter);
        assert_eq!(config.llm.model(), "mistralai/mistral-small");
        assert_eq!(config.llm.base_url(), "https://openrouter.ai/api/v1");
        assert!(!config.conversation.track_user_profile);
        assert_eq!(config.conversation.top_k_retrieval, 8);
        assert_eq!(config.scraper.rate_limit_ms, 1000);
    }

    #[test]
    fn scrape_config_from_app_config() {
        let app = AppConfig::default();
        let scrape = ScrapeConfig::from(&app);
        assert_eq!(scrape.base_url, "https://emba.unisg.ch/programm");
        assert_eq!(scrape.timeout_secs, 30);
        assert!(!scrape.use_browser);
    }

    #[test]
    fn collection_name_appends_language() {
        let index = IndexConfig::default();
        assert_eq!(index.collection_name(Language::De), "hsg_rag_content_de");
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk() {
        let mut config = AppConfig::default();
        config.index.chunk_overlap = 1000;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn keyless_provider_needs_no_key() {
        let config = AppConfig::default();
        assert!(validate_api_key(&config).expect("ollama").is_none());
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        config.llm.provider = LlmProvider::Groq;
        // Use a unique env var name to avoid interfering with other tests
        config.llm.api_key_env = Some("EA_TEST_NONEXISTENT_KEY_12345".into());
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key"));
    }
}
