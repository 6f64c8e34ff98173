//! Shared types, error model, and configuration for ExecAdvisor.
//!
//! This crate is the foundation depended on by all other ExecAdvisor crates.
//! It provides:
//! - [`ExecAdvisorError`], the unified error type
//! - Domain types ([`RawProgram`], [`ProgramRecord`], [`Language`], [`ProgramTier`])
//! - Configuration ([`AppConfig`], [`ScrapeConfig`], config loading)
//! - Language detection ([`lang::detect_language`])

pub mod config;
pub mod error;
pub mod lang;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CacheConfig, ConversationConfig, DataConfig, IndexConfig, LlmConfig, LlmProvider,
    ScrapeConfig, ScraperSection, config_dir, config_file_path, init_config, load_config,
    load_config_from, validate_api_key, validate_config,
};
pub use error::{ExecAdvisorError, Result};
pub use lang::{detect_language, detect_short};
pub use types::{
    Faculty, Language, NOT_SPECIFIED, NormalizedCost, NormalizedDuration, ProgramId,
    ProgramRecord, ProgramTier, RawProgram,
};
