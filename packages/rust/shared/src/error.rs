//! Error types for ExecAdvisor.
//!
//! Library crates use [`ExecAdvisorError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all ExecAdvisor operations.
#[derive(Debug, thiserror::Error)]
pub enum ExecAdvisorError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while scraping or calling a remote service.
    #[error("network error: {0}")]
    Network(String),

    /// HTML parsing or field extraction error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Local database error (import ledger, answer cache).
    #[error("storage error: {0}")]
    Storage(String),

    /// Vector database error (schema, batch import, query).
    #[error("vector store error: {0}")]
    VectorStore(String),

    /// Language model call or response decoding error.
    #[error("llm error: {0}")]
    Llm(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (empty input, unsupported language, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Document conversion error (HTML to Markdown, JSON encoding).
    #[error("conversion error: {0}")]
    Conversion(String),
}

pub type Result<T> = std::result::Result<T, ExecAdvisorError>;

impl ExecAdvisorError {
    /// Bad or missing setting in `execadvisor.toml` or the environment.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Input rejected before any work is done.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// I/O failure on a data, config or snapshot file.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether retrying the same call could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ExecAdvisorError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = ExecAdvisorError::validation("language 'fr' is not supported");
        assert!(err.to_string().contains("'fr'"));

        let err = ExecAdvisorError::VectorStore("class missing".into());
        assert_eq!(err.to_string(), "vector store error: class missing");
    }

    #[test]
    fn only_network_errors_are_transient() {
        assert!(ExecAdvisorError::Network("timeout".into()).is_transient());
        assert!(!ExecAdvisorError::Llm("bad json".into()).is_transient());
        assert!(!ExecAdvisorError::parse("no h1").is_transient());
    }
}
