//! Core domain types for ExecAdvisor program data.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ExecAdvisorError;

/// Placeholder used by the parser and processor for missing text fields.
pub const NOT_SPECIFIED: &str = "Not specified";

// ---------------------------------------------------------------------------
// Language
// ---------------------------------------------------------------------------

/// Conversation and collection language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    De,
}

impl Language {
    /// All languages with their own vector collection.
    pub const ALL: [Language; 2] = [Language::En, Language::De];

    /// ISO 639-1 code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::De => "de",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = ExecAdvisorError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Self::En),
            "de" | "german" | "deutsch" => Ok(Self::De),
            other => Err(ExecAdvisorError::validation(format!(
                "language '{other}' is not supported (expected 'en' or 'de')"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Program tier
// ---------------------------------------------------------------------------

/// The three executive-MBA tiers the advisor can recommend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgramTier {
    #[serde(rename = "EMBA")]
    Emba,
    #[serde(rename = "IEMBA")]
    Iemba,
    #[serde(rename = "EMBA X")]
    EmbaX,
}

impl ProgramTier {
    /// Display label, also used in profile snapshots.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Emba => "EMBA",
            Self::Iemba => "IEMBA",
            Self::EmbaX => "EMBA X",
        }
    }

    /// Tag stored in chunk metadata (`programs[]`).
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Emba => "emba",
            Self::Iemba => "iemba",
            Self::EmbaX => "emba_x",
        }
    }
}

impl std::fmt::Display for ProgramTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// ProgramId
// ---------------------------------------------------------------------------

/// Derived program identifier of the form `prog_NNNN`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgramId(pub String);

impl ProgramId {
    /// Derive a stable identifier from the program URL.
    ///
    /// Uses the first eight bytes of the SHA-256 digest so the id does not
    /// change between runs.
    pub fn from_url(url: &str) -> Self {
        let digest = Sha256::digest(url.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        let n = u64::from_be_bytes(prefix) % 10_000;
        Self(format!("prog_{n:04}"))
    }
}

impl std::fmt::Display for ProgramId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Scraped and processed records
// ---------------------------------------------------------------------------

/// A faculty member listed on a program page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faculty {
    pub name: String,
    #[serde(default)]
    pub title: String,
}

/// A program record as produced by the parser, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawProgram {
    pub url: String,
    #[serde(default = "unknown_program")]
    pub name: String,
    #[serde(default = "no_description")]
    pub description: String,
    #[serde(default = "not_specified")]
    pub duration: String,
    #[serde(default)]
    pub curriculum: Vec<String>,
    #[serde(default = "not_specified")]
    pub costs: String,
    #[serde(default)]
    pub admission_requirements: Vec<String>,
    #[serde(default = "not_specified")]
    pub schedules: String,
    #[serde(default)]
    pub faculty: Vec<Faculty>,
    #[serde(default = "not_specified")]
    pub deadlines: String,
    #[serde(default = "not_specified")]
    pub language: String,
    #[serde(default = "not_specified")]
    pub location: String,
}

fn unknown_program() -> String {
    "Unknown Program".into()
}
fn no_description() -> String {
    "No description available".into()
}
fn not_specified() -> String {
    NOT_SPECIFIED.into()
}

/// Duration normalized to months, with the raw text kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedDuration {
    pub months: Option<u32>,
    pub original: String,
}

/// Cost normalized to an amount and ISO currency, with the raw text kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedCost {
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub original: String,
}

/// A cleaned, normalized program record ready for indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramRecord {
    pub program_id: ProgramId,
    pub url: String,
    pub name: String,
    pub description: String,
    pub duration: NormalizedDuration,
    pub curriculum: Vec<String>,
    pub costs: NormalizedCost,
    pub admission_requirements: Vec<String>,
    pub schedules: String,
    pub faculty: Vec<Faculty>,
    pub deadlines: String,
    pub language: String,
    pub location: String,
}
