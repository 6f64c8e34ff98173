//! Documents, chunks, and their metadata.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};

use execadvisor_shared::{NOT_SPECIFIED, ProgramRecord, ProgramTier};

use crate::chunker::RecursiveChunker;

/// A chunk as stored in the vector database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub body: String,
    /// MD5 hex of the trimmed chunk text.
    pub chunk_id: String,
    /// MD5 hex of the trimmed document text.
    pub document_id: String,
    pub programs: Vec<String>,
    pub source: String,
    /// RFC 3339 UTC timestamp of the import.
    pub date: String,
}

/// A document ready to be chunked: its text and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub source: String,
    pub content: String,
}

impl Document {
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
        }
    }

    /// MD5 hex of the trimmed content.
    pub fn document_id(&self) -> String {
        md5_hex(&self.content)
    }

    /// Split into chunks with metadata.
    ///
    /// Programs are detected per chunk; a chunk that names no program
    /// inherits the programs detected for the whole document.
    pub fn chunks(&self, chunker: &RecursiveChunker) -> Vec<Chunk> {
        let document_id = self.document_id();
        let document_programs = detect_programs(&self.content);
        let date = Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

        chunker
            .split(&self.content)
            .into_iter()
            .map(|body| {
                let mut programs = detect_programs(&body);
                if programs.is_empty() {
                    programs = document_programs.clone();
                }
                Chunk {
                    chunk_id: md5_hex(&body),
                    document_id: document_id.clone(),
                    programs: programs.iter().map(|p| p.tag().to_string()).collect(),
                    source: self.source.clone(),
                    date: date.clone(),
                    body,
                }
            })
            .collect()
    }
}

pub(crate) fn md5_hex(text: &str) -> String {
    format!("{:x}", md5::compute(text.trim().as_bytes()))
}

// ---------------------------------------------------------------------------
// Program detection
// ---------------------------------------------------------------------------

static EMBA_X_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bemba\s?x\b").expect("valid regex"));
static IEMBA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\biemba\b|\binternational\s+(?:executive\s+mba|emba)\b").expect("valid regex")
});
static EMBA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bemba\b|\bexecutive\s+mba\b").expect("valid regex"));

/// Program tiers named in the text.
///
/// "emba x" and the international program are removed before looking for
/// plain EMBA mentions, so they are not counted twice.
pub fn detect_programs(text: &str) -> Vec<ProgramTier> {
    let mut found = Vec::new();
    let mut rest = text.to_string();

    for (tier, re) in [
        (ProgramTier::EmbaX, &*EMBA_X_RE),
        (ProgramTier::Iemba, &*IEMBA_RE),
        (ProgramTier::Emba, &*EMBA_RE),
    ] {
        if re.is_match(&rest) {
            found.push(tier);
            rest = re.replace_all(&rest, " ").into_owned();
        }
    }
    found
}

// ---------------------------------------------------------------------------
// Program records as text
// ---------------------------------------------------------------------------

fn is_specified(value: &str) -> bool {
    let v = value.trim();
    !v.is_empty() && v != NOT_SPECIFIED
}

fn bullet_list(items: impl IntoIterator<Item = String>) -> String {
    items
        .into_iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a processed program as indexable text, one section per field.
pub fn program_text(record: &ProgramRecord) -> String {
    let mut sections = vec![
        format!("Program: {}", record.name),
        format!("Description: {}", record.description),
    ];

    if is_specified(&record.duration.original) {
        sections.push(format!("Duration: {}", record.duration.original));
    }
    if is_specified(&record.costs.original) {
        sections.push(format!("Costs: {}", record.costs.original));
    }
    if !record.curriculum.is_empty() {
        sections.push(format!(
            "Curriculum:\n{}",
            bullet_list(record.curriculum.iter().cloned())
        ));
    }
    if !record.admission_requirements.is_empty() {
        sections.push(format!(
            "Admission Requirements:\n{}",
            bullet_list(record.admission_requirements.iter().cloned())
        ));
    }
    if is_specified(&record.schedules) {
        sections.push(format!("Schedules: {}", record.schedules));
    }
    if !record.faculty.is_empty() {
        sections.push(format!(
            "Faculty:\n{}",
            bullet_list(record.faculty.iter().map(|f| {
                if f.title.is_empty() {
                    f.name.clone()
                } else {
                    format!("{}, {}", f.name, f.title)
                }
            }))
        ));
    }
    if is_specified(&record.deadlines) {
        sections.push(format!("Application Deadlines: {}", record.deadlines));
    }
    if is_specified(&record.language) {
        sections.push(format!("Language: {}", record.language));
    }
    if is_specified(&record.location) {
        sections.push(format!("Location: {}", record.location));
    }
    sections.push(format!("More Information: {}", record.url));

    sections.join("\n\n")
}

/// The document for a processed program.
pub fn program_document(record: &ProgramRecord) -> Document {
    Document::new(record.url.clone(), program_text(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use execadvisor_shared::{Faculty, NormalizedCost, NormalizedDuration, ProgramId};

    fn record() -> ProgramRecord {
        ProgramRecord {
            program_id: ProgramId::from_url("https://emba.unisg.ch/programm/emba"),
            url: "https://emba.unisg.ch/programm/emba".into(),
            name: "Executive MBA HSG".into(),
            description: "General management program for experienced leaders.".into(),
            duration: NormalizedDuration {
                months: Some(18),
                original: "18 months".into(),
            },
            curriculum: vec!["Strategy".into(), "Leadership".into()],
            costs: NormalizedCost {
                amount: None,
                currency: None,
                original: NOT_SPECIFIED.into(),
            },
            admission_requirements: vec![],
            schedules: NOT_SPECIFIED.into(),
            faculty: vec![Faculty {
                name: "Prof. Dr. Anna Muster".into(),
                title: "Academic Director".into(),
            }],
            deadlines: "30 June".into(),
            language: "German".into(),
            location: "St.Gallen".into(),
        }
    }

    #[test]
    fn program_text_layout() {
        let text = program_text(&record());
        assert!(text.starts_with("Program: Executive MBA HSG\n\nDescription: "));
        assert!(text.contains("Duration: 18 months"));
        assert!(!text.contains("Costs:"));
        assert!(text.contains("Curriculum:\n- Strategy\n- Leadership"));
        assert!(!text.contains("Admission Requirements"));
        assert!(!text.contains("Schedules:"));
        assert!(text.contains("Faculty:\n- Prof. Dr. Anna Muster, Academic Director"));
        assert!(text.contains("Application Deadlines: 30 June"));
        assert!(text.ends_with("More Information: https://emba.unisg.ch/programm/emba"));
    }

    #[test]
    fn chunk_ids_are_md5_of_trimmed_text() {
        let doc = Document::new("test.md", "  Executive MBA HSG overview  ");
        let chunks = doc.chunks(&RecursiveChunker::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_id, format!("{:x}", md5::compute("Executive MBA HSG overview")));
        assert_eq!(chunks[0].document_id, chunks[0].chunk_id);
        assert_eq!(chunks[0].programs, vec!["emba"]);
        assert_eq!(chunks[0].source, "test.md");
        assert!(chunks[0].date.ends_with('Z'));
    }

    #[test]
    fn chunks_inherit_document_programs() {
        let content = format!("The IEMBA is taught in English.\n\n{}", "Modules cover finance. ".repeat(10));
        let doc = Document::new("iemba.html", content);
        let chunks = doc.chunks(&RecursiveChunker::new(60, 0));
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.programs == vec!["iemba"]));
    }

    #[test]
    fn program_detection() {
        assert_eq!(detect_programs("emba X and EMBAX"), vec![ProgramTier::EmbaX]);
        assert_eq!(
            detect_programs("International Executive MBA vs Executive MBA"),
            vec![ProgramTier::Iemba, ProgramTier::Emba]
        );
        assert_eq!(
            detect_programs("IEMBA, EMBA and emba x"),
            vec![ProgramTier::EmbaX, ProgramTier::Iemba, ProgramTier::Emba]
        );
        assert!(detect_programs("MBA programs in general").is_empty());
    }
}
