//! HTML-to-Markdown conversion and text cleanup for imported documents.
//!
//! Web pages and local files are turned into clean Markdown text before
//! chunking: the main content is extracted, tables are rendered as Markdown
//! tables, and a series of cleanup passes normalizes headings, whitespace,
//! stray markup, and links.

mod cleanup;

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use execadvisor_shared::{ExecAdvisorError, Result};

pub use cleanup::clean_content;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Format of an imported source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Html,
    Markdown,
    Text,
}

impl SourceKind {
    /// Guess the kind from a file extension or URL. Unknown extensions are
    /// read as plain text; URLs are fetched pages.
    pub fn detect(source: &str) -> Self {
        if source.starts_with("http://") || source.starts_with("https://") {
            return Self::Html;
        }
        match Path::new(source)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("html" | "htm") => Self::Html,
            Some("md" | "markdown") => Self::Markdown,
            _ => Self::Text,
        }
    }
}

/// Result of converting a source to Markdown.
#[derive(Debug, Clone)]
pub struct ConvertResult {
    pub markdown: String,
    /// First H1, the `<title>`, or the source name.
    pub title: String,
    pub word_count: usize,
}

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// Convert a source's raw content to clean Markdown.
#[instrument(skip(content), fields(source = %source))]
pub fn convert(content: &str, kind: SourceKind, source: &str) -> Result<ConvertResult> {
    let (markdown, html_title) = match kind {
        SourceKind::Html => {
            let doc = Html::parse_document(content);
            let html_title = page_title(&doc);
            let content_html = preprocess_tables(&extract_content_html(&doc, content));

            let converter = htmd::HtmlToMarkdown::builder()
                .skip_tags(vec![
                    "script", "style", "nav", "header", "footer", "iframe", "noscript", "svg",
                    "form",
                ])
                .build();
            let raw = converter.convert(&content_html).map_err(|e| {
                ExecAdvisorError::Conversion(format!("htmd conversion failed: {e}"))
            })?;
            debug!(raw_len = raw.len(), "htmd conversion complete");
            (raw, html_title)
        }
        SourceKind::Markdown | SourceKind::Text => (content.to_string(), None),
    };

    let base_url = Url::parse(source).ok();
    let cleaned = cleanup::run_pipeline(&markdown, base_url.as_ref());

    let title = extract_title_from_markdown(&cleaned)
        .or(html_title)
        .unwrap_or_else(|| source_name(source));
    let word_count = cleaned.split_whitespace().count();

    debug!(title = %title, word_count, "conversion complete");
    Ok(ConvertResult {
        markdown: cleaned,
        title,
        word_count,
    })
}

// ---------------------------------------------------------------------------
// Table pre-processing
// ---------------------------------------------------------------------------

static TABLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("valid selector"));
static TR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("valid selector"));
static CELL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("th, td").expect("valid selector"));

/// Replace HTML tables with Markdown table syntax; `htmd` 0.1 drops them.
fn preprocess_tables(html: &str) -> String {
    let doc = Html::parse_fragment(html);
    let mut result = html.to_string();
    for table in doc.select(&TABLE_SEL) {
        result = result.replacen(&table.html(), &table_to_markdown(&table), 1);
    }
    result
}

fn table_to_markdown(table: &ElementRef) -> String {
    let mut rows: Vec<Vec<String>> = table
        .select(&TR_SEL)
        .map(|tr| {
            tr.select(&CELL_SEL)
                .map(|cell| {
                    cell.text()
                        .collect::<String>()
                        .split_whitespace()
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect::<Vec<_>>()
        })
        .filter(|row: &Vec<String>| !row.is_empty())
        .collect();

    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return String::new();
    }
    for row in &mut rows {
        row.resize(columns, String::new());
    }

    let line = |cells: &[String]| format!("| {} |\n", cells.join(" | "));
    let mut md = String::from("\n\n");
    md.push_str(&line(&rows[0]));
    md.push_str(&line(&vec!["---".to_string(); columns]));
    for row in &rows[1..] {
        md.push_str(&line(row));
    }
    md.push('\n');
    md
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Main content HTML, without site chrome.
fn extract_content_html(doc: &Html, fallback: &str) -> String {
    let selectors = ["main", "[role=\"main\"]", "article", "#content", ".content", "body"];
    for sel in selectors {
        if let Ok(selector) = Selector::parse(sel) {
            if let Some(el) = doc.select(&selector).next() {
                return el.inner_html();
            }
        }
    }
    fallback.to_string()
}

fn page_title(doc: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    doc.select(&selector)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

fn extract_title_from_markdown(md: &str) -> Option<String> {
    static H1_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^# (.+)$").expect("valid regex"));
    H1_RE.captures(md).map(|c| c[1].trim().to_string())
}

/// Last path segment of a file path or URL.
fn source_name(source: &str) -> String {
    source
        .trim_end_matches('/')
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(source)
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kind_detection() {
        assert_eq!(SourceKind::detect("https://emba.unisg.ch/programm"), SourceKind::Html);
        assert_eq!(SourceKind::detect("docs/brochure.HTML"), SourceKind::Html);
        assert_eq!(SourceKind::detect("notes/faq.md"), SourceKind::Markdown);
        assert_eq!(SourceKind::detect("notes/faq.txt"), SourceKind::Text);
        assert_eq!(SourceKind::detect("README"), SourceKind::Text);
    }

    #[test]
    fn html_page_keeps_main_content() {
        let html = r#"<html><head><title>EMBA HSG</title></head><body>
            <nav><a href="/">Home</a></nav>
            <main><h1>Executive MBA HSG</h1><p>Eighteen months of   general management.</p>
            <a href="/fees">Fees</a></main>
            <footer><p>Copyright 2024</p></footer>
        </body></html>"#;
        let result = convert(html, SourceKind::Html, "https://emba.unisg.ch/emba").unwrap();

        assert_eq!(result.title, "Executive MBA HSG");
        assert!(result.markdown.contains("Eighteen months of general management."));
        assert!(result.markdown.contains("(https://emba.unisg.ch/fees)"));
        assert!(!result.markdown.contains("Copyright"));
        assert!(!result.markdown.contains("Home"));
    }

    #[test]
    fn tables_become_markdown_tables() {
        let html = "<main><table><tr><th>Program</th><th>Duration</th></tr>\
                    <tr><td>EMBA</td><td>18 months</td></tr></table></main>";
        let result = convert(html, SourceKind::Html, "page.html").unwrap();
        assert!(result.markdown.contains("| Program | Duration |"));
        assert!(result.markdown.contains("| EMBA | 18 months |"));
    }

    #[test]
    fn title_falls_back_to_source_name() {
        let result = convert("Tuition is CHF 75,000.", SourceKind::Text, "data/fees.txt").unwrap();
        assert_eq!(result.title, "fees.txt");
        assert_eq!(result.word_count, 4);

        let html = "<html><head><title>IEMBA</title></head><body><p>Online.</p></body></html>";
        let result = convert(html, SourceKind::Html, "iemba.html").unwrap();
        assert_eq!(result.title, "IEMBA");
    }
}
