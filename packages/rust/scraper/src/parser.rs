//! Program page parser.
//!
//! Each field is read from its `div.program-*` container when the page has
//! one, otherwise from regexes over the visible page text.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use execadvisor_shared::{Faculty, NOT_SPECIFIED, RawProgram};

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

fn patterns(sources: &[&str]) -> Vec<Regex> {
    sources
        .iter()
        .map(|p| Regex::new(&format!("(?i){p}")).expect("valid regex"))
        .collect()
}

static H1: LazyLock<Selector> = LazyLock::new(|| selector("h1"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("title"));
static P: LazyLock<Selector> = LazyLock::new(|| selector("p"));
static LI: LazyLock<Selector> = LazyLock::new(|| selector("li"));
static FACULTY_MEMBER: LazyLock<Selector> = LazyLock::new(|| selector("div.faculty-member"));
static FACULTY_NAME: LazyLock<Selector> = LazyLock::new(|| selector("h3, strong"));
static FACULTY_TITLE: LazyLock<Selector> = LazyLock::new(|| selector("p.faculty-title"));

static DURATION: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    patterns(&[
        r"Duration:?\s*([^.\n]+)",
        r"Program length:?\s*([^.\n]+)",
        r"(\d+\s+months)",
        r"(\d+\s+years)",
    ])
});
static COSTS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    patterns(&[
        r"Cost:?\s*([^.\n]+)",
        r"Tuition:?\s*([^.\n]+)",
        r"Fee:?\s*([^.\n]+)",
        r"CHF\s*[\d',]+",
        r"€\s*[\d',]+",
    ])
});
static SCHEDULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    patterns(&[
        r"Schedule:?\s*([^.\n]+)",
        r"Classes:?\s*([^.\n]+)",
        r"Start date:?\s*([^.\n]+)",
    ])
});
static DEADLINES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    patterns(&[
        r"Application deadline:?\s*([^.\n]+)",
        r"Deadline:?\s*([^.\n]+)",
        r"Apply by:?\s*([^.\n]+)",
    ])
});
static LANGUAGE: LazyLock<Vec<Regex>> =
    LazyLock::new(|| patterns(&[r"Language:?\s*([^.\n]+)", r"Taught in:?\s*([^.\n]+)"]));
static LOCATION: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    patterns(&[
        r"Location:?\s*([^.\n]+)",
        r"Campus:?\s*([^.\n]+)",
        r"Venue:?\s*([^.\n]+)",
    ])
});

/// Which part of a regex match becomes the field value.
#[derive(Clone, Copy)]
enum Capture {
    Group,
    Whole,
}

/// Extracts [`RawProgram`]s from program pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgramParser;

impl ProgramParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse one program page. Missing fields get their placeholder values.
    pub fn parse(&self, html: &str, url: &str) -> RawProgram {
        let doc = Html::parse_document(html);
        let text = page_text(&doc);

        let field = |container: &str, regexes: &[Regex], capture: Capture| {
            container_text(&doc, container)
                .or_else(|| search(&text, regexes, capture))
                .unwrap_or_else(|| NOT_SPECIFIED.to_string())
        };

        let program = RawProgram {
            url: url.to_string(),
            name: program_name(&doc),
            description: description(&doc),
            duration: field("div.program-duration", &DURATION, Capture::Group),
            curriculum: container_items(&doc, "div.program-curriculum"),
            costs: field("div.program-costs", &COSTS, Capture::Whole),
            admission_requirements: container_items(
                &doc,
                "div.program-admission, div.program-requirements",
            ),
            schedules: field("div.program-schedule", &SCHEDULES, Capture::Group),
            faculty: faculty(&doc),
            deadlines: field("div.program-deadlines", &DEADLINES, Capture::Group),
            language: field("div.program-language", &LANGUAGE, Capture::Group),
            location: field("div.program-location", &LOCATION, Capture::Group),
        };
        debug!(url, name = %program.name, "parsed program page");
        program
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Element text with whitespace collapsed.
fn element_text(el: &ElementRef) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Visible text nodes, one per line, without script and style content.
fn page_text(doc: &Html) -> String {
    doc.root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let parent = node
                .parent()
                .and_then(|p| p.value().as_element().map(|e| e.name()));
            if matches!(parent, Some("script" | "style" | "noscript")) {
                return None;
            }
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn container_text(doc: &Html, css: &str) -> Option<String> {
    let sel = selector(css);
    doc.select(&sel)
        .next()
        .map(|el| element_text(&el))
        .filter(|t| !t.is_empty())
}

fn search(text: &str, regexes: &[Regex], capture: Capture) -> Option<String> {
    regexes.iter().find_map(|re| {
        let caps = re.captures(text)?;
        let m = match capture {
            Capture::Group => caps.get(1).or_else(|| caps.get(0)),
            Capture::Whole => caps.get(0),
        }?;
        let value = m.as_str().trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// `<li>` items of the container, or its whole text as a single item.
fn container_items(doc: &Html, css: &str) -> Vec<String> {
    let sel = selector(css);
    let Some(container) = doc.select(&sel).next() else {
        return Vec::new();
    };
    let items: Vec<String> = container
        .select(&LI)
        .map(|li| element_text(&li))
        .filter(|t| !t.is_empty())
        .collect();
    if !items.is_empty() {
        return items;
    }
    let whole = element_text(&container);
    if whole.is_empty() { Vec::new() } else { vec![whole] }
}

fn program_name(doc: &Html) -> String {
    doc.select(&H1)
        .chain(doc.select(&TITLE))
        .map(|el| element_text(&el))
        .find(|t| !t.is_empty())
        .unwrap_or_else(|| "Unknown Program".to_string())
}

fn description(doc: &Html) -> String {
    if let Some(text) = container_text(doc, "div.program-description") {
        return text;
    }
    let paragraphs: Vec<String> = doc.select(&P).take(3).map(|p| element_text(&p)).collect();
    let joined = paragraphs.join(" ").trim().to_string();
    if joined.is_empty() {
        "No description available".to_string()
    } else {
        joined
    }
}

fn faculty(doc: &Html) -> Vec<Faculty> {
    doc.select(&FACULTY_MEMBER)
        .map(|member| Faculty {
            name: member
                .select(&FACULTY_NAME)
                .next()
                .map(|el| element_text(&el))
                .unwrap_or_else(|| "Unknown".to_string()),
            title: member
                .select(&FACULTY_TITLE)
                .next()
                .map(|el| element_text(&el))
                .unwrap_or_default(),
        })
        .collect()
}
