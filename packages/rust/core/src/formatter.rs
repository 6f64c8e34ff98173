//! Answer post-processing for chat display.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use execadvisor_shared::Language;

use crate::messages::continuation_prompt;

static TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\|[^\n]+\|[ \t]*\n\|[-: \t|]+\|[ \t]*\n(?:\|[^\n]+\|[ \t]*(?:\n|$))+")
        .expect("valid regex")
});
static BLANK_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

fn cells(line: &str) -> Vec<&str> {
    line.trim()
        .trim_matches('|')
        .split('|')
        .map(str::trim)
        .collect()
}

/// Rewrite markdown tables as bullet lists, one bullet per row.
///
/// Rows whose cell count differs from the header are dropped.
pub fn tables_to_bullets(text: &str) -> String {
    TABLE_RE
        .replace_all(text, |caps: &Captures| {
            let table = &caps[0];
            let lines: Vec<&str> = table.lines().filter(|l| !l.trim().is_empty()).collect();
            let headers = cells(lines[0]);
            let bullets: Vec<String> = lines[2..]
                .iter()
                .map(|line| cells(line))
                .filter(|row| row.len() == headers.len())
                .map(|row| {
                    let parts: Vec<String> = headers
                        .iter()
                        .zip(&row)
                        .filter(|(_, cell)| !cell.is_empty())
                        .map(|(h, cell)| format!("**{h}**: {cell}"))
                        .collect();
                    format!("- {}", parts.join(", "))
                })
                .collect();
            debug!(rows = bullets.len(), "converted table to bullets");
            let trailing = if table.ends_with('\n') { "\n" } else { "" };
            format!("{}{trailing}", bullets.join("\n"))
        })
        .into_owned()
}

/// Collapse blank-line runs and trim.
pub fn clean_response(text: &str) -> String {
    BLANK_RUN_RE.replace_all(text, "\n\n").trim().to_string()
}

/// Cut an answer after the last whole line that fits in `max_words`.
///
/// Returns the shortened answer with a continuation prompt and the remainder,
/// or the text unchanged and `None` when it already fits.
pub fn chunk_response(text: &str, max_words: usize, language: Language) -> (String, Option<String>) {
    let total = text.split_whitespace().count();
    if total <= max_words {
        return (text.to_string(), None);
    }

    let lines: Vec<&str> = text.split('\n').collect();
    let mut kept = 0;
    let mut words = 0;
    for line in &lines {
        let line_words = line.split_whitespace().count();
        if words + line_words > max_words && kept > 0 {
            break;
        }
        kept += 1;
        words += line_words;
    }
    debug!(total, kept_words = words, "answer shortened");

    let current = format!(
        "{}\n\n{}",
        lines[..kept].join("\n").trim_end(),
        continuation_prompt(language)
    );
    let rest = lines[kept..].join("\n");
    (current, (!rest.trim().is_empty()).then_some(rest))
}

/// Use the English university name in English answers.
pub fn localize_university_name(text: &str, language: Language) -> String {
    match language {
        Language::En => text.replace("Universität St.Gallen", "University of St.Gallen"),
        Language::De => text.to_string(),
    }
}

/// Full formatting pass applied to every generated answer.
pub fn format_answer(text: &str, max_words: usize, language: Language) -> String {
    let text = clean_response(&tables_to_bullets(text));
    let (text, _rest) = chunk_response(&text, max_words, language);
    localize_university_name(&text, language)
}
