//! Pattern-based profile extraction.
//!
//! All functions are pure and total: no match means `None`, never an error.

use regex::Regex;

use execadvisor_shared::ProgramTier;

use crate::patterns::{ExtractionPatterns, ProgramMentions};

/// Captured integer of the leftmost match across `patterns`.
fn first_number(text: &str, patterns: &[Regex]) -> Option<u32> {
    patterns
        .iter()
        .filter_map(|re| re.captures(text))
        .filter_map(|caps| {
            let start = caps.get(0)?.start();
            let n = caps.get(1)?.as_str().parse::<u32>().ok()?;
            Some((start, n))
        })
        .min_by_key(|(start, _)| *start)
        .map(|(_, n)| n)
}

/// Years of professional experience, e.g. "8 years of experience".
pub fn extract_experience_years(text: &str, patterns: &ExtractionPatterns) -> Option<u32> {
    first_number(text, &patterns.experience)
}

/// Years of leadership or management experience.
pub fn extract_leadership_years(text: &str, patterns: &ExtractionPatterns) -> Option<u32> {
    first_number(text, &patterns.leadership)
}

/// First industry from the vocabulary found in the text.
pub fn extract_field(text: &str, patterns: &ExtractionPatterns) -> Option<String> {
    let lower = text.to_lowercase();
    patterns
        .fields
        .iter()
        .find(|field| lower.contains(field.as_str()))
        .cloned()
}

/// All interest topics found in the text, comma-joined in vocabulary order.
pub fn extract_interest(text: &str, patterns: &ExtractionPatterns) -> Option<String> {
    let matches = matching_interests(text, patterns);
    (!matches.is_empty()).then(|| matches.join(", "))
}

pub(crate) fn matching_interests<'a>(text: &str, patterns: &'a ExtractionPatterns) -> Vec<&'a str> {
    let lower = text.to_lowercase();
    patterns
        .interests
        .iter()
        .filter(|topic| lower.contains(topic.as_str()))
        .map(String::as_str)
        .collect()
}

/// The user's name from phrases like "my name is Anna Meier".
pub fn extract_user_name(text: &str, patterns: &ExtractionPatterns) -> Option<String> {
    patterns
        .user_name
        .iter()
        .filter_map(|re| re.captures(text))
        .filter_map(|caps| Some((caps.get(0)?.start(), caps.get(1)?.as_str().to_string())))
        .min_by_key(|(start, _)| *start)
        .map(|(_, name)| name)
}

/// Highest qualification mentioned ("PhD", "MBA", "Master", "Bachelor").
pub fn extract_qualification(text: &str, patterns: &ExtractionPatterns) -> Option<String> {
    patterns
        .qualification
        .iter()
        .find(|(re, _)| re.is_match(text))
        .map(|(_, label)| label.clone())
}

/// Programs the text mentions by name, in precedence order.
pub fn extract_program_interest(text: &str, mentions: &ProgramMentions) -> Vec<ProgramTier> {
    let mut remaining = text.to_string();
    let mut found = Vec::new();
    for (tier, re) in &mentions.patterns {
        if re.is_match(&remaining) {
            found.push(*tier);
            remaining = re.replace_all(&remaining, " ").into_owned();
        }
    }
    found
}

/// True when the text asks for human contact or an appointment.
pub fn detect_handover(text: &str, patterns: &ExtractionPatterns) -> bool {
    let lower = text.to_lowercase();
    patterns.handover.iter().any(|kw| lower.contains(kw.as_str()))
}

/// Topic labels whose keywords appear in the text.
pub fn extract_topics(text: &str, patterns: &ExtractionPatterns) -> Vec<String> {
    let lower = text.to_lowercase();
    patterns
        .topics
        .iter()
        .filter(|t| t.keywords.iter().any(|kw| lower.contains(kw.as_str())))
        .map(|t| t.topic.clone())
        .collect()
}
