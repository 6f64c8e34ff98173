//! Heuristic English/German language detection.
//!
//! Short replies ("ja bitte", "ok thanks") are classified from small
//! dictionaries of conversational words; longer text by stopword frequency.

use crate::types::Language;

const SHORT_WORDS_DE: &[&str] = &[
    "ja", "nein", "danke", "bitte", "ok", "gut", "hallo", "hi", "hey", "genau", "stimmt", "klar",
    "super", "prima", "toll", "schön", "mehr", "weniger", "was", "wie", "wo", "wann", "warum",
    "wer", "und", "oder", "aber", "doch", "noch", "schon", "jetzt", "hier", "gerne", "natürlich",
    "sicher", "vielleicht", "also", "ach", "aha",
];

const SHORT_WORDS_EN: &[&str] = &[
    "yes", "no", "thanks", "please", "ok", "okay", "good", "hello", "hi", "hey", "right", "sure",
    "great", "nice", "cool", "fine", "perfect", "more", "less", "what", "how", "where", "when",
    "why", "who", "and", "or", "but", "yet", "now", "here", "there", "maybe", "probably",
    "definitely", "certainly", "alright",
];

const STOPWORDS_DE: &[&str] = &[
    "der", "die", "das", "und", "ist", "ich", "nicht", "mit", "für", "ein", "eine", "einen", "zu",
    "auf", "sie", "wie", "was", "welche", "welches", "haben", "habe", "bei", "von", "den", "dem",
    "des", "im", "auch", "es", "mein", "meine", "kann", "gibt", "über", "wir", "sind",
];

const STOPWORDS_EN: &[&str] = &[
    "the", "and", "is", "i", "not", "with", "for", "a", "an", "to", "on", "you", "what", "which",
    "have", "has", "of", "in", "are", "do", "does", "my", "about", "it", "can", "there", "we",
    "be", "how", "your",
];

/// Inputs with at most this many words use the short-word dictionaries.
const SHORT_INPUT_WORDS: usize = 3;

fn words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

/// Classify a short input (at most three words) by dictionary matches.
///
/// Returns `None` for longer inputs and for ties, including inputs such as
/// "ok" that appear in both dictionaries.
pub fn detect_short(text: &str) -> Option<Language> {
    let words = words(text);
    if words.is_empty() || words.len() > SHORT_INPUT_WORDS {
        return None;
    }

    let de = words.iter().filter(|w| SHORT_WORDS_DE.contains(&w.as_str())).count();
    let en = words.iter().filter(|w| SHORT_WORDS_EN.contains(&w.as_str())).count();

    match de.cmp(&en) {
        std::cmp::Ordering::Greater => Some(Language::De),
        std::cmp::Ordering::Less => Some(Language::En),
        std::cmp::Ordering::Equal => None,
    }
}

/// Detect the language of `text`, defaulting to English when undecided.
pub fn detect_language(text: &str) -> Language {
    if let Some(lang) = detect_short(text) {
        return lang;
    }

    let words = words(text);
    let mut de = words
        .iter()
        .filter(|w| STOPWORDS_DE.contains(&w.as_str()))
        .count();
    let en = words
        .iter()
        .filter(|w| STOPWORDS_EN.contains(&w.as_str()))
        .count();

    if text.chars().any(|c| matches!(c, 'ä' | 'ö' | 'ü' | 'ß' | 'Ä' | 'Ö' | 'Ü')) {
        de += 2;
    }

    if de > en { Language::De } else { Language::En }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_inputs_use_dictionaries() {
        assert_eq!(detect_short("ja bitte"), Some(Language::De));
        assert_eq!(detect_short("yes please!"), Some(Language::En));
        assert_eq!(detect_short("ok"), None);
        assert_eq!(detect_short("this has four words"), None);
    }

    #[test]
    fn longer_inputs_use_stopwords() {
        assert_eq!(
            detect_language("Welche Voraussetzungen gibt es für das EMBA Programm?"),
            Language::De
        );
        assert_eq!(
            detect_language("What are the admission requirements for the IEMBA?"),
            Language::En
        );
    }

    #[test]
    fn umlauts_tip_the_balance() {
        assert_eq!(detect_language("Kosten Gebühren Förderung Studium"), Language::De);
    }

    #[test]
    fn undecided_defaults_to_english() {
        assert_eq!(detect_language("ok"), Language::En);
        assert_eq!(detect_language(""), Language::En);
    }
}
