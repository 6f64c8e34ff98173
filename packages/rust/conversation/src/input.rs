//! User input normalization.
//!
//! A bare number like "7" only makes sense in light of the question that
//! prompted it, so numeric answers are rewritten into a full sentence based
//! on the last assistant message before extraction runs.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

static NUMERIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)?$").expect("valid regex"));

const EXPERIENCE_CUES: &[&str] = &["experience", "years", "worked", "arbeits", "erfahrung", "jahre"];
const AGE_CUES: &[&str] = &["age", "old", "alter", "jahre alt"];
const QUALIFICATION_CUES: &[&str] = &["qualification", "degree", "bachelor", "master", "qualifikation"];

/// Validated user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    /// Nothing usable was entered.
    Invalid,
    /// Text to feed into the conversation, possibly rewritten.
    Text(String),
}

/// Trims input and interprets bare numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputHandler;

impl InputHandler {
    /// True for inputs like "5" or "5.5".
    pub fn is_numeric(message: &str) -> bool {
        NUMERIC_RE.is_match(message.trim())
    }

    /// Rewrite a bare number using the last assistant message as context.
    ///
    /// Experience cues are checked first, then age, then qualification; with
    /// no cue the number is read as years of experience.
    pub fn interpret_numeric(number: &str, last_assistant: Option<&str>) -> String {
        let number = number.trim();
        let context = last_assistant.unwrap_or_default().to_lowercase();
        let cued = |cues: &[&str]| cues.iter().any(|cue| context.contains(cue));

        let sentence = if cued(EXPERIENCE_CUES) {
            format!("I have {number} years of work experience")
        } else if cued(AGE_CUES) {
            format!("I am {number} years old")
        } else if cued(QUALIFICATION_CUES) {
            match number {
                "1" => "I have a Bachelor's degree".to_string(),
                "2" => "I have a Master's degree".to_string(),
                "3" => "I have an MBA".to_string(),
                "4" => "I have a doctorate/PhD".to_string(),
                other => format!("My qualification level is {other}"),
            }
        } else {
            format!("I have {number} years of work experience")
        };

        debug!(number, interpreted = %sentence, "interpreted numeric input");
        sentence
    }

    /// Normalize raw input for the conversation.
    pub fn process(message: &str, last_assistant: Option<&str>) -> UserInput {
        let trimmed = message.trim();
        if trimmed.is_empty() {
            return UserInput::Invalid;
        }
        if Self::is_numeric(trimmed) {
            return UserInput::Text(Self::interpret_numeric(trimmed, last_assistant));
        }
        UserInput::Text(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_invalid() {
        assert_eq!(InputHandler::process("   ", None), UserInput::Invalid);
        assert_eq!(InputHandler::process("", None), UserInput::Invalid);
    }

    #[test]
    fn text_is_trimmed() {
        assert_eq!(
            InputHandler::process("  Tell me about IEMBA \n", None),
            UserInput::Text("Tell me about IEMBA".into())
        );
    }

    #[test]
    fn numeric_detection() {
        assert!(InputHandler::is_numeric("12"));
        assert!(InputHandler::is_numeric(" 5.5 "));
        assert!(!InputHandler::is_numeric("5 years"));
        assert!(!InputHandler::is_numeric("5."));
    }

    #[test]
    fn numbers_follow_context() {
        assert_eq!(
            InputHandler::interpret_numeric("8", Some("How many years of experience do you have?")),
            "I have 8 years of work experience"
        );
        assert_eq!(
            InputHandler::interpret_numeric("35", Some("How old are you?")),
            "I am 35 years old"
        );
        assert_eq!(
            InputHandler::interpret_numeric("2", Some("What is your highest degree? 1) Bachelor 2) Master")),
            "I have a Master's degree"
        );
        assert_eq!(
            InputHandler::interpret_numeric("9", Some("Which qualification do you have?")),
            "My qualification level is 9"
        );
    }

    #[test]
    fn number_without_context_is_experience() {
        assert_eq!(
            InputHandler::process("6", None),
            UserInput::Text("I have 6 years of work experience".into())
        );
        assert_eq!(
            InputHandler::process("6", Some("Welcome!")),
            UserInput::Text("I have 6 years of work experience".into())
        );
    }
}
