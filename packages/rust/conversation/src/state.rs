//! Per-session conversation state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use execadvisor_shared::{Language, ProgramTier};

use crate::scope::ScopeKind;

/// Who sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of the dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Profile signals extracted from the dialogue so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_name: Option<String>,
    pub experience_years: Option<u32>,
    pub leadership_years: Option<u32>,
    pub field: Option<String>,
    pub interest: Option<String>,
    pub qualification_level: Option<String>,
    pub program_interest: Vec<ProgramTier>,
}

impl UserProfile {
    /// Merge newly extracted values; unset values never erase known ones.
    pub fn merge(&mut self, other: UserProfile) {
        fn keep<T>(slot: &mut Option<T>, new: Option<T>) {
            if new.is_some() {
                *slot = new;
            }
        }

        keep(&mut self.user_name, other.user_name);
        keep(&mut self.experience_years, other.experience_years);
        keep(&mut self.leadership_years, other.leadership_years);
        keep(&mut self.field, other.field);
        keep(&mut self.interest, other.interest);
        keep(&mut self.qualification_level, other.qualification_level);

        for tier in other.program_interest {
            if !self.program_interest.contains(&tier) {
                self.program_interest.push(tier);
            }
        }
    }

    /// True while nothing is known about the user.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Everything tracked for one chat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub user_id: String,
    /// Locked from the first message and never changed afterwards.
    pub user_language: Option<Language>,
    pub messages: Vec<Message>,
    pub profile: UserProfile,
    pub suggested_program: Option<ProgramTier>,
    pub handover_requested: bool,
    /// Number of user messages received.
    pub message_count: usize,
    pub topics_discussed: Vec<String>,
    pub scope_attempts: BTreeMap<ScopeKind, u32>,
}

impl ConversationState {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_language: None,
            messages: Vec::new(),
            profile: UserProfile::default(),
            suggested_program: None,
            handover_requested: false,
            message_count: 0,
            topics_discussed: Vec::new(),
            scope_attempts: BTreeMap::new(),
        }
    }

    /// Start a session with the language fixed up front.
    pub fn with_language(user_id: impl Into<String>, language: Language) -> Self {
        Self {
            user_language: Some(language),
            ..Self::new(user_id)
        }
    }

    /// The locked language, English until the first message arrives.
    pub fn language(&self) -> Language {
        self.user_language.unwrap_or_default()
    }

    /// All user messages joined by newlines.
    pub fn user_history(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The most recent assistant reply, if any.
    pub fn last_assistant_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
    }

    /// Count one more violation of `kind` and return the new total.
    pub fn record_scope_violation(&mut self, kind: ScopeKind) -> u32 {
        let count = self.scope_attempts.entry(kind).or_insert(0);
        *count += 1;
        *count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_never_erases() {
        let mut profile = UserProfile {
            experience_years: Some(8),
            field: Some("banking".into()),
            program_interest: vec![ProgramTier::Emba],
            ..Default::default()
        };
        profile.merge(UserProfile {
            leadership_years: Some(3),
            program_interest: vec![ProgramTier::Emba, ProgramTier::EmbaX],
            ..Default::default()
        });

        assert_eq!(profile.experience_years, Some(8));
        assert_eq!(profile.leadership_years, Some(3));
        assert_eq!(profile.field.as_deref(), Some("banking"));
        assert_eq!(
            profile.program_interest,
            vec![ProgramTier::Emba, ProgramTier::EmbaX]
        );
    }

    #[test]
    fn history_helpers() {
        let mut state = ConversationState::new("u1");
        state.messages.push(Message::user("hello"));
        state.messages.push(Message::assistant("How many years?"));
        state.messages.push(Message::user("10"));

        assert_eq!(state.user_history(), "hello\n10");
        assert_eq!(state.last_assistant_message(), Some("How many years?"));
        assert_eq!(state.language(), Language::En);
    }

    #[test]
    fn scope_violations_accumulate() {
        let mut state = ConversationState::new("u1");
        assert_eq!(state.record_scope_violation(ScopeKind::OffTopic), 1);
        assert_eq!(state.record_scope_violation(ScopeKind::OffTopic), 2);
        assert_eq!(state.record_scope_violation(ScopeKind::Aggressive), 1);
    }
}
