//! Per-turn conversation state updates.

use tracing::{debug, info, instrument};

use execadvisor_shared::{ConversationConfig, ProgramTier, detect_language};

use crate::extract;
use crate::patterns::{ExtractionPatterns, ReferenceData};
use crate::recommend::recommend;
use crate::snapshot::{ProfileLogger, ProfileSnapshot};
use crate::state::{ConversationState, Message, UserProfile};

/// What changed during one user turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnOutcome {
    /// Set when the program went from unset to set on this turn.
    pub newly_suggested: Option<ProgramTier>,
    /// True when this turn asked for human contact for the first time.
    pub handover_started: bool,
    /// The snapshot emitted on this turn, if any.
    pub snapshot: Option<ProfileSnapshot>,
}

/// Applies extraction, recommendation, handover detection and snapshot
/// logging to a [`ConversationState`].
#[derive(Debug, Clone)]
pub struct ConversationEngine {
    config: ConversationConfig,
    reference: ReferenceData,
    logger: Option<ProfileLogger>,
}

impl ConversationEngine {
    /// Engine with the default pattern tables, logging to
    /// `config.profile_log_dir`.
    pub fn new(config: ConversationConfig) -> Self {
        let logger = ProfileLogger::new(&config.profile_log_dir);
        Self {
            config,
            reference: ReferenceData::default(),
            logger: Some(logger),
        }
    }

    /// Replace the extraction tables and recommendation thresholds.
    pub fn with_reference_data(mut self, reference: ReferenceData) -> Self {
        self.reference = reference;
        self
    }

    /// Replace the snapshot logger; `None` keeps snapshots in memory only.
    pub fn with_logger(mut self, logger: Option<ProfileLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &ConversationConfig {
        &self.config
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    /// Record a user message and update the state.
    #[instrument(skip_all, fields(user_id = %state.user_id, turn = state.message_count + 1))]
    pub fn process_turn(&self, state: &mut ConversationState, text: &str) -> TurnOutcome {
        state.messages.push(Message::user(text));
        state.message_count += 1;

        if state.user_language.is_none() {
            let lang = detect_language(text);
            info!(language = %lang, "locked conversation language");
            state.user_language = Some(lang);
        }

        let mut outcome = TurnOutcome::default();

        let asks_for_handover = self
            .reference
            .table(state.language())
            .is_some_and(|table| extract::detect_handover(text, table));
        if asks_for_handover && !state.handover_requested {
            info!("handover requested");
            state.handover_requested = true;
            outcome.handover_started = true;
        }

        if !self.config.track_user_profile {
            return outcome;
        }

        for topic in self
            .reference
            .table(state.language())
            .map(|t| extract::extract_topics(text, t))
            .unwrap_or_default()
        {
            if !state.topics_discussed.contains(&topic) {
                state.topics_discussed.push(topic);
            }
        }

        let extracted = self.extract_profile(state);
        state.profile.merge(extracted);

        let previous = state.suggested_program;
        if let Some(tier) = recommend(&state.profile, &self.reference.rules) {
            if previous != Some(tier) {
                info!(program = %tier, "suggested program updated");
            }
            state.suggested_program = Some(tier);
        }
        if previous.is_none() {
            outcome.newly_suggested = state.suggested_program;
        }

        let interval = self.config.snapshot_interval.max(1);
        if state.message_count % interval == 0 || outcome.newly_suggested.is_some() {
            let snapshot = ProfileSnapshot::capture(state);
            if let Some(logger) = &self.logger {
                logger.log_detached(snapshot.clone());
            }
            outcome.snapshot = Some(snapshot);
        }

        debug!(profile = ?state.profile, "profile after turn");
        outcome
    }

    /// Record an assistant reply in the history.
    pub fn record_assistant(&self, state: &mut ConversationState, text: &str) {
        state.messages.push(Message::assistant(text));
    }

    /// Run every extractor over the full user history.
    ///
    /// Tables are tried with the session language first; the first table that
    /// yields a value wins. Interests are collected across all tables.
    fn extract_profile(&self, state: &ConversationState) -> UserProfile {
        let history = state.user_history();
        let tables = self.reference.ordered_for(state.language());

        let first = |f: fn(&str, &ExtractionPatterns) -> Option<String>| {
            tables.iter().copied().find_map(|t| f(&history, t))
        };
        let first_num = |f: fn(&str, &ExtractionPatterns) -> Option<u32>| {
            tables.iter().copied().find_map(|t| f(&history, t))
        };

        let mut interests: Vec<&str> = Vec::new();
        for table in tables.iter().copied() {
            for topic in extract::matching_interests(&history, table) {
                if !interests.contains(&topic) {
                    interests.push(topic);
                }
            }
        }

        UserProfile {
            user_name: first(extract::extract_user_name),
            experience_years: first_num(extract::extract_experience_years),
            leadership_years: first_num(extract::extract_leadership_years),
            field: first(extract::extract_field),
            interest: (!interests.is_empty()).then(|| interests.join(", ")),
            qualification_level: first(extract::extract_qualification),
            program_interest: extract::extract_program_interest(&history, &self.reference.programs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use execadvisor_shared::Language;

    fn engine() -> ConversationEngine {
        ConversationEngine::new(ConversationConfig::default()).with_logger(None)
    }

    #[test]
    fn language_locks_on_first_message() {
        let engine = engine();
        let mut state = ConversationState::new("u1");
        engine.process_turn(&mut state, "Welche Voraussetzungen gibt es für das EMBA?");
        assert_eq!(state.user_language, Some(Language::De));

        engine.process_turn(&mut state, "What does the program cost in total?");
        assert_eq!(state.user_language, Some(Language::De));
    }

    #[test]
    fn preset_language_is_kept() {
        let engine = engine();
        let mut state = ConversationState::with_language("u1", Language::En);
        engine.process_turn(&mut state, "Ich habe eine Frage zu den Kosten");
        assert_eq!(state.user_language, Some(Language::En));
    }

    #[test]
    fn extraction_runs_over_full_history() {
        let engine = engine();
        let mut state = ConversationState::new("u1");
        engine.process_turn(&mut state, "I have 8 years of experience in banking.");
        let outcome = engine.process_turn(&mut state, "I also have 3 years of leadership experience.");

        assert_eq!(state.profile.experience_years, Some(8));
        assert_eq!(state.profile.leadership_years, Some(3));
        assert_eq!(state.profile.field.as_deref(), Some("banking"));
        assert_eq!(state.suggested_program, Some(ProgramTier::Emba));
        // IEMBA was already suggested on the first turn
        assert_eq!(outcome.newly_suggested, None);
    }

    #[test]
    fn first_suggestion_emits_snapshot() {
        let engine = engine();
        let mut state = ConversationState::new("u1");
        let first = engine.process_turn(&mut state, "Hello, tell me about your programs");
        assert!(first.snapshot.is_none());

        let second = engine.process_turn(&mut state, "I have 6 years of experience");
        assert_eq!(second.newly_suggested, Some(ProgramTier::Iemba));
        let snapshot = second.snapshot.expect("snapshot on new suggestion");
        assert_eq!(snapshot.suggested_program, Some(ProgramTier::Iemba));
        assert_eq!(snapshot.experience_years, Some(6));
    }

    #[test]
    fn snapshot_every_fifth_message() {
        let engine = engine();
        let mut state = ConversationState::new("u1");
        let outcomes: Vec<_> = (0..10)
            .map(|i| engine.process_turn(&mut state, &format!("Question number {i} about the curriculum")))
            .collect();

        let emitted: Vec<usize> = outcomes
            .iter()
            .enumerate()
            .filter(|(_, o)| o.snapshot.is_some())
            .map(|(i, _)| i + 1)
            .collect();
        assert_eq!(emitted, vec![5, 10]);
    }

    #[test]
    fn german_technology_interest_suggests_emba_x() {
        let engine = engine();
        let mut state = ConversationState::new("u1");
        let outcome = engine.process_turn(
            &mut state,
            "Ich interessiere mich sehr für Technologie und die Zukunft der Arbeit",
        );
        assert_eq!(state.user_language, Some(Language::De));
        assert_eq!(state.profile.interest.as_deref(), Some("technologie"));
        assert_eq!(state.suggested_program, Some(ProgramTier::EmbaX));
        assert_eq!(outcome.newly_suggested, Some(ProgramTier::EmbaX));
    }

    #[test]
    fn suggestion_is_never_cleared() {
        let engine = engine();
        let mut state = ConversationState::new("u1");
        engine.process_turn(&mut state, "I am interested in digital transformation");
        assert_eq!(state.suggested_program, Some(ProgramTier::EmbaX));

        engine.process_turn(&mut state, "What are the deadlines?");
        assert_eq!(state.suggested_program, Some(ProgramTier::EmbaX));

        engine.process_turn(&mut state, "I have 7 years of experience");
        assert_eq!(state.suggested_program, Some(ProgramTier::Iemba));
    }

    #[test]
    fn handover_is_sticky() {
        let engine = engine();
        let mut state = ConversationState::new("u1");
        engine.process_turn(&mut state, "What does the IEMBA cost?");
        assert!(!state.handover_requested);

        let outcome = engine.process_turn(&mut state, "Can I book an appointment with an advisor?");
        assert!(outcome.handover_started);
        assert!(state.handover_requested);

        let later = engine.process_turn(&mut state, "Thanks, what about the curriculum?");
        assert!(!later.handover_started);
        assert!(state.handover_requested);
    }

    #[test]
    fn disabled_tracking_skips_extraction_and_logging() {
        let config = ConversationConfig {
            track_user_profile: false,
            ..Default::default()
        };
        let engine = ConversationEngine::new(config).with_logger(None);
        let mut state = ConversationState::new("u1");
        let mut snapshots = 0;
        for _ in 0..5 {
            let outcome = engine.process_turn(&mut state, "I have 10 years of experience");
            snapshots += usize::from(outcome.snapshot.is_some());
        }

        assert_eq!(snapshots, 0);
        assert!(state.profile.is_empty());
        assert_eq!(state.suggested_program, None);
        assert_eq!(state.message_count, 5);
        assert_eq!(state.user_language, Some(Language::En));
    }

    #[test]
    fn program_mentions_accumulate() {
        let engine = engine();
        let mut state = ConversationState::new("u1");
        engine.process_turn(&mut state, "Tell me about the IEMBA");
        engine.process_turn(&mut state, "And how does emba X compare?");
        assert_eq!(
            state.profile.program_interest,
            vec![ProgramTier::Iemba, ProgramTier::EmbaX]
        );
    }

    #[test]
    fn snapshots_are_written_to_log_dir() {
        let dir = std::env::temp_dir().join(format!("execadvisor-engine-{}", uuid::Uuid::now_v7()));
        let engine = ConversationEngine::new(ConversationConfig::default())
            .with_logger(Some(ProfileLogger::new(&dir)));
        let mut state = ConversationState::new("u1");
        engine.process_turn(&mut state, "I have 6 years of experience");

        let files: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
        assert_eq!(files.len(), 1);
    }
}
