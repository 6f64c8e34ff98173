//! Conversation tracking and program recommendation for ExecAdvisor.
//!
//! [`ConversationEngine::process_turn`] drives one user turn: it locks the
//! session language, extracts profile signals from the whole user history,
//! re-evaluates the recommended program, detects handover requests and emits
//! [`ProfileSnapshot`]s. The keyword and pattern tables it uses live in
//! [`ReferenceData`] and can be replaced.

pub mod engine;
pub mod extract;
pub mod input;
pub mod patterns;
pub mod recommend;
pub mod scope;
pub mod snapshot;
pub mod state;

pub use engine::{ConversationEngine, TurnOutcome};
pub use extract::{
    detect_handover, extract_experience_years, extract_field, extract_interest,
    extract_leadership_years, extract_program_interest, extract_qualification, extract_topics,
    extract_user_name,
};
pub use input::{InputHandler, UserInput};
pub use patterns::{
    ExtractionPatterns, ProgramMentions, RecommendationRules, ReferenceData, TopicKeywords,
};
pub use recommend::recommend;
pub use scope::{Escalation, ScopeGuardian, ScopeKeywords, ScopeKind};
pub use snapshot::{ProfileLogger, ProfileSnapshot};
pub use state::{ConversationState, Message, Role, UserProfile};
