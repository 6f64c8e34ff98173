//! One advisor chat session.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use execadvisor_conversation::{
    ConversationEngine, ConversationState, InputHandler, ScopeGuardian, ScopeKeywords, ScopeKind,
    UserInput,
};
use execadvisor_shared::{CacheConfig, Language};
use execadvisor_storage::{Storage, cache_key};

use crate::chain::{AnswerKind, RagChain};
use crate::formatter::format_answer;
use crate::messages;
use crate::prompts::session_prompt;

/// Why a reply has the text it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Answer,
    Cached,
    NoContext,
    Failed,
    InvalidInput,
    Redirect(ScopeKind),
    Escalated,
    ConversationEnd,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub text: String,
    pub kind: ReplyKind,
    /// Booking links to show below the reply.
    pub appointment_links: Option<String>,
}

impl ChatReply {
    fn new(text: impl Into<String>, kind: ReplyKind) -> Self {
        Self {
            text: text.into(),
            kind,
            appointment_links: None,
        }
    }

    fn with_links(mut self, language: Language) -> Self {
        self.appointment_links = Some(messages::appointment_links(language));
        self
    }

    /// Reply text followed by the booking links, if any.
    pub fn render(&self) -> String {
        match &self.appointment_links {
            Some(links) => format!("{}\n\n{links}", self.text),
            None => self.text.clone(),
        }
    }
}

/// Answer cache backed by the local database.
#[derive(Clone)]
pub struct AnswerCache {
    storage: Arc<Storage>,
    ttl_secs: u64,
}

impl AnswerCache {
    pub fn new(storage: Arc<Storage>, config: &CacheConfig) -> Option<Self> {
        config.enabled.then(|| Self {
            storage,
            ttl_secs: config.ttl_secs,
        })
    }

    async fn get(&self, key: &str) -> Option<String> {
        match self.storage.cache_get(key).await {
            Ok(Some(json)) => serde_json::from_str(&json)
                .map_err(|e| warn!(key, error = %e, "discarding malformed cache entry"))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "cache lookup failed");
                None
            }
        }
    }

    async fn set(&self, key: &str, answer: &str) {
        let json = match serde_json::to_string(answer) {
            Ok(json) => json,
            Err(e) => {
                warn!(key, error = %e, "failed to encode answer");
                return;
            }
        };
        if let Err(e) = self.storage.cache_set(key, &json, self.ttl_secs).await {
            warn!(key, error = %e, "cache write failed");
        }
    }
}

/// Drives a single user's conversation.
pub struct ChatSession {
    state: ConversationState,
    engine: Arc<ConversationEngine>,
    guardian: Arc<ScopeGuardian>,
    chain: Arc<RagChain>,
    cache: Option<AnswerCache>,
    ended: bool,
}

impl ChatSession {
    pub fn new(
        user_id: impl Into<String>,
        engine: Arc<ConversationEngine>,
        chain: Arc<RagChain>,
    ) -> Self {
        Self {
            state: ConversationState::new(user_id),
            engine,
            guardian: Arc::new(ScopeGuardian::new(ScopeKeywords::default())),
            chain,
            cache: None,
            ended: false,
        }
    }

    /// Fix the session language instead of detecting it from the first message.
    pub fn with_language(mut self, language: Language) -> Self {
        self.state.user_language = Some(language);
        self
    }

    pub fn with_cache(mut self, cache: Option<AnswerCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_guardian(mut self, guardian: Arc<ScopeGuardian>) -> Self {
        self.guardian = guardian;
        self
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Greeting in the session language.
    pub fn greeting(&self) -> &'static str {
        messages::greeting(self.state.language())
    }

    /// Handle one user message and produce the advisor's reply.
    #[instrument(skip_all, fields(user_id = %self.state.user_id, turn = self.state.message_count + 1))]
    pub async fn respond(&mut self, input: &str) -> ChatReply {
        let max_turns = self.engine.config().max_conversation_turns;
        if self.ended || self.state.message_count >= max_turns {
            self.ended = true;
            let language = self.state.language();
            info!(max_turns, "conversation limit reached");
            return ChatReply::new(messages::conversation_end(language), ReplyKind::ConversationEnd)
                .with_links(language);
        }

        let text = match InputHandler::process(input, self.state.last_assistant_message()) {
            UserInput::Text(text) => text,
            UserInput::Invalid => {
                return ChatReply::new(
                    messages::not_valid_query(self.state.language()),
                    ReplyKind::InvalidInput,
                );
            }
        };

        let outcome = self.engine.process_turn(&mut self.state, &text);
        let language = self.state.language();

        let scope = self.guardian.check_scope(&text);
        if scope != ScopeKind::OnTopic {
            let attempt = self.state.record_scope_violation(scope);
            let reply = match self.guardian.should_escalate(scope, attempt) {
                Some(escalation) => {
                    info!(?scope, attempt, "escalating to admissions team");
                    self.state.handover_requested = true;
                    ChatReply::new(
                        self.guardian.escalation_message(escalation, language),
                        ReplyKind::Escalated,
                    )
                    .with_links(language)
                }
                None => ChatReply::new(
                    self.guardian.redirect_message(scope, language),
                    ReplyKind::Redirect(scope),
                ),
            };
            self.engine.record_assistant(&mut self.state, &reply.text);
            return reply;
        }

        let mut reply = self.answer(&text, language).await;
        if outcome.handover_started || reply.kind == ReplyKind::NoContext {
            reply = reply.with_links(language);
        }
        self.engine.record_assistant(&mut self.state, &reply.text);
        reply
    }

    async fn answer(&self, question: &str, language: Language) -> ChatReply {
        let key = cache_key(language, question);
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(&key).await {
                debug!(key, "answer cache hit");
                return ChatReply::new(cached, ReplyKind::Cached);
            }
        }

        // The current question is the last message; it is sent separately.
        let history = &self.state.messages[..self.state.messages.len().saturating_sub(1)];
        let answer = self
            .chain
            .answer_with_prompt(question, language, history, session_prompt(&self.state))
            .await;

        match answer.kind {
            AnswerKind::Generated => {
                let max_words = self.engine.config().max_response_words;
                let text = format_answer(&answer.text, max_words, language);
                if let Some(cache) = &self.cache {
                    cache.set(&key, &text).await;
                }
                ChatReply::new(text, ReplyKind::Answer)
            }
            AnswerKind::NoContext => ChatReply::new(answer.text, ReplyKind::NoContext),
            AnswerKind::Failed => ChatReply::new(answer.text, ReplyKind::Failed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedLlm;
    use execadvisor_index::{Chunk, InMemoryStore, VectorStore};
    use execadvisor_shared::ConversationConfig;
    use uuid::Uuid;

    async fn store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::default());
        store.ensure_collections().await.unwrap();
        for (lang, body) in [
            (Language::En, "The IEMBA program costs CHF 86000 and lasts 18 months"),
            (Language::De, "Das EMBA Programm kostet CHF 79500 und dauert 18 Monate"),
        ] {
            let chunk = Chunk {
                body: body.into(),
                chunk_id: format!("c-{lang}"),
                document_id: format!("d-{lang}"),
                programs: vec!["emba".into()],
                source: "https://emba.unisg.ch".into(),
                date: "2025-01-01T00:00:00Z".into(),
            };
            store.store_batch(lang, &[chunk]).await.unwrap();
        }
        store
    }

    fn engine(max_turns: usize) -> Arc<ConversationEngine> {
        let config = ConversationConfig {
            max_conversation_turns: max_turns,
            ..ConversationConfig::default()
        };
        Arc::new(ConversationEngine::new(config).with_logger(None))
    }

    async fn session(llm: Arc<ScriptedLlm>, max_turns: usize) -> ChatSession {
        let chain = Arc::new(RagChain::new(store().await, llm, 4));
        ChatSession::new("user-1", engine(max_turns), chain)
    }

    #[tokio::test]
    async fn answers_and_records_history() {
        let llm = Arc::new(ScriptedLlm::ok("The **IEMBA** costs around CHF 85-90k."));
        let mut chat = session(llm.clone(), 30).await;

        let reply = chat.respond("How much does the IEMBA program cost?").await;
        assert_eq!(reply.kind, ReplyKind::Answer);
        assert!(reply.appointment_links.is_none());
        assert_eq!(chat.state().messages.len(), 2);
        assert_eq!(chat.state().last_assistant_message(), Some(reply.text.as_str()));
        assert_eq!(chat.state().user_language, Some(Language::En));

        let sent = &llm.requests.lock().unwrap()[0];
        assert_eq!(sent.len(), 2, "system prompt and question only");
    }

    #[tokio::test]
    async fn blank_input_is_rejected() {
        let mut chat = session(Arc::new(ScriptedLlm::ok("unused")), 30).await;
        let reply = chat.respond("   ").await;
        assert_eq!(reply.kind, ReplyKind::InvalidInput);
        assert_eq!(chat.state().message_count, 0);
    }

    #[tokio::test]
    async fn off_topic_redirects_then_escalates() {
        let llm = Arc::new(ScriptedLlm::ok("unused"));
        let mut chat = session(llm.clone(), 30).await.with_language(Language::En);

        let first = chat.respond("What is the weather today?").await;
        assert_eq!(first.kind, ReplyKind::Redirect(ScopeKind::OffTopic));
        assert!(first.appointment_links.is_none());

        let second = chat.respond("Tell me about the weather tomorrow").await;
        assert_eq!(second.kind, ReplyKind::Escalated);
        assert!(second.appointment_links.is_some());
        assert!(chat.state().handover_requested);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn conversation_ends_after_max_turns() {
        let llm = Arc::new(ScriptedLlm::ok("IEMBA answer"));
        let mut chat = session(llm.clone(), 1).await;

        chat.respond("How long is the IEMBA program?").await;
        let reply = chat.respond("And the costs of the IEMBA?").await;
        assert_eq!(reply.kind, ReplyKind::ConversationEnd);
        assert!(reply.render().contains("calendly.com"));
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn no_context_carries_links() {
        let mut chat = session(Arc::new(ScriptedLlm::ok("unused")), 30).await;
        let reply = chat.respond("Wo kann ich mein Auto parkieren? Gibt es Parkplätze?").await;
        assert_eq!(reply.kind, ReplyKind::NoContext);
        assert_eq!(reply.text, messages::confidence_fallback(Language::De));
        assert!(reply.appointment_links.unwrap().contains("Termin buchen"));
    }

    #[tokio::test]
    async fn llm_failure_does_not_escape() {
        let mut chat = session(Arc::new(ScriptedLlm::failing()), 30).await;
        let reply = chat.respond("How much does the IEMBA program cost?").await;
        assert_eq!(reply.kind, ReplyKind::Failed);
        assert_eq!(reply.text, messages::query_exception(Language::En));
    }

    #[tokio::test]
    async fn cached_answers_skip_the_model() {
        let path = std::env::temp_dir().join(format!("execadvisor_chat_{}.db", Uuid::now_v7()));
        let storage = Arc::new(Storage::open(&path).await.unwrap());
        let cache = AnswerCache::new(storage, &CacheConfig::default());

        let llm = Arc::new(ScriptedLlm::ok("Around CHF 85-90k."));
        let mut first = session(llm.clone(), 30).await.with_cache(cache.clone());
        let reply = first.respond("How much does the IEMBA program cost?").await;
        assert_eq!(reply.kind, ReplyKind::Answer);

        let mut second = session(llm.clone(), 30).await.with_cache(cache);
        let reply = second.respond("how much does the IEMBA program cost").await;
        assert_eq!(reply.kind, ReplyKind::Cached);
        assert_eq!(reply.text, "Around CHF 85-90k.");
        assert_eq!(llm.calls(), 1);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn disabled_cache_is_none() {
        let path = std::env::temp_dir().join(format!("execadvisor_chat_{}.db", Uuid::now_v7()));
        let storage = Arc::new(Storage::open(&path).await.unwrap());
        let config = CacheConfig {
            enabled: false,
            ttl_secs: 10,
        };
        assert!(AnswerCache::new(storage, &config).is_none());
        let _ = std::fs::remove_file(&path);
    }
}
