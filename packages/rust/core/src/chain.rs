//! Retrieval-augmented answering.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use execadvisor_conversation::Message;
use execadvisor_index::{RetrievedChunk, VectorStore};
use execadvisor_shared::Language;

use crate::llm::{ChatMessage, LlmClient};
use crate::messages;
use crate::prompts::system_prompt;

/// Prior messages sent along with each question.
const HISTORY_WINDOW: usize = 10;

/// How an answer came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerKind {
    /// Generated by the model from retrieved context.
    Generated,
    /// Nothing relevant was retrieved; the confidence fallback was returned.
    NoContext,
    /// Retrieval or generation failed; the query-exception message was returned.
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainAnswer {
    pub text: String,
    pub kind: AnswerKind,
    /// Sources of the chunks used as context, deduplicated in rank order.
    pub sources: Vec<String>,
}

impl ChainAnswer {
    fn fixed(text: &str, kind: AnswerKind) -> Self {
        Self {
            text: text.to_string(),
            kind,
            sources: Vec::new(),
        }
    }
}

/// Retrieves program chunks and asks the model to answer from them.
pub struct RagChain {
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LlmClient>,
    top_k: usize,
}

impl RagChain {
    pub fn new(store: Arc<dyn VectorStore>, llm: Arc<dyn LlmClient>, top_k: usize) -> Self {
        Self {
            store,
            llm,
            top_k: top_k.max(1),
        }
    }

    /// Answer with the plain advisor prompt for `language`.
    pub async fn answer(&self, question: &str, language: Language, history: &[Message]) -> ChainAnswer {
        self.answer_with_prompt(question, language, history, system_prompt(language))
            .await
    }

    /// Answer with a caller-supplied system prompt (e.g. including the user profile).
    #[instrument(skip_all, fields(language = %language, top_k = self.top_k))]
    pub async fn answer_with_prompt(
        &self,
        question: &str,
        language: Language,
        history: &[Message],
        system: String,
    ) -> ChainAnswer {
        let chunks = match self.store.search(language, question, self.top_k).await {
            Ok(chunks) => chunks,
            Err(e) => {
                error!(error = %e, "retrieval failed");
                return ChainAnswer::fixed(messages::query_exception(language), AnswerKind::Failed);
            }
        };
        if chunks.is_empty() {
            info!("no context retrieved");
            return ChainAnswer::fixed(
                messages::confidence_fallback(language),
                AnswerKind::NoContext,
            );
        }

        let request = build_messages(question, history, &chunks, system);
        match self.llm.complete(&request).await {
            Ok(text) => {
                info!(chunks = chunks.len(), model = self.llm.model(), "answer generated");
                ChainAnswer {
                    text,
                    kind: AnswerKind::Generated,
                    sources: sources(&chunks),
                }
            }
            Err(e) => {
                warn!(error = %e, "generation failed");
                ChainAnswer::fixed(messages::query_exception(language), AnswerKind::Failed)
            }
        }
    }
}

/// Context blocks separated by blank lines.
pub fn format_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(RetrievedChunk::context_block)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn sources(chunks: &[RetrievedChunk]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for chunk in chunks {
        if !out.contains(&chunk.source) {
            out.push(chunk.source.clone());
        }
    }
    out
}

fn build_messages(
    question: &str,
    history: &[Message],
    chunks: &[RetrievedChunk],
    system: String,
) -> Vec<ChatMessage> {
    let mut request = vec![ChatMessage::system(system)];
    let start = history.len().saturating_sub(HISTORY_WINDOW);
    request.extend(history[start..].iter().map(ChatMessage::from));
    request.push(ChatMessage::user(format!(
        "Context:\n{}\n\nQuestion: {question}",
        format_context(chunks)
    )));
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedLlm;
    use execadvisor_index::{Chunk, InMemoryStore};

    fn chunk(body: &str, source: &str) -> Chunk {
        Chunk {
            body: body.into(),
            chunk_id: format!("c-{source}"),
            document_id: format!("d-{source}"),
            programs: vec!["iemba".into()],
            source: source.into(),
            date: "2025-01-01T00:00:00Z".into(),
        }
    }

    async fn store_with_iemba() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::default());
        store.ensure_collections().await.unwrap();
        store
            .store_batch(
                Language::En,
                &[chunk("The IEMBA tuition is CHF 86000", "https://emba.unisg.ch/iemba")],
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn answers_from_context() {
        let store = store_with_iemba().await;
        let llm = Arc::new(ScriptedLlm::ok("About CHF 85-90k."));
        let chain = RagChain::new(store, llm.clone(), 8);

        let history = vec![Message::user("Hi"), Message::assistant("Hello!")];
        let answer = chain.answer("IEMBA tuition", Language::En, &history).await;
        assert_eq!(answer.kind, AnswerKind::Generated);
        assert_eq!(answer.text, "About CHF 85-90k.");
        assert_eq!(answer.sources, vec!["https://emba.unisg.ch/iemba"]);

        let requests = llm.requests.lock().unwrap();
        let sent = &requests[0];
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[0].role, "system");
        assert_eq!(sent[2].content, "Hello!");
        assert!(sent[3].content.contains("Source: https://emba.unisg.ch/iemba\nPrograms: iemba"));
        assert!(sent[3].content.ends_with("Question: IEMBA tuition"));
    }

    #[tokio::test]
    async fn empty_retrieval_returns_fallback() {
        let store = store_with_iemba().await;
        let llm = Arc::new(ScriptedLlm::ok("unused"));
        let chain = RagChain::new(store, llm.clone(), 8);

        let answer = chain.answer("Parkplatz", Language::De, &[]).await;
        assert_eq!(answer.kind, AnswerKind::NoContext);
        assert_eq!(answer.text, messages::confidence_fallback(Language::De));
        assert!(llm.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn llm_failure_becomes_exception_message() {
        let store = store_with_iemba().await;
        let chain = RagChain::new(store, Arc::new(ScriptedLlm::failing()), 8);

        let answer = chain.answer("IEMBA tuition", Language::En, &[]).await;
        assert_eq!(answer.kind, AnswerKind::Failed);
        assert_eq!(answer.text, messages::query_exception(Language::En));
    }

    #[tokio::test]
    async fn missing_collection_becomes_exception_message() {
        let store = Arc::new(InMemoryStore::default());
        let chain = RagChain::new(store, Arc::new(ScriptedLlm::ok("unused")), 8);

        let answer = chain.answer("IEMBA tuition", Language::En, &[]).await;
        assert_eq!(answer.kind, AnswerKind::Failed);
    }
}
