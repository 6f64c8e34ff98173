//! Advisor logic for ExecAdvisor.
//!
//! Ties the conversation engine, the vector store and a chat-completion
//! model together into [`ChatSession`]s, and runs the indexing pipelines
//! that fill the store.

pub mod chain;
pub mod chat;
pub mod formatter;
pub mod llm;
pub mod messages;
pub mod pipeline;
pub mod prompts;

#[cfg(test)]
mod testing;

pub use chain::{AnswerKind, ChainAnswer, RagChain};
pub use chat::{AnswerCache, ChatReply, ChatSession, ReplyKind};
pub use llm::{ChatCompletionsClient, ChatMessage, LlmClient};
pub use pipeline::{
    ImportReport, ProgressReporter, SilentProgress, import_sources, index_programs, load_source,
};
