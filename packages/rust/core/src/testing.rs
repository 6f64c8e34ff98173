//! Test doubles shared by the module tests.

use std::sync::Mutex;

use async_trait::async_trait;

use execadvisor_shared::{ExecAdvisorError, Result};

use crate::llm::{ChatMessage, LlmClient};

/// Records requests and answers with a fixed reply.
pub(crate) struct ScriptedLlm {
    reply: std::result::Result<String, String>,
    pub requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedLlm {
    pub fn ok(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: Err("model unavailable".into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.reply.clone().map_err(ExecAdvisorError::Llm)
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
