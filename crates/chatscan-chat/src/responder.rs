//! Single-turn chat replies with a fixed greeting and fallback.

use std::sync::Arc;

use tracing::{debug, warn};

use chatscan_core::config::LlmConfig;

use crate::llm::LlmClient;
use crate::types::{ChatTurn, CompletionRequest};

/// Produces a reply for a list of turns.
///
/// Never fails: an empty turn list yields the greeting without calling the
/// model, and any model error yields the fallback reply.
pub struct ChatResponder {
    client: Arc<dyn LlmClient>,
    model: String,
    temperature: f32,
    greeting: String,
    fallback: String,
}

impl ChatResponder {
    pub fn new(client: Arc<dyn LlmClient>, config: &LlmConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
            temperature: config.temperature,
            greeting: config.greeting.clone(),
            fallback: config.fallback_reply.clone(),
        }
    }

    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub async fn respond(&self, turns: &[ChatTurn]) -> String {
        if turns.is_empty() {
            debug!("No turns supplied, replying with greeting");
            return self.greeting.clone();
        }

        let request = CompletionRequest {
            model: self.model.clone(),
            messages: turns.to_vec(),
            temperature: self.temperature,
        };

        match self.client.complete(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(client = self.client.name(), error = %e, "Chat completion failed");
                self.fallback.clone()
            }
        }
    }

    /// Reply to one user message. The text is always sent, even when blank.
    pub async fn reply_to(&self, text: &str) -> String {
        self.respond(&[ChatTurn::user(text)]).await
    }
}
