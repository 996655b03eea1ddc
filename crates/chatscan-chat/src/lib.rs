//! Language model access for chatscan.
//!
//! Provides the completion client trait and its OpenAI-compatible backend,
//! the single-turn chat responder, and the vision-model screenshot analyzer.

pub mod error;
pub mod llm;
pub mod responder;
pub mod types;
pub mod vision;

pub use error::ChatError;
pub use llm::{LlmClient, MockLlm, OpenAiClient};
pub use responder::ChatResponder;
pub use types::{ChatTurn, CompletionRequest, ContentPart, ImageUrl, MessageContent, Role};
pub use vision::{ImageAnalyzer, DEFAULT_IMAGE_MIME};
