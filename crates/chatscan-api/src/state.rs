//! Application state shared across all route handlers.
//!
//! Everything here is built once at startup and only read afterwards. It is
//! passed to handlers via axum's State extractor.

use std::sync::Arc;
use std::time::Instant;

use chatscan_chat::{ChatResponder, ImageAnalyzer, LlmClient};
use chatscan_core::config::ChatscanConfig;
use chatscan_ocr::OcrPipeline;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<ChatscanConfig>,
    /// OCR pipeline (engine plus optional bubble detector).
    pub ocr: Arc<OcrPipeline>,
    /// Single-turn chat replies.
    pub responder: Arc<ChatResponder>,
    /// Vision-model screenshot analysis.
    pub analyzer: Arc<ImageAnalyzer>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Create a new AppState. The chat responder and image analyzer share
    /// the given LLM client.
    pub fn new(config: ChatscanConfig, ocr: OcrPipeline, llm: Arc<dyn LlmClient>) -> Self {
        let responder = ChatResponder::new(Arc::clone(&llm), &config.llm);
        let analyzer = ImageAnalyzer::new(llm, &config.llm);
        Self {
            config: Arc::new(config),
            ocr: Arc::new(ocr),
            responder: Arc::new(responder),
            analyzer: Arc::new(analyzer),
            start_time: Instant::now(),
        }
    }
}
