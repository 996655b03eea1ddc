//! Screenshot analysis through a vision-capable chat model.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::{info, warn};

use chatscan_core::config::LlmConfig;

use crate::error::ChatError;
use crate::llm::LlmClient;
use crate::types::{ChatTurn, CompletionRequest};

/// MIME type assumed when the upload does not declare one.
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Sends an image with a fixed instruction to a vision model.
pub struct ImageAnalyzer {
    client: Arc<dyn LlmClient>,
    model: String,
    temperature: f32,
    prompt: String,
    error_prefix: String,
}

impl ImageAnalyzer {
    pub fn new(client: Arc<dyn LlmClient>, config: &LlmConfig) -> Self {
        Self {
            client,
            model: config.vision_model.clone(),
            temperature: config.temperature,
            prompt: config.vision_prompt.clone(),
            error_prefix: config.vision_error_prefix.clone(),
        }
    }

    /// Analyze `image`, returning the model's text.
    ///
    /// Failures are folded into the returned string as the error prefix
    /// followed by the error description.
    pub async fn analyze(&self, image: &[u8], mime_type: Option<&str>) -> String {
        match self.try_analyze(image, mime_type).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Image analysis failed");
                format!("{}{}", self.error_prefix, e)
            }
        }
    }

    async fn try_analyze(&self, image: &[u8], mime_type: Option<&str>) -> Result<String, ChatError> {
        if image.is_empty() {
            return Err(ChatError::Image("empty image".to_string()));
        }
        let mime_type = mime_type
            .filter(|m| m.starts_with("image/"))
            .unwrap_or(DEFAULT_IMAGE_MIME);

        info!(model = %self.model, bytes = image.len(), mime = mime_type, "Analyzing image");

        let b64 = STANDARD.encode(image);
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatTurn::user_with_image(self.prompt.clone(), mime_type, &b64)],
            temperature: self.temperature,
        };
        self.client.complete(&request).await
    }
}
