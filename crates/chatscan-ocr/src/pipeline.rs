//! OCR pipeline: optional bubble detection, text extraction, line grouping
//! and side classification, plus the JSON report shapes built from them.

use std::sync::Arc;

use image::DynamicImage;
use serde::Serialize;
use tracing::{debug, info};

use chatscan_core::error::{ChatscanError, Result};
use chatscan_core::types::{ExcludedToken, GroupedLine, ImageInfo, Side};

use crate::classifier::classify_lines;
use crate::detector::{crop_detections, BubbleDetector};
use crate::extractor::{decode_image, TextLineExtractor};
use crate::grouper::group_lines;

/// Method label for whole-image OCR.
pub const METHOD_FULL: &str = "ocr";
/// Method label for the position-grouped report.
pub const METHOD_POSITIONAL: &str = "ocr+position";

// =============================================================================
// Report shapes
// =============================================================================

/// Per-token text and score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedText {
    pub text: String,
    pub confidence: f32,
}

/// Flat list of recognized texts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextReport {
    pub method: String,
    pub text_count: usize,
    pub texts: Vec<String>,
    pub detailed_texts: Vec<DetailedText>,
    /// Tokens under the confidence cutoff.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub excluded_texts: Vec<ExcludedToken>,
}

/// Counts of lines per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MessageCounts {
    pub left_messages: usize,
    pub right_messages: usize,
    pub total: usize,
}

/// Line texts split by speaker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedConversations {
    pub other_person: Vec<String>,
    pub me: Vec<String>,
}

/// Lines grouped by left/right position in a chat screenshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationReport {
    pub method: String,
    pub image_info: ImageInfo,
    pub message_counts: MessageCounts,
    pub left_messages: Vec<GroupedLine>,
    pub right_messages: Vec<GroupedLine>,
    /// All line texts top to bottom.
    pub all_texts: Vec<String>,
    pub grouped_conversations: GroupedConversations,
}

// =============================================================================
// Pipeline
// =============================================================================

/// Composes the extractor with an optional bubble detector.
#[derive(Clone)]
pub struct OcrPipeline {
    extractor: TextLineExtractor,
    detector: Option<Arc<dyn BubbleDetector>>,
}

impl OcrPipeline {
    pub fn new(extractor: TextLineExtractor) -> Self {
        Self {
            extractor,
            detector: None,
        }
    }

    /// Attach a detector for the detection pre-pass.
    pub fn with_detector(mut self, detector: Arc<dyn BubbleDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn engine_name(&self) -> &str {
        self.extractor.engine_name()
    }

    pub fn has_detector(&self) -> bool {
        self.detector.is_some()
    }

    /// OCR the whole image and return token texts in engine order.
    pub async fn read_full(&self, bytes: &[u8]) -> Result<Vec<String>> {
        let extraction = self.extractor.extract(bytes).await?;
        Ok(extraction.tokens.into_iter().map(|t| t.text).collect())
    }

    /// Detect bubbles, then OCR each crop in detection order.
    ///
    /// Without a detector this is the same as [`read_full`](Self::read_full).
    pub async fn read_with_detection(&self, bytes: &[u8]) -> Result<Vec<String>> {
        let Some(detector) = &self.detector else {
            debug!("No detector configured, running OCR on the full image");
            return self.read_full(bytes).await;
        };

        let crops = detect_and_crop(Arc::clone(detector), bytes.to_vec()).await?;
        debug!(regions = crops.len(), "Bubble detection finished");

        let mut texts = Vec::new();
        for crop in crops {
            let extraction = self.extractor.extract_image(crop).await?;
            texts.extend(extraction.tokens.into_iter().map(|t| t.text));
        }
        Ok(texts)
    }

    /// Whole-image OCR as a flat text report.
    pub async fn text_report(&self, bytes: &[u8]) -> Result<TextReport> {
        let extraction = self.extractor.extract(bytes).await?;
        let detailed_texts: Vec<DetailedText> = extraction
            .tokens
            .iter()
            .map(|t| DetailedText {
                text: t.text.clone(),
                confidence: t.confidence,
            })
            .collect();
        let texts: Vec<String> = detailed_texts.iter().map(|d| d.text.clone()).collect();

        Ok(TextReport {
            method: METHOD_FULL.to_string(),
            text_count: texts.len(),
            texts,
            detailed_texts,
            excluded_texts: extraction.excluded,
        })
    }

    /// Whole-image OCR grouped into lines and split by side.
    pub async fn conversation_report(&self, bytes: &[u8]) -> Result<ConversationReport> {
        let extraction = self.extractor.extract(bytes).await?;
        let image_info = extraction.image;
        let lines = group_lines(&extraction.tokens);
        let all_texts: Vec<String> = lines.iter().map(|l| l.text.clone()).collect();

        let (mut left_messages, mut right_messages) = (Vec::new(), Vec::new());
        for classified in classify_lines(lines, image_info.width) {
            match classified.side {
                Side::Left => left_messages.push(classified.line),
                Side::Right => right_messages.push(classified.line),
            }
        }

        info!(
            left = left_messages.len(),
            right = right_messages.len(),
            "Conversation lines classified"
        );

        Ok(ConversationReport {
            method: METHOD_POSITIONAL.to_string(),
            image_info,
            message_counts: MessageCounts {
                left_messages: left_messages.len(),
                right_messages: right_messages.len(),
                total: left_messages.len() + right_messages.len(),
            },
            grouped_conversations: GroupedConversations {
                other_person: left_messages.iter().map(|l| l.text.clone()).collect(),
                me: right_messages.iter().map(|l| l.text.clone()).collect(),
            },
            left_messages,
            right_messages,
            all_texts,
        })
    }
}

/// Decoding, inference and cropping are blocking, offload to blocking thread.
async fn detect_and_crop(
    detector: Arc<dyn BubbleDetector>,
    bytes: Vec<u8>,
) -> Result<Vec<DynamicImage>> {
    tokio::task::spawn_blocking(move || {
        let image = decode_image(&bytes)?;
        let detections = detector.detect(&image)?;
        Ok(crop_detections(&image, &detections))
    })
    .await
    .map_err(|e| ChatscanError::Detection(format!("Detection task panicked: {}", e)))?
}
