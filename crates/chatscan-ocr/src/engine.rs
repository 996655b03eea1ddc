//! OCR engine trait and the record shape every engine produces.

use async_trait::async_trait;
use image::DynamicImage;

use chatscan_core::error::{ChatscanError, Result};
use chatscan_core::types::BoundingBox;

/// One record as reported by an OCR engine, before validation.
///
/// Engines differ in what they report: some give no score, some give no
/// geometry. Missing pieces are explicit `None`s here and are checked once
/// by the extractor rather than at every use site.
#[derive(Clone, Debug, PartialEq)]
pub struct RawOcrRecord {
    pub text: String,
    /// Confidence in `[0, 1]`, if the engine scored this record.
    pub confidence: Option<f32>,
    pub bbox: Option<BoundingBox>,
    pub block_id: u32,
    pub line_id: u32,
}

impl RawOcrRecord {
    /// Convenience constructor for a fully-populated record.
    pub fn new(
        text: &str,
        confidence: f32,
        bbox: BoundingBox,
        block_id: u32,
        line_id: u32,
    ) -> Self {
        Self {
            text: text.to_string(),
            confidence: Some(confidence),
            bbox: Some(bbox),
            block_id,
            line_id,
        }
    }
}

/// Service for recognizing text in a decoded image.
///
/// Implementations wrap a concrete engine (Tesseract, a mock) behind a
/// uniform async interface. One instance is built at startup and shared
/// across requests.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Short engine name for logs and health output.
    fn name(&self) -> &str;

    /// Recognize text in `image`.
    ///
    /// # Returns
    /// Records in engine emission order. May be empty if no text is found.
    async fn recognize(&self, image: &DynamicImage) -> Result<Vec<RawOcrRecord>>;
}

/// Mock OCR engine for testing.
///
/// Returns the configured records for any non-empty image without running
/// real recognition.
#[derive(Debug, Clone, Default)]
pub struct MockOcrEngine {
    records: Vec<RawOcrRecord>,
}

impl MockOcrEngine {
    /// Create a mock engine that recognizes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock engine that returns `records` for every image.
    pub fn with_records(records: Vec<RawOcrRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl OcrEngine for MockOcrEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn recognize(&self, image: &DynamicImage) -> Result<Vec<RawOcrRecord>> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ChatscanError::Ocr("Empty image".to_string()));
        }
        Ok(self.records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: &str) -> RawOcrRecord {
        RawOcrRecord::new(text, 0.9, BoundingBox::new(0.0, 0.0, 10.0, 10.0), 1, 1)
    }

    #[tokio::test]
    async fn test_mock_engine_returns_records() {
        let engine = MockOcrEngine::with_records(vec![record("hi"), record("there")]);
        let image = DynamicImage::new_luma8(4, 4);
        let records = engine.recognize(&image).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].text, "there");
    }

    #[tokio::test]
    async fn test_mock_engine_empty_by_default() {
        let engine = MockOcrEngine::new();
        let records = engine.recognize(&DynamicImage::new_luma8(2, 2)).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(engine.name(), "mock");
    }

    #[tokio::test]
    async fn test_mock_engine_rejects_empty_image() {
        let engine = MockOcrEngine::with_records(vec![record("x")]);
        let result = engine.recognize(&DynamicImage::new_luma8(0, 0)).await;
        assert!(matches!(result, Err(ChatscanError::Ocr(_))));
    }
}
