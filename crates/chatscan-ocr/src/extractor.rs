//! Text-line extractor: image bytes in, validated OCR tokens out.

use std::sync::Arc;

use image::DynamicImage;
use tracing::{debug, warn};

use chatscan_core::config::OcrConfig;
use chatscan_core::error::{ChatscanError, Result};
use chatscan_core::types::{ExcludedToken, ImageInfo, OcrToken};

use crate::engine::{OcrEngine, RawOcrRecord};

/// Tokens recognized in one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub image: ImageInfo,
    /// Tokens at or above the confidence cutoff, in engine order.
    pub tokens: Vec<OcrToken>,
    /// Tokens below the cutoff, kept for diagnostics.
    pub excluded: Vec<ExcludedToken>,
}

/// Wraps an OCR engine with decoding, grayscale conversion and the
/// confidence cutoff.
#[derive(Clone)]
pub struct TextLineExtractor {
    engine: Arc<dyn OcrEngine>,
    min_confidence: f32,
    grayscale: bool,
}

impl TextLineExtractor {
    pub fn new(engine: Arc<dyn OcrEngine>, config: &OcrConfig) -> Self {
        Self {
            engine,
            min_confidence: config.min_confidence,
            grayscale: config.grayscale,
        }
    }

    /// Name of the underlying engine.
    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Decode `bytes` and extract tokens from the whole image.
    pub async fn extract(&self, bytes: &[u8]) -> Result<Extraction> {
        let bytes = bytes.to_vec();
        let image = run_blocking(move || decode_image(&bytes)).await?;
        self.extract_image(image).await
    }

    /// Extract tokens from an already-decoded image (e.g. a detector crop).
    pub async fn extract_image(&self, image: DynamicImage) -> Result<Extraction> {
        let info = ImageInfo::new(image.width(), image.height());

        let image = if self.grayscale {
            run_blocking(move || Ok(DynamicImage::ImageLuma8(image.to_luma8()))).await?
        } else {
            image
        };
        let records = self.engine.recognize(&image).await?;

        let (tokens, excluded) = validate_records(records, self.min_confidence);
        debug!(
            engine = self.engine.name(),
            kept = tokens.len(),
            excluded = excluded.len(),
            "Text extraction finished"
        );
        for token in &excluded {
            debug!(text = %token.text, confidence = token.confidence, "Excluded low-confidence token");
        }

        Ok(Extraction {
            image: info,
            tokens,
            excluded,
        })
    }
}

/// Run CPU-bound image work off the async worker threads.
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ChatscanError::Image(format!("Image task panicked: {}", e)))?
}

/// Decode raw upload bytes into an image.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(ChatscanError::Image("Empty image data".to_string()));
    }
    image::load_from_memory(bytes)
        .map_err(|e| ChatscanError::Image(format!("Failed to decode image: {}", e)))
}

/// Split engine records into kept tokens and excluded low scorers.
///
/// Records without geometry or with a non-finite score are skipped with a
/// warning. Unscored records are kept with confidence 1.0.
pub fn validate_records(
    records: Vec<RawOcrRecord>,
    min_confidence: f32,
) -> (Vec<OcrToken>, Vec<ExcludedToken>) {
    let mut tokens = Vec::with_capacity(records.len());
    let mut excluded = Vec::new();

    for record in records {
        let Some(bbox) = record.bbox.filter(|b| b.is_valid()) else {
            warn!(text = %record.text, "Skipping OCR record without a usable bounding box");
            continue;
        };
        let confidence = match record.confidence {
            Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
            Some(_) => {
                warn!(text = %record.text, "Skipping OCR record with non-finite confidence");
                continue;
            }
            None => 1.0,
        };

        if confidence < min_confidence {
            excluded.push(ExcludedToken {
                text: record.text,
                confidence,
            });
            continue;
        }

        tokens.push(OcrToken {
            text: record.text,
            confidence,
            bbox,
            block_id: record.block_id,
            line_id: record.line_id,
        });
    }

    (tokens, excluded)
}
