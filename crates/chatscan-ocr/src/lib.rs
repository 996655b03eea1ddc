//! chatscan OCR crate - text extraction and chat layout analysis.
//!
//! Provides the OcrEngine trait with a Tesseract CLI engine and a mock,
//! the text-line extractor, the (block, line) grouper, the left/right
//! position classifier, an optional YOLO bubble detector, and the
//! OcrPipeline that composes them into JSON-ready reports.

pub mod classifier;
pub mod detector;
pub mod engine;
pub mod extractor;
pub mod grouper;
pub mod pipeline;
pub mod tesseract;

pub use classifier::{classify, classify_lines};
pub use detector::{BubbleDetector, Detection, MockDetector, YoloDetector};
pub use engine::{MockOcrEngine, OcrEngine, RawOcrRecord};
pub use extractor::{Extraction, TextLineExtractor};
pub use grouper::group_lines;
pub use pipeline::{ConversationReport, OcrPipeline, TextReport};
pub use tesseract::TesseractEngine;
