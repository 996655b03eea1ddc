//! Tesseract OCR via the `tesseract` command-line tool.
//!
//! The image is PNG-encoded in memory and piped to
//! `tesseract stdin stdout -l <langs> --psm <n> tsv`. The TSV report gives
//! one row per word with its block/line identity, box and a 0–100 score.

use std::io::Cursor;
use std::process::Stdio;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use chatscan_core::config::OcrConfig;
use chatscan_core::error::{ChatscanError, Result};
use chatscan_core::types::BoundingBox;

use crate::engine::{OcrEngine, RawOcrRecord};
use crate::extractor::run_blocking;

/// TSV `level` value for word rows.
const WORD_LEVEL: u32 = 5;
/// Columns in a Tesseract TSV row.
const TSV_COLUMNS: usize = 12;

/// OCR engine backed by the Tesseract CLI.
pub struct TesseractEngine {
    config: OcrConfig,
}

impl TesseractEngine {
    /// Create a new Tesseract engine with the given configuration.
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    /// Get a reference to the OCR configuration.
    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// Command-line arguments passed to tesseract.
    fn args(&self) -> Vec<String> {
        vec![
            "stdin".to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            self.config.languages.join("+"),
            "--psm".to_string(),
            self.config.page_segmentation_mode.to_string(),
            "tsv".to_string(),
        ]
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(&self, image: &DynamicImage) -> Result<Vec<RawOcrRecord>> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ChatscanError::Ocr("Empty image".into()));
        }

        let image = image.clone();
        let png = run_blocking(move || {
            let mut png = Vec::new();
            image
                .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
                .map_err(|e| ChatscanError::Image(format!("PNG encoding failed: {}", e)))?;
            Ok(png)
        })
        .await?;

        let mut child = Command::new(&self.config.tesseract_cmd)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ChatscanError::Ocr(format!(
                    "Failed to start {}: {}",
                    self.config.tesseract_cmd, e
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&png)
                .await
                .map_err(|e| ChatscanError::Ocr(format!("Failed to write image: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ChatscanError::Ocr(format!("tesseract did not finish: {}", e)))?;

        if !output.status.success() {
            return Err(ChatscanError::Ocr(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        let records = parse_tsv(&tsv);
        debug!(records = records.len(), "Tesseract completed");
        Ok(records)
    }
}

/// Parse Tesseract TSV output into word records.
///
/// Non-word rows (page, block, paragraph, line) are ignored. Rows that do
/// not parse are skipped with a warning. A score of `-1` means unscored.
pub fn parse_tsv(tsv: &str) -> Vec<RawOcrRecord> {
    let mut records = Vec::new();

    for (index, row) in tsv.lines().enumerate() {
        if index == 0 && row.starts_with("level") {
            continue;
        }
        if row.trim().is_empty() {
            continue;
        }
        match parse_row(row) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(reason) => warn!(line = index + 1, %reason, "Skipping malformed OCR row"),
        }
    }

    records
}

fn parse_row(row: &str) -> std::result::Result<Option<RawOcrRecord>, String> {
    let fields: Vec<&str> = row.splitn(TSV_COLUMNS, '\t').collect();
    // Tesseract drops the trailing tab when the text column is empty.
    if fields.len() < TSV_COLUMNS - 1 {
        return Err(format!("expected {} columns, got {}", TSV_COLUMNS, fields.len()));
    }

    let level: u32 = parse_field(fields[0], "level")?;
    if level != WORD_LEVEL {
        return Ok(None);
    }

    let block_id: u32 = parse_field(fields[2], "block_num")?;
    let line_id: u32 = parse_field(fields[4], "line_num")?;
    let left: f64 = parse_field(fields[6], "left")?;
    let top: f64 = parse_field(fields[7], "top")?;
    let width: f64 = parse_field(fields[8], "width")?;
    let height: f64 = parse_field(fields[9], "height")?;
    let conf: f32 = parse_field(fields[10], "conf")?;
    let text = fields.get(11).copied().unwrap_or_default();

    let confidence = if conf < 0.0 {
        None
    } else {
        Some((conf / 100.0).min(1.0))
    };

    Ok(Some(RawOcrRecord {
        text: text.to_string(),
        confidence,
        bbox: Some(BoundingBox::new(left, top, width, height)),
        block_id,
        line_id,
    }))
}

fn parse_field<T: std::str::FromStr>(value: &str, name: &str) -> std::result::Result<T, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("invalid {} '{}'", name, value))
}
