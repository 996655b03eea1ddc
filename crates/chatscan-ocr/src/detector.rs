//! Chat-bubble detection pre-pass.
//!
//! A detector proposes boxes around candidate bubbles; the pipeline crops
//! each box and runs OCR on the crops instead of the whole screenshot.
//!
//! When compiled with the `yolo` feature, `YoloDetector` runs a YOLOv8 ONNX
//! export through ONNX Runtime. Without the feature it is a stub whose
//! constructor fails, so the service runs OCR-only.

#[cfg(feature = "yolo")]
use std::path::Path;
#[cfg(feature = "yolo")]
use std::sync::Mutex;

use image::DynamicImage;
use serde::Serialize;

use chatscan_core::config::DetectionConfig;
use chatscan_core::error::{ChatscanError, Result};

/// One detected region in image pixel coordinates (corner form).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: usize,
}

impl Detection {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }
}

/// Detector that proposes chat-bubble regions.
///
/// `detect` is blocking (model inference); async callers should run it on
/// `tokio::task::spawn_blocking`.
pub trait BubbleDetector: Send + Sync {
    /// Short detector name for logs.
    fn name(&self) -> &str;

    /// Detect regions in `image`, highest confidence first.
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>>;
}

/// Mock detector returning fixed boxes, for tests.
#[derive(Debug, Clone, Default)]
pub struct MockDetector {
    detections: Vec<Detection>,
}

impl MockDetector {
    pub fn with_detections(detections: Vec<Detection>) -> Self {
        Self { detections }
    }
}

impl BubbleDetector for MockDetector {
    fn name(&self) -> &str {
        "mock"
    }

    fn detect(&self, _image: &DynamicImage) -> Result<Vec<Detection>> {
        Ok(self.detections.clone())
    }
}

/// Intersection over union of two boxes.
pub fn iou(a: &Detection, b: &Detection) -> f32 {
    let x_min = a.x1.max(b.x1);
    let y_min = a.y1.max(b.y1);
    let x_max = a.x2.min(b.x2);
    let y_max = a.y2.min(b.y2);

    if x_max <= x_min || y_max <= y_min {
        return 0.0;
    }

    let intersection = (x_max - x_min) * (y_max - y_min);
    let union = a.area() + b.area() - intersection;
    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Per-class non-maximum suppression.
///
/// Returns at most `max_detections` boxes sorted by descending confidence.
pub fn non_max_suppression(
    mut detections: Vec<Detection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Detection> = Vec::new();
    for candidate in detections {
        if keep.len() >= max_detections {
            break;
        }
        let suppressed = keep
            .iter()
            .any(|k| k.class_id == candidate.class_id && iou(k, &candidate) > iou_threshold);
        if !suppressed {
            keep.push(candidate);
        }
    }
    keep
}

/// Crop each detection out of `image`.
///
/// Boxes are clamped to the image bounds; boxes with a non-finite coordinate
/// or no area after clamping are dropped.
pub fn crop_detections(image: &DynamicImage, detections: &[Detection]) -> Vec<DynamicImage> {
    let (width, height) = (image.width() as f32, image.height() as f32);

    detections
        .iter()
        .filter_map(|d| {
            if ![d.x1, d.y1, d.x2, d.y2].iter().all(|v| v.is_finite()) {
                return None;
            }
            let x1 = d.x1.clamp(0.0, width).floor();
            let y1 = d.y1.clamp(0.0, height).floor();
            let x2 = d.x2.clamp(0.0, width).ceil();
            let y2 = d.y2.clamp(0.0, height).ceil();
            if x2 <= x1 || y2 <= y1 {
                return None;
            }
            Some(image.crop_imm(x1 as u32, y1 as u32, (x2 - x1) as u32, (y2 - y1) as u32))
        })
        .collect()
}

// =============================================================================
// YOLO detector
// =============================================================================

/// YOLOv8 detector over ONNX Runtime.
pub struct YoloDetector {
    config: DetectionConfig,
    #[cfg(feature = "yolo")]
    session: Mutex<ort::session::Session>,
}

impl YoloDetector {
    /// Load the model named in `config`.
    ///
    /// # Errors
    /// Returns `ChatscanError::Detection` if the model file is missing or
    /// ONNX Runtime rejects it.
    #[cfg(feature = "yolo")]
    pub fn new(config: DetectionConfig) -> Result<Self> {
        if !Path::new(&config.model_path).exists() {
            return Err(ChatscanError::Detection(format!(
                "YOLO model not found: {}",
                config.model_path
            )));
        }
        if config.input_size == 0 {
            return Err(ChatscanError::Detection("input_size must be positive".into()));
        }

        tracing::info!(model = %config.model_path, size = config.input_size, "Loading YOLO model");

        let session = ort::session::Session::builder()
            .map_err(|e| ChatscanError::Detection(format!("ONNX session builder: {}", e)))?
            .with_intra_threads(1)
            .map_err(|e| ChatscanError::Detection(format!("ONNX set threads: {}", e)))?
            .commit_from_file(&config.model_path)
            .map_err(|e| ChatscanError::Detection(format!("Failed to load YOLO model: {}", e)))?;

        Ok(Self {
            config,
            session: Mutex::new(session),
        })
    }

    /// Stub constructor when the `yolo` feature is disabled.
    #[cfg(not(feature = "yolo"))]
    pub fn new(config: DetectionConfig) -> Result<Self> {
        let _ = config;
        Err(ChatscanError::Detection(
            "chatscan was built without the `yolo` feature".into(),
        ))
    }

    /// Get a reference to the detection configuration.
    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }
}

#[cfg(feature = "yolo")]
impl BubbleDetector for YoloDetector {
    fn name(&self) -> &str {
        "yolov8"
    }

    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>> {
        use ort::value::TensorRef;

        let size = self.config.input_size;
        let input = preprocess(image, size);
        let input_ref = TensorRef::from_array_view(&input)
            .map_err(|e| ChatscanError::Detection(format!("Input tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| ChatscanError::Detection(format!("session lock poisoned: {}", e)))?;
        let outputs = session
            .run(ort::inputs![input_ref])
            .map_err(|e| ChatscanError::Detection(format!("YOLO inference failed: {}", e)))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ChatscanError::Detection(format!("Output tensor: {}", e)))?;
        if shape.len() != 3 {
            return Err(ChatscanError::Detection(format!(
                "Unexpected YOLO output rank {}",
                shape.len()
            )));
        }
        let rows = shape[1] as usize;
        let anchors = shape[2] as usize;

        let scale_x = image.width() as f32 / size as f32;
        let scale_y = image.height() as f32 / size as f32;
        let candidates = decode_predictions(
            data,
            rows,
            anchors,
            self.config.confidence_threshold,
            (scale_x, scale_y),
        );
        let detections = non_max_suppression(
            candidates,
            self.config.iou_threshold,
            self.config.max_detections,
        );
        tracing::debug!(count = detections.len(), "YOLO detection completed");
        Ok(detections)
    }
}

#[cfg(not(feature = "yolo"))]
impl BubbleDetector for YoloDetector {
    fn name(&self) -> &str {
        "yolov8"
    }

    fn detect(&self, _image: &DynamicImage) -> Result<Vec<Detection>> {
        Err(ChatscanError::Detection(
            "chatscan was built without the `yolo` feature".into(),
        ))
    }
}

/// Resize to the square model input and lay out as NCHW f32 in `[0, 1]`.
#[cfg(feature = "yolo")]
fn preprocess(image: &DynamicImage, size: u32) -> ndarray::Array4<f32> {
    let rgb = image
        .resize_exact(size, size, image::imageops::FilterType::Triangle)
        .to_rgb8();
    let side = size as usize;
    let mut input = ndarray::Array4::<f32>::zeros((1, 3, side, side));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for channel in 0..3 {
            input[[0, channel, y as usize, x as usize]] = f32::from(pixel[channel]) / 255.0;
        }
    }
    input
}

/// Decode a YOLOv8 `[1, 4 + classes, anchors]` output into boxes above
/// `threshold`, scaled back to image coordinates.
///
/// Each anchor column holds `cx, cy, w, h` followed by one score per class.
pub fn decode_predictions(
    data: &[f32],
    rows: usize,
    anchors: usize,
    threshold: f32,
    (scale_x, scale_y): (f32, f32),
) -> Vec<Detection> {
    if rows <= 4 || data.len() < rows * anchors {
        return Vec::new();
    }

    let at = |row: usize, anchor: usize| data[row * anchors + anchor];
    let mut detections = Vec::new();

    for anchor in 0..anchors {
        let (class_id, confidence) = (4..rows)
            .map(|row| (row - 4, at(row, anchor)))
            .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });
        if confidence < threshold {
            continue;
        }

        let (cx, cy, w, h) = (at(0, anchor), at(1, anchor), at(2, anchor), at(3, anchor));
        detections.push(Detection {
            x1: (cx - w / 2.0) * scale_x,
            y1: (cy - h / 2.0) * scale_y,
            x2: (cx + w / 2.0) * scale_x,
            y2: (cy + h / 2.0) * scale_y,
            confidence,
            class_id,
        });
    }

    detections
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32, class_id: usize) -> Detection {
        Detection {
            x1,
            y1,
            x2,
            y2,
            confidence,
            class_id,
        }
    }

    #[test]
    fn test_iou_identical_and_disjoint() {
        let a = det(0.0, 0.0, 10.0, 10.0, 0.9, 0);
        let b = det(20.0, 20.0, 30.0, 30.0, 0.9, 0);
        assert_eq!(iou(&a, &a), 1.0);
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn test_iou_half_overlap() {
        let a = det(0.0, 0.0, 10.0, 10.0, 0.9, 0);
        let b = det(5.0, 0.0, 15.0, 10.0, 0.9, 0);
        // intersection 50, union 150
        assert!((iou(&a, &b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_nms_suppresses_overlaps_within_class() {
        let detections = vec![
            det(0.0, 0.0, 10.0, 10.0, 0.6, 0),
            det(1.0, 1.0, 10.0, 10.0, 0.9, 0),
            det(1.0, 1.0, 10.0, 10.0, 0.8, 1),
            det(50.0, 50.0, 60.0, 60.0, 0.7, 0),
        ];
        let kept = non_max_suppression(detections, 0.45, 100);
        let confidences: Vec<f32> = kept.iter().map(|d| d.confidence).collect();
        assert_eq!(confidences, vec![0.9, 0.8, 0.7]);
    }

    #[test]
    fn test_nms_respects_max_detections() {
        let detections = (0..10)
            .map(|i| {
                let x = i as f32 * 100.0;
                det(x, 0.0, x + 10.0, 10.0, 0.5, 0)
            })
            .collect();
        assert_eq!(non_max_suppression(detections, 0.45, 3).len(), 3);
    }

    #[test]
    fn test_crop_detections_clamps_and_drops_empty() {
        let image = DynamicImage::new_rgb8(100, 50);
        let crops = crop_detections(
            &image,
            &[
                det(10.0, 10.0, 40.0, 30.0, 0.9, 0),
                det(-20.0, -5.0, 200.0, 500.0, 0.9, 0),
                det(150.0, 10.0, 180.0, 20.0, 0.9, 0),
            ],
        );
        assert_eq!(crops.len(), 2);
        assert_eq!((crops[0].width(), crops[0].height()), (30, 20));
        assert_eq!((crops[1].width(), crops[1].height()), (100, 50));
    }

    #[test]
    fn test_crop_detections_drops_non_finite_boxes() {
        let image = DynamicImage::new_rgb8(100, 50);
        let crops = crop_detections(
            &image,
            &[
                det(f32::NAN, 0.0, 40.0, 30.0, 0.9, 0),
                det(0.0, 0.0, f32::NAN, 30.0, 0.9, 0),
                det(0.0, f32::INFINITY, 40.0, 30.0, 0.9, 0),
                det(5.0, 5.0, 25.0, 15.0, 0.9, 0),
            ],
        );
        assert_eq!(crops.len(), 1);
        assert_eq!((crops[0].width(), crops[0].height()), (20, 10));
    }

    #[test]
    fn test_decode_predictions_layout() {
        // 2 classes, 3 anchors: rows = 6
        let anchors = 3;
        #[rustfmt::skip]
        let data = vec![
            // cx
            100.0, 200.0, 300.0,
            // cy
            50.0, 50.0, 50.0,
            // w
            20.0, 20.0, 20.0,
            // h
            10.0, 10.0, 10.0,
            // class 0
            0.9, 0.1, 0.2,
            // class 1
            0.1, 0.05, 0.7,
        ];
        let detections = decode_predictions(&data, 6, anchors, 0.5, (2.0, 1.0));
        assert_eq!(detections.len(), 2);

        assert_eq!(detections[0].class_id, 0);
        assert_eq!(detections[0].x1, 180.0);
        assert_eq!(detections[0].x2, 220.0);
        assert_eq!(detections[0].y1, 45.0);

        assert_eq!(detections[1].class_id, 1);
        assert!((detections[1].confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_decode_predictions_rejects_bad_shape() {
        assert!(decode_predictions(&[1.0; 8], 4, 2, 0.1, (1.0, 1.0)).is_empty());
        assert!(decode_predictions(&[1.0; 3], 6, 2, 0.1, (1.0, 1.0)).is_empty());
    }

    #[test]
    fn test_mock_detector_returns_boxes() {
        let detector = MockDetector::with_detections(vec![det(0.0, 0.0, 1.0, 1.0, 0.5, 0)]);
        let boxes = detector.detect(&DynamicImage::new_rgb8(4, 4)).unwrap();
        assert_eq!(boxes.len(), 1);
        assert_eq!(detector.name(), "mock");
    }

    #[cfg(not(feature = "yolo"))]
    #[test]
    fn test_yolo_stub_fails_without_feature() {
        let result = YoloDetector::new(DetectionConfig::default());
        assert!(matches!(result, Err(ChatscanError::Detection(_))));
    }

    #[cfg(feature = "yolo")]
    #[test]
    fn test_yolo_missing_model_file() {
        let config = DetectionConfig {
            model_path: "/nonexistent/yolo.onnx".to_string(),
            ..DetectionConfig::default()
        };
        assert!(matches!(
            YoloDetector::new(config),
            Err(ChatscanError::Detection(_))
        ));
    }
}
