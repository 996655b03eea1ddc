use serde::{Deserialize, Serialize};

// =============================================================================
// OCR tokens
// =============================================================================

/// Axis-aligned box in image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Right edge (`left + width`).
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// True when every coordinate is finite and the size is non-negative.
    pub fn is_valid(&self) -> bool {
        [self.left, self.top, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width >= 0.0
            && self.height >= 0.0
    }
}

/// A single recognized word or segment, validated at the engine boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OcrToken {
    pub text: String,
    /// Recognition confidence in `[0, 1]`.
    pub confidence: f32,
    pub bbox: BoundingBox,
    pub block_id: u32,
    pub line_id: u32,
}

/// A token dropped for scoring below the confidence cutoff.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExcludedToken {
    pub text: String,
    pub confidence: f32,
}

// =============================================================================
// Grouped lines
// =============================================================================

/// Horizontal and vertical extent of a grouped line.
///
/// Invariant: `left <= center <= right` and `center == left + width / 2`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinePosition {
    pub left: f64,
    pub center: f64,
    pub right: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl LinePosition {
    /// Build a position from a left edge, width, top and height. `center`
    /// and `right` are derived so the invariant always holds.
    pub fn from_extent(left: f64, width: f64, top: f64, height: f64) -> Self {
        let width = width.max(0.0);
        Self {
            left,
            center: left + width / 2.0,
            right: left + width,
            top,
            width,
            height,
        }
    }
}

/// One logical text line made of tokens sharing a (block, line) identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupedLine {
    pub text: String,
    /// Mean confidence of the constituent tokens.
    pub confidence: f32,
    pub position: LinePosition,
}

// =============================================================================
// Classification
// =============================================================================

/// Which side of a chat screenshot a line sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Left-aligned: the other person.
    Left,
    /// Right-aligned: me.
    Right,
}

impl Side {
    /// Speaker label used in grouped conversation output.
    pub fn speaker(&self) -> &'static str {
        match self {
            Side::Left => "other_person",
            Side::Right => "me",
        }
    }
}

/// A grouped line tagged with its side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedLine {
    #[serde(flatten)]
    pub line: GroupedLine,
    pub side: Side,
}

/// Pixel dimensions of an uploaded image plus its vertical center line.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub center_line: f64,
}

impl ImageInfo {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            center_line: f64::from(width) / 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_right_edge() {
        let bbox = BoundingBox::new(10.0, 20.0, 30.0, 5.0);
        assert_eq!(bbox.right(), 40.0);
        assert!(bbox.is_valid());
    }

    #[test]
    fn test_bounding_box_invalid() {
        assert!(!BoundingBox::new(f64::NAN, 0.0, 1.0, 1.0).is_valid());
        assert!(!BoundingBox::new(0.0, 0.0, -1.0, 1.0).is_valid());
        assert!(!BoundingBox::new(0.0, f64::INFINITY, 1.0, 1.0).is_valid());
    }

    #[test]
    fn test_line_position_invariant() {
        let pos = LinePosition::from_extent(650.0, 100.0, 12.0, 18.0);
        assert_eq!(pos.center, 700.0);
        assert_eq!(pos.right, 750.0);
        assert!(pos.left <= pos.center && pos.center <= pos.right);
    }

    #[test]
    fn test_line_position_clamps_negative_width() {
        let pos = LinePosition::from_extent(100.0, -5.0, 0.0, 10.0);
        assert_eq!(pos.width, 0.0);
        assert_eq!(pos.center, 100.0);
        assert_eq!(pos.right, 100.0);
    }

    #[test]
    fn test_side_serialization_and_speaker() {
        assert_eq!(serde_json::to_string(&Side::Left).unwrap(), "\"left\"");
        assert_eq!(serde_json::to_string(&Side::Right).unwrap(), "\"right\"");
        assert_eq!(Side::Left.speaker(), "other_person");
        assert_eq!(Side::Right.speaker(), "me");
    }

    #[test]
    fn test_classified_line_flattens_line_fields() {
        let line = ClassifiedLine {
            line: GroupedLine {
                text: "hello".to_string(),
                confidence: 0.9,
                position: LinePosition::from_extent(0.0, 10.0, 0.0, 10.0),
            },
            side: Side::Left,
        };
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["text"], "hello");
        assert_eq!(json["side"], "left");
        assert_eq!(json["position"]["center"], 5.0);
    }

    #[test]
    fn test_image_info_center_line() {
        let info = ImageInfo::new(900, 1600);
        assert_eq!(info.center_line, 450.0);
    }
}
