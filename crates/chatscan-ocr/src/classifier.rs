//! Left/right position classifier for chat screenshot lines.
//!
//! A line is tagged by comparing its horizontal extent against the image
//! center and outer thirds. Rules are evaluated in table order and every
//! rule whose predicate matches overwrites the tag, so later rules win.

use chatscan_core::types::{ClassifiedLine, GroupedLine, LinePosition, Side};

/// A geometric predicate over (line position, image width) and the side it
/// assigns when it matches.
pub struct PositionRule {
    pub name: &'static str,
    pub applies: fn(&LinePosition, f64) -> bool,
    pub side: Side,
}

/// Tag used when no rule matches.
pub const DEFAULT_SIDE: Side = Side::Left;

/// Classification rules, lowest to highest precedence.
pub const RULES: [PositionRule; 3] = [
    PositionRule {
        name: "center_right_of_midline",
        applies: center_right_of_midline,
        side: Side::Right,
    },
    PositionRule {
        name: "starts_in_right_third",
        applies: starts_in_right_third,
        side: Side::Right,
    },
    // Can never match together with the rule above for a positive width;
    // kept so the left-third override stays last.
    PositionRule {
        name: "ends_in_left_third",
        applies: ends_in_left_third,
        side: Side::Left,
    },
];

fn center_right_of_midline(pos: &LinePosition, width: f64) -> bool {
    pos.center > width / 2.0
}

fn starts_in_right_third(pos: &LinePosition, width: f64) -> bool {
    pos.left > width * 2.0 / 3.0
}

fn ends_in_left_third(pos: &LinePosition, width: f64) -> bool {
    pos.right < width / 3.0
}

/// Classify one line position against an image of `image_width` pixels.
///
/// Pure: the same inputs always give the same side. A center exactly on the
/// midline classifies as left unless the line starts in the right third.
pub fn classify(position: &LinePosition, image_width: f64) -> Side {
    RULES
        .iter()
        .filter(|rule| (rule.applies)(position, image_width))
        .last()
        .map_or(DEFAULT_SIDE, |rule| rule.side)
}

/// Tag every grouped line, preserving order.
pub fn classify_lines(lines: Vec<GroupedLine>, image_width: u32) -> Vec<ClassifiedLine> {
    let width = f64::from(image_width);
    lines
        .into_iter()
        .map(|line| {
            let side = classify(&line.position, width);
            ClassifiedLine { line, side }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDTH: f64 = 900.0;

    fn pos(left: f64, width: f64) -> LinePosition {
        LinePosition::from_extent(left, width, 0.0, 20.0)
    }

    #[test]
    fn test_right_of_center_is_me() {
        // left=650, width=100: center 700 > 450
        assert_eq!(classify(&pos(650.0, 100.0), WIDTH), Side::Right);
    }

    #[test]
    fn test_left_third_is_other_person() {
        // left=50, width=100: right 150 < 300
        assert_eq!(classify(&pos(50.0, 100.0), WIDTH), Side::Left);
    }

    #[test]
    fn test_left_of_center_defaults_left() {
        // center 400, right 500: no override fires
        assert_eq!(classify(&pos(300.0, 200.0), WIDTH), Side::Left);
    }

    #[test]
    fn test_center_on_midline_is_left() {
        assert_eq!(classify(&pos(400.0, 100.0), WIDTH), Side::Left);
    }

    #[test]
    fn test_starts_in_right_third_overrides_center() {
        // Rule 2 alone: a line can only start past 600 with its center past
        // 450, so check the predicate table directly as well.
        let p = pos(601.0, 0.0);
        assert_eq!(classify(&p, WIDTH), Side::Right);
        assert!((RULES[1].applies)(&p, WIDTH));
    }

    #[test]
    fn test_left_third_dominates_every_other_rule() {
        for left in [0.0, 10.0, 100.0, 250.0] {
            for width in [0.0, 10.0, 49.0] {
                let p = pos(left, width);
                if p.right < WIDTH / 3.0 {
                    assert_eq!(classify(&p, WIDTH), Side::Left);
                }
            }
        }
    }

    #[test]
    fn test_right_third_start_always_me() {
        for left in [600.5, 700.0, 899.0] {
            assert_eq!(classify(&pos(left, 1.0), WIDTH), Side::Right);
        }
    }

    #[test]
    fn test_classification_is_idempotent() {
        let p = pos(420.0, 90.0);
        assert_eq!(classify(&p, WIDTH), classify(&p, WIDTH));
    }

    #[test]
    fn test_rule_order_is_fixed() {
        let names: Vec<&str> = RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec!["center_right_of_midline", "starts_in_right_third", "ends_in_left_third"]
        );
    }

    #[test]
    fn test_classify_lines_preserves_order() {
        let lines = vec![
            GroupedLine {
                text: "hey".to_string(),
                confidence: 0.9,
                position: pos(40.0, 100.0),
            },
            GroupedLine {
                text: "yo".to_string(),
                confidence: 0.8,
                position: pos(700.0, 150.0),
            },
        ];
        let classified = classify_lines(lines, 900);
        assert_eq!(classified[0].line.text, "hey");
        assert_eq!(classified[0].side, Side::Left);
        assert_eq!(classified[1].side, Side::Right);
    }
}
