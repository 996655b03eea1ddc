//! Merge word-level tokens into lines by (block, line) identity.

use chatscan_core::types::{GroupedLine, LinePosition, OcrToken};

struct LineAccumulator<'a> {
    key: (u32, u32),
    texts: Vec<&'a str>,
    confidence_sum: f64,
    left: f64,
    right: f64,
    top: f64,
    height: f64,
}

impl<'a> LineAccumulator<'a> {
    fn start(token: &'a OcrToken, text: &'a str) -> Self {
        Self {
            key: (token.block_id, token.line_id),
            texts: vec![text],
            confidence_sum: f64::from(token.confidence),
            left: token.bbox.left,
            right: token.bbox.right(),
            top: token.bbox.top,
            height: token.bbox.height,
        }
    }

    fn push(&mut self, token: &OcrToken, text: &'a str) {
        self.texts.push(text);
        self.confidence_sum += f64::from(token.confidence);
        self.left = self.left.min(token.bbox.left);
        self.right = self.right.max(token.bbox.right());
    }

    fn finish(self) -> GroupedLine {
        let count = self.texts.len() as f64;
        GroupedLine {
            text: self.texts.join(" "),
            confidence: (self.confidence_sum / count) as f32,
            position: LinePosition::from_extent(
                self.left,
                self.right - self.left,
                self.top,
                self.height,
            ),
        }
    }
}

/// Group tokens sharing a (block id, line id) key into lines.
///
/// Groups keep first-appearance order until the final sort; token texts are
/// trimmed and joined with single spaces in emission order. `top` and
/// `height` come from the first token of each group. Tokens whose text is
/// blank after trimming are ignored. The result is sorted by ascending `top`
/// (stable, so ties keep first-appearance order).
pub fn group_lines(tokens: &[OcrToken]) -> Vec<GroupedLine> {
    let mut groups: Vec<LineAccumulator<'_>> = Vec::new();

    for token in tokens {
        let text = token.text.trim();
        if text.is_empty() {
            continue;
        }
        let key = (token.block_id, token.line_id);
        match groups.iter_mut().find(|g| g.key == key) {
            Some(group) => group.push(token, text),
            None => groups.push(LineAccumulator::start(token, text)),
        }
    }

    let mut lines: Vec<GroupedLine> = groups.into_iter().map(LineAccumulator::finish).collect();
    lines.sort_by(|a, b| a.position.top.total_cmp(&b.position.top));
    lines
}
