//! Per-character text boxes

use super::engine::{LayoutBlock, TextLayout};
use super::geometry::RectF;

/// One character of page text with its bounding box in page space
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextBox {
    text: char,
    rect: RectF,
    at_end_of_line: bool,
}

impl TextBox {
    #[must_use]
    pub const fn new(text: char, rect: RectF) -> Self {
        Self {
            text,
            rect,
            at_end_of_line: false,
        }
    }

    #[must_use]
    pub const fn text(&self) -> char {
        self.text
    }

    #[must_use]
    pub const fn rect(&self) -> RectF {
        self.rect
    }

    /// True for the last character of a line as segmented by layout analysis
    #[must_use]
    pub const fn is_at_end_of_line(&self) -> bool {
        self.at_end_of_line
    }
}

/// Flatten a layout into boxes in reading order (block, line, span, char).
///
/// Image blocks are skipped. The last character of every line that has at
/// least one character is marked as ending the line.
#[must_use]
pub fn collect_text_boxes(layout: &TextLayout) -> Vec<TextBox> {
    let mut boxes = Vec::new();

    for block in &layout.blocks {
        let LayoutBlock::Text(lines) = block else {
            continue;
        };
        for line in lines {
            let line_start = boxes.len();
            for span in &line.spans {
                boxes.extend(span.chars.iter().map(|ch| TextBox::new(ch.c, ch.bbox)));
            }
            if boxes.len() > line_start {
                if let Some(last) = boxes.last_mut() {
                    last.at_end_of_line = true;
                }
            }
        }
    }

    boxes
}

/// Join box characters, breaking lines after end-of-line boxes
#[must_use]
pub fn boxes_to_string(boxes: &[TextBox]) -> String {
    let mut out = String::with_capacity(boxes.len());
    for b in boxes {
        out.push(b.text);
        if b.at_end_of_line {
            out.push('\n');
        }
    }
    out
}
