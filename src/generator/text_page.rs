//! Text layer handed to the host

use crate::pdf::{NormalizedRect, SizeF, TextBox};

/// One character (plus a trailing newline at line ends) with its area
#[derive(Clone, Debug, PartialEq)]
pub struct TextEntity {
    pub text: String,
    pub area: NormalizedRect,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextPage {
    entities: Vec<TextEntity>,
}

impl TextPage {
    /// Build from text boxes of a page of `size` points.
    ///
    /// `None` for a degenerate page size, which cannot be normalized against.
    #[must_use]
    pub fn from_boxes(boxes: &[TextBox], size: SizeF) -> Option<Self> {
        let entities = boxes
            .iter()
            .map(|b| {
                let mut text = b.text().to_string();
                if b.is_at_end_of_line() {
                    text.push('\n');
                }
                let area = NormalizedRect::from_page_rect(&b.rect(), size)?;
                Some(TextEntity { text, area })
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Self { entities })
    }

    #[must_use]
    pub fn entities(&self) -> &[TextEntity] {
        &self.entities
    }

    /// All entity text concatenated
    #[must_use]
    pub fn text(&self) -> String {
        self.entities.iter().map(|e| e.text.as_str()).collect()
    }
}
