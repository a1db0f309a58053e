//! A loaded page of a [`Document`](super::Document)

use image::RgbaImage;
use log::warn;

use super::document::GenerationToken;
use super::engine::EnginePage;
use super::error::{EngineError, PdfError};
use super::geometry::{Scale, SizeF};
use super::raster::{fit_to_size, pixmap_to_rgba};
use super::text::{TextBox, collect_text_boxes};

/// Slide durations below this are treated as "no auto-advance"
const MIN_DURATION_SECS: f32 = 0.1;

/// One page, valid while the document that produced it stays open.
///
/// Every accessor except [`number`](Self::number) fails with
/// [`PdfError::DocumentClosed`] once the document is closed or reloaded.
pub struct Page {
    index: usize,
    inner: Box<dyn EnginePage>,
    token: GenerationToken,
}

impl Page {
    pub(crate) fn new(index: usize, inner: Box<dyn EnginePage>, token: GenerationToken) -> Self {
        Self {
            index,
            inner,
            token,
        }
    }

    fn live(&self) -> Result<&dyn EnginePage, PdfError> {
        if self.token.is_current() {
            Ok(self.inner.as_ref())
        } else {
            Err(PdfError::DocumentClosed)
        }
    }

    /// Zero-based index the page was opened with
    #[must_use]
    pub const fn number(&self) -> usize {
        self.index
    }

    /// Page extent in points
    pub fn size(&self) -> Result<SizeF, PdfError> {
        Ok(self.live()?.bounds()?.size())
    }

    /// Presentation duration in seconds, `None` when unset or too short
    pub fn duration(&self) -> Result<Option<f32>, PdfError> {
        Ok(self
            .live()?
            .presentation_duration()
            .filter(|secs| *secs >= MIN_DURATION_SECS))
    }

    /// Rasterize the whole page into a `width` x `height` RGBA image.
    ///
    /// A failure inside the library yields an empty (0x0) image rather than a
    /// partially drawn one.
    pub fn render(&self, width: u32, height: u32) -> Result<RgbaImage, PdfError> {
        let page = self.live()?;
        if width == 0 || height == 0 {
            return Ok(RgbaImage::new(0, 0));
        }
        match rasterize(page, width, height) {
            Ok(image) => Ok(image),
            Err(e) => {
                warn!("Rendering page {} failed: {e}", self.index);
                Ok(RgbaImage::new(0, 0))
            }
        }
    }

    /// Characters in reading order; empty when layout analysis fails
    pub fn text_boxes(&self) -> Result<Vec<TextBox>, PdfError> {
        let page = self.live()?;
        match page.text_layout() {
            Ok(layout) => Ok(collect_text_boxes(&layout)),
            Err(e) => {
                warn!("Text extraction on page {} failed: {e}", self.index);
                Ok(Vec::new())
            }
        }
    }
}

fn rasterize(page: &dyn EnginePage, width: u32, height: u32) -> Result<RgbaImage, EngineError> {
    let size = page.bounds()?.size();
    let transform = Scale::fit(size, width, height);
    let pixmap = page.rasterize(transform, width, height)?;
    let image = pixmap_to_rgba(&pixmap)?;
    Ok(fit_to_size(image, width, height))
}
