//! PDF adaptation layer over the rendering library

mod document;
mod engine;
mod error;
mod geometry;
mod link;
mod locale;
#[cfg(feature = "pdf")]
mod mupdf_engine;
mod outline;
mod page;
mod raster;
mod text;
pub(crate) mod tree;

pub use document::{Document, PageMode};
pub use engine::{
    Engine, EngineDocument, EnginePage, InfoDict, LayoutBlock, LayoutChar, LayoutLine, LayoutSpan,
    RawLink, RawLinkKind, RawOutline, RawPixmap, TextLayout,
};
pub use error::{EngineError, PdfError};
pub use geometry::{NormalizedRect, PointF, RectF, Scale, SizeF};
pub use link::{ExternalTarget, LinkDestination};
pub use locale::{NumericLocaleGuard, current_numeric_locale};
#[cfg(feature = "pdf")]
pub use mupdf_engine::MuPdfEngine;
pub use outline::Outline;
pub use page::Page;
pub use raster::{fit_to_size, pixmap_to_rgba};
pub use text::{TextBox, boxes_to_string, collect_text_boxes};
