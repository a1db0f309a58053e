//! Source synchronization between PDF positions and typesetting sources
//!
//! The scanner itself is an external helper; this module only fixes the
//! query interface and the unit conversions around it.

use std::path::Path;

/// Device resolution the host reports positions in
pub const HOST_DPI: f64 = 96.0;
/// PDF points per inch
const POINTS_PER_INCH: f64 = 72.0;
/// TeX points per inch
const TEX_POINTS_PER_INCH: f64 = 72.27;

/// Line number used when a reference has no leading digits
pub const UNKNOWN_LINE: i32 = -1;

const SOURCE_PREFIX: &str = "src:";

/// First result of a page-to-source query
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncEditHit {
    pub file: String,
    pub line: i32,
    /// -1 when the scanner does not know the column
    pub column: i32,
}

/// First result of a source-to-page query, in TeX points
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SyncDisplayHit {
    /// One-based page number
    pub page: i32,
    pub h: f64,
    pub v: f64,
}

/// Query interface of a source-sync scanner attached to one PDF
pub trait SyncScanner: Send {
    /// Source location under a point of a page, in PDF points
    fn edit_query(&mut self, page: i32, h: f64, v: f64) -> Option<SyncEditHit>;

    /// Page position produced by a source line
    fn display_query(&mut self, file: &str, line: i32, column: i32) -> Option<SyncDisplayHit>;
}

/// Creates a scanner for a freshly opened PDF, if sync data exists for it
pub trait SyncOpener: Send + Sync {
    fn open(&self, pdf_path: &Path) -> Option<Box<dyn SyncScanner>>;
}

impl<F> SyncOpener for F
where
    F: Fn(&Path) -> Option<Box<dyn SyncScanner>> + Send + Sync,
{
    fn open(&self, pdf_path: &Path) -> Option<Box<dyn SyncScanner>> {
        self(pdf_path)
    }
}

/// Location in a source file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceReference {
    pub file_name: String,
    pub line: i32,
    pub column: i32,
}

/// Where the viewport is anchored on the target page
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportPosition {
    pub normalized_x: f64,
    pub normalized_y: f64,
    /// The position marks the center of the view
    pub centered: bool,
}

/// Page plus optional position, the result of a named viewport lookup
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DocumentViewport {
    /// Zero-based page
    pub page: usize,
    pub position: Option<ViewportPosition>,
}

/// Split `src:<line><file>` into its line number and file name.
///
/// The leading digit run is the line; a reference without one gets
/// [`UNKNOWN_LINE`]. The file name is trimmed. Returns `None` when the prefix
/// is missing.
#[must_use]
pub fn parse_source_reference(reference: &str) -> Option<(i32, String)> {
    let prefix = reference.get(..SOURCE_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(SOURCE_PREFIX) {
        return None;
    }
    let rest = &reference[SOURCE_PREFIX.len()..];
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    let line = rest[..digits].parse().unwrap_or(UNKNOWN_LINE);
    Some((line, rest[digits..].trim().to_string()))
}

/// Host pixels to PDF points
#[must_use]
pub fn device_to_points(abs: f64) -> f64 {
    abs * POINTS_PER_INCH / HOST_DPI
}

/// TeX points to host pixels
#[must_use]
pub fn tex_points_to_device(value: f64) -> f64 {
    value * HOST_DPI / TEX_POINTS_PER_INCH
}

/// Turn a display hit into a viewport on a page of the given size.
///
/// A hit with no valid page yields `None`; a degenerate page size yields a
/// viewport without position.
#[must_use]
pub fn viewport_from_hit(
    hit: &SyncDisplayHit,
    page_size: impl FnOnce(usize) -> Option<(f64, f64)>,
) -> Option<DocumentViewport> {
    let page = usize::try_from(hit.page.checked_sub(1)?).ok()?;
    let position = page_size(page)
        .filter(|(w, h)| *w > 0.0 && *h > 0.0)
        .map(|(width, height)| ViewportPosition {
            normalized_x: tex_points_to_device(hit.h) / width,
            normalized_y: (tex_points_to_device(hit.v) + 0.5) / height,
            centered: true,
        });
    Some(DocumentViewport { page, position })
}

impl From<SyncEditHit> for SourceReference {
    fn from(hit: SyncEditHit) -> Self {
        Self {
            file_name: hit.file,
            line: hit.line,
            column: if hit.column == -1 { 0 } else { hit.column },
        }
    }
}
