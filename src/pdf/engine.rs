//! Boundary to the PDF rendering library
//!
//! The adaptation layer never talks to the library directly: it goes through
//! these traits, which mirror the handful of library entry points it needs
//! (open, authenticate, count/load pages, bound, rasterize, text layout,
//! outline, trailer dictionary lookups). The MuPDF binding lives in
//! [`super::mupdf_engine`]; tests use a scripted engine from `test_utils`.

use super::error::EngineError;
use super::geometry::{RectF, Scale};
use super::tree::{self, TreeNode};

/// Opens documents. One engine value is owned by each [`Document`](super::Document).
pub trait Engine: Send + Sync {
    /// Interpret `data` as a PDF file
    fn open(&self, data: Vec<u8>) -> Result<Box<dyn EngineDocument>, EngineError>;
}

/// An opened document handle
pub trait EngineDocument: Send {
    fn needs_password(&self) -> bool;

    /// Try `password`; true when the document is now readable
    fn authenticate(&mut self, password: &[u8]) -> bool;

    /// Whether the trailer references a `Root` catalog
    fn has_catalog(&self) -> bool;

    /// Raw `PageMode` name from the catalog, if it is a name object
    fn page_mode_name(&self) -> Option<Vec<u8>>;

    fn count_pages(&self) -> Result<usize, EngineError>;

    fn load_page(&self, index: usize) -> Result<Box<dyn EnginePage>, EngineError>;

    /// Snapshot of the trailer `Info` dictionary, `None` when absent
    fn info_dict(&self) -> Result<Option<InfoDict>, EngineError>;

    /// Top-level outline entries; empty when the document has no outline
    fn outline(&self) -> Result<Vec<RawOutline>, EngineError>;

    /// Format string as reported by the library, e.g. `"PDF 1.4"`
    fn format(&self) -> Option<String>;
}

/// A loaded page handle
pub trait EnginePage: Send {
    fn bounds(&self) -> Result<RectF, EngineError>;

    /// Value of the page's `/Dur` entry
    fn presentation_duration(&self) -> Option<f32>;

    /// Rasterize into a `width` x `height` buffer cleared to opaque white
    fn rasterize(&self, transform: Scale, width: u32, height: u32)
    -> Result<RawPixmap, EngineError>;

    /// Run layout analysis at identity scale
    fn text_layout(&self) -> Result<TextLayout, EngineError>;
}

/// Interleaved pixel buffer as produced by the library
#[derive(Clone, Debug, Default)]
pub struct RawPixmap {
    pub width: u32,
    pub height: u32,
    /// Components per pixel (3 = RGB, 4 = RGBA)
    pub n: u8,
    /// Bytes per row
    pub stride: usize,
    pub samples: Vec<u8>,
}

/// Output of the library's text layout analysis
#[derive(Clone, Debug, Default)]
pub struct TextLayout {
    pub blocks: Vec<LayoutBlock>,
}

#[derive(Clone, Debug)]
pub enum LayoutBlock {
    Text(Vec<LayoutLine>),
    Image,
}

#[derive(Clone, Debug, Default)]
pub struct LayoutLine {
    pub spans: Vec<LayoutSpan>,
}

#[derive(Clone, Debug, Default)]
pub struct LayoutSpan {
    pub chars: Vec<LayoutChar>,
}

#[derive(Clone, Copy, Debug)]
pub struct LayoutChar {
    pub c: char,
    pub bbox: RectF,
}

/// Entries of the `Info` dictionary in dictionary order.
///
/// Only name keys are kept. String values carry their decoded text; any other
/// kind of object (name, number, array, ...) is `None`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InfoDict {
    pub entries: Vec<(Vec<u8>, Option<String>)>,
}

impl InfoDict {
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn keys(&self) -> impl Iterator<Item = &[u8]> {
        self.entries.iter().map(|(k, _)| k.as_slice())
    }
}

/// One entry of the library's outline, children in `down`
#[derive(Debug, Default)]
pub struct RawOutline {
    pub title: Option<String>,
    pub is_open: bool,
    pub link: RawLink,
    pub down: Vec<RawOutline>,
}

impl RawOutline {
    #[must_use]
    pub fn new(title: impl Into<String>, link: RawLink) -> Self {
        Self {
            title: Some(title.into()),
            is_open: false,
            link,
            down: Vec::new(),
        }
    }

    /// Mark the entry as initially expanded
    #[must_use]
    pub fn open(mut self) -> Self {
        self.is_open = true;
        self
    }

    #[must_use]
    pub fn with_children(mut self, down: Vec<RawOutline>) -> Self {
        self.down = down;
        self
    }
}

impl TreeNode for RawOutline {
    fn child_nodes(&self) -> &[Self] {
        &self.down
    }

    fn child_nodes_mut(&mut self) -> &mut Vec<Self> {
        &mut self.down
    }

    fn shallow_clone(&self) -> Self {
        Self {
            title: self.title.clone(),
            is_open: self.is_open,
            link: self.link.clone(),
            down: Vec::new(),
        }
    }

    fn shallow_eq(&self, other: &Self) -> bool {
        self.title == other.title && self.is_open == other.is_open && self.link == other.link
    }
}

impl Clone for RawOutline {
    fn clone(&self) -> Self {
        tree::deep_clone(self)
    }
}

impl Drop for RawOutline {
    fn drop(&mut self) {
        tree::dismantle(self);
    }
}

/// Destination kind tag of a [`RawLink`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RawLinkKind {
    #[default]
    None,
    GoTo,
    GoToR,
    Launch,
    Uri,
    Named,
    /// A kind this layer does not know how to represent
    Unknown(i32),
}

/// Library destination record. Which fields are meaningful depends on `kind`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawLink {
    pub kind: RawLinkKind,
    /// Zero-based target page, -1 when unknown
    pub page: i32,
    pub rect: Option<RectF>,
    /// Named destination inside the target document
    pub dest_name: Option<String>,
    pub file_spec: Option<String>,
    pub uri: Option<String>,
    /// Name of a named action
    pub name: Option<String>,
    pub new_window: bool,
    pub is_uri: bool,
    pub is_map: bool,
}

impl RawLink {
    #[must_use]
    pub fn goto(page: i32, rect: Option<RectF>) -> Self {
        Self {
            kind: RawLinkKind::GoTo,
            page,
            rect,
            ..Self::default()
        }
    }

    /// Classify a library URI string the way the MuPDF binding reports links.
    ///
    /// - `#nameddest=X` or `#X` (not a page fragment): named destination
    /// - `#page=N...`: internal jump
    /// - `file:` URIs: remote PDF destination when the file is a PDF and the
    ///   fragment names a target, otherwise a launch
    /// - `scheme:...`: plain URI
    /// - anything else: launch of a relative file
    #[must_use]
    pub fn from_uri(uri: &str) -> Self {
        let uri = uri.trim();
        if uri.is_empty() {
            return Self::default();
        }

        if let Some(fragment) = uri.strip_prefix('#') {
            let target = FragmentTarget::parse(fragment);
            return match target.named {
                Some(name) => Self {
                    kind: RawLinkKind::Named,
                    name: Some(name),
                    ..Self::default()
                },
                None => match target.page {
                    Some(page) => Self::goto(page, target.rect),
                    None => Self {
                        kind: RawLinkKind::Named,
                        name: Some(fragment.to_string()),
                        ..Self::default()
                    },
                },
            };
        }

        if let Some(rest) = uri.strip_prefix("file:") {
            let (path, fragment) = match rest.split_once('#') {
                Some((path, fragment)) => (path, Some(fragment)),
                None => (rest, None),
            };
            let path = path.strip_prefix("//").unwrap_or(path);
            let file = percent_decode(path);
            let target = fragment.map(FragmentTarget::parse).unwrap_or_default();
            let is_pdf = file.to_ascii_lowercase().ends_with(".pdf");

            return if is_pdf && (target.page.is_some() || target.named.is_some()) {
                Self {
                    kind: RawLinkKind::GoToR,
                    page: target.page.unwrap_or(-1),
                    rect: target.rect,
                    dest_name: target.named,
                    file_spec: Some(file),
                    ..Self::default()
                }
            } else {
                Self {
                    kind: RawLinkKind::Launch,
                    file_spec: Some(file),
                    ..Self::default()
                }
            };
        }

        if has_scheme(uri) {
            return Self {
                kind: RawLinkKind::Uri,
                uri: Some(uri.to_string()),
                ..Self::default()
            };
        }

        Self {
            kind: RawLinkKind::Launch,
            file_spec: Some(percent_decode(uri)),
            ..Self::default()
        }
    }
}

/// Target parsed from a `page=N&view=...&zoom=...&nameddest=...` fragment
#[derive(Debug, Default)]
struct FragmentTarget {
    page: Option<i32>,
    rect: Option<RectF>,
    named: Option<String>,
}

impl FragmentTarget {
    fn parse(fragment: &str) -> Self {
        let mut target = Self::default();
        let mut params = 0usize;

        for part in fragment.split('&') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            params += 1;
            match key {
                "page" => {
                    target.page = value
                        .trim()
                        .parse::<i32>()
                        .ok()
                        .map(|p| p.saturating_sub(1).max(0));
                }
                "nameddest" => target.named = Some(percent_decode(value)),
                "view" => {
                    let mut fields = value.split(',');
                    if fields.next() == Some("FitR") {
                        let nums: Vec<f32> = fields.filter_map(|f| f.parse().ok()).collect();
                        if let [left, bottom, right, top] = nums[..] {
                            target.rect = Some(RectF::new(left, top, right, bottom).normalized());
                        }
                    }
                }
                "zoom" => {
                    let nums: Vec<f32> = value
                        .split(',')
                        .skip(1)
                        .filter_map(|f| f.parse().ok())
                        .collect();
                    if let [x, y] = nums[..] {
                        target.rect = Some(RectF::new(x, y, x, y));
                    }
                }
                _ => {}
            }
        }

        if params == 0 && !fragment.is_empty() {
            target.named = Some(percent_decode(fragment));
        }
        target
    }
}

fn has_scheme(uri: &str) -> bool {
    let Some((scheme, _)) = uri.split_once(':') else {
        return false;
    };
    // single letters are drive names, not schemes
    scheme.len() > 1
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
