//! [`Engine`] implementation backed by MuPDF

use std::{mem, vec};

use log::{debug, warn};
use mupdf::link::LinkDestination;
use mupdf::pdf::{PdfDocument, PdfObject};
use mupdf::text_page::TextBlockType;
use mupdf::{Colorspace, DestinationKind, Matrix, MetadataName, Outline, TextPageFlags};

use super::engine::{
    Engine, EngineDocument, EnginePage, InfoDict, LayoutBlock, LayoutChar, LayoutLine, LayoutSpan,
    RawLink, RawOutline, RawPixmap, TextLayout,
};
use super::error::EngineError;
use super::geometry::{RectF, Scale};

/// Opens documents with MuPDF's PDF handler
#[derive(Clone, Copy, Debug, Default)]
pub struct MuPdfEngine;

impl Engine for MuPdfEngine {
    fn open(&self, data: Vec<u8>) -> Result<Box<dyn EngineDocument>, EngineError> {
        let doc = PdfDocument::from_bytes(&data)?;
        Ok(Box::new(MuPdfDocument { doc }))
    }
}

struct MuPdfDocument {
    doc: PdfDocument,
}

// SAFETY: MuPDF handles are not tied to the thread that created them. The
// owning `Document` is never used from two threads at once; callers that share
// one serialize access through a mutex.
unsafe impl Send for MuPdfDocument {}

impl MuPdfDocument {
    fn catalog(&self) -> Option<PdfObject> {
        dict_entry(&self.doc.trailer().ok()?, "Root")
    }

    fn page_duration(&self, index: i32) -> Option<f32> {
        let page = self.doc.find_page(index).ok()?;
        let dur = page.get_dict("Dur").ok().flatten()?;
        dur.as_float().ok()
    }
}

impl EngineDocument for MuPdfDocument {
    fn needs_password(&self) -> bool {
        self.doc.needs_password().unwrap_or_else(|e| {
            warn!("Password check failed: {e}");
            false
        })
    }

    fn authenticate(&mut self, password: &[u8]) -> bool {
        let password = String::from_utf8_lossy(password);
        self.doc.authenticate(&password).unwrap_or_else(|e| {
            warn!("Authentication failed: {e}");
            false
        })
    }

    fn has_catalog(&self) -> bool {
        self.catalog().is_some()
    }

    fn page_mode_name(&self) -> Option<Vec<u8>> {
        let mode = self.catalog()?.get_dict("PageMode").ok().flatten()?;
        if !mode.is_name().ok()? {
            return None;
        }
        mode.as_name().ok().map(<[u8]>::to_vec)
    }

    fn count_pages(&self) -> Result<usize, EngineError> {
        let count = self.doc.page_count()?;
        usize::try_from(count).map_err(|_| EngineError::generic(format!("Bad page count {count}")))
    }

    fn load_page(&self, index: usize) -> Result<Box<dyn EnginePage>, EngineError> {
        let index = i32::try_from(index)
            .map_err(|_| EngineError::generic(format!("Page index {index} out of range")))?;
        let page = self.doc.load_page(index)?;
        let duration = self.page_duration(index);
        Ok(Box::new(MuPdfPage { page, duration }))
    }

    fn info_dict(&self) -> Result<Option<InfoDict>, EngineError> {
        let Some(info) = self.doc.trailer()?.get_dict("Info")? else {
            return Ok(None);
        };
        if !info.is_dict()? {
            debug!("Info entry is not a dictionary");
            return Ok(None);
        }

        let len = info.dict_len()?;
        let mut entries = Vec::with_capacity(len);
        for i in 0..len {
            let Ok(i) = i32::try_from(i) else { break };
            let Some(key) = info.get_dict_key(i)? else {
                continue;
            };
            if !key.is_name()? {
                continue;
            }
            let name = key.as_name()?.to_vec();
            let value = std::str::from_utf8(&name)
                .ok()
                .and_then(|k| dict_entry(&info, k))
                .and_then(|v| text_string(&v));
            entries.push((name, value));
        }
        Ok(Some(InfoDict { entries }))
    }

    fn outline(&self) -> Result<Vec<RawOutline>, EngineError> {
        let entries = self.doc.outlines()?;
        let first = self
            .catalog()
            .and_then(|catalog| dict_entry(&catalog, "Outlines"))
            .and_then(|outlines| dict_entry(&outlines, "First"));
        Ok(convert_outline(entries, first))
    }

    fn format(&self) -> Option<String> {
        self.doc
            .metadata(MetadataName::Format)
            .ok()
            .filter(|f| !f.is_empty())
    }
}

fn dict_entry(obj: &PdfObject, key: &str) -> Option<PdfObject> {
    obj.get_dict(key).ok().flatten()
}

/// Text of a string object, `None` for any other kind of object
fn text_string(obj: &PdfObject) -> Option<String> {
    if !obj.is_string().ok()? {
        return None;
    }
    obj.as_bytes().ok().map(decode_text_string)
}

/// Decode a PDF text string: UTF-16BE or UTF-8 when marked by a byte order
/// mark, otherwise UTF-8 if valid and Latin-1 if not
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_owned(),
        Err(_) => bytes.iter().copied().map(char::from).collect(),
    }
}

/// Convert MuPDF's outline, consuming it level by level.
///
/// `first` is the catalog's first outline item. Items are paired with the
/// converted entries in order so that `Count` can mark open entries, which
/// the binding does not report.
fn convert_outline(entries: Vec<Outline>, first: Option<PdfObject>) -> Vec<RawOutline> {
    struct Frame {
        pending: vec::IntoIter<Outline>,
        item: Option<PdfObject>,
        node: RawOutline,
    }

    let mut stack = vec![Frame {
        pending: entries.into_iter(),
        item: first,
        node: RawOutline::default(),
    }];

    loop {
        let Some(frame) = stack.last_mut() else {
            return Vec::new();
        };

        if let Some(Outline {
            title,
            uri,
            dest,
            down,
        }) = frame.pending.next()
        {
            let item = frame.item.take();
            frame.item = item.as_ref().and_then(|i| dict_entry(i, "Next"));
            let is_open = item
                .as_ref()
                .and_then(|i| dict_entry(i, "Count"))
                .and_then(|count| count.as_int().ok())
                .is_some_and(|count| count > 0);

            let node = RawOutline {
                title: Some(title),
                is_open,
                link: outline_link(dest, uri.as_deref()),
                down: Vec::with_capacity(down.len()),
            };
            stack.push(Frame {
                pending: down.into_iter(),
                item: item.as_ref().and_then(|i| dict_entry(i, "First")),
                node,
            });
            continue;
        }

        let Some(mut done) = stack.pop() else {
            return Vec::new();
        };
        match stack.last_mut() {
            Some(parent) => parent.node.down.push(done.node),
            None => return mem::take(&mut done.node.down),
        }
    }
}

fn outline_link(dest: Option<LinkDestination>, uri: Option<&str>) -> RawLink {
    match (dest, uri) {
        (Some(dest), _) => RawLink::goto(
            i32::try_from(dest.loc.page_number).unwrap_or(-1),
            dest_rect(dest.kind),
        ),
        (None, Some(uri)) => RawLink::from_uri(uri),
        (None, None) => RawLink::default(),
    }
}

/// Area of the target page a destination points at.
///
/// Point destinations give an empty rect at that point, with a missing
/// coordinate taken as 0. Whole-page fits give `None`.
fn dest_rect(kind: DestinationKind) -> Option<RectF> {
    let known = |v: Option<f32>| v.filter(|v| v.is_finite());
    let point = |x: Option<f32>, y: Option<f32>| {
        let (x, y) = (known(x), known(y));
        if x.is_none() && y.is_none() {
            return None;
        }
        let (x, y) = (x.unwrap_or(0.0), y.unwrap_or(0.0));
        Some(RectF::new(x, y, x, y))
    };

    match kind {
        DestinationKind::Fit | DestinationKind::FitB => None,
        DestinationKind::XYZ { left, top, .. } => point(left, top),
        DestinationKind::FitH { top } | DestinationKind::FitBH { top } => point(None, Some(top)),
        DestinationKind::FitV { left } | DestinationKind::FitBV { left } => point(Some(left), None),
        DestinationKind::FitR {
            left,
            bottom,
            right,
            top,
        } => [left, bottom, right, top]
            .iter()
            .all(|v| v.is_finite())
            .then(|| RectF::new(left, top, right, bottom).normalized()),
    }
}

struct MuPdfPage {
    page: mupdf::Page,
    duration: Option<f32>,
}

// SAFETY: see `MuPdfDocument`.
unsafe impl Send for MuPdfPage {}

impl EnginePage for MuPdfPage {
    fn bounds(&self) -> Result<RectF, EngineError> {
        Ok(self.page.bounds()?.into())
    }

    fn presentation_duration(&self) -> Option<f32> {
        self.duration
    }

    fn rasterize(
        &self,
        transform: Scale,
        width: u32,
        height: u32,
    ) -> Result<RawPixmap, EngineError> {
        let matrix = Matrix::from(transform);
        let pixmap = self
            .page
            .to_pixmap(&matrix, &Colorspace::device_rgb(), false, true)?;
        debug!(
            "Rasterized {}x{} for a {width}x{height} request",
            pixmap.width(),
            pixmap.height()
        );

        let bad = |what: &str| EngineError::generic(format!("Pixmap {what} out of range"));
        Ok(RawPixmap {
            width: u32::try_from(pixmap.width()).map_err(|_| bad("width"))?,
            height: u32::try_from(pixmap.height()).map_err(|_| bad("height"))?,
            n: u8::try_from(pixmap.n()).map_err(|_| bad("components"))?,
            stride: usize::try_from(pixmap.stride()).map_err(|_| bad("stride"))?,
            samples: pixmap.samples().to_vec(),
        })
    }

    fn text_layout(&self) -> Result<TextLayout, EngineError> {
        let text_page = self.page.to_text_page(TextPageFlags::empty())?;
        let blocks = text_page
            .blocks()
            .map(|block| {
                if block.r#type() != TextBlockType::Text {
                    return LayoutBlock::Image;
                }
                let lines = block
                    .lines()
                    .map(|line| {
                        let chars = line
                            .chars()
                            .map(|ch| LayoutChar {
                                c: ch.char().unwrap_or(char::REPLACEMENT_CHARACTER),
                                bbox: ch.quad().into(),
                            })
                            .collect();
                        LayoutLine {
                            spans: vec![LayoutSpan { chars }],
                        }
                    })
                    .collect();
                LayoutBlock::Text(lines)
            })
            .collect();
        Ok(TextLayout { blocks })
    }
}
