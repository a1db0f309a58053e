//! PDF document handle

use std::cell::OnceCell;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, warn};

use super::engine::{Engine, EngineDocument, InfoDict};
use super::error::PdfError;
use super::locale::NumericLocaleGuard;
use super::outline::Outline;
use super::page::Page;

/// Initial view requested by the document catalog
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PageMode {
    #[default]
    UseNone,
    UseOutlines,
    UseThumbs,
    FullScreen,
    UseOC,
    UseAttachments,
}

impl PageMode {
    /// Map a catalog `PageMode` name; unknown names yield `None`
    #[must_use]
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"UseNone" => Some(Self::UseNone),
            b"UseOutlines" => Some(Self::UseOutlines),
            b"UseThumbs" => Some(Self::UseThumbs),
            b"FullScreen" => Some(Self::FullScreen),
            b"UseOC" => Some(Self::UseOC),
            b"UseAttachments" => Some(Self::UseAttachments),
            _ => None,
        }
    }
}

/// Counter bumped whenever the open document goes away.
///
/// Pages remember the value they were created under and refuse to touch the
/// library once it has moved on.
#[derive(Clone, Debug, Default)]
pub(crate) struct Generation(Arc<AtomicU64>);

impl Generation {
    fn bump(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }

    fn token(&self) -> GenerationToken {
        GenerationToken {
            counter: Arc::clone(&self.0),
            issued: self.0.load(Ordering::Acquire),
        }
    }
}

#[derive(Debug)]
pub(crate) struct GenerationToken {
    counter: Arc<AtomicU64>,
    issued: u64,
}

impl GenerationToken {
    pub(crate) fn is_current(&self) -> bool {
        self.counter.load(Ordering::Acquire) == self.issued
    }
}

/// A PDF document opened through a rendering [`Engine`].
///
/// Owns the engine and the opened library handle; both are released together
/// by [`close`](Self::close) or on drop. Not meant for concurrent use: callers
/// that share a document across threads put it behind a lock.
pub struct Document {
    engine: Box<dyn Engine>,
    inner: Option<Box<dyn EngineDocument>>,
    page_count: usize,
    page_mode: PageMode,
    locked: bool,
    info: OnceCell<Option<InfoDict>>,
    generation: Generation,
}

impl Document {
    /// Document backed by MuPDF
    #[cfg(feature = "pdf")]
    #[must_use]
    pub fn new() -> Self {
        Self::with_engine(Box::new(super::mupdf_engine::MuPdfEngine))
    }

    #[must_use]
    pub fn with_engine(engine: Box<dyn Engine>) -> Self {
        Self {
            engine,
            inner: None,
            page_count: 0,
            page_mode: PageMode::default(),
            locked: false,
            info: OnceCell::new(),
            generation: Generation::default(),
        }
    }

    /// Open the PDF file at `path`, closing whatever was open before.
    ///
    /// Succeeds for password protected files too; check
    /// [`is_locked`](Self::is_locked) afterwards.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), PdfError> {
        let path = path.as_ref();
        self.close();
        let data = fs::read(path).map_err(|source| PdfError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Opening {} ({} bytes)", path.display(), data.len());
        self.load_bytes(data)
    }

    /// Open a PDF held in memory
    pub fn load_bytes(&mut self, data: Vec<u8>) -> Result<(), PdfError> {
        self.close();

        let inner = {
            let _locale = NumericLocaleGuard::pin_c();
            self.engine.open(data)?
        };
        self.locked = inner.needs_password();
        self.inner = Some(inner);

        if self.locked {
            debug!("Document requires a password");
            return Ok(());
        }

        if let Err(e) = self.finish_load() {
            self.close();
            return Err(e);
        }
        Ok(())
    }

    /// Read the catalog once the document content is accessible
    fn finish_load(&mut self) -> Result<(), PdfError> {
        let inner = self.inner.as_ref().ok_or(PdfError::DocumentClosed)?;
        if !inner.has_catalog() {
            return Err(PdfError::MissingCatalog);
        }
        let page_count = inner.count_pages()?;
        let page_mode = inner
            .page_mode_name()
            .and_then(|name| PageMode::from_name(&name))
            .unwrap_or_default();

        self.page_count = page_count;
        self.page_mode = page_mode;
        debug!("Loaded {page_count} pages, page mode {page_mode:?}");
        Ok(())
    }

    /// Release the document. Calling it on a closed document does nothing.
    pub fn close(&mut self) {
        if self.inner.take().is_some() {
            debug!("Closing document");
        }
        self.page_count = 0;
        self.page_mode = PageMode::UseNone;
        self.locked = false;
        self.info = OnceCell::new();
        self.generation.bump();
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    /// Try `password` on a locked document.
    ///
    /// Returns false when the document is not locked, the password is wrong,
    /// or the catalog cannot be read afterwards. In every failing case the
    /// document stays locked.
    pub fn unlock(&mut self, password: &[u8]) -> bool {
        if !self.locked {
            return false;
        }
        let Some(inner) = self.inner.as_mut() else {
            return false;
        };
        if !inner.authenticate(password) {
            debug!("Password rejected");
            return false;
        }

        self.locked = false;
        match self.finish_load() {
            Ok(()) => true,
            Err(e) => {
                warn!("Unlocked document could not be loaded: {e}");
                self.locked = true;
                self.page_count = 0;
                self.page_mode = PageMode::UseNone;
                false
            }
        }
    }

    /// Zero until a document has been loaded and unlocked
    #[must_use]
    pub const fn page_count(&self) -> usize {
        self.page_count
    }

    #[must_use]
    pub const fn page_mode(&self) -> PageMode {
        self.page_mode
    }

    fn readable(&self) -> Option<&dyn EngineDocument> {
        if self.locked {
            return None;
        }
        self.inner.as_deref()
    }

    /// Load page `index`. `None` when nothing is open or the index is out of range.
    #[must_use]
    pub fn page(&self, index: usize) -> Option<Page> {
        let inner = self.readable()?;
        if index >= self.page_count {
            return None;
        }
        match inner.load_page(index) {
            Ok(page) => Some(Page::new(index, page, self.generation.token())),
            Err(e) => {
                warn!("Failed to load page {index}: {e}");
                None
            }
        }
    }

    fn info(&self) -> Option<&InfoDict> {
        let inner = self.readable()?;
        self.info
            .get_or_init(|| {
                inner.info_dict().unwrap_or_else(|e| {
                    warn!("Failed to read the Info dictionary: {e}");
                    None
                })
            })
            .as_ref()
    }

    /// Keys present in the `Info` dictionary
    #[must_use]
    pub fn info_keys(&self) -> Vec<Vec<u8>> {
        self.info()
            .map(|info| info.keys().map(<[u8]>::to_vec).collect())
            .unwrap_or_default()
    }

    /// Text value of an `Info` entry, empty when absent
    #[must_use]
    pub fn info_key(&self, key: &[u8]) -> String {
        self.info()
            .and_then(|info| info.get(key))
            .map(str::to_owned)
            .unwrap_or_default()
    }

    /// Bookmark tree, `None` when the document has none
    #[must_use]
    pub fn outline(&self) -> Option<Outline> {
        let inner = self.readable()?;
        let entries = match inner.outline() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to load outline: {e}");
                return None;
            }
        };
        if entries.is_empty() {
            return None;
        }
        Some(Outline::from_raw(&entries))
    }

    /// PDF version as `major + minor / 10`, 0.0 when unknown
    #[must_use]
    pub fn pdf_version(&self) -> f32 {
        self.inner
            .as_ref()
            .and_then(|inner| inner.format())
            .and_then(|format| parse_pdf_version(&format))
            .unwrap_or(0.0)
    }
}

#[cfg(feature = "pdf")]
impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Document {
    fn drop(&mut self) {
        self.generation.bump();
    }
}

/// Parse a `"PDF 1.7"` format string
fn parse_pdf_version(format: &str) -> Option<f32> {
    let rest = format.trim().strip_prefix("PDF")?.trim_start();
    let (major, minor) = rest.split_once('.')?;
    let major: u16 = major.parse().ok()?;
    let digits: String = minor.chars().take_while(char::is_ascii_digit).collect();
    let minor: u16 = digits.parse().ok()?;
    Some(f32::from(major) + f32::from(minor) / 10.0)
}
