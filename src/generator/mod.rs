//! Host-facing document generator
//!
//! Wraps a [`Document`] behind a single lock and exposes what a viewer asks
//! for: the page list, rendered pages, text layers, document information, the
//! table of contents and source synchronization.

mod credentials;
mod info;
mod password;
mod synctex;
mod synopsis;
mod text_page;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use image::RgbaImage;
use log::{debug, info, warn};

use crate::pdf::{Document, PageMode, PdfError};

pub use credentials::{CredentialError, DEFAULT_FOLDER, FileCredentialStore, StoreBackedCredentials};
pub use info::{DocumentInfo, InfoEntry, InfoKey};
pub use password::{
    CredentialProvider, PasswordReply, PasswordSession, PromptKind, SessionFailure, SessionState,
};
pub use synctex::{
    DocumentViewport, HOST_DPI, SourceReference, SyncDisplayHit, SyncEditHit, SyncOpener,
    SyncScanner, UNKNOWN_LINE, ViewportPosition, device_to_points, parse_source_reference,
    tex_points_to_device, viewport_from_hit,
};
pub use synopsis::{Synopsis, SynopsisNode};
pub use text_page::{TextEntity, TextPage};

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("cannot open document: {0}")]
    Open(#[from] PdfError),

    #[error("password entry cancelled")]
    Cancelled,

    #[error("no document is open")]
    NotOpen,
}

impl From<SessionFailure> for GeneratorError {
    fn from(failure: SessionFailure) -> Self {
        match failure {
            SessionFailure::Load(e) => Self::Open(e),
            SessionFailure::Cancelled => Self::Cancelled,
        }
    }
}

/// Page as announced to the host after opening
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageInfo {
    pub number: usize,
    pub width: f64,
    pub height: f64,
    /// Always 0; page rotation is not read from the file
    pub rotation: u16,
    /// Slide duration in seconds
    pub duration: Option<f32>,
}

/// Outcome of a non-interactive open
#[derive(Debug)]
pub enum OpenResult {
    Success(Vec<PageInfo>),
    /// The document is encrypted and the password was missing or wrong
    NeedsPassword,
    Error(GeneratorError),
}

/// Host request for a page image
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixmapRequest {
    pub page: usize,
    pub width: u32,
    pub height: u32,
}

/// Metadata the host may query by name
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetaDataQuery {
    DocumentTitle,
    StartFullScreen,
    OpenTOC,
    /// Named destination or `src:` reference
    NamedViewport(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum MetaDataValue {
    Text(String),
    Flag(bool),
    Viewport(DocumentViewport),
}

#[derive(Default)]
struct Cache {
    pages: Vec<PageInfo>,
    info: Option<DocumentInfo>,
    /// Outer `None` = not computed yet
    synopsis: Option<Option<Arc<Synopsis>>>,
    sync: Option<Box<dyn SyncScanner>>,
}

pub struct Generator {
    document: Mutex<Document>,
    cache: Mutex<Cache>,
    sync_opener: Option<Box<dyn SyncOpener>>,
}

impl Generator {
    #[must_use]
    pub fn new(document: Document) -> Self {
        Self {
            document: Mutex::new(document),
            cache: Mutex::new(Cache::default()),
            sync_opener: None,
        }
    }

    /// Attach source sync to every document opened from now on
    #[must_use]
    pub fn with_sync_opener(mut self, opener: Box<dyn SyncOpener>) -> Self {
        self.sync_opener = Some(opener);
        self
    }

    fn document(&self) -> MutexGuard<'_, Document> {
        self.document.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cache(&self) -> MutexGuard<'_, Cache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open `path`, asking `provider` for passwords while it is locked
    pub fn load_document(
        &self,
        path: &Path,
        provider: &mut dyn CredentialProvider,
    ) -> Result<Vec<PageInfo>, GeneratorError> {
        self.close_document();
        let key = wallet_key(path);
        PasswordSession::new(&self.document).run(path, key.as_deref(), provider)?;
        Ok(self.finish_open(path))
    }

    /// Open `path` with a known password, without prompting
    pub fn load_document_with_password(&self, path: &Path, password: &str) -> OpenResult {
        self.close_document();
        {
            let mut doc = self.document();
            if let Err(e) = doc.load(path) {
                return OpenResult::Error(e.into());
            }
            if doc.is_locked() && !doc.unlock(password.as_bytes()) {
                debug!("Password did not unlock {}", path.display());
                doc.close();
                return OpenResult::NeedsPassword;
            }
        }
        OpenResult::Success(self.finish_open(path))
    }

    fn finish_open(&self, path: &Path) -> Vec<PageInfo> {
        let pages = self.collect_pages();
        let sync = self.sync_opener.as_ref().and_then(|opener| opener.open(path));
        if sync.is_some() {
            debug!("Source sync available for {}", path.display());
        }
        info!("Opened {} with {} pages", path.display(), pages.len());

        let mut cache = self.cache();
        cache.pages = pages.clone();
        cache.sync = sync;
        pages
    }

    fn collect_pages(&self) -> Vec<PageInfo> {
        let doc = self.document();
        (0..doc.page_count())
            .map(|number| {
                let page = doc.page(number);
                let size = page.as_ref().and_then(|p| p.size().ok()).unwrap_or_default();
                let duration = page.as_ref().and_then(|p| p.duration().ok()).flatten();
                if page.is_none() {
                    warn!("Page {number} could not be loaded");
                }
                PageInfo {
                    number,
                    width: f64::from(size.width),
                    height: f64::from(size.height),
                    rotation: 0,
                    duration,
                }
            })
            .collect()
    }

    /// Close the document and drop everything cached for it
    pub fn close_document(&self) {
        self.document().close();
        *self.cache() = Cache::default();
    }

    #[must_use]
    pub fn pages(&self) -> Vec<PageInfo> {
        self.cache().pages.clone()
    }

    /// Render a page; an empty image when the page cannot be rendered
    pub fn image(&self, request: PixmapRequest) -> Result<RgbaImage, GeneratorError> {
        let doc = self.document();
        if !doc.is_open() {
            return Err(GeneratorError::NotOpen);
        }
        let Some(page) = doc.page(request.page) else {
            warn!("No page {} to render", request.page);
            return Ok(RgbaImage::new(0, 0));
        };
        Ok(page.render(request.width, request.height)?)
    }

    /// Text layer of a page
    #[must_use]
    pub fn text_page(&self, number: usize) -> Option<TextPage> {
        let (boxes, size) = {
            let doc = self.document();
            let page = doc.page(number)?;
            (page.text_boxes().ok()?, page.size().ok()?)
        };
        TextPage::from_boxes(&boxes, size)
    }

    /// Information block, computed once per open document
    pub fn generate_document_info(&self) -> Result<DocumentInfo, GeneratorError> {
        if let Some(info) = &self.cache().info {
            return Ok(info.clone());
        }
        let info = {
            let doc = self.document();
            if !doc.is_open() {
                return Err(GeneratorError::NotOpen);
            }
            DocumentInfo::from_document(&doc)
        };
        self.cache().info = Some(info.clone());
        Ok(info)
    }

    /// Table of contents, computed once per open document and shared after that
    #[must_use]
    pub fn generate_document_synopsis(&self) -> Option<Arc<Synopsis>> {
        if let Some(synopsis) = &self.cache().synopsis {
            return synopsis.clone();
        }
        let outline = {
            let doc = self.document();
            if !doc.is_open() {
                return None;
            }
            doc.outline()
        };
        let synopsis = outline
            .as_ref()
            .map(|root| Arc::new(Synopsis::from_outline(root)));
        self.cache().synopsis = Some(synopsis.clone());
        synopsis
    }

    #[must_use]
    pub fn meta_data(&self, query: &MetaDataQuery) -> Option<MetaDataValue> {
        match query {
            MetaDataQuery::DocumentTitle => {
                Some(MetaDataValue::Text(self.document().info_key(b"Title")))
            }
            MetaDataQuery::StartFullScreen => (self.document().page_mode() == PageMode::FullScreen)
                .then_some(MetaDataValue::Flag(true)),
            MetaDataQuery::OpenTOC => (self.document().page_mode() == PageMode::UseOutlines)
                .then_some(MetaDataValue::Flag(true)),
            MetaDataQuery::NamedViewport(name) => {
                if name.is_empty() {
                    return None;
                }
                // named destinations are not resolved
                let (line, file) = parse_source_reference(name)?;
                self.viewport_for_source(&file, line)
                    .map(MetaDataValue::Viewport)
            }
        }
    }

    /// Page position generated from `file` at `line`
    #[must_use]
    pub fn viewport_for_source(&self, file: &str, line: i32) -> Option<DocumentViewport> {
        let mut cache = self.cache();
        let Cache { pages, sync, .. } = &mut *cache;
        let hit = sync.as_mut()?.display_query(file, line, 0)?;
        viewport_from_hit(&hit, |page| {
            pages.get(page).map(|info| (info.width, info.height))
        })
    }

    /// Source location under a point of `page`, given in host pixels
    #[must_use]
    pub fn dynamic_source_reference(
        &self,
        page: usize,
        abs_x: f64,
        abs_y: f64,
    ) -> Option<SourceReference> {
        let page = i32::try_from(page).ok()?.checked_add(1)?;
        let mut cache = self.cache();
        let hit = cache.sync.as_mut()?.edit_query(
            page,
            device_to_points(abs_x),
            device_to_points(abs_y),
        )?;
        Some(hit.into())
    }

    #[must_use]
    pub fn has_source_sync(&self) -> bool {
        self.cache().sync.is_some()
    }
}

/// Name remembered passwords are stored under
fn wallet_key(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
}
