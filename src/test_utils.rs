pub mod test_helpers {
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex, PoisonError};

    use crate::generator::{CredentialProvider, PasswordReply, PromptKind};
    use crate::pdf::{
        Document, Engine, EngineDocument, EngineError, EnginePage, InfoDict, LayoutBlock,
        LayoutChar, LayoutLine, LayoutSpan, RawOutline, RawPixmap, RectF, Scale, TextLayout,
    };

    /// Page of a [`FakePdf`]
    #[derive(Clone, Debug)]
    pub struct FakePage {
        pub width: f32,
        pub height: f32,
        pub duration: Option<f32>,
        /// Colour every rendered pixel gets
        pub fill: [u8; 3],
        pub lines: Vec<Vec<String>>,
    }

    impl FakePage {
        pub fn new(width: f32, height: f32) -> Self {
            Self {
                width,
                height,
                duration: None,
                fill: [0xff, 0xff, 0xff],
                lines: Vec::new(),
            }
        }

        pub fn duration(mut self, secs: f32) -> Self {
            self.duration = Some(secs);
            self
        }

        pub fn fill(mut self, rgb: [u8; 3]) -> Self {
            self.fill = rgb;
            self
        }

        /// Add a line made of the given spans
        pub fn line(mut self, spans: &[&str]) -> Self {
            self.lines.push(spans.iter().map(|s| (*s).to_string()).collect());
            self
        }
    }

    /// Scripted content served by [`FakeEngine`]
    #[derive(Clone, Debug, Default)]
    pub struct FakePdf {
        pub pages: Vec<FakePage>,
        pub outline: Vec<RawOutline>,
        pub info: Option<InfoDict>,
        pub password: Option<Vec<u8>>,
        pub page_mode: Option<Vec<u8>>,
        pub format: Option<String>,
        pub missing_catalog: bool,
        pub fail_render: bool,
        pub fail_text: bool,
        pub fail_outline: bool,
    }

    impl FakePdf {
        pub fn new() -> Self {
            Self {
                format: Some("PDF 1.4".to_string()),
                ..Self::default()
            }
        }

        pub fn page(mut self, page: FakePage) -> Self {
            self.pages.push(page);
            self
        }

        /// `count` Letter-sized pages
        pub fn letter_pages(mut self, count: usize) -> Self {
            self.pages
                .extend(std::iter::repeat_n(FakePage::new(612.0, 792.0), count));
            self
        }

        pub fn outline(mut self, outline: Vec<RawOutline>) -> Self {
            self.outline = outline;
            self
        }

        pub fn info(mut self, entries: &[(&str, &str)]) -> Self {
            self.info = Some(InfoDict {
                entries: entries
                    .iter()
                    .map(|(k, v)| (k.as_bytes().to_vec(), Some((*v).to_string())))
                    .collect(),
            });
            self
        }

        pub fn password(mut self, password: &str) -> Self {
            self.password = Some(password.as_bytes().to_vec());
            self
        }

        pub fn page_mode(mut self, name: &str) -> Self {
            self.page_mode = Some(name.as_bytes().to_vec());
            self
        }

        pub fn format(mut self, format: Option<&str>) -> Self {
            self.format = format.map(str::to_owned);
            self
        }

        pub fn missing_catalog(mut self) -> Self {
            self.missing_catalog = true;
            self
        }

        pub fn failing_render(mut self) -> Self {
            self.fail_render = true;
            self
        }

        pub fn failing_text(mut self) -> Self {
            self.fail_text = true;
            self
        }

        pub fn failing_outline(mut self) -> Self {
            self.fail_outline = true;
            self
        }

        /// Document backed by an engine serving this content
        pub fn into_document(self) -> Document {
            Document::with_engine(Box::new(FakeEngine::new(self)))
        }

        /// Like [`into_document`](Self::into_document), also returning the call log
        pub fn into_document_with_log(self) -> (Document, Arc<Mutex<FakeLog>>) {
            let engine = FakeEngine::new(self);
            let log = engine.log();
            (Document::with_engine(Box::new(engine)), log)
        }
    }

    /// Calls observed by a [`FakeEngine`]
    #[derive(Debug, Default)]
    pub struct FakeLog {
        pub opens: usize,
        pub passwords: Vec<Vec<u8>>,
        pub pages_loaded: Vec<usize>,
    }

    /// In-memory [`Engine`] accepting any input that starts with `%PDF`
    pub struct FakeEngine {
        pdf: FakePdf,
        log: Arc<Mutex<FakeLog>>,
    }

    impl FakeEngine {
        pub fn new(pdf: FakePdf) -> Self {
            Self {
                pdf,
                log: Arc::default(),
            }
        }

        pub fn log(&self) -> Arc<Mutex<FakeLog>> {
            Arc::clone(&self.log)
        }
    }

    fn record(log: &Mutex<FakeLog>, f: impl FnOnce(&mut FakeLog)) {
        f(&mut log.lock().unwrap_or_else(PoisonError::into_inner));
    }

    impl Engine for FakeEngine {
        fn open(&self, data: Vec<u8>) -> Result<Box<dyn EngineDocument>, EngineError> {
            record(&self.log, |log| log.opens += 1);
            if !data.starts_with(b"%PDF") {
                return Err(EngineError::generic("no objects found"));
            }
            Ok(Box::new(FakeDocument {
                pdf: self.pdf.clone(),
                unlocked: self.pdf.password.is_none(),
                log: Arc::clone(&self.log),
            }))
        }
    }

    struct FakeDocument {
        pdf: FakePdf,
        unlocked: bool,
        log: Arc<Mutex<FakeLog>>,
    }

    impl EngineDocument for FakeDocument {
        fn needs_password(&self) -> bool {
            self.pdf.password.is_some()
        }

        fn authenticate(&mut self, password: &[u8]) -> bool {
            record(&self.log, |log| log.passwords.push(password.to_vec()));
            self.unlocked = self.pdf.password.as_deref().is_none_or(|p| p == password);
            self.unlocked
        }

        fn has_catalog(&self) -> bool {
            !self.pdf.missing_catalog
        }

        fn page_mode_name(&self) -> Option<Vec<u8>> {
            self.pdf.page_mode.clone()
        }

        fn count_pages(&self) -> Result<usize, EngineError> {
            if !self.unlocked {
                return Err(EngineError::generic("document is encrypted"));
            }
            Ok(self.pdf.pages.len())
        }

        fn load_page(&self, index: usize) -> Result<Box<dyn EnginePage>, EngineError> {
            let page = self
                .pdf
                .pages
                .get(index)
                .ok_or_else(|| EngineError::generic(format!("invalid page number: {index}")))?;
            record(&self.log, |log| log.pages_loaded.push(index));
            Ok(Box::new(FakePageHandle {
                page: page.clone(),
                fail_render: self.pdf.fail_render,
                fail_text: self.pdf.fail_text,
            }))
        }

        fn info_dict(&self) -> Result<Option<InfoDict>, EngineError> {
            Ok(self.pdf.info.clone())
        }

        fn outline(&self) -> Result<Vec<RawOutline>, EngineError> {
            if self.pdf.fail_outline {
                return Err(EngineError::generic("broken outline"));
            }
            Ok(self.pdf.outline.clone())
        }

        fn format(&self) -> Option<String> {
            self.pdf.format.clone()
        }
    }

    struct FakePageHandle {
        page: FakePage,
        fail_render: bool,
        fail_text: bool,
    }

    /// Glyph cell size used to lay out scripted text
    pub const GLYPH_WIDTH: f32 = 6.0;
    pub const LINE_HEIGHT: f32 = 12.0;

    impl EnginePage for FakePageHandle {
        fn bounds(&self) -> Result<RectF, EngineError> {
            Ok(RectF::new(0.0, 0.0, self.page.width, self.page.height))
        }

        fn presentation_duration(&self) -> Option<f32> {
            self.page.duration
        }

        fn rasterize(
            &self,
            transform: Scale,
            _width: u32,
            _height: u32,
        ) -> Result<RawPixmap, EngineError> {
            if self.fail_render {
                return Err(EngineError::generic("cookie reported errors"));
            }
            // size derived from the transform the way the library does, so
            // rounding can leave it a pixel off the request
            let width = (self.page.width * transform.sx).floor() as u32;
            let height = (self.page.height * transform.sy).floor() as u32;
            let stride = width as usize * 3;
            let samples = self
                .page
                .fill
                .iter()
                .copied()
                .cycle()
                .take(stride * height as usize)
                .collect();
            Ok(RawPixmap {
                width,
                height,
                n: 3,
                stride,
                samples,
            })
        }

        fn text_layout(&self) -> Result<TextLayout, EngineError> {
            if self.fail_text {
                return Err(EngineError::generic("layout analysis failed"));
            }
            let lines = self
                .page
                .lines
                .iter()
                .enumerate()
                .map(|(row, spans)| {
                    let y0 = row as f32 * LINE_HEIGHT;
                    let mut x = 0.0;
                    let spans = spans
                        .iter()
                        .map(|span| LayoutSpan {
                            chars: span
                                .chars()
                                .map(|c| {
                                    let bbox = RectF::new(x, y0, x + GLYPH_WIDTH, y0 + LINE_HEIGHT);
                                    x += GLYPH_WIDTH;
                                    LayoutChar { c, bbox }
                                })
                                .collect(),
                        })
                        .collect();
                    LayoutLine { spans }
                })
                .collect();
            Ok(TextLayout {
                blocks: vec![LayoutBlock::Image, LayoutBlock::Text(lines)],
            })
        }
    }

    /// Write something the fake engine accepts as a PDF
    pub fn write_fake_pdf(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"%PDF-1.4\n%%EOF\n").unwrap_or_else(|e| panic!("{path:?}: {e}"));
        path
    }

    /// [`CredentialProvider`] answering prompts from a script
    #[derive(Debug, Default)]
    pub struct ScriptedCredentials {
        pub stored: Option<(String, String)>,
        pub replies: Vec<Option<PasswordReply>>,
        pub with_store: bool,
        pub prompts: Vec<(PromptKind, bool)>,
        pub saved: Vec<(String, String)>,
    }

    impl ScriptedCredentials {
        pub fn new() -> Self {
            Self::default()
        }

        /// Enable the store, optionally seeded with `key` -> `password`
        pub fn with_store(mut self, seed: Option<(&str, &str)>) -> Self {
            self.with_store = true;
            self.stored = seed.map(|(k, p)| (k.to_string(), p.to_string()));
            self
        }

        pub fn reply(mut self, password: &str, keep: bool) -> Self {
            self.replies.push(Some(PasswordReply {
                password: password.to_string(),
                keep,
            }));
            self
        }

        pub fn cancel(mut self) -> Self {
            self.replies.push(None);
            self
        }
    }

    impl CredentialProvider for ScriptedCredentials {
        fn stored_password(&mut self, key: &str) -> Option<String> {
            self.stored
                .as_ref()
                .filter(|(k, _)| k == key)
                .map(|(_, p)| p.clone())
        }

        fn prompt(&mut self, kind: PromptKind, can_keep: bool) -> Option<PasswordReply> {
            self.prompts.push((kind, can_keep));
            if self.replies.is_empty() {
                return None;
            }
            self.replies.remove(0)
        }

        fn store_password(&mut self, key: &str, password: &str) {
            self.saved.push((key.to_string(), password.to_string()));
        }

        fn has_store(&self) -> bool {
            self.with_store
        }
    }
}
