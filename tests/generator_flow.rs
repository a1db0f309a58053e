use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use mupdf_generator::generator::{
    Generator, GeneratorError, InfoKey, MetaDataQuery, MetaDataValue, OpenResult, PixmapRequest,
    PromptKind, SourceReference, SyncDisplayHit, SyncEditHit, SyncScanner,
};
use mupdf_generator::pdf::{PdfError, RawLink, RawOutline};
use mupdf_generator::test_utils::test_helpers::*;
use tempfile::TempDir;

fn fixture() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fake_pdf(dir.path(), "report.pdf");
    (dir, path)
}

fn locked_pdf() -> FakePdf {
    FakePdf::new().letter_pages(2).password("secret")
}

#[test]
fn plain_document_needs_no_prompt() {
    let (_dir, path) = fixture();
    let generator = Generator::new(FakePdf::new().letter_pages(3).into_document());
    let mut creds = ScriptedCredentials::new();

    let pages = generator.load_document(&path, &mut creds).unwrap();
    assert_eq!(pages.len(), 3);
    assert_eq!(pages[2].number, 2);
    assert_eq!((pages[0].width, pages[0].height), (612.0, 792.0));
    assert_eq!(pages[0].rotation, 0);
    assert!(creds.prompts.is_empty());
    assert_eq!(generator.pages(), pages);
}

#[test]
fn remembered_password_is_tried_first() {
    let (_dir, path) = fixture();
    let generator = Generator::new(locked_pdf().into_document());
    let mut creds = ScriptedCredentials::new().with_store(Some(("report.pdf", "secret")));

    let pages = generator.load_document(&path, &mut creds).unwrap();
    assert_eq!(pages.len(), 2);
    assert!(creds.prompts.is_empty());
    assert!(creds.saved.is_empty());
}

#[test]
fn stale_remembered_password_falls_back_to_prompt_and_saves() {
    let (_dir, path) = fixture();
    let generator = Generator::new(locked_pdf().into_document());
    let mut creds = ScriptedCredentials::new()
        .with_store(Some(("report.pdf", "old")))
        .reply("secret", true);

    generator.load_document(&path, &mut creds).unwrap();
    assert_eq!(creds.prompts, vec![(PromptKind::FirstAttempt, true)]);
    assert_eq!(
        creds.saved,
        vec![("report.pdf".to_string(), "secret".to_string())]
    );
}

#[test]
fn password_not_saved_without_keep() {
    let (_dir, path) = fixture();
    let generator = Generator::new(locked_pdf().into_document());
    let mut creds = ScriptedCredentials::new()
        .with_store(None)
        .reply("secret", false);

    generator.load_document(&path, &mut creds).unwrap();
    assert!(creds.saved.is_empty());
}

#[test]
fn wrong_password_prompts_again() {
    let (_dir, path) = fixture();
    let (doc, log) = locked_pdf().into_document_with_log();
    let generator = Generator::new(doc);
    let mut creds = ScriptedCredentials::new()
        .reply("guess", true)
        .reply("secret", true);

    let pages = generator.load_document(&path, &mut creds).unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(
        creds.prompts,
        vec![
            (PromptKind::FirstAttempt, false),
            (PromptKind::RetryAfterFailure, false),
        ]
    );
    // no store: nothing can be remembered
    assert!(creds.saved.is_empty());
    assert_eq!(
        log.lock().unwrap().passwords,
        vec![b"guess".to_vec(), b"secret".to_vec()]
    );
}

#[test]
fn cancelling_the_prompt_fails_and_closes() {
    let (_dir, path) = fixture();
    let generator = Generator::new(locked_pdf().into_document());
    let mut creds = ScriptedCredentials::new().reply("guess", false).cancel();

    let err = generator.load_document(&path, &mut creds).unwrap_err();
    assert!(matches!(err, GeneratorError::Cancelled));
    assert_eq!(creds.prompts.len(), 2);
    assert!(generator.pages().is_empty());
    assert!(matches!(
        generator.image(PixmapRequest {
            page: 0,
            width: 10,
            height: 10
        }),
        Err(GeneratorError::NotOpen)
    ));
}

#[test]
fn unreadable_file_reports_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.pdf");
    std::fs::write(&path, b"not a pdf").unwrap();
    let generator = Generator::new(FakePdf::new().letter_pages(1).into_document());

    let err = generator
        .load_document(&path, &mut ScriptedCredentials::new())
        .unwrap_err();
    assert!(matches!(err, GeneratorError::Open(PdfError::Engine(_))));
}

#[test]
fn open_with_known_password() {
    let (_dir, path) = fixture();
    let generator = Generator::new(locked_pdf().into_document());

    assert!(matches!(
        generator.load_document_with_password(&path, "wrong"),
        OpenResult::NeedsPassword
    ));
    assert!(generator.pages().is_empty());

    match generator.load_document_with_password(&path, "secret") {
        OpenResult::Success(pages) => assert_eq!(pages.len(), 2),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn open_with_password_reports_load_errors() {
    let dir = tempfile::tempdir().unwrap();
    let generator = Generator::new(FakePdf::new().letter_pages(1).into_document());
    let result = generator.load_document_with_password(&dir.path().join("gone.pdf"), "");
    assert!(matches!(
        result,
        OpenResult::Error(GeneratorError::Open(PdfError::Io { .. }))
    ));
}

#[test]
fn image_renders_requested_page() {
    let (_dir, path) = fixture();
    let generator = Generator::new(
        FakePdf::new()
            .page(FakePage::new(100.0, 100.0).fill([1, 2, 3]))
            .into_document(),
    );
    generator
        .load_document(&path, &mut ScriptedCredentials::new())
        .unwrap();

    let image = generator
        .image(PixmapRequest {
            page: 0,
            width: 50,
            height: 40,
        })
        .unwrap();
    assert_eq!(image.dimensions(), (50, 40));
    assert_eq!(image.get_pixel(0, 0).0, [1, 2, 3, 0xff]);

    let missing = generator
        .image(PixmapRequest {
            page: 5,
            width: 50,
            height: 40,
        })
        .unwrap();
    assert_eq!(missing.dimensions(), (0, 0));
}

#[test]
fn text_page_normalizes_character_areas() {
    let (_dir, path) = fixture();
    let generator = Generator::new(
        FakePdf::new()
            .page(FakePage::new(120.0, 240.0).line(&["ab"]).line(&["c"]))
            .into_document(),
    );
    generator
        .load_document(&path, &mut ScriptedCredentials::new())
        .unwrap();

    let text = generator.text_page(0).unwrap();
    assert_eq!(text.text(), "ab\nc\n");
    let b = &text.entities()[1];
    assert_eq!(b.text, "b\n");
    assert!((b.area.left - 0.05).abs() < 1e-9);
    assert!((b.area.bottom - 0.05).abs() < 1e-9);
    assert!(generator.text_page(1).is_none());
}

#[test]
fn document_info_is_collected_once() {
    let (_dir, path) = fixture();
    let generator = Generator::new(
        FakePdf::new()
            .letter_pages(3)
            .info(&[("Title", "Quarterly"), ("Author", "Ops")])
            .into_document(),
    );
    generator
        .load_document(&path, &mut ScriptedCredentials::new())
        .unwrap();

    let info = generator.generate_document_info().unwrap();
    assert_eq!(info.get(InfoKey::MimeType), Some("application/pdf"));
    assert_eq!(info.get(InfoKey::Title), Some("Quarterly"));
    assert_eq!(info.get(InfoKey::Author), Some("Ops"));
    assert_eq!(info.get(InfoKey::Subject), Some(""));
    assert_eq!(info.get(InfoKey::Pages), Some("3"));
    assert_eq!(info.get(InfoKey::Custom("format")), Some("PDF v. 1.4"));
    let format = info
        .entries()
        .iter()
        .find(|e| e.key == InfoKey::Custom("format"))
        .unwrap();
    assert_eq!(format.title, Some("Format"));

    assert_eq!(generator.generate_document_info().unwrap(), info);

    generator.close_document();
    assert!(matches!(
        generator.generate_document_info(),
        Err(GeneratorError::NotOpen)
    ));
}

#[test]
fn synopsis_mirrors_outline() {
    let (_dir, path) = fixture();
    let outline = vec![
        RawOutline::new("Intro", RawLink::goto(0, None))
            .open()
            .with_children(vec![RawOutline::new("Scope", RawLink::goto(1, None))]),
        RawOutline::new("Results", RawLink::goto(2, None)),
    ];
    let generator = Generator::new(
        FakePdf::new()
            .letter_pages(3)
            .outline(outline)
            .into_document(),
    );
    generator
        .load_document(&path, &mut ScriptedCredentials::new())
        .unwrap();

    let synopsis = generator.generate_document_synopsis().unwrap();
    let walked: Vec<(usize, &str, bool)> = synopsis
        .walk()
        .map(|(level, node)| (level, node.title.as_str(), node.open))
        .collect();
    assert_eq!(
        walked,
        vec![(0, "Intro", true), (1, "Scope", false), (0, "Results", false)]
    );
    let again = generator.generate_document_synopsis().unwrap();
    assert!(Arc::ptr_eq(&synopsis, &again));

    generator.close_document();
    generator
        .load_document(&path, &mut ScriptedCredentials::new())
        .unwrap();
    let reopened = generator.generate_document_synopsis().unwrap();
    assert!(!Arc::ptr_eq(&synopsis, &reopened));
    assert_eq!(*reopened, *synopsis);
}

#[test]
fn synopsis_absent_without_outline() {
    let (_dir, path) = fixture();
    let generator = Generator::new(FakePdf::new().letter_pages(1).into_document());
    assert!(generator.generate_document_synopsis().is_none());

    generator
        .load_document(&path, &mut ScriptedCredentials::new())
        .unwrap();
    assert!(generator.generate_document_synopsis().is_none());
}

#[test]
fn metadata_reflects_title_and_page_mode() {
    let (_dir, path) = fixture();
    let generator = Generator::new(
        FakePdf::new()
            .letter_pages(1)
            .info(&[("Title", "Slides")])
            .page_mode("FullScreen")
            .into_document(),
    );
    generator
        .load_document(&path, &mut ScriptedCredentials::new())
        .unwrap();

    assert_eq!(
        generator.meta_data(&MetaDataQuery::DocumentTitle),
        Some(MetaDataValue::Text("Slides".into()))
    );
    assert_eq!(
        generator.meta_data(&MetaDataQuery::StartFullScreen),
        Some(MetaDataValue::Flag(true))
    );
    assert_eq!(generator.meta_data(&MetaDataQuery::OpenTOC), None);
    assert_eq!(
        generator.meta_data(&MetaDataQuery::NamedViewport("chapter.1".into())),
        None
    );
    assert_eq!(
        generator.meta_data(&MetaDataQuery::NamedViewport(String::new())),
        None
    );
}

#[derive(Default)]
struct Queries {
    edit: Vec<(i32, f64, f64)>,
    display: Vec<(String, i32, i32)>,
}

struct FakeScanner {
    queries: Arc<Mutex<Queries>>,
}

impl SyncScanner for FakeScanner {
    fn edit_query(&mut self, page: i32, h: f64, v: f64) -> Option<SyncEditHit> {
        self.queries.lock().unwrap().edit.push((page, h, v));
        Some(SyncEditHit {
            file: "chapter.tex".into(),
            line: 42,
            column: -1,
        })
    }

    fn display_query(&mut self, file: &str, line: i32, column: i32) -> Option<SyncDisplayHit> {
        self.queries
            .lock()
            .unwrap()
            .display
            .push((file.to_string(), line, column));
        (file == "chapter.tex").then_some(SyncDisplayHit {
            page: 2,
            h: 72.27,
            v: 144.54,
        })
    }
}

fn synced_generator(pdf: FakePdf) -> (Generator, Arc<Mutex<Queries>>) {
    let queries = Arc::new(Mutex::new(Queries::default()));
    let shared = Arc::clone(&queries);
    let generator = Generator::new(pdf.into_document()).with_sync_opener(Box::new(
        move |_: &Path| -> Option<Box<dyn SyncScanner>> {
            Some(Box::new(FakeScanner {
                queries: Arc::clone(&shared),
            }))
        },
    ));
    (generator, queries)
}

#[test]
fn source_reference_resolves_to_viewport() {
    let (_dir, path) = fixture();
    let (generator, queries) = synced_generator(FakePdf::new().letter_pages(3));
    assert!(!generator.has_source_sync());
    generator
        .load_document(&path, &mut ScriptedCredentials::new())
        .unwrap();
    assert!(generator.has_source_sync());

    let Some(MetaDataValue::Viewport(viewport)) =
        generator.meta_data(&MetaDataQuery::NamedViewport("src:17 chapter.tex".into()))
    else {
        panic!("expected a viewport");
    };
    assert_eq!(viewport.page, 1);
    let position = viewport.position.unwrap();
    assert!(position.centered);
    assert!((position.normalized_x - 96.0 / 612.0).abs() < 1e-9);
    assert!((position.normalized_y - 192.5 / 792.0).abs() < 1e-9);

    assert_eq!(
        queries.lock().unwrap().display,
        vec![("chapter.tex".to_string(), 17, 0)]
    );
    assert!(generator.viewport_for_source("other.tex", 1).is_none());
}

#[test]
fn point_on_page_resolves_to_source() {
    let (_dir, path) = fixture();
    let (generator, queries) = synced_generator(FakePdf::new().letter_pages(1));
    generator
        .load_document(&path, &mut ScriptedCredentials::new())
        .unwrap();

    let reference = generator.dynamic_source_reference(0, 96.0, 192.0);
    assert_eq!(
        reference,
        Some(SourceReference {
            file_name: "chapter.tex".into(),
            line: 42,
            column: 0,
        })
    );
    assert_eq!(queries.lock().unwrap().edit, vec![(1, 72.0, 144.0)]);
}

#[test]
fn closing_drops_source_sync() {
    let (_dir, path) = fixture();
    let (generator, _queries) = synced_generator(FakePdf::new().letter_pages(1));
    generator
        .load_document(&path, &mut ScriptedCredentials::new())
        .unwrap();
    generator.close_document();
    assert!(!generator.has_source_sync());
    assert!(generator.dynamic_source_reference(0, 1.0, 1.0).is_none());
}
