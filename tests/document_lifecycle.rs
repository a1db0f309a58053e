use mupdf_generator::pdf::{
    Document, LinkDestination, PageMode, PdfError, RawLink, RawOutline, current_numeric_locale,
};
use mupdf_generator::test_utils::test_helpers::*;
use serial_test::serial;
use tempfile::TempDir;

fn open(pdf: FakePdf) -> (TempDir, Document) {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fake_pdf(dir.path(), "doc.pdf");
    let mut doc = pdf.into_document();
    doc.load(&path).unwrap();
    (dir, doc)
}

fn entry(title: &str, page: i32, down: Vec<RawOutline>) -> RawOutline {
    RawOutline::new(title, RawLink::goto(page, None)).with_children(down)
}

#[test]
fn plain_document_opens_unlocked_with_all_pages() {
    let (_dir, doc) = open(FakePdf::new().letter_pages(3));
    assert!(doc.is_open());
    assert!(!doc.is_locked());
    assert_eq!(doc.page_count(), 3);
    assert_eq!(doc.page_mode(), PageMode::UseNone);
}

#[test]
fn pages_in_range_carry_their_index() {
    let (_dir, doc) = open(FakePdf::new().letter_pages(3));
    for i in 0..3 {
        assert_eq!(doc.page(i).unwrap().number(), i);
    }
    assert!(doc.page(3).is_none());
    assert!(doc.page(usize::MAX).is_none());
}

#[test]
fn close_resets_everything_and_is_idempotent() {
    let (_dir, mut doc) = open(FakePdf::new().letter_pages(2).page_mode("FullScreen"));
    assert_eq!(doc.page_mode(), PageMode::FullScreen);

    doc.close();
    assert!(!doc.is_open());
    assert_eq!(doc.page_count(), 0);
    assert_eq!(doc.page_mode(), PageMode::UseNone);
    assert!(doc.page(0).is_none());
    assert!(doc.info_keys().is_empty());

    doc.close();
    assert_eq!(doc.page_count(), 0);
}

#[test]
fn page_fails_after_its_document_closes() {
    let (_dir, mut doc) = open(FakePdf::new().letter_pages(1));
    let page = doc.page(0).unwrap();
    assert!(page.size().is_ok());

    doc.close();
    assert_eq!(page.number(), 0);
    assert!(matches!(page.size(), Err(PdfError::DocumentClosed)));
    assert!(matches!(page.render(10, 10), Err(PdfError::DocumentClosed)));
    assert!(matches!(page.text_boxes(), Err(PdfError::DocumentClosed)));
    assert!(matches!(page.duration(), Err(PdfError::DocumentClosed)));
}

#[test]
fn page_fails_after_reload_and_drop() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fake_pdf(dir.path(), "doc.pdf");
    let mut doc = FakePdf::new().letter_pages(1).into_document();
    doc.load(&path).unwrap();
    let stale = doc.page(0).unwrap();

    doc.load(&path).unwrap();
    assert!(matches!(stale.size(), Err(PdfError::DocumentClosed)));
    let fresh = doc.page(0).unwrap();
    assert!(fresh.size().is_ok());

    drop(doc);
    assert!(matches!(fresh.size(), Err(PdfError::DocumentClosed)));
}

#[test]
fn unreadable_and_invalid_files_fail_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = FakePdf::new().letter_pages(1).into_document();

    let missing = dir.path().join("missing.pdf");
    assert!(matches!(doc.load(&missing), Err(PdfError::Io { .. })));

    let garbage = dir.path().join("garbage.pdf");
    std::fs::write(&garbage, b"hello").unwrap();
    assert!(matches!(doc.load(&garbage), Err(PdfError::Engine(_))));
    assert!(!doc.is_open());
    assert_eq!(doc.page_count(), 0);
}

#[test]
fn missing_catalog_fails_and_leaves_document_closed() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fake_pdf(dir.path(), "doc.pdf");
    let mut doc = FakePdf::new().letter_pages(1).missing_catalog().into_document();
    assert!(matches!(doc.load(&path), Err(PdfError::MissingCatalog)));
    assert!(!doc.is_open());
}

#[test]
fn encrypted_document_stays_locked_until_right_password() {
    let (_dir, mut doc) = open(FakePdf::new().letter_pages(4).password("open sesame"));
    assert!(doc.is_open());
    assert!(doc.is_locked());
    assert_eq!(doc.page_count(), 0);
    assert!(doc.page(0).is_none());
    assert!(doc.outline().is_none());

    assert!(!doc.unlock(b"wrong"));
    assert!(doc.is_locked());
    assert_eq!(doc.page_count(), 0);

    assert!(doc.unlock(b"open sesame"));
    assert!(!doc.is_locked());
    assert_eq!(doc.page_count(), 4);
    assert!(doc.page(3).is_some());
}

#[test]
fn unlock_on_unlocked_document_is_rejected() {
    let (_dir, mut doc) = open(FakePdf::new().letter_pages(1));
    assert!(!doc.unlock(b"anything"));
    assert_eq!(doc.page_count(), 1);
}

#[test]
fn unlock_fails_when_catalog_is_missing() {
    let (_dir, mut doc) = open(
        FakePdf::new()
            .letter_pages(1)
            .password("pw")
            .missing_catalog(),
    );
    assert!(!doc.unlock(b"pw"));
    assert!(doc.is_locked());
    assert_eq!(doc.page_count(), 0);
}

#[test]
fn page_mode_names_are_mapped() {
    for (name, mode) in [
        ("UseOutlines", PageMode::UseOutlines),
        ("UseThumbs", PageMode::UseThumbs),
        ("UseOC", PageMode::UseOC),
        ("Bogus", PageMode::UseNone),
    ] {
        let (_dir, doc) = open(FakePdf::new().letter_pages(1).page_mode(name));
        assert_eq!(doc.page_mode(), mode, "{name}");
    }
}

#[test]
fn info_dictionary_lookup() {
    let (_dir, doc) = open(
        FakePdf::new()
            .letter_pages(1)
            .info(&[("Title", "Annual Report"), ("Author", "Finance")]),
    );
    assert_eq!(doc.info_key(b"Title"), "Annual Report");
    assert_eq!(doc.info_key(b"Subject"), "");
    assert_eq!(
        doc.info_keys(),
        vec![b"Title".to_vec(), b"Author".to_vec()]
    );
}

#[test]
fn missing_info_dictionary_gives_empty_values() {
    let (_dir, doc) = open(FakePdf::new().letter_pages(1));
    assert_eq!(doc.info_key(b"Title"), "");
    assert!(doc.info_keys().is_empty());
}

#[test]
fn pdf_version_from_format_string() {
    let (_dir, doc) = open(FakePdf::new().letter_pages(1));
    assert!((doc.pdf_version() - 1.4).abs() < 1e-6);

    let (_dir, doc) = open(FakePdf::new().letter_pages(1).format(Some("PDF 1.7")));
    assert!((doc.pdf_version() - 1.7).abs() < 1e-6);

    let (_dir, doc) = open(FakePdf::new().letter_pages(1).format(Some("garbage")));
    assert_eq!(doc.pdf_version(), 0.0);

    let (_dir, doc) = open(FakePdf::new().letter_pages(1).format(None));
    assert_eq!(doc.pdf_version(), 0.0);
}

#[test]
fn outline_keeps_depth_and_order() {
    let (_dir, doc) = open(FakePdf::new().letter_pages(5).outline(vec![
        entry("Chapter 1", 0, vec![entry("1.1", 1, vec![entry("1.1.1", 1, vec![])])]),
        entry("Chapter 2", 3, vec![]),
        RawOutline::new("Website", RawLink::from_uri("https://example.org")),
    ]));

    let root = doc.outline().unwrap();
    assert_eq!(root.depth(), 3);
    let titles: Vec<&str> = root.children().iter().map(|c| c.title()).collect();
    assert_eq!(titles, ["Chapter 1", "Chapter 2", "Website"]);
    assert_eq!(
        root.children()[1].destination(),
        Some(&LinkDestination::GoTo { page: 3, rect: None })
    );
    assert!(matches!(
        root.children()[2].destination(),
        Some(LinkDestination::Uri { .. })
    ));
}

#[test]
fn no_bookmarks_or_broken_outline_gives_none() {
    let (_dir, doc) = open(FakePdf::new().letter_pages(1));
    assert!(doc.outline().is_none());

    let (_dir, doc) = open(
        FakePdf::new()
            .letter_pages(1)
            .outline(vec![entry("x", 0, vec![])])
            .failing_outline(),
    );
    assert!(doc.outline().is_none());
}

#[test]
#[serial]
fn load_restores_numeric_locale() {
    let before = current_numeric_locale();
    let (_dir, _doc) = open(FakePdf::new().letter_pages(1));
    assert_eq!(current_numeric_locale(), before);
}

#[test]
fn engine_sees_one_open_per_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fake_pdf(dir.path(), "doc.pdf");
    let (mut doc, log) = FakePdf::new().letter_pages(2).into_document_with_log();
    doc.load(&path).unwrap();
    let _ = doc.page(1);
    let log = log.lock().unwrap();
    assert_eq!(log.opens, 1);
    assert_eq!(log.pages_loaded, vec![1]);
}
