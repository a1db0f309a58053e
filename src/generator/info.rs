//! Document information block shown by the host

use crate::pdf::Document;

/// Well-known information keys
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InfoKey {
    MimeType,
    Title,
    Subject,
    Author,
    Keywords,
    Creator,
    Producer,
    Pages,
    /// Backend specific entry with its own key and display title
    Custom(&'static str),
}

impl InfoKey {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MimeType => "mimeType",
            Self::Title => "title",
            Self::Subject => "subject",
            Self::Author => "author",
            Self::Keywords => "keywords",
            Self::Creator => "creator",
            Self::Producer => "producer",
            Self::Pages => "pages",
            Self::Custom(key) => key,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct InfoEntry {
    pub key: InfoKey,
    pub value: String,
    /// Display title, only set for custom entries
    pub title: Option<&'static str>,
}

/// Ordered key/value block describing the open document
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocumentInfo {
    entries: Vec<InfoEntry>,
}

impl DocumentInfo {
    pub fn set(&mut self, key: InfoKey, value: impl Into<String>) {
        self.set_titled(key, value, None);
    }

    pub fn set_titled(&mut self, key: InfoKey, value: impl Into<String>, title: Option<&'static str>) {
        let value = value.into();
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => {
                entry.value = value;
                entry.title = title;
            }
            None => self.entries.push(InfoEntry { key, value, title }),
        }
    }

    #[must_use]
    pub fn get(&self, key: InfoKey) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }

    #[must_use]
    pub fn entries(&self) -> &[InfoEntry] {
        &self.entries
    }

    /// Collect the standard entries from `document`
    #[must_use]
    pub fn from_document(document: &Document) -> Self {
        let mut info = Self::default();
        info.set(InfoKey::MimeType, "application/pdf");
        info.set(InfoKey::Title, document.info_key(b"Title"));
        info.set(InfoKey::Subject, document.info_key(b"Subject"));
        info.set(InfoKey::Author, document.info_key(b"Author"));
        info.set(InfoKey::Keywords, document.info_key(b"Keywords"));
        info.set(InfoKey::Creator, document.info_key(b"Creator"));
        info.set(InfoKey::Producer, document.info_key(b"Producer"));
        info.set_titled(
            InfoKey::Custom("format"),
            format!("PDF v. {}", format_version(document.pdf_version())),
            Some("Format"),
        );
        info.set(InfoKey::Pages, document.page_count().to_string());
        info
    }
}

/// One decimal, dropping a trailing ".0" ("1.4", "2")
fn format_version(version: f32) -> String {
    let text = format!("{version:.1}");
    match text.strip_suffix(".0") {
        Some(whole) => whole.to_string(),
        None => text,
    }
}
