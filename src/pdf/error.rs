//! Error types for the PDF adaptation layer

use std::path::PathBuf;

/// Failure reported by the rendering engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[cfg(feature = "pdf")]
    #[error("PDF engine: {0}")]
    Pdf(#[from] mupdf::error::Error),

    #[error("{detail}")]
    Generic { detail: String },
}

impl EngineError {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

/// Errors surfaced by [`Document`](super::Document) and [`Page`](super::Page)
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("document has no root catalog")]
    MissingCatalog,

    #[error("document was closed")]
    DocumentClosed,
}
