// Export modules for use in tests
pub mod generator;
pub mod panic_handler;
pub mod pdf;
pub mod settings;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use generator::{Generator, GeneratorError, OpenResult, PageInfo, PixmapRequest};
pub use pdf::{Document, Page, PdfError};
