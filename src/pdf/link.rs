//! Link destinations attached to outline entries

use super::engine::{RawLink, RawLinkKind};
use super::geometry::RectF;

/// Where a remote (`GoToR`) link points inside its target file
#[derive(Clone, Debug, PartialEq)]
pub enum ExternalTarget {
    /// Zero-based page number
    Page(i32),
    /// Named destination
    Named(String),
}

/// Destination of a link or outline entry.
///
/// Coordinates are kept in page space; converting them to device units is up
/// to the consumer.
#[derive(Clone, Debug, PartialEq)]
pub enum LinkDestination {
    /// Jump inside this document
    GoTo { page: i32, rect: Option<RectF> },
    /// Jump into another PDF file
    External {
        target: ExternalTarget,
        file_name: String,
        new_window: bool,
    },
    /// Open or run a file
    Launch {
        file_name: String,
        is_uri: bool,
        new_window: bool,
    },
    /// Web address
    Uri { uri: String, is_map: bool },
    /// Named action or unresolved named destination
    Named { name: String },
}

impl LinkDestination {
    /// Build a destination from the library record, `None` for unknown kinds
    #[must_use]
    pub fn from_raw(raw: &RawLink) -> Option<Self> {
        match raw.kind {
            RawLinkKind::GoTo => Some(Self::GoTo {
                page: raw.page,
                rect: raw.rect,
            }),
            RawLinkKind::GoToR => {
                let target = match &raw.dest_name {
                    Some(name) => ExternalTarget::Named(name.clone()),
                    None => ExternalTarget::Page(raw.page),
                };
                Some(Self::External {
                    target,
                    file_name: raw.file_spec.clone().unwrap_or_default(),
                    new_window: raw.new_window,
                })
            }
            RawLinkKind::Launch => Some(Self::Launch {
                file_name: raw.file_spec.clone().unwrap_or_default(),
                is_uri: raw.is_uri,
                new_window: raw.new_window,
            }),
            RawLinkKind::Uri => Some(Self::Uri {
                uri: raw.uri.clone().unwrap_or_default(),
                is_map: raw.is_map,
            }),
            RawLinkKind::Named => Some(Self::Named {
                name: raw.name.clone().unwrap_or_default(),
            }),
            RawLinkKind::None | RawLinkKind::Unknown(_) => None,
        }
    }

    /// Target page inside this document, if the destination has one
    #[must_use]
    pub fn internal_page(&self) -> Option<usize> {
        match self {
            Self::GoTo { page, .. } => usize::try_from(*page).ok(),
            Self::External { .. } | Self::Launch { .. } | Self::Uri { .. } | Self::Named { .. } => {
                None
            }
        }
    }
}
