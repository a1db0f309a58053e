//! Opening a document, asking for a password while it stays locked

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use log::{debug, info, warn};

use crate::pdf::{Document, PdfError};

/// Which prompt to show
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptKind {
    /// "Please insert the password to read the document:"
    FirstAttempt,
    /// "Incorrect password. Try again:"
    RetryAfterFailure,
}

impl PromptKind {
    pub const CAPTION: &'static str = "Document Password";

    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::FirstAttempt => "Please insert the password to read the document:",
            Self::RetryAfterFailure => "Incorrect password. Try again:",
        }
    }
}

/// Answer of an interactive prompt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordReply {
    pub password: String,
    /// The user asked to remember the password
    pub keep: bool,
}

/// Source of passwords for locked documents
pub trait CredentialProvider {
    /// Previously remembered password for `key`
    fn stored_password(&mut self, key: &str) -> Option<String>;

    /// Ask the user. `None` means the prompt was cancelled. `can_keep` tells
    /// whether a "remember" choice can be honored.
    fn prompt(&mut self, kind: PromptKind, can_keep: bool) -> Option<PasswordReply>;

    /// Remember a password that unlocked the document
    fn store_password(&mut self, key: &str, password: &str);

    /// Whether remembered passwords are available at all
    fn has_store(&self) -> bool;
}

/// Stage of [`PasswordSession`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Opening,
    /// Waiting for password number `attempt` (zero-based)
    PasswordPrompt { attempt: u32 },
    Open,
    Failed,
}

/// Why a session ended without an open document
#[derive(Debug)]
pub enum SessionFailure {
    Load(PdfError),
    Cancelled,
}

/// Drives `Idle -> Opening -> PasswordPrompt -> Open | Failed` for one file.
///
/// The document lock is taken around `load` and each `unlock`, never while
/// the provider is prompting.
pub struct PasswordSession<'a> {
    document: &'a Mutex<Document>,
    state: SessionState,
}

impl<'a> PasswordSession<'a> {
    #[must_use]
    pub const fn new(document: &'a Mutex<Document>) -> Self {
        Self {
            document,
            state: SessionState::Idle,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    fn with_document<T>(&self, f: impl FnOnce(&mut Document) -> T) -> T {
        let mut doc = self.document.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut doc)
    }

    /// Load `path` and unlock it if needed.
    ///
    /// `wallet_key` names the remembered password, usually the file's base
    /// name; `None` skips the store. On failure the document is left closed.
    pub fn run(
        &mut self,
        path: &Path,
        wallet_key: Option<&str>,
        provider: &mut dyn CredentialProvider,
    ) -> Result<(), SessionFailure> {
        self.state = SessionState::Opening;
        if let Err(e) = self.with_document(|doc| doc.load(path)) {
            self.state = SessionState::Failed;
            return Err(SessionFailure::Load(e));
        }

        let mut attempt = 0u32;
        let mut prompted = false;
        let mut tried_store = false;
        let can_keep = wallet_key.is_some() && provider.has_store();

        while self.with_document(|doc| doc.is_locked()) {
            self.state = SessionState::PasswordPrompt { attempt };

            let mut from_store = false;
            let mut keep = true;
            let mut password = None;

            if !tried_store {
                tried_store = true;
                if let Some(key) = wallet_key.filter(|_| provider.has_store()) {
                    password = provider.stored_password(key);
                    from_store = password.is_some();
                    if from_store {
                        debug!("Trying remembered password for {key}");
                    }
                }
            }

            let password = match password {
                Some(password) => password,
                None => {
                    let kind = if prompted {
                        PromptKind::RetryAfterFailure
                    } else {
                        PromptKind::FirstAttempt
                    };
                    prompted = true;
                    let Some(reply) = provider.prompt(kind, can_keep) else {
                        info!("Password entry cancelled");
                        break;
                    };
                    if can_keep {
                        keep = reply.keep;
                    }
                    reply.password
                }
            };

            attempt += 1;
            let unlocked = self.with_document(|doc| doc.unlock(password.as_bytes()));

            if unlocked && keep && !from_store {
                if let Some(key) = wallet_key.filter(|_| can_keep) {
                    provider.store_password(key, &password);
                }
            }
        }

        if self.with_document(|doc| doc.is_locked()) {
            warn!("Document is still locked, closing it");
            self.with_document(Document::close);
            self.state = SessionState::Failed;
            return Err(SessionFailure::Cancelled);
        }

        self.state = SessionState::Open;
        Ok(())
    }
}
