use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::password::{CredentialProvider, PasswordReply, PromptKind};

pub const DEFAULT_FOLDER: &str = "Okular";

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("credential store {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("credential store {path:?} is malformed: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Remembered document passwords, grouped in folders and keyed by file name.
///
/// Stored as JSON. An ephemeral store keeps everything in memory.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FileCredentialStore {
    folders: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(skip)]
    file_path: Option<PathBuf>,
    #[serde(skip)]
    folder: String,
}

impl FileCredentialStore {
    pub fn ephemeral() -> Self {
        Self {
            folder: DEFAULT_FOLDER.to_string(),
            ..Self::default()
        }
    }

    pub fn with_file(path: &Path) -> Self {
        Self {
            file_path: Some(path.to_path_buf()),
            ..Self::ephemeral()
        }
    }

    pub fn load_or_ephemeral(path: Option<&Path>) -> Self {
        match path {
            Some(path) => Self::load_from_file(path).unwrap_or_else(|e| {
                log::error!("Failed to load credentials: {e}");
                Self::with_file(path)
            }),
            None => Self::ephemeral(),
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self, CredentialError> {
        if !path.exists() {
            return Ok(Self::with_file(path));
        }
        let content = fs::read_to_string(path).map_err(|source| CredentialError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut store: Self =
            serde_json::from_str(&content).map_err(|source| CredentialError::Format {
                path: path.to_path_buf(),
                source,
            })?;
        store.file_path = Some(path.to_path_buf());
        store.folder = DEFAULT_FOLDER.to_string();
        Ok(store)
    }

    /// Switch to `folder`, creating it on first write
    #[must_use]
    pub fn in_folder(mut self, folder: &str) -> Self {
        self.folder = folder.to_string();
        self
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    pub fn read_password(&self, key: &str) -> Option<&str> {
        self.folders
            .get(&self.folder)
            .and_then(|entries| entries.get(key))
            .map(String::as_str)
    }

    pub fn write_password(&mut self, key: &str, password: &str) -> Result<(), CredentialError> {
        self.folders
            .entry(self.folder.clone())
            .or_default()
            .insert(key.to_string(), password.to_string());
        self.save()
    }

    pub fn save(&self) -> Result<(), CredentialError> {
        let Some(path) = &self.file_path else {
            return Ok(());
        };
        let io_err = |source| CredentialError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let content = serde_json::to_string_pretty(self).map_err(|source| {
            CredentialError::Format {
                path: path.clone(),
                source,
            }
        })?;
        fs::write(path, content).map_err(io_err)?;
        restrict_permissions(path).map_err(io_err)?;
        log::debug!("Saved credentials to {path:?}");
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// [`CredentialProvider`] combining an optional store with an interactive prompt
pub struct StoreBackedCredentials<F> {
    store: Option<FileCredentialStore>,
    prompt: F,
}

impl<F> StoreBackedCredentials<F>
where
    F: FnMut(PromptKind, bool) -> Option<PasswordReply>,
{
    pub fn new(store: Option<FileCredentialStore>, prompt: F) -> Self {
        Self { store, prompt }
    }

    pub fn store(&self) -> Option<&FileCredentialStore> {
        self.store.as_ref()
    }
}

impl<F> CredentialProvider for StoreBackedCredentials<F>
where
    F: FnMut(PromptKind, bool) -> Option<PasswordReply>,
{
    fn stored_password(&mut self, key: &str) -> Option<String> {
        self.store
            .as_ref()
            .and_then(|store| store.read_password(key))
            .map(str::to_owned)
    }

    fn prompt(&mut self, kind: PromptKind, can_keep: bool) -> Option<PasswordReply> {
        (self.prompt)(kind, can_keep)
    }

    fn store_password(&mut self, key: &str, password: &str) {
        if let Some(store) = self.store.as_mut() {
            if let Err(e) = store.write_password(key, password) {
                log::error!("Failed to remember password for {key}: {e}");
            }
        }
    }

    fn has_store(&self) -> bool {
        self.store.is_some()
    }
}
