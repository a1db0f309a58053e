use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, RwLock};

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
pub const APP_NAME: &str = "mupdf-generator";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Resolution used by `render` when no pixel size is given
    #[serde(default = "default_render_dpi")]
    pub render_dpi: f32,

    #[serde(default = "default_true")]
    pub remember_passwords: bool,

    #[serde(default = "default_credential_folder")]
    pub credential_folder: String,

    /// Overrides the credential store location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_file: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_render_dpi() -> f32 {
    96.0
}

fn default_credential_folder() -> String {
    "Okular".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            log_level: default_log_level(),
            render_dpi: default_render_dpi(),
            remember_passwords: true,
            credential_folder: default_credential_folder(),
            credential_file: None,
        }
    }
}

static SETTINGS: LazyLock<RwLock<Settings>> = LazyLock::new(|| RwLock::new(Settings::default()));

pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME))
}

fn preferred_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(SETTINGS_FILENAME))
}

pub fn load_settings() {
    let Some(path) = preferred_config_path() else {
        warn!("Could not determine config directory, using default settings");
        return;
    };
    if path.exists() {
        load_settings_from_path(&path);
    } else {
        info!("Settings file not found, creating with defaults at {path:?}");
        if let Ok(settings) = SETTINGS.read() {
            save_settings_to_file(&settings, &path);
        }
    }
}

/// Replace the global settings with the contents of `path`.
///
/// Read or parse errors are logged and leave the current settings untouched.
pub fn load_settings_from_path(path: &Path) {
    match fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str::<Settings>(&content) {
            Ok(mut settings) => {
                debug!("Loaded settings from {path:?}");

                if settings.version < CURRENT_VERSION {
                    migrate_settings(&mut settings);
                    save_settings_to_file(&settings, path);
                }

                if let Ok(mut global) = SETTINGS.write() {
                    *global = settings;
                }
            }
            Err(e) => {
                error!("Failed to parse settings file {path:?}: {e}");
            }
        },
        Err(e) => {
            error!("Failed to read settings file {path:?}: {e}");
        }
    }
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );
    settings.version = CURRENT_VERSION;
}

pub fn save_settings_to_file(settings: &Settings, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory {parent:?}: {e}");
                return;
            }
        }
    }

    let content = generate_settings_yaml(settings);

    match fs::write(path, content) {
        Ok(()) => debug!("Saved settings to {path:?}"),
        Err(e) => error!("Failed to save settings to {path:?}: {e}"),
    }
}

fn generate_settings_yaml(settings: &Settings) -> String {
    let mut content = String::from(SETTINGS_HEADER);

    content.push_str(&format!("version: {}\n", settings.version));
    if let Some(level) = yaml_scalar(&settings.log_level) {
        content.push_str(&format!("log_level: {level}\n"));
    }
    content.push_str(&format!("render_dpi: {:?}\n", settings.render_dpi));
    content.push_str(&format!(
        "remember_passwords: {}\n",
        settings.remember_passwords
    ));
    if let Some(folder) = yaml_scalar(&settings.credential_folder) {
        content.push_str(&format!("credential_folder: {folder}\n"));
    }
    match settings.credential_file.as_ref().and_then(yaml_scalar) {
        Some(path) => content.push_str(&format!("credential_file: {path}\n")),
        None => content.push_str("# credential_file: \"/path/to/credentials.json\"\n"),
    }

    content
}

/// A value as a YAML scalar, quoted and escaped as needed
fn yaml_scalar<T: Serialize + ?Sized>(value: &T) -> Option<String> {
    match serde_yaml::to_string(value) {
        Ok(text) => Some(text.trim_end_matches('\n').to_string()),
        Err(e) => {
            warn!("Skipping setting that cannot be written as YAML: {e}");
            None
        }
    }
}

const SETTINGS_HEADER: &str = r#"# mupdf-generator settings
#
# log_level: off, error, warn, info, debug or trace
# render_dpi: resolution for `render` when --width/--height are not given
# remember_passwords: offer to store document passwords after unlocking

"#;

// Public API for reading settings

#[must_use]
pub fn snapshot() -> Settings {
    SETTINGS.read().map(|s| s.clone()).unwrap_or_default()
}

pub fn get_log_level() -> String {
    SETTINGS
        .read()
        .map(|s| s.log_level.clone())
        .unwrap_or_else(|_| default_log_level())
}

pub fn get_render_dpi() -> f32 {
    SETTINGS
        .read()
        .map(|s| s.render_dpi)
        .unwrap_or_else(|_| default_render_dpi())
}

pub fn is_remember_passwords() -> bool {
    SETTINGS.read().map(|s| s.remember_passwords).unwrap_or(true)
}

pub fn get_credential_folder() -> String {
    SETTINGS
        .read()
        .map(|s| s.credential_folder.clone())
        .unwrap_or_else(|_| default_credential_folder())
}

/// Credential store location: the configured override or
/// `<config dir>/mupdf-generator/credentials.json`
pub fn get_credential_file() -> Option<PathBuf> {
    let configured = SETTINGS
        .read()
        .ok()
        .and_then(|s| s.credential_file.clone());
    configured.or_else(|| config_dir().map(|dir| dir.join("credentials.json")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn empty_yaml_yields_defaults() {
        let settings: Settings = serde_yaml::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.credential_folder, "Okular");
        assert_eq!(settings.render_dpi, 96.0);
    }

    #[test]
    fn generated_yaml_parses_back() {
        let settings = Settings {
            log_level: "debug".into(),
            render_dpi: 150.0,
            remember_passwords: false,
            credential_file: Some(PathBuf::from("/tmp/creds.json")),
            ..Settings::default()
        };
        let parsed: Settings = serde_yaml::from_str(&generate_settings_yaml(&settings)).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn quotes_and_special_characters_survive_saving() {
        let settings = Settings {
            log_level: "de\"bug\\".into(),
            credential_folder: "Vault: \"main\" # keep\nsecond line".into(),
            credential_file: Some(PathBuf::from("/tmp/pass \"wörds\"\\creds.json")),
            ..Settings::default()
        };
        let parsed: Settings = serde_yaml::from_str(&generate_settings_yaml(&settings)).unwrap();
        assert_eq!(parsed, settings);

        let plain_looking = Settings {
            credential_folder: "true".into(),
            log_level: "1.5".into(),
            ..Settings::default()
        };
        let parsed: Settings =
            serde_yaml::from_str(&generate_settings_yaml(&plain_looking)).unwrap();
        assert_eq!(parsed, plain_looking);
    }

    #[test]
    #[serial]
    fn older_file_is_migrated_and_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        fs::write(&path, "version: 0\nrender_dpi: 72.0\n").unwrap();

        load_settings_from_path(&path);
        assert_eq!(get_render_dpi(), 72.0);
        assert_eq!(snapshot().version, CURRENT_VERSION);

        let rewritten = fs::read_to_string(&path).unwrap();
        assert!(rewritten.contains(&format!("version: {CURRENT_VERSION}")));

        if let Ok(mut global) = SETTINGS.write() {
            *global = Settings::default();
        }
    }

    #[test]
    #[serial]
    fn broken_file_keeps_current_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        fs::write(&path, "render_dpi: [not, a, number]\n").unwrap();

        let before = snapshot();
        load_settings_from_path(&path);
        assert_eq!(snapshot(), before);
    }
}
