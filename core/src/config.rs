//! `$CWS_HOME/config.toml`.

use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use dirs::home_dir;
use serde::Deserialize;
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;
use toml::Table as TomlTable;
use toml::Value as TomlValue;
use tracing::debug;

use crate::files::UploadStrategy;

pub const CONFIG_TOML_FILE: &str = "config.toml";
pub const CWS_HOME_ENV: &str = "CWS_HOME";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
const DEFAULT_UPLOAD_SIZE_THRESHOLD: u64 = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not find home directory; set {CWS_HOME_ENV}")]
    NoHome,
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{context}: {source}")]
    Toml {
        context: &'static str,
        #[source]
        source: toml::de::Error,
    },
    #[error("{context}: {source}")]
    TomlSerialize {
        context: &'static str,
        #[source]
        source: toml::ser::Error,
    },
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Per-user display preferences, persisted under `[preferences]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub theme: Theme,
    pub language: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            language: "en-US".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// REST base URL, including the API prefix.
    pub base_url: String,
    /// Explicit WebSocket endpoint; derived from `base_url` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub websocket_url: Option<String>,
    pub upload_strategy: UploadStrategy,
    /// Files above this many bytes go straight to the blob store under
    /// `browser_upload_when_file_size_exceed`.
    pub upload_size_threshold: u64,
    pub code_auto_wrap: bool,
    pub preferences: Preferences,

    #[serde(skip)]
    pub cws_home: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            websocket_url: None,
            upload_strategy: UploadStrategy::default(),
            upload_size_threshold: DEFAULT_UPLOAD_SIZE_THRESHOLD,
            code_auto_wrap: false,
            preferences: Preferences::default(),
            cws_home: PathBuf::new(),
        }
    }
}

impl Config {
    /// Reads `config.toml` from `cws_home`; a missing file yields defaults.
    pub fn load(cws_home: &Path) -> Result<Self, ConfigError> {
        let path = cws_home.join(CONFIG_TOML_FILE);
        let mut config = match std::fs::read_to_string(&path) {
            Ok(contents) => toml::from_str::<Config>(&contents).map_err(|source| {
                ConfigError::Toml {
                    context: "failed to parse config.toml",
                    source,
                }
            })?,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file; using defaults");
                Config::default()
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    context: "failed to read config.toml",
                    source,
                });
            }
        };
        config.cws_home = cws_home.to_path_buf();
        Ok(config)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.cws_home.join("log")
    }

    /// Where the session cookie is kept between runs.
    pub fn session_path(&self) -> PathBuf {
        self.cws_home.join("session.json")
    }
}

/// `$CWS_HOME` when set, otherwise `~/.cws`.
pub fn find_cws_home() -> Result<PathBuf, ConfigError> {
    match std::env::var(CWS_HOME_ENV) {
        Ok(value) if !value.trim().is_empty() => Ok(PathBuf::from(value)),
        _ => {
            let mut path = home_dir().ok_or(ConfigError::NoHome)?;
            path.push(".cws");
            Ok(path)
        }
    }
}

/// Writes `preferences` into `config.toml`, keeping every other key.
pub fn persist_preferences(cws_home: &Path, preferences: &Preferences) -> Result<(), ConfigError> {
    let path = cws_home.join(CONFIG_TOML_FILE);
    let mut doc = match std::fs::read_to_string(&path) {
        Ok(contents) => {
            toml::from_str::<TomlTable>(&contents).map_err(|source| ConfigError::Toml {
                context: "failed to parse config.toml",
                source,
            })?
        }
        Err(err) if err.kind() == ErrorKind::NotFound => TomlTable::new(),
        Err(source) => {
            return Err(ConfigError::Io {
                context: "failed to read config.toml",
                source,
            });
        }
    };

    let value = TomlValue::try_from(preferences).map_err(|source| ConfigError::TomlSerialize {
        context: "failed to encode preferences",
        source,
    })?;
    doc.insert("preferences".to_string(), value);
    let contents = toml::to_string_pretty(&doc).map_err(|source| ConfigError::TomlSerialize {
        context: "failed to encode config.toml",
        source,
    })?;

    write_atomically(cws_home, &path, &contents)
}

fn write_atomically(dir: &Path, path: &Path, contents: &str) -> Result<(), ConfigError> {
    let io_err = |context: &'static str| move |source: std::io::Error| ConfigError::Io { context, source };
    std::fs::create_dir_all(dir).map_err(io_err("failed to create config directory"))?;
    let tmp_file = NamedTempFile::new_in(dir).map_err(io_err("failed to create temp file"))?;
    std::fs::write(tmp_file.path(), contents).map_err(io_err("failed to write temp file"))?;
    tmp_file
        .persist(path)
        .map_err(|err| err.error)
        .map_err(io_err("failed to replace config.toml"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let home = TempDir::new().expect("tempdir");

        let config = Config::load(home.path()).expect("load config");

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.upload_strategy, UploadStrategy::ServerUploadOnly);
        assert_eq!(config.cws_home, home.path());
        assert_eq!(config.log_dir(), home.path().join("log"));
    }

    #[test]
    fn reads_partial_file() {
        let home = TempDir::new().expect("tempdir");
        std::fs::write(
            home.path().join(CONFIG_TOML_FILE),
            r#"
base_url = "https://chat.example.com/api"
upload_strategy = "browser_upload_when_file_size_exceed"

[preferences]
theme = "dark"
"#,
        )
        .expect("write config");

        let config = Config::load(home.path()).expect("load config");

        assert_eq!(config.base_url, "https://chat.example.com/api");
        assert_eq!(
            config.upload_strategy,
            UploadStrategy::BrowserUploadWhenFileSizeExceed
        );
        assert_eq!(config.preferences.theme, Theme::Dark);
        assert_eq!(config.preferences.language, "en-US");
    }

    #[test]
    fn rejects_malformed_file() {
        let home = TempDir::new().expect("tempdir");
        std::fs::write(home.path().join(CONFIG_TOML_FILE), "base_url = [").expect("write");

        assert!(matches!(
            Config::load(home.path()),
            Err(ConfigError::Toml { .. })
        ));
    }

    #[test]
    fn persisting_preferences_keeps_other_keys() {
        let home = TempDir::new().expect("tempdir");
        std::fs::write(
            home.path().join(CONFIG_TOML_FILE),
            "base_url = \"https://chat.example.com/api\"\n",
        )
        .expect("write config");

        persist_preferences(
            home.path(),
            &Preferences {
                theme: Theme::Dark,
                language: "zh-CN".to_string(),
            },
        )
        .expect("persist preferences");

        let config = Config::load(home.path()).expect("load config");
        assert_eq!(config.base_url, "https://chat.example.com/api");
        assert_eq!(config.preferences.theme, Theme::Dark);
        assert_eq!(config.preferences.language, "zh-CN");
    }
}
