//! Login session persisted between runs as the jar's cookies.

use std::io;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use tokio::fs;
use tracing::debug;

use crate::client::ApiClient;
use crate::error::ApiError;

/// Cookie whose presence means the user is logged in.
pub const LOGIN_COOKIE_NAME: &str = "cws_user_auth";

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredSession {
    base_url: String,
    cookies: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the client's current cookies.
    pub async fn save(&self, client: &ApiClient) -> Result<(), ApiError> {
        let cookies = client
            .cookie_header()
            .and_then(|header| header.to_str().ok().map(split_cookie_header))
            .unwrap_or_default();
        let stored = StoredSession {
            base_url: client.base_url().to_string(),
            cookies,
        };
        let json = serde_json::to_string_pretty(&stored).map_err(|source| ApiError::Decode {
            path: self.path.display().to_string(),
            source,
        })?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error("create", source))?;
        }
        write_private(&self.path, json.as_bytes())
            .await
            .map_err(|source| self.io_error("write", source))
    }

    /// Load saved cookies into `client`. Returns `false` when nothing was
    /// saved for this base URL.
    pub async fn restore(&self, client: &ApiClient) -> Result<bool, ApiError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(source) => return Err(self.io_error("read", source)),
        };
        let stored: StoredSession =
            serde_json::from_str(&contents).map_err(|source| ApiError::Decode {
                path: self.path.display().to_string(),
                source,
            })?;
        if stored.base_url != client.base_url().as_str() {
            debug!(saved = %stored.base_url, "ignoring session saved for another backend");
            return Ok(false);
        }
        for cookie in &stored.cookies {
            client.add_cookie(cookie);
        }
        Ok(!stored.cookies.is_empty())
    }

    pub async fn clear(&self) -> Result<(), ApiError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.io_error("remove", source)),
        }
    }

    fn io_error(&self, action: &str, source: io::Error) -> ApiError {
        ApiError::Io {
            context: format!("failed to {action} session file {}", self.path.display()),
            source,
        }
    }
}

fn split_cookie_header(header: &str) -> Vec<String> {
    header
        .split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(unix)]
async fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .await?;
    file.write_all(contents).await?;
    file.flush().await
}

#[cfg(not(unix))]
async fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    fs::write(path, contents).await
}

impl ApiClient {
    pub fn has_login_cookie(&self) -> bool {
        self.cookie_header()
            .and_then(|header| header.to_str().ok().map(split_cookie_header))
            .unwrap_or_default()
            .iter()
            .any(|pair| {
                pair.split_once('=')
                    .is_some_and(|(name, _)| name == LOGIN_COOKIE_NAME)
            })
    }
}
