//! File uploads: direct multipart to the backend, or the two-phase
//! start / blob PUT / complete flow for the web provider.

use std::path::Path;

use cws_protocol::schema::StartUploadRequest;
use cws_protocol::schema::StartUploadResponse;
use cws_protocol::schema::UploadedFileInfo;
use futures::TryStreamExt;
use reqwest::Body;
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::header::CONTENT_LENGTH;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::Form;
use reqwest::multipart::Part;
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;
use tracing::info;
use tracing::warn;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::notice::ClientNotice;
use crate::paths;

const BLOB_TYPE_HEADER: &str = "x-ms-blob-type";
const BLOB_TYPE: &str = "BlockBlob";
const BLOB_VERSION_HEADER: &str = "x-ms-version";
const BLOB_VERSION: &str = "2020-04-08";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub sent: u64,
    pub total: u64,
}

impl UploadProgress {
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        u8::try_from((self.sent.saturating_mul(100) / self.total).min(100)).unwrap_or(100)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string())
}

fn io_error(path: &Path, action: &str, source: std::io::Error) -> ApiError {
    ApiError::Io {
        context: format!("failed to {action} {}", path.display()),
        source,
    }
}

impl ApiClient {
    /// Store `path` on the backend itself.
    pub async fn upload_local(
        &self,
        path: &Path,
        mime_type: &str,
    ) -> Result<UploadedFileInfo, ApiError> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|source| io_error(path, "read", source))?;
        let part = Part::bytes(data)
            .file_name(file_name(path))
            .mime_str(mime_type)
            .map_err(|source| ApiError::Transport {
                path: paths::LOCAL_UPLOAD.to_string(),
                source,
            })?;
        let form = Form::new().part("file", part);
        let request = self
            .request(Method::POST, paths::LOCAL_UPLOAD)?
            .multipart(form);
        self.fetch(paths::LOCAL_UPLOAD, request).await
    }

    pub async fn start_upload(
        &self,
        request: &StartUploadRequest,
    ) -> Result<StartUploadResponse, ApiError> {
        let builder = self
            .request(Method::POST, paths::UPLOAD_START)?
            .json(request);
        self.fetch(paths::UPLOAD_START, builder).await
    }

    /// PUT the file body to a pre-signed blob URL. The store answers `201`.
    pub async fn put_blob(
        &self,
        upload_url: &str,
        path: &Path,
        mime_type: &str,
        progress: Option<mpsc::UnboundedSender<UploadProgress>>,
    ) -> Result<(), ApiError> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|source| io_error(path, "open", source))?;
        let total = file
            .metadata()
            .await
            .map_err(|source| io_error(path, "stat", source))?
            .len();

        let mut sent = 0u64;
        let stream = ReaderStream::new(file).inspect_ok(move |chunk| {
            sent += chunk.len() as u64;
            if let Some(tx) = &progress {
                let _ = tx.send(UploadProgress { sent, total });
            }
        });

        let response = self
            .http()
            .put(upload_url)
            .header(BLOB_TYPE_HEADER, BLOB_TYPE)
            .header(BLOB_VERSION_HEADER, BLOB_VERSION)
            .header(CONTENT_TYPE, mime_type)
            .header(CONTENT_LENGTH, total)
            .body(Body::wrap_stream(stream))
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                path: upload_url.to_string(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::CREATED {
            warn!(%status, "blob upload rejected");
            self.notify(ClientNotice::Error(format!("Upload Error: {status}")));
            return Err(ApiError::BlobUpload { status });
        }
        Ok(())
    }

    pub async fn complete_upload(&self, file_id: &str) -> Result<UploadedFileInfo, ApiError> {
        let path = paths::upload_complete(file_id);
        let request = self.request(Method::POST, &path)?;
        self.fetch(&path, request).await
    }

    /// Run the whole start / PUT / complete sequence for `path`.
    pub async fn upload_to_web(
        &self,
        path: &Path,
        mime_type: &str,
        use_case: &str,
        progress: Option<mpsc::UnboundedSender<UploadProgress>>,
    ) -> Result<UploadedFileInfo, ApiError> {
        let size = tokio::fs::metadata(path)
            .await
            .map_err(|source| io_error(path, "stat", source))?
            .len();
        let started = self
            .start_upload(&StartUploadRequest {
                file_name: file_name(path),
                file_size: size,
                use_case: use_case.to_string(),
                mime_type: Some(mime_type.to_string()),
                width: None,
                height: None,
            })
            .await?;
        let file_id = started.upload_file_info.id;
        self.put_blob(&started.upload_url, path, mime_type, progress)
            .await?;
        let info = self.complete_upload(&file_id).await?;
        info!(file_id, "upload completed");
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn percent_is_clamped() {
        assert_eq!(UploadProgress { sent: 0, total: 0 }.percent(), 100);
        assert_eq!(UploadProgress { sent: 50, total: 200 }.percent(), 25);
        assert_eq!(UploadProgress { sent: 300, total: 200 }.percent(), 100);
    }
}
