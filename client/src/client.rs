use std::sync::Arc;

use cws_protocol::ApiEnvelope;
use reqwest::Method;
use reqwest::RequestBuilder;
use reqwest::StatusCode;
use reqwest::cookie::CookieStore;
use reqwest::cookie::Jar;
use reqwest::header::HeaderValue;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::warn;
use url::Url;

use crate::error::ApiError;
use crate::notice::ClientNotice;
use crate::notice::NoticeSender;
use crate::paths;

/// Cookie-authenticated client for the backend REST surface.
///
/// Every JSON response is unwrapped from its `{ code, message, result }`
/// envelope; failed envelopes are reported on the notice channel before the
/// error is returned.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    jar: Arc<Jar>,
    notices: NoticeSender,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url).map_err(|source| ApiError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;
        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .build()
            .map_err(|source| ApiError::Transport {
                path: base_url.to_string(),
                source,
            })?;
        Ok(Self {
            http,
            base_url,
            jar,
            notices: NoticeSender::default(),
        })
    }

    /// Route error and login-expired notices to `tx`.
    pub fn with_notices(mut self, tx: mpsc::UnboundedSender<ClientNotice>) -> Self {
        self.notices = NoticeSender::new(Some(tx));
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL of `path`, which is appended to the base URL's path.
    pub fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let raw = format!("{}{path}", self.base_url.as_str().trim_end_matches('/'));
        Url::parse(&raw).map_err(|source| ApiError::InvalidUrl { url: raw, source })
    }

    /// `Cookie` header the jar would attach to a request for the base URL.
    pub fn cookie_header(&self) -> Option<HeaderValue> {
        self.jar.cookies(&self.base_url)
    }

    pub(crate) fn add_cookie(&self, cookie: &str) {
        self.jar.add_cookie_str(cookie, &self.base_url);
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn notify(&self, notice: ClientNotice) {
        self.notices.send(notice);
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        Ok(self.http.request(method, self.endpoint(path)?))
    }

    /// Send `request` and unwrap the envelope; `None` for bodiless replies.
    pub(crate) async fn execute<T: DeserializeOwned>(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> Result<Option<T>, ApiError> {
        debug!(path, "sending request");
        let response = match request.send().await {
            Ok(response) => response,
            Err(source) => {
                warn!(path, "request failed: {source}");
                self.notify(ClientNotice::Error(format!("Request Error: {source}")));
                return Err(ApiError::Transport {
                    path: path.to_string(),
                    source,
                });
            }
        };
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| ApiError::Transport {
                path: path.to_string(),
                source,
            })?;

        let Some(value) = self.intercept(path, status, &body)? else {
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|source| ApiError::Decode {
                path: path.to_string(),
                source,
            })
    }

    /// Like [`ApiClient::execute`] but the call must produce a result.
    pub(crate) async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        self.execute(path, request)
            .await?
            .ok_or_else(|| ApiError::EmptyResult {
                path: path.to_string(),
            })
    }

    /// Apply the envelope rules to a raw response.
    ///
    /// `201` and `204` replies bypass the envelope. Anything else must carry
    /// one, and its code decides success.
    pub(crate) fn intercept(
        &self,
        path: &str,
        status: StatusCode,
        body: &[u8],
    ) -> Result<Option<JsonValue>, ApiError> {
        if status == StatusCode::NO_CONTENT || (status == StatusCode::CREATED && body.is_empty()) {
            return Ok(None);
        }
        if status == StatusCode::CREATED {
            return serde_json::from_slice(body)
                .map(Some)
                .map_err(|source| ApiError::Decode {
                    path: path.to_string(),
                    source,
                });
        }

        let envelope = match serde_json::from_slice::<ApiEnvelope>(body) {
            Ok(envelope) => envelope,
            Err(source) if status.is_success() => {
                return Err(ApiError::Decode {
                    path: path.to_string(),
                    source,
                });
            }
            Err(_) => {
                warn!(path, %status, "request failed without an envelope");
                self.notify(ClientNotice::Error(format!("Request Error: {status}")));
                if status == StatusCode::UNAUTHORIZED && !paths::is_auth_call(path) {
                    self.notify(ClientNotice::LoginExpired);
                }
                return Err(ApiError::UnexpectedStatus {
                    path: path.to_string(),
                    status,
                    body: String::from_utf8_lossy(body).into_owned(),
                });
            }
        };

        if envelope.is_success() {
            return Ok(envelope.result);
        }

        let summary = envelope.error_summary();
        warn!(path, code = envelope.code, "request rejected: {summary}");
        self.notify(ClientNotice::Error(summary.clone()));
        let err = ApiError::Envelope {
            code: envelope.code,
            message: envelope.message,
            summary,
        };
        if err.is_login_expired() && !paths::is_auth_call(path) {
            self.notify(ClientNotice::LoginExpired);
        }
        Err(err)
    }
}
