use std::io;

use cws_protocol::AskRequestError;
use cws_protocol::envelope::LOGIN_EXPIRED_CODE;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("cannot derive a websocket url from `{url}`")]
    UnsupportedScheme { url: String },

    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx response whose body was not an envelope.
    #[error("request to {path} failed with status {status}")]
    UnexpectedStatus {
        path: String,
        status: StatusCode,
        body: String,
    },

    /// Envelope with a code outside the success set.
    #[error("{summary}")]
    Envelope {
        code: i64,
        message: String,
        summary: String,
    },

    #[error("failed to decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("response from {path} carried no result")]
    EmptyResult { path: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("blob upload failed with status {status}")]
    BlobUpload { status: StatusCode },

    #[error(transparent)]
    InvalidAsk(#[from] AskRequestError),
}

impl ApiError {
    pub fn is_login_expired(&self) -> bool {
        matches!(self, ApiError::Envelope { code, .. } if *code == LOGIN_EXPIRED_CODE)
            || matches!(self, ApiError::UnexpectedStatus { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }
}

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("ask stream failed with status {status}")]
    UnexpectedStatus {
        status: StatusCode,
        headers: HeaderMap,
        body: String,
    },

    #[error("ask stream returned content-type `{content_type}`, expected NDJSON")]
    UnexpectedContentType {
        status: StatusCode,
        headers: HeaderMap,
        content_type: String,
    },

    #[error("failed to read ask stream: {0}")]
    Read(#[source] reqwest::Error),

    #[error("failed to decode ask frame `{line}`: {source}")]
    Decode {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode ask request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[source] Box<tungstenite::Error>),

    #[error("websocket closed with code {code}: {reason}")]
    Closed { code: u16, reason: String },

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl From<tungstenite::Error> for StreamError {
    fn from(err: tungstenite::Error) -> Self {
        StreamError::WebSocket(Box::new(err))
    }
}
