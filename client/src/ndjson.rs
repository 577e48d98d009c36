//! Streaming ask over newline-delimited JSON.

use bytes::Bytes;
use bytes::BytesMut;
use cws_protocol::ApiEnvelope;
use cws_protocol::AskRequest;
use cws_protocol::AskResponse;
use futures::Stream;
use futures::StreamExt;
use futures::TryStreamExt;
use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::error::StreamError;
use crate::notice::ClientNotice;
use crate::paths;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// How a stream ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed { frames: usize },
    Cancelled { frames: usize },
}

/// Splits a byte stream into lines, holding back a partial trailing line
/// until the chunk that completes it arrives.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: BytesMut,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer `chunk` and return every line it completed. Blank lines are
    /// dropped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line = self.buffer.split_to(pos + 1);
            if let Some(text) = line_text(&line[..pos]) {
                lines.push(text);
            }
        }
        lines
    }

    /// The unterminated tail left when the stream ends.
    pub fn finish(&mut self) -> Option<String> {
        let rest = self.buffer.split();
        line_text(&rest)
    }
}

fn line_text(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub(crate) fn decode_line<T: DeserializeOwned>(line: String) -> Result<T, StreamError> {
    serde_json::from_str(&line).map_err(|source| StreamError::Decode { line, source })
}

/// Feed every frame of `stream` to `on_frame` until it ends or `cancel`
/// fires. Cancellation is not an error.
pub(crate) async fn consume_ndjson<S, T, F>(
    stream: S,
    cancel: &CancellationToken,
    mut on_frame: F,
) -> Result<StreamOutcome, StreamError>
where
    S: Stream<Item = Result<Bytes, StreamError>>,
    T: DeserializeOwned,
    F: FnMut(T),
{
    let mut stream = std::pin::pin!(stream);
    let mut decoder = NdjsonDecoder::new();
    let mut frames = 0;

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(frames, "ask stream cancelled");
                return Ok(StreamOutcome::Cancelled { frames });
            }
            chunk = stream.next() => chunk,
        };
        let Some(chunk) = chunk else {
            break;
        };
        for line in decoder.push(&chunk?) {
            on_frame(decode_line(line)?);
            frames += 1;
        }
    }

    if let Some(line) = decoder.finish() {
        on_frame(decode_line(line)?);
        frames += 1;
    }
    debug!(frames, "ask stream completed");
    Ok(StreamOutcome::Completed { frames })
}

impl ApiClient {
    /// `POST /conv` and deliver each [`AskResponse`] frame as it arrives.
    pub async fn ask_stream<F>(
        &self,
        ask: &AskRequest,
        cancel: &CancellationToken,
        on_frame: F,
    ) -> Result<StreamOutcome, StreamError>
    where
        F: FnMut(AskResponse),
    {
        ask.validate().map_err(ApiError::from)?;
        let path = paths::CONVERSATIONS;
        let request = self.request(Method::POST, path)?.json(ask);

        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("ask cancelled before the stream opened");
                return Ok(StreamOutcome::Cancelled { frames: 0 });
            }
            sent = request.send() => sent,
        };
        let response = sent.map_err(|source| ApiError::Transport {
            path: path.to_string(),
            source,
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "ask stream rejected");
            self.notify(ClientNotice::Error(format!("Request Error: {status}")));
            return Err(StreamError::UnexpectedStatus {
                status,
                headers,
                body,
            });
        }

        if !content_type.starts_with(NDJSON_CONTENT_TYPE) {
            let body = response.bytes().await.map_err(StreamError::Read)?;
            // A failing envelope carries a better message than the content-type.
            if let Ok(envelope) = serde_json::from_slice::<ApiEnvelope>(&body)
                && !envelope.is_success()
            {
                self.intercept(path, status, &body)?;
            }
            warn!(content_type, "ask stream has unexpected content-type");
            self.notify(ClientNotice::Error(format!(
                "Request Error: unexpected content-type {content_type}"
            )));
            return Err(StreamError::UnexpectedContentType {
                status,
                headers,
                content_type,
            });
        }

        let stream = response.bytes_stream().map_err(StreamError::Read);
        consume_ndjson(stream, cancel, on_frame).await
    }
}
