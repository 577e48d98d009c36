//! WebSocket ask: one request frame out, one [`AskResponse`] per text frame
//! back, ended by the server's close frame.

use cws_protocol::AskRequest;
use cws_protocol::AskResponse;
use futures::SinkExt;
use futures::StreamExt;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WebSocketMessage;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::COOKIE;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;
use url::Url;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::error::StreamError;
use crate::ndjson::StreamOutcome;
use crate::ndjson::decode_line;
use crate::paths;

/// `explicit` when configured, otherwise `chat` under the base URL with the
/// scheme switched to `wss` for HTTPS and `ws` for HTTP.
pub fn websocket_url(base: &Url, explicit: Option<&str>) -> Result<Url, ApiError> {
    if let Some(explicit) = explicit {
        return Url::parse(explicit).map_err(|source| ApiError::InvalidUrl {
            url: explicit.to_string(),
            source,
        });
    }

    let unsupported = || ApiError::UnsupportedScheme {
        url: base.to_string(),
    };
    let scheme = match base.scheme() {
        "https" => "wss",
        "http" => "ws",
        _ => return Err(unsupported()),
    };
    let mut url = base.clone();
    url.set_scheme(scheme).map_err(|()| unsupported())?;
    let path = format!(
        "{}/{}",
        base.path().trim_end_matches('/'),
        paths::WEBSOCKET_CHAT
    );
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

impl ApiClient {
    /// Ask over a WebSocket at `url`, forwarding the session cookie.
    pub async fn ask_websocket<F>(
        &self,
        ask: &AskRequest,
        url: &Url,
        cancel: &CancellationToken,
        mut on_frame: F,
    ) -> Result<StreamOutcome, StreamError>
    where
        F: FnMut(AskResponse),
    {
        ask.validate().map_err(ApiError::from)?;
        let payload = serde_json::to_string(ask).map_err(StreamError::Encode)?;

        let mut request = url.as_str().into_client_request()?;
        if let Some(cookie) = self.cookie_header() {
            request.headers_mut().insert(COOKIE, cookie);
        }

        let connected = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("ask cancelled before the websocket opened");
                return Ok(StreamOutcome::Cancelled { frames: 0 });
            }
            connected = connect_async(request) => connected,
        };
        let (websocket_stream, _response) = connected?;
        debug!(%url, "websocket connected");

        let (mut websocket_writer, mut websocket_reader) = websocket_stream.split();
        websocket_writer
            .send(WebSocketMessage::Text(payload.into()))
            .await?;

        let mut frames = 0;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(frames, "websocket ask cancelled");
                    let _ = websocket_writer.send(WebSocketMessage::Close(None)).await;
                    return Ok(StreamOutcome::Cancelled { frames });
                }
                incoming_message = websocket_reader.next() => {
                    match incoming_message {
                        Some(Ok(WebSocketMessage::Text(text))) => {
                            on_frame(decode_line(text.as_str().to_string())?);
                            frames += 1;
                        }
                        Some(Ok(WebSocketMessage::Ping(payload))) => {
                            websocket_writer.send(WebSocketMessage::Pong(payload)).await?;
                        }
                        Some(Ok(WebSocketMessage::Pong(_))) | Some(Ok(WebSocketMessage::Frame(_))) => {}
                        Some(Ok(WebSocketMessage::Binary(_))) => {
                            warn!("dropping unsupported binary websocket message");
                        }
                        Some(Ok(WebSocketMessage::Close(close_frame))) => {
                            if let Some(close_frame) = close_frame
                                && close_frame.code != CloseCode::Normal
                            {
                                return Err(StreamError::Closed {
                                    code: u16::from(close_frame.code),
                                    reason: close_frame.reason.as_str().to_string(),
                                });
                            }
                            break;
                        }
                        None => break,
                        Some(Err(err)) => {
                            warn!("websocket receive error: {err}");
                            return Err(err.into());
                        }
                    }
                }
            }
        }

        debug!(frames, "websocket ask completed");
        Ok(StreamOutcome::Completed { frames })
    }
}
