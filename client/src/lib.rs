//! HTTP, NDJSON and WebSocket client for the chat-service backend.

// Prevent accidental direct writes to stdout/stderr in library code. All
// user-visible output must go through the notice channel or tracing.
#![deny(clippy::print_stdout, clippy::print_stderr)]

mod client;
mod endpoints;
mod error;
mod ndjson;
mod notice;
pub mod paths;
mod session;
mod upload;
mod websocket;

pub use client::ApiClient;
pub use endpoints::LogQuery;
pub use error::ApiError;
pub use error::StreamError;
pub use ndjson::NDJSON_CONTENT_TYPE;
pub use ndjson::NdjsonDecoder;
pub use ndjson::StreamOutcome;
pub use notice::ClientNotice;
pub use session::LOGIN_COOKIE_NAME;
pub use session::SessionFile;
pub use upload::UploadProgress;
pub use websocket::websocket_url;
