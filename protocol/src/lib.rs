//! Wire types shared by the chat-service client crates.
//!
//! Everything in here mirrors the JSON the backend produces. Derived view
//! models (display groups, display items) live in `cws-core`.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod ask;
pub mod content;
pub mod envelope;
pub mod history;
pub mod message;
pub mod metadata;
pub mod schema;
pub mod timestamp;

pub use ask::AskRequest;
pub use ask::AskRequestError;
pub use ask::AskResponse;
pub use ask::AskResponseType;
pub use content::Content;
pub use content::ContentKind;
pub use content::ImagePart;
pub use content::MessageContent;
pub use content::MultimodalPart;
pub use envelope::ApiEnvelope;
pub use history::ConversationHistory;
pub use history::HistoryMetadata;
pub use message::ChatMessage;
pub use message::ChatSource;
pub use message::Role;
pub use metadata::Citation;
pub use metadata::MessageMetadata;
pub use metadata::WebMessageMetadata;
