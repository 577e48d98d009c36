//! Conversation pipeline for the chat-service client.
//!
//! A conversation arrives as a tree of messages keyed by id. Rendering it
//! means walking the active branch ([`history::linearize`]), merging the
//! messages of one assistant turn ([`history::group_messages`]), tagging each
//! group with how it should be drawn ([`history::classify_group`]) and
//! turning message bodies into markdown source ([`text::display_text`]).

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod config;
pub mod export;
pub mod files;
pub mod history;
pub mod store;
pub mod text;
pub mod time;
pub mod title;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use config::ConfigError;
pub use config::Preferences;
pub use history::DisplayGroup;
pub use history::DisplayItem;
pub use history::DisplayType;
pub use history::HistoryError;
pub use history::PluginAction;
pub use store::AskUpdate;
pub use store::ConversationStore;
pub use store::StoreError;
