use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::content::ContentKind;
use crate::content::MessageContent;
use crate::metadata::MessageMetadata;

/// Id prefix of messages the client inserts before the backend acknowledges
/// them.
pub const TEMPORARY_ID_PREFIX: &str = "temp_";

/// Which upstream produced a conversation.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChatSource {
    /// The web provider: multi-message turns, tools, plugins, browsing.
    #[default]
    OpenaiWeb,
    /// The plain completion API: one message per turn.
    OpenaiApi,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One node of the conversation tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub source: ChatSource,
    pub role: Role,
    /// Tool name for `tool` messages (`browser`, `python`, a plugin, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(
        default,
        deserialize_with = "crate::timestamp::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl ChatMessage {
    pub fn is_temporary(&self) -> bool {
        self.id.starts_with(TEMPORARY_ID_PREFIX)
    }

    pub fn content_kind(&self) -> Option<ContentKind> {
        self.content.as_ref().map(MessageContent::kind)
    }

    pub fn end_turn(&self) -> Option<bool> {
        self.metadata.as_ref().and_then(MessageMetadata::end_turn)
    }

    pub fn recipient(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(MessageMetadata::recipient)
    }
}
