use std::collections::HashMap;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::message::ChatMessage;
use crate::message::ChatSource;

/// Full conversation document as returned by `GET /conv/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationHistory {
    #[serde(alias = "_id")]
    pub id: String,
    pub source: ChatSource,
    #[serde(default)]
    pub title: String,
    #[serde(
        default,
        deserialize_with = "crate::timestamp::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "crate::timestamp::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub update_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub mapping: HashMap<String, ChatMessage>,
    #[serde(default)]
    pub current_node: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HistoryMetadata>,
}

impl ConversationHistory {
    /// An empty history for a conversation the backend has just created.
    pub fn new(id: impl Into<String>, source: ChatSource) -> Self {
        Self {
            id: id.into(),
            source,
            title: String::new(),
            create_time: None,
            update_time: None,
            mapping: HashMap::new(),
            current_node: None,
            current_model: None,
            metadata: None,
        }
    }

    pub fn message(&self, id: &str) -> Option<&ChatMessage> {
        self.mapping.get(id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum HistoryMetadata {
    OpenaiWeb {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        moderation_results: Option<Vec<JsonValue>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        plugin_ids: Option<Vec<String>>,
    },
    OpenaiApi {},
}
