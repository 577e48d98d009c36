use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::message::ChatMessage;
use crate::message::ChatSource;

/// Payload posted to the streaming ask endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskRequest {
    pub source: ChatSource,
    pub model: String,
    pub new_conversation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// How many previous messages an `openai_api` ask replays; `-1` means all.
    #[serde(default = "default_context_message_count")]
    pub api_context_message_count: i64,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_web_plugin_ids: Option<Vec<String>>,
}

fn default_context_message_count() -> i64 {
    -1
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AskRequestError {
    #[error("a new conversation cannot specify conversation_id")]
    NewConversationWithId,
    #[error("conversation_id is required when continuing a conversation")]
    MissingConversationId,
    #[error("parent is required when continuing a conversation")]
    MissingParent,
    #[error("new_title can only be set on a new conversation")]
    TitleOnExistingConversation,
    #[error("api_context_message_count must be -1 or greater, got {0}")]
    InvalidContextMessageCount(i64),
    #[error("content must not be empty")]
    EmptyContent,
}

impl AskRequest {
    pub fn new_conversation(
        source: ChatSource,
        model: impl Into<String>,
        content: impl Into<String>,
        new_title: Option<String>,
    ) -> Self {
        Self {
            source,
            model: model.into(),
            new_conversation: true,
            new_title,
            conversation_id: None,
            parent: None,
            api_context_message_count: default_context_message_count(),
            content: content.into(),
            openai_web_plugin_ids: None,
        }
    }

    pub fn follow_up(
        source: ChatSource,
        model: impl Into<String>,
        content: impl Into<String>,
        conversation_id: impl Into<String>,
        parent: impl Into<String>,
    ) -> Self {
        Self {
            source,
            model: model.into(),
            new_conversation: false,
            new_title: None,
            conversation_id: Some(conversation_id.into()),
            parent: Some(parent.into()),
            api_context_message_count: default_context_message_count(),
            content: content.into(),
            openai_web_plugin_ids: None,
        }
    }

    /// Mirrors the backend's own checks so a bad ask fails before it is sent.
    pub fn validate(&self) -> Result<(), AskRequestError> {
        if self.content.trim().is_empty() {
            return Err(AskRequestError::EmptyContent);
        }
        if self.api_context_message_count < -1 {
            return Err(AskRequestError::InvalidContextMessageCount(
                self.api_context_message_count,
            ));
        }

        if self.new_conversation {
            if self.conversation_id.is_some() {
                return Err(AskRequestError::NewConversationWithId);
            }
            return Ok(());
        }

        if self.conversation_id.is_none() {
            return Err(AskRequestError::MissingConversationId);
        }
        if self.parent.is_none() {
            return Err(AskRequestError::MissingParent);
        }
        if self.new_title.is_some() {
            return Err(AskRequestError::TitleOnExistingConversation);
        }
        Ok(())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AskResponseType {
    Waiting,
    Queueing,
    Message,
    Error,
}

/// One NDJSON frame of an ask stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    #[serde(rename = "type")]
    pub kind: AskResponseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn new_conversation_rejects_conversation_id() {
        let mut request =
            AskRequest::new_conversation(ChatSource::OpenaiWeb, "gpt_4", "hello", None);
        assert_eq!(request.validate(), Ok(()));

        request.conversation_id = Some("c-1".to_string());
        assert_eq!(
            request.validate(),
            Err(AskRequestError::NewConversationWithId)
        );
    }

    #[test]
    fn follow_up_requires_parent_and_forbids_title() {
        let mut request =
            AskRequest::follow_up(ChatSource::OpenaiApi, "gpt_3_5", "more", "c-1", "m-9");
        assert_eq!(request.validate(), Ok(()));

        request.new_title = Some("Renamed".to_string());
        assert_eq!(
            request.validate(),
            Err(AskRequestError::TitleOnExistingConversation)
        );

        request.new_title = None;
        request.parent = None;
        assert_eq!(request.validate(), Err(AskRequestError::MissingParent));
    }

    #[test]
    fn context_message_count_defaults_to_all() {
        let request: AskRequest = serde_json::from_str(
            r#"{"source":"openai_api","model":"gpt_4","new_conversation":true,"content":"hi"}"#,
        )
        .expect("ask request should parse");
        assert_eq!(request.api_context_message_count, -1);
    }

    #[test]
    fn response_frame_reads_type_tag() {
        let frame: AskResponse =
            serde_json::from_str(r#"{"type":"queueing","tip":"tips.queueing"}"#)
                .expect("frame should parse");
        assert_eq!(frame.kind, AskResponseType::Queueing);
        assert_eq!(frame.tip.as_deref(), Some("tips.queueing"));
    }
}
