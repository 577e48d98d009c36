use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::de::Error as _;
use serde_json::Value as JsonValue;

/// Body of a chat message.
///
/// Messages synthesized on the client (before the backend acknowledges them)
/// carry a bare string; everything the backend sends is a [`Content`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Plain(String),
    Typed(Content),
}

impl<'de> Deserialize<'de> for MessageContent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Dispatch by hand so an unknown `content_type` surfaces as
        // "unknown variant" instead of a generic untagged mismatch.
        match JsonValue::deserialize(deserializer)? {
            JsonValue::String(text) => Ok(Self::Plain(text)),
            other => Content::deserialize(other)
                .map(Self::Typed)
                .map_err(D::Error::custom),
        }
    }
}

impl MessageContent {
    pub fn kind(&self) -> ContentKind {
        match self {
            MessageContent::Plain(_) => ContentKind::Text,
            MessageContent::Typed(content) => content.kind(),
        }
    }
}

impl From<Content> for MessageContent {
    fn from(content: Content) -> Self {
        Self::Typed(content)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "content_type", rename_all = "snake_case")]
pub enum Content {
    /// `openai_web` messages use `parts`; `openai_api` messages use `text`.
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parts: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    MultimodalText {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parts: Option<Vec<MultimodalPart>>,
    },
    Code {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    ExecutionOutput {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    Stderr {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    TetherBrowsingDisplay {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<String>,
    },
    TetherQuote {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        domain: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    SystemError {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
}

impl Content {
    pub fn text_parts(parts: Vec<String>) -> Self {
        Content::Text {
            parts: Some(parts),
            text: None,
        }
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            Content::Text { .. } => ContentKind::Text,
            Content::MultimodalText { .. } => ContentKind::MultimodalText,
            Content::Code { .. } => ContentKind::Code,
            Content::ExecutionOutput { .. } => ContentKind::ExecutionOutput,
            Content::Stderr { .. } => ContentKind::Stderr,
            Content::TetherBrowsingDisplay { .. } => ContentKind::TetherBrowsingDisplay,
            Content::TetherQuote { .. } => ContentKind::TetherQuote,
            Content::SystemError { .. } => ContentKind::SystemError,
        }
    }
}

/// The `content_type` tag of a [`Content`], without its payload.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContentKind {
    Text,
    MultimodalText,
    Code,
    ExecutionOutput,
    Stderr,
    TetherBrowsingDisplay,
    TetherQuote,
    SystemError,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MultimodalPart {
    Text(String),
    Image(ImagePart),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_pointer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ImagePartMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagePartMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dalle: Option<DalleMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DalleMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serialization_title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_string_content_is_passthrough() {
        let content: MessageContent =
            serde_json::from_str("\"hello\"").expect("plain content should parse");
        assert_eq!(content, MessageContent::Plain("hello".to_string()));
        assert_eq!(content.kind(), ContentKind::Text);
    }

    #[test]
    fn tagged_content_parses_by_content_type() {
        let content: MessageContent = serde_json::from_str(
            r#"{"content_type":"code","language":"python","text":"print(1)"}"#,
        )
        .expect("code content should parse");
        assert_eq!(
            content,
            MessageContent::Typed(Content::Code {
                language: Some("python".to_string()),
                text: Some("print(1)".to_string()),
            })
        );
    }

    #[test]
    fn unknown_content_type_is_rejected() {
        let err = serde_json::from_str::<MessageContent>(r#"{"content_type":"hologram"}"#)
            .expect_err("unknown tag should fail");
        assert!(err.to_string().contains("unknown variant `hologram`"));
    }

    #[test]
    fn multimodal_parts_mix_text_and_images() {
        let content: Content = serde_json::from_str(
            r#"{
                "content_type": "multimodal_text",
                "parts": [
                    {"asset_pointer": "file-service://file-1", "width": 512, "height": 512,
                     "metadata": {"dalle": {"prompt": "a red fox"}}},
                    "caption"
                ]
            }"#,
        )
        .expect("multimodal content should parse");

        let Content::MultimodalText { parts: Some(parts) } = content else {
            panic!("expected multimodal parts");
        };
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1], MultimodalPart::Text("caption".to_string()));
        let MultimodalPart::Image(image) = &parts[0] else {
            panic!("expected an image part first");
        };
        assert_eq!(
            image
                .metadata
                .as_ref()
                .and_then(|meta| meta.dalle.as_ref())
                .and_then(|dalle| dalle.prompt.as_deref()),
            Some("a red fox")
        );
    }
}
