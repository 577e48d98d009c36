use serde::Deserialize;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Provider-specific message metadata, discriminated by `source`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum MessageMetadata {
    OpenaiWeb(Box<WebMessageMetadata>),
    OpenaiApi(ApiMessageMetadata),
}

impl MessageMetadata {
    pub fn as_web(&self) -> Option<&WebMessageMetadata> {
        match self {
            MessageMetadata::OpenaiWeb(meta) => Some(meta),
            MessageMetadata::OpenaiApi(_) => None,
        }
    }

    pub fn end_turn(&self) -> Option<bool> {
        self.as_web().and_then(|meta| meta.end_turn)
    }

    pub fn recipient(&self) -> Option<&str> {
        self.as_web().and_then(|meta| meta.recipient.as_deref())
    }

    pub fn citations(&self) -> &[Citation] {
        self.as_web()
            .and_then(|meta| meta.citations.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebMessageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_details: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_turn: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_status: Option<String>,
    /// `all`, `browser`, `python`, `dalle.text2im`, `myfiles_browser` or a
    /// plugin operation such as `plugin_name.operation`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    /// Raw content kept by the backend when it could not parse `content_type`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_content: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoked_plugin: Option<InvokedPlugin>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(
        rename = "_cite_metadata",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cite_metadata: Option<CiteMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_complete: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate_result: Option<AggregateResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiMessageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokedPlugin {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_response_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiteData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CiteMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation_format: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_list: Option<Vec<CiteData>>,
}

/// A cited span of the message text. Offsets count characters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_ix: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_ix: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<CiteData>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Code-interpreter run summary attached to `execution_output` messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_expression_output: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_kernel_exception: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<AggregateResultMessage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jupyter_messages: Option<Vec<JsonValue>>,
}

impl AggregateResult {
    /// Image URLs produced by the run, in emission order.
    pub fn image_urls(&self) -> impl Iterator<Item = &str> {
        self.messages
            .iter()
            .flatten()
            .filter(|message| message.message_type.as_deref() == Some("image"))
            .filter_map(|message| message.image_url.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateResultMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}
