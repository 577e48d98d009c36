use cws_protocol::ChatMessage;
use cws_protocol::Content;
use cws_protocol::MessageContent;
use cws_protocol::MultimodalPart;

const PART_SEPARATOR: &str = "\n\n";

/// Plain text of a message body, empty when the message has none.
pub fn raw_text(message: &ChatMessage) -> String {
    message
        .content
        .as_ref()
        .map(content_raw_text)
        .unwrap_or_default()
}

pub fn content_raw_text(content: &MessageContent) -> String {
    let content = match content {
        MessageContent::Plain(text) => return text.clone(),
        MessageContent::Typed(content) => content,
    };

    match content {
        Content::Text { parts, text } => match parts {
            Some(parts) if !parts.is_empty() => parts.join(PART_SEPARATOR),
            _ => text.clone().unwrap_or_default(),
        },
        Content::MultimodalText { parts } => parts
            .iter()
            .flatten()
            .filter_map(|part| match part {
                MultimodalPart::Text(text) => Some(text.as_str()),
                MultimodalPart::Image(_) => None,
            })
            .collect::<Vec<_>>()
            .join(PART_SEPARATOR),
        Content::TetherBrowsingDisplay { result } => result.clone().unwrap_or_default(),
        Content::Code { text, .. }
        | Content::ExecutionOutput { text }
        | Content::Stderr { text }
        | Content::TetherQuote { text, .. }
        | Content::SystemError { text, .. } => text.clone().unwrap_or_default(),
    }
}
