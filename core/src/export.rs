use std::fmt::Write as _;
use std::path::Path;

use cws_protocol::ChatMessage;
use cws_protocol::Content;
use cws_protocol::ConversationHistory;
use cws_protocol::MessageContent;
use cws_protocol::MultimodalPart;
use cws_protocol::Role;
use serde::Serialize;

use crate::history::linearize;
use crate::text::display_text;
use crate::title::display_title;

pub async fn export_history_as_markdown(
    history: &ConversationHistory,
    last_node: Option<&str>,
    out_path: &Path,
) -> std::io::Result<usize> {
    let path = linearize(history, last_node);
    let markdown = messages_to_markdown(&display_title(history), &path);
    tokio::fs::write(out_path, markdown).await?;

    Ok(count_exported_messages(&path))
}

pub async fn export_history_as_json(
    history: &ConversationHistory,
    last_node: Option<&str>,
    out_path: &Path,
) -> std::io::Result<usize> {
    let path = linearize(history, last_node);
    let messages = messages_to_export_messages(&path);
    let json = serde_json::to_string_pretty(&messages)
        .map_err(|e| std::io::Error::other(format!("failed to serialize JSON: {e}")))?;

    tokio::fs::write(out_path, json).await?;

    Ok(messages.len())
}

fn role_header(role: Role) -> Option<&'static str> {
    match role {
        Role::User => Some("## User"),
        Role::Assistant => Some("## Assistant"),
        Role::System | Role::Tool => None,
    }
}

/// Remote images are linked; blob-store pointers only resolve inside a
/// session, so they become a placeholder.
fn image_item(url: &str) -> Option<ExportContentItem> {
    if url.trim().is_empty() {
        None
    } else if url.starts_with("http://") || url.starts_with("https://") {
        Some(ExportContentItem::ImageUrl {
            url: url.to_string(),
        })
    } else {
        Some(ExportContentItem::ImageOmitted {
            reason: "asset_pointer".to_string(),
        })
    }
}

fn message_items(message: &ChatMessage) -> Vec<ExportContentItem> {
    let mut items = Vec::new();
    match &message.content {
        Some(MessageContent::Typed(Content::Code { language, text })) => {
            let code = text.as_deref().unwrap_or_default();
            if !code.trim().is_empty() {
                let language = language.as_deref().unwrap_or_default();
                items.push(ExportContentItem::Text {
                    text: format!("```{language}\n{code}\n```"),
                });
            }
        }
        Some(MessageContent::Typed(Content::MultimodalText { parts })) => {
            for part in parts.iter().flatten() {
                match part {
                    MultimodalPart::Text(text) if !text.trim().is_empty() => {
                        items.push(ExportContentItem::Text { text: text.clone() });
                    }
                    MultimodalPart::Text(_) => {}
                    MultimodalPart::Image(image) => {
                        items.extend(image.asset_pointer.as_deref().and_then(image_item));
                    }
                }
            }
        }
        Some(_) => {
            let text = display_text(message);
            if !text.trim().is_empty() {
                items.push(ExportContentItem::Text { text });
            }
        }
        None => {}
    }
    items
}

fn item_to_markdown(item: &ExportContentItem) -> String {
    match item {
        ExportContentItem::Text { text } => text.clone(),
        ExportContentItem::ImageUrl { url } => format!("![image]({url})"),
        ExportContentItem::ImageOmitted { reason } => {
            format!("_[image omitted: {}]_", reason.replace('_', " "))
        }
    }
}

fn messages_to_markdown(title: &str, messages: &[&ChatMessage]) -> String {
    let mut out = String::new();

    let _ = writeln!(&mut out, "# {title}");
    let _ = writeln!(&mut out);

    for message in messages {
        let Some(header) = role_header(message.role) else {
            continue;
        };
        let items = message_items(message);
        if items.is_empty() {
            continue;
        }
        let body = items
            .iter()
            .map(item_to_markdown)
            .collect::<Vec<_>>()
            .join("\n\n");

        let _ = writeln!(&mut out, "{header}");
        let _ = writeln!(&mut out);
        let _ = writeln!(&mut out, "{body}");
        let _ = writeln!(&mut out);
    }

    out
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExportMessage {
    pub id: String,
    pub timestamp: Option<String>,
    pub role: Role,
    pub model: Option<String>,
    pub content: Vec<ExportContentItem>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExportContentItem {
    Text { text: String },
    ImageUrl { url: String },
    ImageOmitted { reason: String },
}

fn messages_to_export_messages(messages: &[&ChatMessage]) -> Vec<ExportMessage> {
    messages
        .iter()
        .filter(|message| role_header(message.role).is_some())
        .filter_map(|message| {
            let content = message_items(message);
            if content.is_empty() {
                return None;
            }
            Some(ExportMessage {
                id: message.id.clone(),
                timestamp: message.create_time.map(|time| time.to_rfc3339()),
                role: message.role,
                model: message.model.clone(),
                content,
            })
        })
        .collect()
}

fn count_exported_messages(messages: &[&ChatMessage]) -> usize {
    messages
        .iter()
        .filter(|message| role_header(message.role).is_some() && !message_items(message).is_empty())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::history;
    use crate::test_support::message;
    use cws_protocol::ImagePart;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample_history() -> ConversationHistory {
        let mut history = history(
            vec![
                message("sys", Role::System).text("You are helpful.").build(),
                message("u1", Role::User)
                    .parent("sys")
                    .content(Content::MultimodalText {
                        parts: Some(vec![
                            MultimodalPart::Image(ImagePart {
                                asset_pointer: Some("file-service://file-9".to_string()),
                                ..ImagePart::default()
                            }),
                            MultimodalPart::Text("What is in this chart?".to_string()),
                        ]),
                    })
                    .created_at("2023-06-01T10:00:00Z")
                    .build(),
                message("a1", Role::Assistant)
                    .parent("u1")
                    .recipient("python")
                    .content(Content::Code {
                        language: Some("python".to_string()),
                        text: Some("print(sum([1, 2]))".to_string()),
                    })
                    .build(),
                message("t1", Role::Tool)
                    .parent("a1")
                    .author("python")
                    .content(Content::ExecutionOutput {
                        text: Some("3".to_string()),
                    })
                    .build(),
                message("a2", Role::Assistant)
                    .parent("t1")
                    .text(r"The total is \(3\).")
                    .end_turn()
                    .build(),
            ],
            "a2",
        );
        history.title = "Chart question".to_string();
        history
    }

    #[test]
    fn markdown_skips_system_and_tool_messages() {
        let history = sample_history();
        let path = linearize(&history, None);

        let markdown = messages_to_markdown(&display_title(&history), &path);

        assert_eq!(
            markdown,
            "# Chart question\n\n\
             ## User\n\n_[image omitted: asset pointer]_\n\nWhat is in this chart?\n\n\
             ## Assistant\n\n```python\nprint(sum([1, 2]))\n```\n\n\
             ## Assistant\n\nThe total is $3$.\n\n"
        );
        assert_eq!(count_exported_messages(&path), 3);
    }

    #[test]
    fn json_records_carry_ids_and_typed_items() {
        let history = sample_history();
        let path = linearize(&history, None);

        let messages = messages_to_export_messages(&path);

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].id, "u1");
        assert_eq!(
            messages[0].timestamp.as_deref(),
            Some("2023-06-01T10:00:00+00:00")
        );
        assert_eq!(
            messages[0].content,
            vec![
                ExportContentItem::ImageOmitted {
                    reason: "asset_pointer".to_string()
                },
                ExportContentItem::Text {
                    text: "What is in this chart?".to_string()
                },
            ]
        );
        let json = serde_json::to_value(&messages[0]).expect("serialize");
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"][0]["type"], "image_omitted");
    }

    #[tokio::test]
    async fn writes_export_files() {
        let dir = TempDir::new().expect("tempdir");
        let history = sample_history();
        let md_path = dir.path().join("chat.md");
        let json_path = dir.path().join("chat.json");

        let md_count = export_history_as_markdown(&history, None, &md_path)
            .await
            .expect("markdown export");
        let json_count = export_history_as_json(&history, None, &json_path)
            .await
            .expect("json export");

        assert_eq!(md_count, 3);
        assert_eq!(json_count, 3);
        let written = std::fs::read_to_string(&md_path).expect("read markdown");
        assert!(written.starts_with("# Chart question\n"));
    }
}
