use chrono::DateTime;
use chrono::Utc;
use cws_protocol::ChatMessage;
use cws_protocol::Content;
use cws_protocol::ContentKind;
use cws_protocol::ConversationHistory;
use cws_protocol::MessageContent;
use cws_protocol::MessageMetadata;
use cws_protocol::MultimodalPart;
use cws_protocol::Role;
use serde::Serialize;

use super::classify::DisplayType;
use super::classify::classify_group;
use super::grouping::group_messages;
use super::plugin::split_plugin_actions;
use super::walker::linearize;
use crate::text::display_text;
use crate::text::raw_text;

/// A classified turn of the active branch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayGroup<'a> {
    pub display_type: Option<DisplayType>,
    pub messages: Vec<&'a ChatMessage>,
}

impl DisplayGroup<'_> {
    pub fn role(&self) -> Option<Role> {
        self.messages.first().map(|message| message.role)
    }

    pub fn items(&self) -> Vec<DisplayItem> {
        display_items(&self.messages)
    }
}

/// Walks, groups and classifies the branch ending at `last_node` (the
/// current node by default).
pub fn build_display_groups<'a>(
    history: &'a ConversationHistory,
    last_node: Option<&str>,
) -> Vec<DisplayGroup<'a>> {
    let path = linearize(history, last_node);
    group_messages(&path)
        .into_iter()
        .map(|messages| DisplayGroup {
            display_type: classify_group(&messages),
            messages,
        })
        .collect()
}

/// Drawable pieces of one group, in message order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DisplayItem {
    /// Consecutive text messages concatenated into one block.
    Text {
        content: String,
        merge_count: usize,
        finish_time: Option<DateTime<Utc>>,
    },
    /// A message addressed to a tool, and the tool's reply once it arrives.
    PluginCall {
        recipient: String,
        request: String,
        response: Option<String>,
        finish_time: Option<DateTime<Utc>>,
    },
    Image {
        url: String,
        prompt: Option<String>,
    },
    /// Anything else, rendered from its raw text.
    Block {
        kind: ContentKind,
        content: String,
        finish_time: Option<DateTime<Utc>>,
    },
}

pub fn display_items(group: &[&ChatMessage]) -> Vec<DisplayItem> {
    let mut items: Vec<DisplayItem> = Vec::new();
    let mut rest = group;

    while let Some((&message, tail)) = rest.split_first() {
        if is_tool_request(message) {
            let (calls, tail) = rest.split_at(tool_call_run_len(rest));
            push_tool_calls(&mut items, calls);
            rest = tail;
            continue;
        }
        push_message(&mut items, message);
        rest = tail;
    }
    items
}

fn is_tool_request(message: &ChatMessage) -> bool {
    message.role == Role::Assistant
        && message.content.is_some()
        && message.recipient().is_some_and(|recipient| recipient != "all")
}

/// Length of the alternating request/response run at the start of `messages`.
fn tool_call_run_len(messages: &[&ChatMessage]) -> usize {
    messages
        .iter()
        .enumerate()
        .take_while(|(index, message)| {
            if index % 2 == 0 {
                is_tool_request(message)
            } else {
                message.role == Role::Tool
            }
        })
        .count()
}

fn push_tool_calls(items: &mut Vec<DisplayItem>, calls: &[&ChatMessage]) {
    let actions = split_plugin_actions(calls);
    for (action, pair) in actions.into_iter().zip(calls.chunks_exact(2)) {
        let response = pair[1];
        items.push(DisplayItem::PluginCall {
            recipient: action.plugin_name,
            request: action.request,
            response: Some(action.response),
            finish_time: response.create_time,
        });
        items.extend(message_images(response));
    }

    // A request still waiting for its tool reply.
    if calls.len() % 2 == 1
        && let Some(pending) = calls.last()
    {
        items.push(DisplayItem::PluginCall {
            recipient: pending.recipient().unwrap_or_default().to_string(),
            request: raw_text(pending),
            response: None,
            finish_time: pending.create_time,
        });
    }
}

fn push_message(items: &mut Vec<DisplayItem>, message: &ChatMessage) {
    let Some(content) = message.content.as_ref() else {
        return;
    };
    let finish_time = message.create_time;

    match content.kind() {
        ContentKind::Text => {
            let text = display_text(message);
            if let Some(DisplayItem::Text {
                content: merged,
                merge_count,
                finish_time: merged_until,
            }) = items.last_mut()
            {
                merged.push_str(&text);
                *merge_count += 1;
                *merged_until = finish_time;
            } else {
                items.push(DisplayItem::Text {
                    content: text,
                    merge_count: 1,
                    finish_time,
                });
            }
        }
        kind => {
            let text = display_text(message);
            if !text.is_empty() {
                items.push(DisplayItem::Block {
                    kind,
                    content: text,
                    finish_time,
                });
            }
            items.extend(message_images(message));
        }
    }
}

/// Images carried by a message: multimodal image parts and plots produced by
/// a code-interpreter run.
fn message_images(message: &ChatMessage) -> Vec<DisplayItem> {
    let mut images = Vec::new();
    if let Some(MessageContent::Typed(Content::MultimodalText { parts })) = &message.content {
        for part in parts.iter().flatten() {
            if let MultimodalPart::Image(image) = part
                && let Some(url) = image.asset_pointer.as_ref()
            {
                let prompt = image
                    .metadata
                    .as_ref()
                    .and_then(|metadata| metadata.dalle.as_ref())
                    .and_then(|dalle| dalle.prompt.clone());
                images.push(DisplayItem::Image {
                    url: url.clone(),
                    prompt,
                });
            }
        }
    }
    if let Some(result) = message
        .metadata
        .as_ref()
        .and_then(MessageMetadata::as_web)
        .and_then(|web| web.aggregate_result.as_ref())
    {
        images.extend(result.image_urls().map(|url| DisplayItem::Image {
            url: url.to_string(),
            prompt: None,
        }));
    }
    images
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::history;
    use crate::test_support::message;
    use cws_protocol::ImagePart;
    use cws_protocol::content::DalleMetadata;
    use cws_protocol::content::ImagePartMetadata;
    use pretty_assertions::assert_eq;

    #[test]
    fn builds_classified_groups_for_active_branch() {
        let history = history(
            vec![
                message("u1", Role::User).text("weather?").build(),
                message("a1", Role::Assistant)
                    .parent("u1")
                    .recipient("browser")
                    .text("search(\"oslo weather\")")
                    .build(),
                message("t1", Role::Tool)
                    .parent("a1")
                    .author("browser")
                    .content(Content::TetherBrowsingDisplay {
                        result: Some("rain".to_string()),
                    })
                    .build(),
                message("a2", Role::Assistant)
                    .parent("t1")
                    .text("It rains.")
                    .end_turn()
                    .build(),
            ],
            "a2",
        );

        let groups = build_display_groups(&history, None);

        let summary: Vec<(Option<DisplayType>, usize)> = groups
            .iter()
            .map(|group| (group.display_type, group.messages.len()))
            .collect();
        assert_eq!(
            summary,
            vec![(Some(DisplayType::Text), 1), (Some(DisplayType::Browser), 3)]
        );
        assert_eq!(groups[0].role(), Some(Role::User));
    }

    #[test]
    fn merges_consecutive_text_and_pairs_tool_calls() {
        let messages = [
            message("a1", Role::Assistant)
                .text("Let me check. ")
                .created_at("2023-06-01T10:00:00Z")
                .build(),
            message("a2", Role::Assistant)
                .text("One moment.")
                .created_at("2023-06-01T10:00:01Z")
                .build(),
            message("a3", Role::Assistant)
                .recipient("weather.forecast")
                .text("{\"city\":\"Oslo\"}")
                .created_at("2023-06-01T10:00:02Z")
                .build(),
            message("t1", Role::Tool)
                .author("weather.forecast")
                .text("rain")
                .created_at("2023-06-01T10:00:03Z")
                .build(),
            message("a4", Role::Assistant)
                .text("Bring an umbrella.")
                .end_turn()
                .build(),
        ];
        let group: Vec<&ChatMessage> = messages.iter().collect();

        let items = display_items(&group);

        assert_eq!(
            items,
            vec![
                DisplayItem::Text {
                    content: "Let me check. One moment.".to_string(),
                    merge_count: 2,
                    finish_time: messages[1].create_time,
                },
                DisplayItem::PluginCall {
                    recipient: "weather.forecast".to_string(),
                    request: "{\"city\":\"Oslo\"}".to_string(),
                    response: Some("rain".to_string()),
                    finish_time: messages[3].create_time,
                },
                DisplayItem::Text {
                    content: "Bring an umbrella.".to_string(),
                    merge_count: 1,
                    finish_time: None,
                },
            ]
        );
    }

    #[test]
    fn plugin_group_keeps_pending_request_after_paired_actions() {
        let messages = [
            message("a1", Role::Assistant)
                .model("gpt_4_plugins")
                .recipient("foo.bar")
                .text("{}")
                .build(),
            message("t1", Role::Tool).author("foo.bar").text("first").build(),
            message("a2", Role::Assistant)
                .model("gpt_4_plugins")
                .recipient("foo.baz")
                .text("{\"q\":1}")
                .build(),
        ];
        let group = DisplayGroup {
            display_type: Some(DisplayType::Plugin),
            messages: messages.iter().collect(),
        };

        assert_eq!(
            group.items(),
            vec![
                DisplayItem::PluginCall {
                    recipient: "foo.bar".to_string(),
                    request: "{}".to_string(),
                    response: Some("first".to_string()),
                    finish_time: None,
                },
                DisplayItem::PluginCall {
                    recipient: "foo.baz".to_string(),
                    request: "{\"q\":1}".to_string(),
                    response: None,
                    finish_time: None,
                },
            ]
        );
    }

    #[test]
    fn dalle_result_yields_image_with_prompt() {
        let messages = [message("t1", Role::Tool)
            .author("dalle.text2im")
            .content(Content::MultimodalText {
                parts: Some(vec![MultimodalPart::Image(ImagePart {
                    asset_pointer: Some("file-service://file-1".to_string()),
                    metadata: Some(ImagePartMetadata {
                        dalle: Some(DalleMetadata {
                            prompt: Some("a red fox".to_string()),
                            ..DalleMetadata::default()
                        }),
                    }),
                    ..ImagePart::default()
                })]),
            })
            .build()];
        let group: Vec<&ChatMessage> = messages.iter().collect();

        assert_eq!(
            display_items(&group),
            vec![DisplayItem::Image {
                url: "file-service://file-1".to_string(),
                prompt: Some("a red fox".to_string()),
            }]
        );
    }
}
