use cws_protocol::ChatMessage;
use cws_protocol::ChatSource;
use cws_protocol::ContentKind;
use cws_protocol::Role;
use serde::Deserialize;
use serde::Serialize;
use tracing::error;
use tracing::warn;

/// How a message group is drawn.
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
pub enum DisplayType {
    Text,
    Browser,
    Plugin,
    Code,
    ExecutionOutput,
    MultimodalText,
    DallePrompt,
    DalleResult,
    MyfilesBrowser,
}

const BROWSER: &str = "browser";
const DALLE: &str = "dalle.text2im";
const MYFILES: &str = "myfiles_browser";
const PYTHON: &str = "python";
const ALL: &str = "all";

/// Tags a group with the first display type any of its messages yields.
///
/// Returns `None` when nothing matches; callers fall back to raw rendering.
pub fn classify_group(group: &[&ChatMessage]) -> Option<DisplayType> {
    if let [only] = group
        && only.source == ChatSource::OpenaiApi
        && only.content_kind() == Some(ContentKind::Text)
    {
        return Some(DisplayType::Text);
    }

    let user_messages = group
        .iter()
        .filter(|message| message.role == Role::User)
        .count();
    if user_messages > 1 {
        error!(
            message_ids = ?group.iter().map(|message| message.id.as_str()).collect::<Vec<_>>(),
            "group holds {user_messages} user messages; classifying from the first"
        );
    }

    let display_type = group.iter().find_map(|message| classify_message(message));
    if display_type.is_none() {
        warn!(
            message_ids = ?group.iter().map(|message| message.id.as_str()).collect::<Vec<_>>(),
            "no display type for message group"
        );
    }
    display_type
}

fn classify_message(message: &ChatMessage) -> Option<DisplayType> {
    let kind = message.content_kind();

    if message.is_temporary() || message.role == Role::User {
        return match kind? {
            ContentKind::Text => Some(DisplayType::Text),
            ContentKind::MultimodalText => Some(DisplayType::MultimodalText),
            _ => None,
        };
    }

    match message.role {
        Role::Assistant => {
            if let Some(display_type) = classify_recipient(message) {
                return Some(display_type);
            }
        }
        Role::Tool => return Some(classify_tool_author(message.author_name.as_deref())),
        Role::System | Role::User => {}
    }

    match kind? {
        ContentKind::Code => Some(DisplayType::Code),
        ContentKind::ExecutionOutput => Some(DisplayType::ExecutionOutput),
        ContentKind::Text => Some(DisplayType::Text),
        ContentKind::MultimodalText => Some(DisplayType::MultimodalText),
        ContentKind::Stderr
        | ContentKind::TetherBrowsingDisplay
        | ContentKind::TetherQuote
        | ContentKind::SystemError => None,
    }
}

fn classify_recipient(message: &ChatMessage) -> Option<DisplayType> {
    match message.recipient()? {
        BROWSER => Some(DisplayType::Browser),
        DALLE => Some(DisplayType::DallePrompt),
        MYFILES => Some(DisplayType::MyfilesBrowser),
        ALL | PYTHON => None,
        _ if supports_plugins(message.model.as_deref()) => Some(DisplayType::Plugin),
        _ => None,
    }
}

fn classify_tool_author(author: Option<&str>) -> DisplayType {
    match author {
        Some(BROWSER) => DisplayType::Browser,
        Some(DALLE) => DisplayType::DalleResult,
        Some(MYFILES) => DisplayType::MyfilesBrowser,
        Some(PYTHON) => DisplayType::ExecutionOutput,
        _ => DisplayType::Plugin,
    }
}

/// Plugin calls only happen on the plugin model variants
/// (`gpt_4_plugins`, `gpt-4-plugins`).
fn supports_plugins(model: Option<&str>) -> bool {
    model.is_some_and(|model| model.contains("plugins"))
}
