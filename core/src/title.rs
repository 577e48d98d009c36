use cws_protocol::ConversationHistory;
use cws_protocol::Role;

use crate::history::linearize;
use crate::text::raw_text;

pub const MAX_TITLE_CHARS: usize = 80;
const MAX_PREVIEW_CHARS: usize = 40;

/// Cleans up a user- or model-supplied conversation title.
///
/// Trims, strips one pair of wrapping quotes, collapses whitespace and
/// clamps to [`MAX_TITLE_CHARS`]. Returns `None` when nothing is left.
pub fn normalize_title(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let stripped = strip_wrapping_quotes(trimmed);
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    let collapsed = collapsed.trim();
    if collapsed.is_empty() {
        return None;
    }

    let mut title = collapsed.to_string();
    if title.chars().count() > MAX_TITLE_CHARS {
        title = title.chars().take(MAX_TITLE_CHARS).collect();
        title = title.trim().to_string();
    }

    if title.is_empty() { None } else { Some(title) }
}

fn strip_wrapping_quotes(value: &str) -> &str {
    for quote in ['"', '\'', '`'] {
        if let Some(stripped) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return stripped;
        }
    }
    value
}

/// Title to show for a conversation: its own title, or a preview of the
/// first user message on the active branch.
pub fn display_title(history: &ConversationHistory) -> String {
    if let Some(title) = normalize_title(&history.title) {
        return title;
    }
    linearize(history, None)
        .into_iter()
        .filter(|message| message.role == Role::User)
        .find_map(|message| preview(&raw_text(message), MAX_PREVIEW_CHARS))
        .unwrap_or_else(|| "(untitled)".to_string())
}

fn preview(input: &str, max_chars: usize) -> Option<String> {
    let normalized = input.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        return None;
    }
    Some(truncate_text(&normalized, max_chars))
}

pub(crate) fn truncate_text(input: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    let Some((end, _)) = input.char_indices().nth(max_chars) else {
        return input.to_string();
    };
    if max_chars >= 3 {
        let truncated = input
            .chars()
            .take(max_chars.saturating_sub(3))
            .collect::<String>();
        format!("{truncated}...")
    } else {
        input[..end].to_string()
    }
}
