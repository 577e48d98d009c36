//! Plain-text rendering of backend data for the terminal.

use std::fmt::Write as _;

use chrono::DateTime;
use chrono::Utc;
use cws_client::ClientNotice;
use cws_core::DisplayGroup;
use cws_core::DisplayItem;
use cws_core::time::relative_time;
use cws_protocol::schema::CommonStatus;
use cws_protocol::schema::ConversationSchema;
use cws_protocol::schema::UserRead;

pub fn render_conversations(rows: &[ConversationSchema], now: DateTime<Utc>) -> String {
    let mut rows: Vec<&ConversationSchema> = rows.iter().collect();
    rows.sort_by_key(|row| std::cmp::Reverse(row.update_time));

    let mut out = String::new();
    for row in rows {
        let id = row.conversation_id.as_deref().unwrap_or("-");
        let title = row.title.as_deref().unwrap_or("(untitled)");
        let updated = row
            .update_time
            .map(|at| relative_time(at, now).to_string())
            .unwrap_or_default();
        let _ = writeln!(out, "{id}  {title}  [{}]  {updated}", row.source);
    }
    out
}

pub fn render_groups(groups: &[DisplayGroup<'_>]) -> String {
    let mut out = String::new();
    for group in groups {
        let role = group
            .role()
            .map(|role| role.to_string())
            .unwrap_or_default();
        match group.display_type {
            Some(display_type) => {
                let _ = writeln!(out, "[{role}/{display_type}]");
            }
            None => {
                let _ = writeln!(out, "[{role}]");
            }
        }
        out.push_str(&render_items(&group.items()));
        out.push('\n');
    }
    out
}

pub fn render_items(items: &[DisplayItem]) -> String {
    let mut out = String::new();
    for item in items {
        match item {
            DisplayItem::Text { content, .. } => {
                let _ = writeln!(out, "{content}");
            }
            DisplayItem::PluginCall {
                recipient,
                request,
                response,
                ..
            } => {
                let _ = writeln!(out, "> {recipient}: {request}");
                if let Some(response) = response {
                    let _ = writeln!(out, "< {response}");
                }
            }
            DisplayItem::Image { url, prompt } => {
                let _ = writeln!(out, "![{}]({url})", prompt.as_deref().unwrap_or("image"));
            }
            DisplayItem::Block { kind, content, .. } => {
                let _ = writeln!(out, "```{kind}\n{content}\n```");
            }
        }
    }
    out
}

pub fn render_user(user: &UserRead) -> String {
    let mut out = format!("{} (id {})", user.username, user.id);
    if let Some(nickname) = user.nickname.as_deref() {
        let _ = write!(out, " \"{nickname}\"");
    }
    if user.is_superuser {
        out.push_str(" [admin]");
    }
    if !user.is_active {
        out.push_str(" [inactive]");
    }
    out
}

pub fn render_status(status: &CommonStatus) -> String {
    let count = |value: Option<u64>| value.map_or_else(|| "?".to_string(), |v| v.to_string());
    let busy = match status.is_chatbot_busy {
        Some(true) => "busy",
        Some(false) => "idle",
        None => "unknown",
    };
    format!(
        "active users: {} (5m) {} (1h) {} (1d)\nchatbot: {busy}, {} waiting",
        count(status.active_user_in_5m),
        count(status.active_user_in_1h),
        count(status.active_user_in_1d),
        count(status.chatbot_waiting_count),
    )
}

pub fn render_notice(notice: &ClientNotice) -> String {
    match notice {
        ClientNotice::Error(message) => format!("error: {message}"),
        ClientNotice::LoginExpired => {
            "Your session has expired. Run `cws login <username>` again.".to_string()
        }
    }
}
