use std::collections::HashSet;

use cws_protocol::ChatMessage;
use cws_protocol::ConversationHistory;
use tracing::warn;

/// Returns the messages on the path from the root to `last_node`, oldest
/// first.
///
/// `last_node` defaults to the history's `current_node`. The walk stops at
/// the first id that is missing from the mapping or whose content is absent,
/// so a broken branch yields the messages below the break. An unknown start
/// id yields an empty path.
pub fn linearize<'a>(
    history: &'a ConversationHistory,
    last_node: Option<&str>,
) -> Vec<&'a ChatMessage> {
    let mut path = Vec::new();
    let mut visited = HashSet::new();
    let mut cursor = last_node.or(history.current_node.as_deref());

    while let Some(id) = cursor {
        if !visited.insert(id) {
            warn!(
                conversation_id = %history.id,
                message_id = id,
                "parent chain revisits a message; truncating path"
            );
            break;
        }
        let Some(message) = history.mapping.get(id) else {
            break;
        };
        if message.content.is_none() {
            break;
        }
        path.push(message);
        cursor = message.parent.as_deref();
    }

    path.reverse();
    path
}
