use std::collections::HashMap;

use cws_protocol::ConversationHistory;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("conversation {conversation_id}: current node `{node}` is not in the mapping")]
    MissingCurrentNode {
        conversation_id: String,
        node: String,
    },
    #[error("conversation {conversation_id}: parent chain loops through `{node}`")]
    ParentCycle {
        conversation_id: String,
        node: String,
    },
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

/// Checks that `current_node` resolves and that every parent chain ends.
///
/// Each message is visited once; chains that reach an already verified
/// message stop there.
pub fn validate_history(history: &ConversationHistory) -> Result<(), HistoryError> {
    if let Some(node) = history.current_node.as_deref()
        && !history.mapping.contains_key(node)
    {
        return Err(HistoryError::MissingCurrentNode {
            conversation_id: history.id.clone(),
            node: node.to_string(),
        });
    }

    let mut state: HashMap<&str, Visit> = HashMap::with_capacity(history.mapping.len());
    for start in history.mapping.keys() {
        let mut chain = Vec::new();
        let mut cursor = Some(start.as_str());
        while let Some(id) = cursor {
            match state.get(id) {
                Some(Visit::Done) => break,
                Some(Visit::InProgress) => {
                    return Err(HistoryError::ParentCycle {
                        conversation_id: history.id.clone(),
                        node: id.to_string(),
                    });
                }
                None => {}
            }
            let Some(message) = history.mapping.get(id) else {
                break;
            };
            state.insert(id, Visit::InProgress);
            chain.push(id);
            cursor = message.parent.as_deref();
        }
        for id in chain {
            state.insert(id, Visit::Done);
        }
    }
    Ok(())
}
