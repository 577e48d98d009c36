//! Client-side cache of conversations and their histories.
//!
//! The store is owned by whoever drives the session (the CLI, a UI loop) and
//! passed by reference; nothing in here is global or locked.

use std::collections::HashMap;
use std::collections::HashSet;

use chrono::Utc;
use cws_protocol::AskRequest;
use cws_protocol::AskResponse;
use cws_protocol::AskResponseType;
use cws_protocol::ChatMessage;
use cws_protocol::ConversationHistory;
use cws_protocol::MessageContent;
use cws_protocol::Role;
use cws_protocol::message::TEMPORARY_ID_PREFIX;
use cws_protocol::schema::ConversationSchema;
use thiserror::Error;
use tracing::debug;
use tracing::warn;
use uuid::Uuid;

use crate::history::HistoryError;
use crate::history::validate_history;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error("ask frame carries a message but no conversation id")]
    MissingConversationId,
    #[error("conversation {conversation_id}: message `{message_id}` would become its own ancestor")]
    WouldCycle {
        conversation_id: String,
        message_id: String,
    },
}

/// What applying one ask frame changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskUpdate {
    /// The backend is waiting on or queueing the ask.
    Status {
        kind: AskResponseType,
        tip: Option<String>,
    },
    Message {
        conversation_id: String,
        message_id: String,
    },
    Failed {
        detail: String,
    },
}

#[derive(Debug)]
struct PendingAsk {
    conversation_id: Option<String>,
    new_title: Option<String>,
    message: ChatMessage,
}

#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: Vec<ConversationSchema>,
    histories: HashMap<String, ConversationHistory>,
    pending: Option<PendingAsk>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversations(&self) -> &[ConversationSchema] {
        &self.conversations
    }

    pub fn set_conversations(&mut self, conversations: Vec<ConversationSchema>) {
        self.conversations = conversations;
    }

    pub fn conversation(&self, conversation_id: &str) -> Option<&ConversationSchema> {
        self.conversations
            .iter()
            .find(|conversation| conversation.conversation_id.as_deref() == Some(conversation_id))
    }

    pub fn history(&self, conversation_id: &str) -> Option<&ConversationHistory> {
        self.histories.get(conversation_id)
    }

    /// Caches a fetched history after checking that it can be walked.
    pub fn insert_history(&mut self, history: ConversationHistory) -> Result<(), HistoryError> {
        validate_history(&history)?;
        debug!(
            conversation_id = %history.id,
            messages = history.mapping.len(),
            "caching conversation history"
        );
        self.histories.insert(history.id.clone(), history);
        Ok(())
    }

    /// Drops a conversation from the list and the history cache. Returns
    /// whether anything was removed.
    pub fn remove_conversation(&mut self, conversation_id: &str) -> bool {
        let before = self.conversations.len();
        self.conversations
            .retain(|conversation| conversation.conversation_id.as_deref() != Some(conversation_id));
        let cached = self.histories.remove(conversation_id).is_some();
        cached || before != self.conversations.len()
    }

    /// Applies a title the backend has accepted.
    pub fn rename_conversation(&mut self, conversation_id: &str, title: &str) -> bool {
        let mut renamed = false;
        for conversation in &mut self.conversations {
            if conversation.conversation_id.as_deref() == Some(conversation_id) {
                conversation.title = Some(title.to_string());
                renamed = true;
            }
        }
        if let Some(history) = self.histories.get_mut(conversation_id) {
            history.title = title.to_string();
            renamed = true;
        }
        renamed
    }

    /// Inserts a temporary user message for `request` so it can be shown
    /// before the backend answers. Returns the temporary id.
    pub fn begin_ask(&mut self, request: &AskRequest) -> String {
        self.finish_ask();

        let id = format!("{TEMPORARY_ID_PREFIX}{}", Uuid::new_v4());
        let mut message = ChatMessage {
            id: id.clone(),
            source: request.source,
            role: Role::User,
            author_name: None,
            model: Some(request.model.clone()),
            create_time: Some(Utc::now()),
            parent: request.parent.clone(),
            children: Vec::new(),
            content: Some(MessageContent::Plain(request.content.clone())),
            metadata: None,
        };

        if let Some(history) = request
            .conversation_id
            .as_deref()
            .and_then(|conversation_id| self.histories.get_mut(conversation_id))
        {
            if message.parent.is_none() {
                message.parent = history.current_node.clone();
            }
            link_child(history, &message);
            history.current_node = Some(id.clone());
            history.mapping.insert(id.clone(), message.clone());
        }

        self.pending = Some(PendingAsk {
            conversation_id: request.conversation_id.clone(),
            new_title: request.new_title.clone(),
            message,
        });
        id
    }

    /// The temporary message of the ask in flight, if any.
    pub fn pending_message(&self) -> Option<&ChatMessage> {
        self.pending.as_ref().map(|pending| &pending.message)
    }

    /// Folds one ask frame into the cache.
    pub fn apply_ask_response(&mut self, frame: &AskResponse) -> Result<AskUpdate, StoreError> {
        match frame.kind {
            AskResponseType::Waiting | AskResponseType::Queueing => {
                return Ok(AskUpdate::Status {
                    kind: frame.kind,
                    tip: frame.tip.clone(),
                });
            }
            AskResponseType::Error => {
                let detail = frame
                    .error_detail
                    .clone()
                    .or_else(|| frame.tip.clone())
                    .unwrap_or_else(|| "unknown error".to_string());
                return Ok(AskUpdate::Failed { detail });
            }
            AskResponseType::Message => {}
        }

        let Some(message) = frame.message.as_ref() else {
            warn!("message frame without a message");
            return Ok(AskUpdate::Status {
                kind: frame.kind,
                tip: frame.tip.clone(),
            });
        };
        let conversation_id = frame
            .conversation_id
            .clone()
            .or_else(|| self.pending.as_ref()?.conversation_id.clone())
            .ok_or(StoreError::MissingConversationId)?;

        if !self.histories.contains_key(&conversation_id) {
            self.start_conversation(&conversation_id, message);
        }
        let Some(history) = self.histories.get_mut(&conversation_id) else {
            return Err(StoreError::MissingConversationId);
        };

        let temporary = self
            .pending
            .as_mut()
            .map(|pending| {
                pending.conversation_id = Some(conversation_id.clone());
                pending.message.id.clone()
            })
            .filter(|id| history.mapping.contains_key(id));

        if let Some(temporary) = temporary {
            if message.role == Role::User {
                drop_message(history, &temporary);
            } else if let Some(parent) = message.parent.as_deref()
                && !history.mapping.contains_key(parent)
            {
                promote_message(history, &temporary, parent);
            }
        }

        upsert_message(history, message.clone())?;
        Ok(AskUpdate::Message {
            conversation_id,
            message_id: message.id.clone(),
        })
    }

    /// Ends the ask in flight, discarding its temporary message if the
    /// backend never acknowledged it. Returns the conversation the ask
    /// belonged to.
    pub fn finish_ask(&mut self) -> Option<String> {
        let pending = self.pending.take()?;
        let conversation_id = pending.conversation_id?;
        if let Some(history) = self.histories.get_mut(&conversation_id)
            && history.mapping.contains_key(&pending.message.id)
        {
            drop_message(history, &pending.message.id);
        }
        Some(conversation_id)
    }

    fn start_conversation(&mut self, conversation_id: &str, first: &ChatMessage) {
        debug!(conversation_id, "creating history for new conversation");
        let mut history = ConversationHistory::new(conversation_id, first.source);
        history.create_time = first.create_time;
        history.current_model = first.model.clone();
        let title = self
            .pending
            .as_ref()
            .and_then(|pending| pending.new_title.clone());

        if let Some(pending) = &self.pending
            && pending.conversation_id.is_none()
        {
            let mut message = pending.message.clone();
            message.parent = None;
            history.current_node = Some(message.id.clone());
            history.mapping.insert(message.id.clone(), message);
        }
        history.title = title.clone().unwrap_or_default();
        self.histories.insert(conversation_id.to_string(), history);

        if self.conversation(conversation_id).is_none() {
            self.conversations.insert(
                0,
                ConversationSchema {
                    id: -1,
                    source: first.source,
                    conversation_id: Some(conversation_id.to_string()),
                    title,
                    user_id: None,
                    is_valid: true,
                    current_model: first.model.clone(),
                    create_time: first.create_time,
                    update_time: first.create_time,
                },
            );
        }
    }
}

fn link_child(history: &mut ConversationHistory, message: &ChatMessage) {
    if let Some(parent) = message
        .parent
        .as_deref()
        .and_then(|parent| history.mapping.get_mut(parent))
        && !parent.children.contains(&message.id)
    {
        parent.children.push(message.id.clone());
    }
}

fn drop_message(history: &mut ConversationHistory, id: &str) {
    let Some(message) = history.mapping.remove(id) else {
        return;
    };
    if let Some(parent) = message
        .parent
        .as_deref()
        .and_then(|parent| history.mapping.get_mut(parent))
    {
        parent.children.retain(|child| child != id);
    }
    if history.current_node.as_deref() == Some(id) {
        history.current_node = message.parent;
    }
}

/// Re-keys the temporary message under the id the backend assigned to it.
fn promote_message(history: &mut ConversationHistory, temporary: &str, id: &str) {
    let Some(mut message) = history.mapping.remove(temporary) else {
        return;
    };
    debug!(temporary, id, "backend acknowledged temporary message");
    if let Some(parent) = message
        .parent
        .as_deref()
        .and_then(|parent| history.mapping.get_mut(parent))
    {
        for child in &mut parent.children {
            if child == temporary {
                *child = id.to_string();
            }
        }
    }
    if history.current_node.as_deref() == Some(temporary) {
        history.current_node = Some(id.to_string());
    }
    message.id = id.to_string();
    history.mapping.insert(id.to_string(), message);
}

fn upsert_message(
    history: &mut ConversationHistory,
    mut message: ChatMessage,
) -> Result<(), StoreError> {
    if creates_cycle(history, &message) {
        return Err(StoreError::WouldCycle {
            conversation_id: history.id.clone(),
            message_id: message.id,
        });
    }

    let mut previous_parent = None;
    if let Some(existing) = history.mapping.get(&message.id) {
        for child in &existing.children {
            if !message.children.contains(child) {
                message.children.push(child.clone());
            }
        }
        if existing.parent != message.parent {
            previous_parent = existing.parent.clone();
        }
    }
    if let Some(parent) = previous_parent
        .as_deref()
        .and_then(|parent| history.mapping.get_mut(parent))
    {
        parent.children.retain(|child| *child != message.id);
    }
    link_child(history, &message);

    history.current_node = Some(message.id.clone());
    if message.model.is_some() {
        history.current_model = message.model.clone();
    }
    if let Some(created) = message.create_time
        && history.update_time.is_none_or(|updated| updated < created)
    {
        history.update_time = Some(created);
    }
    history.mapping.insert(message.id.clone(), message);
    Ok(())
}

fn creates_cycle(history: &ConversationHistory, message: &ChatMessage) -> bool {
    let mut visited = HashSet::new();
    let mut cursor = message.parent.as_deref();
    while let Some(id) = cursor {
        if id == message.id || !visited.insert(id) {
            return true;
        }
        cursor = history
            .mapping
            .get(id)
            .and_then(|ancestor| ancestor.parent.as_deref());
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::linearize;
    use crate::test_support::history;
    use crate::test_support::message;
    use cws_protocol::ChatSource;
    use pretty_assertions::assert_eq;

    fn message_frame(conversation_id: Option<&str>, message: ChatMessage) -> AskResponse {
        AskResponse {
            kind: AskResponseType::Message,
            tip: None,
            conversation_id: conversation_id.map(str::to_string),
            message: Some(message),
            error_detail: None,
        }
    }

    fn path_ids(store: &ConversationStore, conversation_id: &str) -> Vec<String> {
        let history = store.history(conversation_id).expect("history cached");
        linearize(history, None)
            .iter()
            .map(|message| message.id.clone())
            .collect()
    }

    fn seeded_store() -> ConversationStore {
        let mut store = ConversationStore::new();
        store
            .insert_history(history(
                vec![
                    message("u1", Role::User).text("hi").build(),
                    message("a1", Role::Assistant).parent("u1").text("hello").end_turn().build(),
                ],
                "a1",
            ))
            .expect("valid history");
        store
    }

    #[test]
    fn begin_ask_links_temporary_message_under_current_node() {
        let mut store = seeded_store();
        let request =
            AskRequest::follow_up(ChatSource::OpenaiWeb, "gpt_4", "again", "conv-1", "a1");

        let temporary = store.begin_ask(&request);

        assert!(temporary.starts_with(TEMPORARY_ID_PREFIX));
        assert_eq!(
            path_ids(&store, "conv-1"),
            vec!["u1".to_string(), "a1".to_string(), temporary.clone()]
        );
        let history = store.history("conv-1").expect("history cached");
        assert_eq!(history.mapping["a1"].children, vec![temporary]);
    }

    #[test]
    fn assistant_frame_promotes_temporary_message() {
        let mut store = seeded_store();
        let request =
            AskRequest::follow_up(ChatSource::OpenaiWeb, "gpt_4", "again", "conv-1", "a1");
        store.begin_ask(&request);

        let frame = message_frame(
            Some("conv-1"),
            message("a2", Role::Assistant).parent("u2").text("partial").build(),
        );
        let update = store.apply_ask_response(&frame).expect("frame applies");
        let streamed = message_frame(
            Some("conv-1"),
            message("a2", Role::Assistant).parent("u2").text("partial and more").end_turn().build(),
        );
        store.apply_ask_response(&streamed).expect("frame applies");

        assert_eq!(
            update,
            AskUpdate::Message {
                conversation_id: "conv-1".to_string(),
                message_id: "a2".to_string(),
            }
        );
        assert_eq!(path_ids(&store, "conv-1"), vec!["u1", "a1", "u2", "a2"]);
        let history = store.history("conv-1").expect("history cached");
        assert_eq!(history.mapping["a1"].children, vec!["u2".to_string()]);
        assert_eq!(history.mapping["u2"].children, vec!["a2".to_string()]);
        assert_eq!(store.finish_ask(), Some("conv-1".to_string()));
        assert_eq!(store.history("conv-1").map(|h| h.mapping.len()), Some(4));
    }

    #[test]
    fn first_frame_of_new_conversation_creates_history() {
        let mut store = ConversationStore::new();
        let request = AskRequest::new_conversation(
            ChatSource::OpenaiApi,
            "gpt_3_5",
            "hello",
            Some("Greeting".to_string()),
        );
        store.begin_ask(&request);

        let frame = message_frame(
            Some("conv-new"),
            message("a1", Role::Assistant).api().parent("u1").text("hi!").build(),
        );
        store.apply_ask_response(&frame).expect("frame applies");

        assert_eq!(path_ids(&store, "conv-new"), vec!["u1", "a1"]);
        assert_eq!(store.conversations().len(), 1);
        assert_eq!(store.conversations()[0].title.as_deref(), Some("Greeting"));
        assert_eq!(store.history("conv-new").map(|h| h.title.as_str()), Some("Greeting"));
    }

    #[test]
    fn unacknowledged_temporary_message_is_dropped_on_finish() {
        let mut store = seeded_store();
        let request =
            AskRequest::follow_up(ChatSource::OpenaiWeb, "gpt_4", "again", "conv-1", "a1");
        store.begin_ask(&request);

        let failed = store
            .apply_ask_response(&AskResponse {
                kind: AskResponseType::Error,
                tip: None,
                conversation_id: None,
                message: None,
                error_detail: Some("rate limited".to_string()),
            })
            .expect("frame applies");
        store.finish_ask();

        assert_eq!(
            failed,
            AskUpdate::Failed {
                detail: "rate limited".to_string()
            }
        );
        assert_eq!(path_ids(&store, "conv-1"), vec!["u1", "a1"]);
        assert!(store.history("conv-1").expect("history cached").mapping["a1"].children.is_empty());
    }

    #[test]
    fn reparented_message_leaves_old_parent() {
        let mut store = ConversationStore::new();
        store
            .insert_history(history(
                vec![
                    message("u1", Role::User).text("hi").build(),
                    message("a1", Role::Assistant).parent("u1").text("hello").end_turn().build(),
                    message("u2", Role::User).parent("a1").text("again").build(),
                    message("a2", Role::Assistant).parent("u2").text("partial").build(),
                ],
                "a2",
            ))
            .expect("valid history");

        let frame = message_frame(
            Some("conv-1"),
            message("a2", Role::Assistant).parent("u1").text("moved").end_turn().build(),
        );
        store.apply_ask_response(&frame).expect("frame applies");

        let history = store.history("conv-1").expect("history cached");
        assert!(history.mapping["u2"].children.is_empty());
        assert_eq!(
            history.mapping["u1"].children,
            vec!["a1".to_string(), "a2".to_string()]
        );
        assert_eq!(path_ids(&store, "conv-1"), vec!["u1", "a2"]);
    }

    #[test]
    fn rejects_message_that_would_loop() {
        let mut store = seeded_store();
        let frame = message_frame(
            Some("conv-1"),
            message("u1", Role::User).parent("a1").text("hi").build(),
        );

        assert_eq!(
            store.apply_ask_response(&frame),
            Err(StoreError::WouldCycle {
                conversation_id: "conv-1".to_string(),
                message_id: "u1".to_string(),
            })
        );
    }

    #[test]
    fn message_frame_needs_a_conversation() {
        let mut store = ConversationStore::new();
        let frame = message_frame(None, message("a1", Role::Assistant).text("x").build());

        assert_eq!(
            store.apply_ask_response(&frame),
            Err(StoreError::MissingConversationId)
        );
    }

    #[test]
    fn insert_rejects_invalid_history() {
        let mut store = ConversationStore::new();
        let broken = history(vec![message("u1", Role::User).text("hi").build()], "gone");

        assert!(store.insert_history(broken).is_err());
        assert!(store.history("conv-1").is_none());
    }

    #[test]
    fn rename_and_remove_update_list_and_cache() {
        let mut store = seeded_store();
        store.set_conversations(vec![ConversationSchema {
            id: 7,
            source: ChatSource::OpenaiWeb,
            conversation_id: Some("conv-1".to_string()),
            title: Some("Old".to_string()),
            user_id: Some(1),
            is_valid: true,
            current_model: None,
            create_time: None,
            update_time: None,
        }]);

        assert!(store.rename_conversation("conv-1", "New"));
        assert_eq!(store.conversation("conv-1").and_then(|c| c.title.as_deref()), Some("New"));
        assert_eq!(store.history("conv-1").map(|h| h.title.as_str()), Some("New"));

        assert!(store.remove_conversation("conv-1"));
        assert!(store.conversations().is_empty());
        assert!(store.history("conv-1").is_none());
        assert!(!store.remove_conversation("conv-1"));
    }
}
