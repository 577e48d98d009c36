//! Builders for message trees used across the unit tests.

use cws_protocol::ChatMessage;
use cws_protocol::ChatSource;
use cws_protocol::Citation;
use cws_protocol::Content;
use cws_protocol::ConversationHistory;
use cws_protocol::MessageContent;
use cws_protocol::MessageMetadata;
use cws_protocol::Role;
use cws_protocol::WebMessageMetadata;

pub(crate) struct MessageBuilder {
    message: ChatMessage,
}

pub(crate) fn message(id: &str, role: Role) -> MessageBuilder {
    MessageBuilder {
        message: ChatMessage {
            id: id.to_string(),
            source: ChatSource::OpenaiWeb,
            role,
            author_name: None,
            model: None,
            create_time: None,
            parent: None,
            children: Vec::new(),
            content: None,
            metadata: None,
        },
    }
}

impl MessageBuilder {
    pub(crate) fn api(mut self) -> Self {
        self.message.source = ChatSource::OpenaiApi;
        self
    }

    pub(crate) fn parent(mut self, parent: &str) -> Self {
        self.message.parent = Some(parent.to_string());
        self
    }

    pub(crate) fn text(self, text: &str) -> Self {
        self.content(Content::text_parts(vec![text.to_string()]))
    }

    pub(crate) fn plain(mut self, text: &str) -> Self {
        self.message.content = Some(MessageContent::Plain(text.to_string()));
        self
    }

    pub(crate) fn content(mut self, content: Content) -> Self {
        self.message.content = Some(MessageContent::Typed(content));
        self
    }

    pub(crate) fn author(mut self, name: &str) -> Self {
        self.message.author_name = Some(name.to_string());
        self
    }

    pub(crate) fn model(mut self, model: &str) -> Self {
        self.message.model = Some(model.to_string());
        self
    }

    pub(crate) fn recipient(mut self, recipient: &str) -> Self {
        self.web_metadata().recipient = Some(recipient.to_string());
        self
    }

    pub(crate) fn end_turn(mut self) -> Self {
        self.web_metadata().end_turn = Some(true);
        self
    }

    pub(crate) fn citations(mut self, citations: Vec<Citation>) -> Self {
        self.web_metadata().citations = Some(citations);
        self
    }

    pub(crate) fn created_at(mut self, rfc3339: &str) -> Self {
        self.message.create_time = cws_protocol::timestamp::parse_timestamp(rfc3339);
        self
    }

    pub(crate) fn build(self) -> ChatMessage {
        self.message
    }

    fn web_metadata(&mut self) -> &mut WebMessageMetadata {
        let metadata = self
            .message
            .metadata
            .get_or_insert_with(|| MessageMetadata::OpenaiWeb(Box::default()));
        match metadata {
            MessageMetadata::OpenaiWeb(meta) => meta,
            MessageMetadata::OpenaiApi(_) => panic!("api messages carry no web metadata"),
        }
    }
}

/// Assembles a history from `messages`, wiring `children` from each
/// message's `parent`.
pub(crate) fn history(messages: Vec<ChatMessage>, current_node: &str) -> ConversationHistory {
    let mut history = ConversationHistory::new("conv-1", ChatSource::OpenaiWeb);
    for message in messages {
        history.mapping.insert(message.id.clone(), message);
    }
    let links: Vec<(String, String)> = history
        .mapping
        .values()
        .filter_map(|message| Some((message.parent.clone()?, message.id.clone())))
        .collect();
    for (parent, child) in links {
        if let Some(parent) = history.mapping.get_mut(&parent) {
            parent.children.push(child);
        }
    }
    history.current_node = Some(current_node.to_string());
    history
}
