//! Message bodies as markdown source.

mod citation;
mod math;
mod raw;

pub use citation::apply_citations;
pub use math::rewrite_math_delimiters;
pub use raw::content_raw_text;
pub use raw::raw_text;

use cws_protocol::ChatMessage;
use cws_protocol::MessageMetadata;
use cws_protocol::Role;

/// Markdown source for a message: raw text, with citation markers for
/// assistant messages, and math delimiters the renderer understands.
pub fn display_text(message: &ChatMessage) -> String {
    let raw = raw_text(message);
    let citations = message
        .metadata
        .as_ref()
        .map(MessageMetadata::citations)
        .unwrap_or_default();
    let cited = if message.role == Role::Assistant && !citations.is_empty() {
        apply_citations(&raw, citations)
    } else {
        raw
    };
    rewrite_math_delimiters(&cited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::message;
    use cws_protocol::Citation;
    use pretty_assertions::assert_eq;

    #[test]
    fn assistant_text_gets_citations_and_math() {
        let message = message("a1", Role::Assistant)
            .text(r"Euler: \(e^{i\pi}+1=0\)")
            .citations(vec![Citation {
                start_ix: Some(0),
                end_ix: Some(5),
                metadata: None,
            }])
            .build();

        assert_eq!(
            display_text(&message),
            "<cite data-citation=\"{}\">Euler</cite>: $e^{i\\pi}+1=0$"
        );
    }

    #[test]
    fn user_text_ignores_citations() {
        let message = message("u1", Role::User)
            .text("plain question")
            .citations(vec![Citation {
                start_ix: Some(0),
                end_ix: Some(5),
                metadata: None,
            }])
            .build();

        assert_eq!(display_text(&message), "plain question");
    }
}
