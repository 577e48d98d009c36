use cws_protocol::ChatMessage;
use cws_protocol::ChatSource;
use cws_protocol::Role;

/// Consecutive messages that render as one logical turn.
pub type MessageGroup<'a> = Vec<&'a ChatMessage>;

/// Partitions a linear path into turns.
///
/// User, system and `openai_api` messages stand alone. `openai_web`
/// assistant and tool messages accumulate until one of them carries
/// `end_turn: true`; that message closes the group. A group still open at
/// the end of the path is emitted as is, so flattening the result always
/// gives back `messages`.
pub fn group_messages<'a>(messages: &[&'a ChatMessage]) -> Vec<MessageGroup<'a>> {
    let mut groups = Vec::new();
    let mut open: MessageGroup<'a> = Vec::new();

    for &message in messages {
        if stands_alone(message) {
            if !open.is_empty() {
                groups.push(std::mem::take(&mut open));
            }
            groups.push(vec![message]);
            continue;
        }

        open.push(message);
        if message.end_turn() == Some(true) {
            groups.push(std::mem::take(&mut open));
        }
    }

    if !open.is_empty() {
        groups.push(open);
    }
    groups
}

fn stands_alone(message: &ChatMessage) -> bool {
    message.source == ChatSource::OpenaiApi || matches!(message.role, Role::User | Role::System)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::message;
    use pretty_assertions::assert_eq;

    fn shape(groups: &[MessageGroup<'_>]) -> Vec<Vec<String>> {
        groups
            .iter()
            .map(|group| group.iter().map(|message| message.id.clone()).collect())
            .collect()
    }

    #[test]
    fn assistant_turn_with_single_end_turn_is_one_group() {
        let messages = [
            message("a1", Role::Assistant).recipient("browser").text("search").build(),
            message("a2", Role::Assistant).recipient("browser").text("open").build(),
            message("a3", Role::Assistant).text("answer").end_turn().build(),
        ];
        let path: Vec<&ChatMessage> = messages.iter().collect();

        assert_eq!(shape(&group_messages(&path)), vec![vec!["a1", "a2", "a3"]]);
    }

    #[test]
    fn user_and_api_messages_are_singletons() {
        let messages = [
            message("sys", Role::System).text("").build(),
            message("u1", Role::User).text("q").build(),
            message("a1", Role::Assistant).api().text("one").build(),
            message("a2", Role::Assistant).api().text("two").build(),
            message("u2", Role::User).text("q2").build(),
        ];
        let path: Vec<&ChatMessage> = messages.iter().collect();

        assert_eq!(
            shape(&group_messages(&path)),
            vec![vec!["sys"], vec!["u1"], vec!["a1"], vec!["a2"], vec!["u2"]]
        );
    }

    #[test]
    fn trailing_open_group_is_flushed_and_flattening_round_trips() {
        let messages = [
            message("u1", Role::User).text("q").build(),
            message("a1", Role::Assistant).recipient("python").text("x").build(),
            message("t1", Role::Tool).author("python").text("1").build(),
            message("a2", Role::Assistant).text("done").end_turn().build(),
            message("u2", Role::User).text("q2").build(),
            message("a3", Role::Assistant).text("partial").build(),
        ];
        let path: Vec<&ChatMessage> = messages.iter().collect();

        let groups = group_messages(&path);

        assert_eq!(
            shape(&groups),
            vec![vec!["u1"], vec!["a1", "t1", "a2"], vec!["u2"], vec!["a3"]]
        );
        let flattened: Vec<&ChatMessage> = groups.into_iter().flatten().collect();
        assert_eq!(flattened, path);
    }

    #[test]
    fn user_message_closes_unterminated_turn() {
        let messages = [
            message("a1", Role::Assistant).text("cut off").build(),
            message("u1", Role::User).text("continue").build(),
        ];
        let path: Vec<&ChatMessage> = messages.iter().collect();

        assert_eq!(shape(&group_messages(&path)), vec![vec!["a1"], vec!["u1"]]);
    }
}
