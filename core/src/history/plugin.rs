use cws_protocol::ChatMessage;
use cws_protocol::Role;
use serde::Serialize;
use tracing::debug;

use crate::text::raw_text;

/// One plugin invocation: the assistant's request and the tool's reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginAction {
    /// The request's recipient, e.g. `weather.get_forecast`.
    pub plugin_name: String,
    pub request: String,
    pub response: String,
}

/// Pairs a plugin group two messages at a time into request/response
/// actions. Pairs that are not (assistant, tool) are skipped, as is a
/// trailing request still waiting for its reply.
pub fn split_plugin_actions(group: &[&ChatMessage]) -> Vec<PluginAction> {
    let mut actions = Vec::new();
    for pair in group.chunks(2) {
        let [request, response] = pair else {
            debug!(message_id = %pair[0].id, "plugin request without a response");
            continue;
        };
        if request.role != Role::Assistant || response.role != Role::Tool {
            debug!(
                request_id = %request.id,
                response_id = %response.id,
                "skipping plugin pair with unexpected roles"
            );
            continue;
        }
        actions.push(PluginAction {
            plugin_name: request.recipient().unwrap_or_default().to_string(),
            request: raw_text(request),
            response: raw_text(response),
        });
    }
    actions
}
