use anyhow::Context;
use cws_client::StreamOutcome;
use cws_client::websocket_url;
use cws_core::AskUpdate;
use cws_core::ConversationStore;
use cws_core::history::build_display_groups;
use cws_core::title::normalize_title;
use cws_protocol::AskRequest;
use cws_protocol::AskResponse;
use cws_protocol::Role;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing::warn;

use crate::CommandContext;
use crate::cli::AskArgs;
use crate::render::render_items;

/// Tracks what the frames of one ask have produced so far.
#[derive(Debug, Default)]
struct AskProgress {
    last_message: Option<(String, String)>,
    failure: Option<String>,
    statuses: Vec<String>,
}

impl AskProgress {
    fn apply(&mut self, store: &mut ConversationStore, frame: &AskResponse) {
        match store.apply_ask_response(frame) {
            Ok(AskUpdate::Status { kind, tip }) => {
                let status = match tip {
                    Some(tip) => format!("{kind}: {tip}"),
                    None => kind.to_string(),
                };
                eprintln!("[{status}]");
                self.statuses.push(status);
            }
            Ok(AskUpdate::Message {
                conversation_id,
                message_id,
            }) => {
                self.last_message = Some((conversation_id, message_id));
            }
            Ok(AskUpdate::Failed { detail }) => {
                self.failure = Some(detail);
            }
            Err(err) => {
                warn!("ignoring ask frame: {err}");
            }
        }
    }
}

fn build_request(args: &AskArgs, parent: Option<String>) -> anyhow::Result<AskRequest> {
    let request = match (&args.conversation, parent) {
        (Some(conversation_id), Some(parent)) => AskRequest::follow_up(
            args.source,
            &args.model,
            &args.message,
            conversation_id,
            parent,
        ),
        (Some(conversation_id), None) => {
            anyhow::bail!("conversation {conversation_id} has no message to reply to")
        }
        (None, _) => AskRequest::new_conversation(
            args.source,
            &args.model,
            &args.message,
            args.title.as_deref().and_then(normalize_title),
        ),
    };
    request.validate()?;
    Ok(request)
}

pub(crate) async fn run_ask(ctx: &CommandContext, args: AskArgs) -> anyhow::Result<()> {
    ctx.require_login()?;

    let mut store = ConversationStore::new();
    let mut parent = args.parent.clone();
    if let Some(conversation_id) = &args.conversation {
        let history = ctx
            .client
            .conversation_history(conversation_id)
            .await
            .with_context(|| format!("failed to load conversation {conversation_id}"))?;
        if parent.is_none() {
            parent = history.current_node.clone();
        }
        store.insert_history(history)?;
    }
    let request = build_request(&args, parent)?;
    store.begin_ask(&request);

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let mut progress = AskProgress::default();
    let on_frame = |frame: AskResponse| progress.apply(&mut store, &frame);
    let outcome = if args.websocket {
        let url = websocket_url(ctx.client.base_url(), ctx.config.websocket_url.as_deref())?;
        info!(%url, "asking over websocket");
        ctx.client
            .ask_websocket(&request, &url, &cancel, on_frame)
            .await
    } else {
        ctx.client.ask_stream(&request, &cancel, on_frame).await
    };
    ctrl_c.abort();
    store.finish_ask();

    let outcome = outcome.context("ask failed")?;
    if let Some(detail) = progress.failure {
        anyhow::bail!("ask failed: {detail}");
    }
    let cancelled = matches!(outcome, StreamOutcome::Cancelled { .. });
    if cancelled {
        eprintln!("Cancelled.");
    }

    let Some((conversation_id, message_id)) = progress.last_message else {
        return Ok(());
    };
    if let Some(history) = store.history(&conversation_id) {
        let groups = build_display_groups(history, Some(&message_id));
        if let Some(reply) = groups.last()
            && reply.role() != Some(Role::User)
        {
            print!("{}", render_items(&reply.items()));
        }
    }
    println!("\nconversation: {conversation_id}  message: {message_id}");

    if request.new_conversation && request.new_title.is_none() && !cancelled {
        match ctx
            .client
            .generate_title(&conversation_id, &message_id)
            .await
        {
            Ok(row) => {
                if let Some(title) = row.title {
                    println!("title: {title}");
                }
            }
            Err(err) => warn!("failed to generate title: {err}"),
        }
    }
    Ok(())
}
