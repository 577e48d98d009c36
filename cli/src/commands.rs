use std::path::Path;

use anyhow::Context;
use chrono::Utc;
use cws_client::LogQuery;
use cws_client::UploadProgress;
use cws_core::config::Theme;
use cws_core::config::persist_preferences;
use cws_core::export::export_history_as_json;
use cws_core::export::export_history_as_markdown;
use cws_core::files::UploadRoute;
use cws_core::files::file_category;
use cws_core::files::guess_mime_type;
use cws_core::files::is_accepted_mime_type;
use cws_core::files::upload_use_case;
use cws_core::history::build_display_groups;
use cws_core::history::validate_history;
use cws_core::title::normalize_title;
use cws_core::validation::validate_password;
use cws_core::validation::validate_username;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::warn;

use crate::CommandContext;
use crate::cli::AdminCommand;
use crate::cli::ExportFormat;
use crate::render;

pub(crate) async fn login(
    ctx: &CommandContext,
    username: &str,
    password: Option<String>,
) -> anyhow::Result<()> {
    validate_username(username)?;
    let password = match password {
        Some(password) => password,
        None => read_password_from_stdin().await?,
    };
    validate_password(&password, true)?;

    ctx.client
        .login(username, &password)
        .await
        .context("login failed")?;
    ctx.session
        .save(&ctx.client)
        .await
        .context("failed to save the session")?;
    println!("Logged in as {username}.");
    Ok(())
}

async fn read_password_from_stdin() -> anyhow::Result<String> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let line = lines
        .next_line()
        .await
        .context("failed to read password from stdin")?
        .unwrap_or_default();
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub(crate) async fn logout(ctx: &CommandContext) -> anyhow::Result<()> {
    if ctx.client.has_login_cookie()
        && let Err(err) = ctx.client.logout().await
    {
        warn!("logout request failed: {err}");
    }
    ctx.session
        .clear()
        .await
        .context("failed to remove the saved session")?;
    println!("Logged out.");
    Ok(())
}

pub(crate) async fn me(ctx: &CommandContext) -> anyhow::Result<()> {
    ctx.require_login()?;
    let user = ctx.client.me().await.context("failed to load user")?;
    println!("{}", render::render_user(&user));
    Ok(())
}

pub(crate) async fn conversations(ctx: &CommandContext) -> anyhow::Result<()> {
    ctx.require_login()?;
    let rows = ctx
        .client
        .conversations()
        .await
        .context("failed to list conversations")?;
    print!("{}", render::render_conversations(&rows, Utc::now()));
    Ok(())
}

pub(crate) async fn show(
    ctx: &CommandContext,
    conversation_id: &str,
    node: Option<&str>,
    raw: bool,
) -> anyhow::Result<()> {
    ctx.require_login()?;
    let history = ctx
        .client
        .conversation_history(conversation_id)
        .await
        .with_context(|| format!("failed to load conversation {conversation_id}"))?;
    validate_history(&history)?;

    let groups = build_display_groups(&history, node);
    if raw {
        println!("{}", serde_json::to_string_pretty(&groups)?);
    } else {
        print!("{}", render::render_groups(&groups));
    }
    Ok(())
}

pub(crate) async fn export(
    ctx: &CommandContext,
    conversation_id: &str,
    format: ExportFormat,
    out: &Path,
    node: Option<&str>,
) -> anyhow::Result<()> {
    ctx.require_login()?;
    let history = ctx
        .client
        .conversation_history(conversation_id)
        .await
        .with_context(|| format!("failed to load conversation {conversation_id}"))?;

    let written = match format {
        ExportFormat::Md => export_history_as_markdown(&history, node, out).await,
        ExportFormat::Json => export_history_as_json(&history, node, out).await,
    }
    .with_context(|| format!("failed to write {}", out.display()))?;
    println!("Exported {written} messages to {}.", out.display());
    Ok(())
}

pub(crate) async fn rename(
    ctx: &CommandContext,
    conversation_id: &str,
    title: &str,
) -> anyhow::Result<()> {
    ctx.require_login()?;
    let Some(title) = normalize_title(title) else {
        anyhow::bail!("title must not be empty");
    };
    let row = ctx
        .client
        .rename_conversation(conversation_id, &title)
        .await
        .context("failed to rename conversation")?;
    println!(
        "Renamed {conversation_id} to \"{}\".",
        row.title.as_deref().unwrap_or(&title)
    );
    Ok(())
}

pub(crate) async fn delete(
    ctx: &CommandContext,
    conversation_id: &str,
    vanish: bool,
) -> anyhow::Result<()> {
    ctx.require_login()?;
    let result = if vanish {
        ctx.client.vanish_conversation(conversation_id).await
    } else {
        ctx.client.delete_conversation(conversation_id).await
    };
    result.with_context(|| format!("failed to delete conversation {conversation_id}"))?;
    println!("Deleted {conversation_id}.");
    Ok(())
}

pub(crate) async fn upload(ctx: &CommandContext, path: &Path) -> anyhow::Result<()> {
    ctx.require_login()?;
    let size = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("failed to stat {}", path.display()))?
        .len();
    let mime_type = guess_mime_type(path);
    if !is_accepted_mime_type(&mime_type) {
        anyhow::bail!("{} ({mime_type}) is not an accepted file type", path.display());
    }
    let Some(route) = ctx
        .config
        .upload_strategy
        .route(size, ctx.config.upload_size_threshold)
    else {
        anyhow::bail!("uploads are disabled by the configured upload strategy");
    };

    let info = match route {
        UploadRoute::Server => ctx.client.upload_local(path, &mime_type).await,
        UploadRoute::Direct => {
            let (tx, mut rx) = mpsc::unbounded_channel::<UploadProgress>();
            let reporter = tokio::spawn(async move {
                while let Some(progress) = rx.recv().await {
                    eprint!("\rUploading... {}%", progress.percent());
                }
                eprintln!();
            });
            let result = ctx
                .client
                .upload_to_web(path, &mime_type, upload_use_case(&mime_type), Some(tx))
                .await;
            let _ = reporter.await;
            result
        }
    }
    .with_context(|| format!("failed to upload {}", path.display()))?;

    println!(
        "Uploaded {} ({}, {} bytes) as {}.",
        info.original_filename,
        file_category(&mime_type),
        info.size,
        info.id
    );
    Ok(())
}

pub(crate) async fn status(ctx: &CommandContext) -> anyhow::Result<()> {
    let status = ctx
        .client
        .common_status()
        .await
        .context("failed to load status")?;
    println!("{}", render::render_status(&status));
    Ok(())
}

pub(crate) async fn admin(ctx: &CommandContext, command: AdminCommand) -> anyhow::Result<()> {
    ctx.require_login()?;
    match command {
        AdminCommand::Users => {
            let users = ctx.client.users().await.context("failed to list users")?;
            for user in &users {
                println!("{}", render::render_user(user));
            }
        }
        AdminCommand::Config => {
            let config = ctx
                .client
                .system_config()
                .await
                .context("failed to load system config")?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        AdminCommand::Logs { lines, proxy } => {
            let query = LogQuery {
                max_lines: lines,
                exclude_keywords: None,
            };
            let logs = if proxy {
                ctx.client.proxy_logs(&query).await
            } else {
                ctx.client.server_logs(&query).await
            }
            .context("failed to load logs")?;
            for line in logs {
                println!("{line}");
            }
        }
        AdminCommand::Stats { granularity } => {
            let requests = ctx
                .client
                .request_stats(granularity)
                .await
                .context("failed to load request stats")?;
            let asks = ctx
                .client
                .ask_stats(granularity)
                .await
                .context("failed to load ask stats")?;
            let stats = serde_json::json!({ "requests": requests, "asks": asks });
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}

pub(crate) fn prefs(
    ctx: &CommandContext,
    theme: Option<Theme>,
    language: Option<String>,
) -> anyhow::Result<()> {
    let mut preferences = ctx.config.preferences.clone();
    if theme.is_none() && language.is_none() {
        println!(
            "theme = {}\nlanguage = {}",
            preferences.theme, preferences.language
        );
        return Ok(());
    }
    if let Some(theme) = theme {
        preferences.theme = theme;
    }
    if let Some(language) = language {
        preferences.language = language;
    }
    persist_preferences(&ctx.config.cws_home, &preferences)
        .context("failed to save preferences")?;
    println!("Preferences saved.");
    Ok(())
}
