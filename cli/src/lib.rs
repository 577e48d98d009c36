//! The `cws` command-line client.

mod ask;
pub mod cli;
mod commands;
pub mod logging;
mod render;

use anyhow::Context;
use cws_client::ApiClient;
use cws_client::ClientNotice;
use cws_client::SessionFile;
use cws_core::Config;
use cws_core::config::find_cws_home;
use tokio::sync::mpsc;
use tracing::info;

use crate::cli::Cli;
use crate::cli::Command;

/// Everything a command needs: resolved config, the HTTP client and the
/// session file backing its cookies.
pub(crate) struct CommandContext {
    pub(crate) config: Config,
    pub(crate) client: ApiClient,
    pub(crate) session: SessionFile,
}

impl CommandContext {
    /// Fails unless a login cookie was restored.
    pub(crate) fn require_login(&self) -> anyhow::Result<()> {
        if self.client.has_login_cookie() {
            return Ok(());
        }
        anyhow::bail!("not logged in; run `cws login <username>` first")
    }
}

/// Config from `--config`, `$CWS_HOME` or `~/.cws`, with CLI overrides applied.
pub fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let cws_home = match &cli.config_dir {
        Some(dir) => dir.clone(),
        None => find_cws_home().context("failed to locate the cws home directory")?,
    };
    let mut config = Config::load(&cws_home).context("failed to load configuration")?;
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    Ok(config)
}

pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    let (notice_tx, mut notice_rx) = mpsc::unbounded_channel();
    let client = ApiClient::new(&config.base_url)
        .with_context(|| format!("invalid base url `{}`", config.base_url))?
        .with_notices(notice_tx);
    let session = SessionFile::new(config.session_path());
    session
        .restore(&client)
        .await
        .context("failed to restore the saved session")?;

    let ctx = CommandContext {
        config,
        client,
        session,
    };
    let result = dispatch(&ctx, cli.command).await;

    for line in drain_notices(&mut notice_rx, &ctx.session).await? {
        eprintln!("{line}");
    }
    result
}

/// Renders every queued notice; an expired login also clears the saved
/// session.
async fn drain_notices(
    notices: &mut mpsc::UnboundedReceiver<ClientNotice>,
    session: &SessionFile,
) -> anyhow::Result<Vec<String>> {
    let mut lines = Vec::new();
    while let Ok(notice) = notices.try_recv() {
        if notice == ClientNotice::LoginExpired {
            info!("session expired; clearing saved cookies");
            session
                .clear()
                .await
                .context("failed to clear the expired session")?;
        }
        lines.push(render::render_notice(&notice));
    }
    Ok(lines)
}

async fn dispatch(ctx: &CommandContext, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Login { username, password } => {
            commands::login(ctx, &username, password).await
        }
        Command::Logout => commands::logout(ctx).await,
        Command::Me => commands::me(ctx).await,
        Command::Conversations => commands::conversations(ctx).await,
        Command::Show {
            conversation_id,
            node,
            raw,
        } => commands::show(ctx, &conversation_id, node.as_deref(), raw).await,
        Command::Export {
            conversation_id,
            format,
            out,
            node,
        } => commands::export(ctx, &conversation_id, format, &out, node.as_deref()).await,
        Command::Rename {
            conversation_id,
            title,
        } => commands::rename(ctx, &conversation_id, &title).await,
        Command::Delete {
            conversation_id,
            vanish,
        } => commands::delete(ctx, &conversation_id, vanish).await,
        Command::Ask(args) => ask::run_ask(ctx, args).await,
        Command::Upload { path } => commands::upload(ctx, &path).await,
        Command::Status => commands::status(ctx).await,
        Command::Admin(admin) => commands::admin(ctx, admin).await,
        Command::Prefs { theme, language } => commands::prefs(ctx, theme, language),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[test]
    fn base_url_flag_overrides_config_file() {
        let home = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            home.path().join("config.toml"),
            "base_url = \"http://from-file/api\"\n",
        )
        .expect("write config");
        let home_arg = home.path().to_string_lossy().into_owned();

        let cli = Cli::try_parse_from(["cws", "--config", &home_arg, "status"]).expect("cli");
        let config = load_config(&cli).expect("config");
        assert_eq!(config.base_url, "http://from-file/api");
        assert_eq!(config.cws_home, home.path());

        let cli = Cli::try_parse_from([
            "cws",
            "--config",
            &home_arg,
            "--base-url",
            "http://flag/api",
            "status",
        ])
        .expect("cli");
        assert_eq!(load_config(&cli).expect("config").base_url, "http://flag/api");
    }

    #[tokio::test]
    async fn notices_are_rendered_and_expiry_clears_session() {
        let home = tempfile::tempdir().expect("tempdir");
        let session_path = home.path().join("session.json");
        std::fs::write(&session_path, "{}").expect("write session");
        let session = SessionFile::new(&session_path);

        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(ClientNotice::Error("403: errors.noPermission".to_string()))
            .expect("send");
        tx.send(ClientNotice::LoginExpired).expect("send");

        let lines = drain_notices(&mut rx, &session).await.expect("drain");

        assert_eq!(
            lines,
            vec![
                "error: 403: errors.noPermission".to_string(),
                "Your session has expired. Run `cws login <username>` again.".to_string(),
            ]
        );
        assert!(!session_path.exists());
    }
}
