use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use cws_core::config::Theme;
use cws_protocol::ChatSource;

#[derive(Debug, Parser)]
#[command(name = "cws", version, about = "Command-line client for the chat-service backend")]
pub struct Cli {
    /// REST base URL, including the API prefix. Overrides `base_url` in config.toml.
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Directory holding config.toml, the session and logs. Defaults to
    /// `$CWS_HOME` or `~/.cws`.
    #[arg(long = "config", global = true, value_name = "PATH")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and keep the session cookie for later commands.
    Login {
        username: String,
        /// Read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,
    },
    Logout,
    /// Show the logged-in user.
    Me,
    /// List conversations, most recently updated first.
    Conversations,
    /// Print the active branch of a conversation.
    Show {
        conversation_id: String,
        /// Render the branch ending at this message instead of the current node.
        #[arg(long, value_name = "ID")]
        node: Option<String>,
        /// Dump display groups as JSON.
        #[arg(long, default_value_t = false)]
        raw: bool,
    },
    /// Save a conversation as markdown or JSON.
    Export {
        conversation_id: String,
        #[arg(long, value_enum, default_value_t = ExportFormat::Md)]
        format: ExportFormat,
        #[arg(long, value_name = "PATH")]
        out: PathBuf,
        #[arg(long, value_name = "ID")]
        node: Option<String>,
    },
    Rename {
        conversation_id: String,
        title: String,
    },
    Delete {
        conversation_id: String,
        /// Also remove it from the upstream provider.
        #[arg(long, default_value_t = false)]
        vanish: bool,
    },
    /// Send a message and stream the reply. Ctrl-C cancels.
    Ask(AskArgs),
    /// Upload a file using the configured upload strategy.
    Upload { path: PathBuf },
    /// Backend load and queue status.
    Status,
    #[command(subcommand)]
    Admin(AdminCommand),
    /// Show or change display preferences.
    Prefs {
        #[arg(long)]
        theme: Option<Theme>,
        #[arg(long)]
        language: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct AskArgs {
    pub message: String,

    /// Continue this conversation instead of starting a new one.
    #[arg(long, value_name = "ID")]
    pub conversation: Option<String>,

    /// Message to reply to; defaults to the conversation's current node.
    #[arg(long, value_name = "ID", requires = "conversation")]
    pub parent: Option<String>,

    #[arg(long, default_value = "gpt_3_5")]
    pub model: String,

    #[arg(long, default_value = "openai_api")]
    pub source: ChatSource,

    /// Title for a new conversation.
    #[arg(long, conflicts_with = "conversation")]
    pub title: Option<String>,

    /// Use the WebSocket endpoint instead of the NDJSON stream.
    #[arg(long, default_value_t = false)]
    pub websocket: bool,
}

#[derive(Debug, Subcommand)]
pub enum AdminCommand {
    Users,
    Config,
    Logs {
        #[arg(long, default_value_t = 100)]
        lines: u32,
        /// Proxy logs instead of server logs.
        #[arg(long, default_value_t = false)]
        proxy: bool,
    },
    /// Request and ask counts bucketed by `granularity` seconds.
    Stats {
        #[arg(long, default_value_t = 3600)]
        granularity: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Md,
    Json,
}
