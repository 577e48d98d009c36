use clap::Parser;
use cws_cli::cli::Cli;
use cws_cli::logging::init_file_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cws_cli::load_config(&cli)?;
    let _log_guard = init_file_logging(&config.log_dir())?;
    cws_cli::run(cli, config).await
}
