//! Sheetwise CLI - extract connector attributes from PDF datasheets.

use clap::Parser;
use sheetwise_cli::commands;
use sheetwise_cli::{Cli, Command, Config, Formatter};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info,sheetwise=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so JSON output stays machine-readable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

async fn run() -> sheetwise_cli::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = Config::path(cli.config.as_deref())?;
    let config = Config::load(&config_path)?;

    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        Command::Ingest(args) => commands::execute_ingest(args, &config, &formatter).await?,
        Command::Extract(args) => {
            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Interrupt received, stopping after the current attribute");
                    on_signal.cancel();
                }
            });
            commands::execute_extract(args, &config, &formatter, &cancel).await?;
        }
        Command::Search(args) => commands::execute_search(args, &config, &formatter).await?,
        Command::Attributes(args) => commands::execute_attributes(args, &formatter).await?,
        Command::Config(args) => {
            commands::execute_config(args, &config, &config_path, &formatter).await?
        }
    }

    Ok(())
}
