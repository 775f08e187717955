mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    // Config errors are reported by the command itself; logging falls back to defaults.
    let mut general = commands::load_config(config_path)
        .await
        .map(|(config, _)| config.general)
        .unwrap_or_default();
    if let Some(level) = &cli.log_level {
        general.log_level = level.clone();
    }
    if let Err(e) = logging::init_tracing(&general) {
        eprintln!("{} {e}", "warning:".yellow().bold());
    }
    chklog_core::metrics::describe_all();

    tracing::debug!(command = ?cli.command, "chklog starting");

    let writer = OutputWriter::new(cli.output);
    let result = match cli.command {
        Commands::Canon(args) => commands::canon::execute(args, config_path, &writer).await,
        Commands::Status(args) => commands::status::execute(args, config_path, &writer).await,
        Commands::Rules(args) => commands::rules::execute(args, config_path, &writer).await,
        Commands::Config(args) => commands::config::execute(args, config_path, &writer).await,
    };

    if let Err(e) = result {
        eprintln!("{} {e}", "error:".red().bold());
        std::process::exit(e.exit_code());
    }
}
