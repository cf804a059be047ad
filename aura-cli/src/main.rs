//! AURA Swarm CLI entry point.

use aura_cli::{logging, monitor_view, App, Cli, CliConfig, CliError, Command};
use clap::Parser;
use crossterm::style::Stylize;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the command succeeded.
async fn run(cli: Cli) -> Result<bool, CliError> {
    let config = CliConfig::load(cli.config.as_deref())?;
    logging::init(cli.log_json || config.log_json)?;

    if let Command::Monitor = cli.command {
        monitor_view::run(&config).await?;
        return Ok(true);
    }

    let app = App::connect(&config).await?;
    let report = app.run(cli.command).await?;
    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        println!("{}", report.to_text());
    }
    Ok(report.is_success())
}
