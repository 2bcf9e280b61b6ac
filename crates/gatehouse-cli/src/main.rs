//! Gatehouse checker
//!
//! Loads a policy document and a request fixture, then reports what the
//! policy decides for that request.

use anyhow::Result;
use clap::Parser;
use gatehouse_cli::cli::{Cli, Commands};
use gatehouse_cli::commands;
use gatehouse_cli::config::CheckConfig;
use std::process::ExitCode;
use tracing::debug;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let config = CheckConfig::load(&cli.config, &cli)?;
    debug!(
        policy = %config.policy_path,
        request = %config.request_path,
        "configuration loaded"
    );

    let mut stdout = std::io::stdout().lock();
    match &cli.command {
        Commands::Check { .. } => {
            if commands::check(&config, &mut stdout)? {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::Validate { profile, actions } => {
            commands::validate(&config, profile, actions, &mut stdout)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Lint => {
            commands::lint(&config, &mut stdout)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("gatehouse=debug")
    } else {
        EnvFilter::try_from_env("GATEHOUSE_LOG").unwrap_or_else(|_| EnvFilter::new("gatehouse=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
