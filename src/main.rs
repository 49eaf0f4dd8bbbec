//! VersionLens - Audit and repair the version refs and releases of a GitHub Action
//!
//! This is the main entry point for the CLI application.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use versionlens::cli::commands::{self, GlobalArgs};
use versionlens::cli::{exit_codes, Cli, Commands};
use versionlens::VersionLensError;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(exit_codes::INVALID_ARGS);
        }
        // --help and --version
        Err(e) => e.exit(),
    };

    setup_logging(cli.verbose);

    let global = GlobalArgs {
        config: cli.config,
        directory: cli.directory,
        repo: cli.repo,
        settings: cli.settings,
    };

    let result = match cli.command {
        Commands::Check(args) => commands::check::execute(&global, args)
            .await
            .map_err(anyhow::Error::from),
        Commands::Plan(args) => commands::plan::execute(&global, args)
            .await
            .map_err(anyhow::Error::from),
        Commands::Fix(args) => commands::fix::execute(&global, args).await,
        Commands::Snapshot(args) => commands::snapshot::execute(&global, args)
            .await
            .map_err(anyhow::Error::from),
    };

    // Handle exit codes for CI integration
    match result {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(error_exit_code(&e));
        }
    }
}

fn error_exit_code(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<VersionLensError>() {
        Some(VersionLensError::Config(_)) => exit_codes::INVALID_ARGS,
        _ => exit_codes::ERROR,
    }
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // stdout carries reports; logs go to stderr
    let json = std::env::var("VERSIONLENS_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
}
