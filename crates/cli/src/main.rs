//! sonar-history CLI - analyse a project's git history with sonar-scanner

use clap::{CommandFactory, Parser};
use colored::Colorize;
use sonar_history_cli::{commands, Cli, ScanStatus};
use sonar_history_core::ConfigError;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let status = match commands::scan::run(&cli) {
        Ok(status) => status,
        Err(err) => match err.downcast_ref::<ConfigError>() {
            Some(config_err) => {
                print_usage_error(config_err);
                ScanStatus::ConfigError
            }
            None => {
                eprintln!("  {}: {:#}", "error".red().bold(), err);
                ScanStatus::Aborted
            }
        },
    };

    ExitCode::from(status.code())
}

fn print_usage_error(err: &ConfigError) {
    eprintln!("Please check the input parameters:");
    eprintln!("{}", err);
    eprintln!();
    let _ = Cli::command().write_help(&mut std::io::stderr());
}

/// `RUST_LOG` wins; otherwise `-v` raises the level from errors only
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "error",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
