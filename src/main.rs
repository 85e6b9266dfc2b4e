use std::process::ExitCode;

use serde_json::json;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use calview_sync::storage::config::Config;

mod cli;
use cli::{CliCommand, USAGE, parse_cli_args, run_command};

#[tokio::main]
async fn main() -> ExitCode {
    let _guard = setup_logging();

    let command = match parse_cli_args(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("Error: {}", err);
            println!("{}", USAGE);
            return ExitCode::FAILURE;
        }
    };

    if command == CliCommand::Help {
        println!("{}", USAGE);
        return ExitCode::SUCCESS;
    }

    match run_command(command).await {
        Ok(body) => {
            println!("{}", body);
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("Command failed: {:#}", err);
            println!("{}", json!({ "error": format!("{:#}", err) }));
            ExitCode::FAILURE
        }
    }
}

fn setup_logging() -> WorkerGuard {
    let log_dir = Config::config_dir();
    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(log_dir, "calview-sync.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .init();

    tracing::info!("calview-sync started");
    guard
}
