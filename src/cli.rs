use std::path::PathBuf;

use anyhow::Context;
use serde_json::{Value, json};

use calview_sync::{
    calendar::NewEventRequest,
    storage::config::Config,
    sync::sync_engine::SyncEngine,
};

pub const USAGE: &str =
    "Usage: calview-sync [--config PATH] <sync|view> <user-uuid>\n       calview-sync [--config PATH] create <user-uuid> <request.json>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Sync { user_id: String, config: Option<PathBuf> },
    View { user_id: String, config: Option<PathBuf> },
    Create { user_id: String, request: PathBuf, config: Option<PathBuf> },
    Help,
}

pub fn parse_cli_args<I>(args: I) -> Result<CliCommand, String>
where
    I: IntoIterator<Item = String>,
{
    let mut config = None;
    let mut positional = Vec::new();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| "--config needs a path".to_string())?;
                config = Some(PathBuf::from(path));
            }
            "--help" | "-h" => return Ok(CliCommand::Help),
            other if other.starts_with("--") => {
                return Err(format!("Unknown argument: {}", other));
            }
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let command = positional.next().ok_or_else(|| "Missing command".to_string())?;
    let user_id = positional
        .next()
        .ok_or_else(|| format!("'{}' needs a user id", command))?;
    let parsed = match command.as_str() {
        "sync" => CliCommand::Sync { user_id, config },
        "view" => CliCommand::View { user_id, config },
        "create" => {
            let request = positional
                .next()
                .ok_or_else(|| "'create' needs a request file".to_string())?;
            CliCommand::Create {
                user_id,
                request: PathBuf::from(request),
                config,
            }
        }
        other => return Err(format!("Unknown command: {}", other)),
    };

    if let Some(extra) = positional.next() {
        return Err(format!("Unexpected argument: {}", extra));
    }
    Ok(parsed)
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Config::load_or_create().context("Failed to load config"),
    }
}

/// Runs a parsed command and returns the JSON body to print on success.
pub async fn run_command(command: CliCommand) -> anyhow::Result<Value> {
    match command {
        CliCommand::Sync { user_id, config } => {
            let config = load_config(config.as_ref())?;
            let engine = SyncEngine::from_config(&config).context("Failed to open sync engine")?;
            let outcome = engine.delta_sync(&user_id).await?;

            Ok(json!({
                "message": "Events successfully synced",
                "data": outcome.resume_token,
            }))
        }
        CliCommand::View { user_id, config } => {
            let config = load_config(config.as_ref())?;
            let engine = SyncEngine::from_config(&config).context("Failed to open sync engine")?;
            let events = engine.view_window(&user_id).await?;

            Ok(json!({
                "message": "Events successfully fetched",
                "data": events,
            }))
        }
        CliCommand::Create { user_id, request, config } => {
            let content = std::fs::read_to_string(&request)
                .with_context(|| format!("Failed to read {}", request.display()))?;
            let request: NewEventRequest = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", request.display()))?;
            let config = load_config(config.as_ref())?;
            let engine = SyncEngine::from_config(&config).context("Failed to open sync engine")?;
            let created = engine.create_event(&user_id, &request).await?;

            Ok(json!({
                "message": "Event successfully created",
                "data": created,
            }))
        }
        CliCommand::Help => Ok(json!({ "message": USAGE })),
    }
}
