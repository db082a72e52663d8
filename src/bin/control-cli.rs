use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use control_plane::client::ControlClient;
use control_plane::config::schema::DEFAULT_SOCKET_PATH;

#[derive(Parser)]
#[command(name = "control-cli")]
#[command(about = "Management CLI for the supervisor control plane", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = DEFAULT_SOCKET_PATH)]
    socket: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inject environment variables (KEY=VALUE ...)
    Env {
        #[arg(required = true, value_parser = parse_pair)]
        vars: Vec<(String, String)>,
    },
    /// Trigger a configuration reload
    Reload,
    /// Push metric samples (NAME=VALUE ...)
    Metric {
        #[arg(required = true, value_parser = parse_pair)]
        samples: Vec<(String, String)>,
    },
    /// Toggle maintenance mode
    Maintenance {
        #[command(subcommand)]
        mode: Maintenance,
    },
}

#[derive(Subcommand)]
enum Maintenance {
    /// Enter maintenance mode
    Enable,
    /// Leave maintenance mode
    Disable,
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

/// Numbers and booleans go out as JSON scalars, everything else as a string.
fn metric_value(raw: String) -> serde_json::Value {
    match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(value @ (serde_json::Value::Number(_) | serde_json::Value::Bool(_))) => value,
        _ => serde_json::Value::String(raw),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = ControlClient::new(cli.socket);

    match cli.command {
        Commands::Env { vars } => {
            let vars: HashMap<String, String> = vars.into_iter().collect();
            client.put_environ(&vars).await?;
        }
        Commands::Reload => client.reload().await?,
        Commands::Metric { samples } => {
            let metrics: BTreeMap<String, serde_json::Value> = samples
                .into_iter()
                .map(|(name, value)| (name, metric_value(value)))
                .collect();
            client.put_metric(&metrics).await?;
        }
        Commands::Maintenance { mode } => {
            client.set_maintenance(matches!(mode, Maintenance::Enable)).await?;
        }
    }

    Ok(())
}
