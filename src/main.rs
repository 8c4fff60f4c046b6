#![forbid(unsafe_code)]

mod config;
mod constants;
mod daemon;
mod error;
mod ipc;
mod persistence;
mod state;
mod types;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;

use config::{RgbSnapshot, Settings};
use daemon::DaemonOptions;
use ipc::{DaemonClient, DaemonRequest};
use state::RgbCommand;

#[derive(Parser, Debug)]
#[command(name = "rgb-profiled", version, about = "Per-game RGB lighting profile daemon")]
struct Cli {
    /// Log level (trace, debug, info, warn, error); overrides LOG_LEVEL
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Settings file (defaults to the user config dir)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Command socket (overrides settings)
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the daemon
    Serve {
        /// Backend socket for save/sync (overrides settings)
        #[arg(long)]
        backend_socket: Option<PathBuf>,

        /// Run without a backend
        #[arg(long)]
        offline: bool,

        /// Save debounce window in milliseconds
        #[arg(long)]
        debounce_ms: Option<u64>,

        /// JSON snapshot ({"rgb": ..., "rgbPerGameProfilesEnabled": ...}) to start from
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Send one command, e.g. '{"type":"setHue","zone":"LEFT","hue":40}'
    Send { json: String },

    /// Print the daemon's full state
    State,

    /// Print the active profile
    Active,

    /// Print the lighting mode of one zone (left or right)
    Mode {
        #[arg(value_parser = parse_zone)]
        zone: types::Zone,
    },

    /// Health check
    Ping,

    /// Ask the daemon to exit
    Shutdown,
}

fn parse_level(level: &str) -> TraceLevel {
    match level.to_lowercase().as_str() {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    }
}

fn parse_zone(zone: &str) -> std::result::Result<types::Zone, String> {
    serde_json::from_value(serde_json::Value::String(zone.to_uppercase()))
        .map_err(|_| format!("unknown zone '{zone}', expected left or right"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.settings {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };

    // CLI flag > LOG_LEVEL env > settings file
    let log_level = cli
        .log_level
        .clone()
        .or_else(|| std::env::var("LOG_LEVEL").ok())
        .unwrap_or_else(|| settings.log_level.clone());

    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(&log_level))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Some(socket) = cli.socket {
        settings.command_socket = Some(socket);
    }
    let command_socket = settings.command_socket_path()?;

    let request = match cli.command {
        Command::Serve {
            backend_socket,
            offline,
            debounce_ms,
            snapshot,
        } => {
            if backend_socket.is_some() {
                settings.backend_socket = backend_socket;
            }
            settings.offline |= offline;
            if let Some(ms) = debounce_ms {
                settings.save_debounce_ms = ms;
            }

            let initial_snapshot = snapshot.as_deref().map(load_snapshot).transpose()?;
            let options = DaemonOptions {
                command_socket,
                backend_socket: settings.backend_socket_path()?,
                save_debounce: settings.save_debounce(),
                initial_snapshot,
            };
            info!(settings = ?settings, "Starting RGB profile daemon");

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("Failed to build tokio runtime")?;
            return runtime.block_on(daemon::run(options));
        }
        Command::Send { json } => {
            let command: RgbCommand =
                serde_json::from_str(&json).context("Failed to parse command JSON")?;
            DaemonRequest::Command(command)
        }
        Command::State => DaemonRequest::GetState,
        Command::Active => DaemonRequest::GetActiveProfile,
        Command::Mode { zone } => DaemonRequest::GetMode { zone },
        Command::Ping => DaemonRequest::Ping,
        Command::Shutdown => DaemonRequest::Shutdown,
    };

    let mut client = DaemonClient::connect_to(&command_socket)?;
    let response = client.request(request)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&response).context("Failed to serialize response")?
    );
    Ok(())
}

fn load_snapshot(path: &std::path::Path) -> Result<RgbSnapshot> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot from {:?}", path))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse snapshot {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), TraceLevel::DEBUG);
        assert_eq!(parse_level("warn"), TraceLevel::WARN);
        assert_eq!(parse_level("bogus"), TraceLevel::INFO);
    }

    #[test]
    fn test_cli_parses_serve_flags() {
        let cli = Cli::try_parse_from([
            "rgb-profiled",
            "--log-level",
            "debug",
            "serve",
            "--offline",
            "--debounce-ms",
            "250",
        ])
        .unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Command::Serve { offline, debounce_ms, .. } => {
                assert!(offline);
                assert_eq!(debounce_ms, Some(250));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_send_takes_json() {
        let cli = Cli::try_parse_from(["rgb-profiled", "send", r#"{"type":"setHue","zone":"LEFT","hue":40}"#])
            .unwrap();
        let Command::Send { json } = cli.command else {
            panic!("expected send");
        };
        let command: RgbCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(command, RgbCommand::SetHue { zone: types::Zone::Left, hue: 40 });
    }

    #[test]
    fn test_cli_mode_parses_zone() {
        let cli = Cli::try_parse_from(["rgb-profiled", "mode", "right"]).unwrap();
        assert!(matches!(cli.command, Command::Mode { zone: types::Zone::Right }));
        assert!(Cli::try_parse_from(["rgb-profiled", "mode", "middle"]).is_err());
    }
}
