//! hwmon - Main entry point
//!
//! Streams hardware sensor readings to a serial display device, and lists
//! the sensors available for configuration.

mod config;
mod diag;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hwmon_monitor::{MonitorService, StopOutcome, SysinfoProvider, TransportWorker, WorkerEvent};
use hwmon_serial::SerialPortConnector;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::Config;
use crate::diag::Listing;

#[derive(Parser, Debug)]
#[command(name = "hwmon")]
#[command(about = "Hardware monitor streaming sensor readings to a serial display")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "hwmon.toml")]
    config: PathBuf,

    /// Serial port to use instead of the configured one
    #[arg(short, long)]
    port: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream frames to the display until interrupted (default)
    Run,
    /// List every sensor the hardware reports
    Sensors {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// List only the sensors referenced by the configuration
    PrintSensors {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write an example configuration file
    InitConfig {
        /// Destination, defaults to the --config path
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("hwmon v{}", env!("CARGO_PKG_VERSION"));

    match args.command.unwrap_or(Command::Run) {
        Command::InitConfig { path } => init_config(path.as_deref().unwrap_or(args.config.as_path())),
        Command::Run => run(load(&args.config, args.port)).await,
        Command::Sensors { json } => {
            let config = load(&args.config, args.port);
            diag::print(&config.registry(), Listing::All, json).await
        }
        Command::PrintSensors { json } => {
            let config = load(&args.config, args.port);
            diag::print(&config.registry(), Listing::Configured, json).await
        }
    }
}

/// Load configuration and apply command line overrides
fn load(path: &Path, port: Option<String>) -> Config {
    let mut config = config::load_config(path);

    // Override serial port if specified
    if let Some(port) = port {
        config.serial.port = port;
    }

    info!(
        port = %config.serial.port,
        baud_rate = config.serial.baud_rate,
        interval_ms = config.monitor.interval_ms,
        "Configuration loaded"
    );
    config
}

fn init_config(path: &Path) -> Result<()> {
    config::save_default_config(path).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote example configuration to {}", path.display());
    Ok(())
}

/// Stream frames until Ctrl-C
async fn run(config: Config) -> Result<()> {
    let provider = SysinfoProvider::open().context("Failed to open hardware provider")?;
    let worker = TransportWorker::new(config.worker_config(), config.registry(), provider, SerialPortConnector);
    let mut service = MonitorService::start(worker, config.shutdown_timeout())?;

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                info!("Shutdown requested");
                break;
            }
            event = service.events().recv() => match event {
                Ok(WorkerEvent::StateChanged(state)) => info!(?state, "Worker state changed"),
                Ok(WorkerEvent::FrameSent { bytes }) => debug!(bytes, "Frame sent"),
                Ok(WorkerEvent::CycleFailed { reason }) => debug!(%reason, "Cycle failed"),
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "Worker events lagged"),
                Err(RecvError::Closed) => {
                    warn!("Worker exited unexpectedly");
                    break;
                }
            },
        }
    }

    if service.stop().await == StopOutcome::Unresponsive {
        warn!("Worker was aborted after the shutdown timeout");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_command_is_run() {
        let args = Args::try_parse_from(["hwmon", "--port", "/dev/ttyACM0"]).unwrap();
        assert!(args.command.is_none());
        assert_eq!(args.port.as_deref(), Some("/dev/ttyACM0"));
    }

    #[test]
    fn test_init_config_writes_example() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        let args = Args::try_parse_from(["hwmon", "init-config", path.to_str().unwrap()]).unwrap();

        let Some(Command::InitConfig { path: Some(target) }) = args.command else {
            panic!("expected init-config with a path");
        };
        init_config(&target).unwrap();

        assert_eq!(config::load_config(&path), config::example_config());
    }

    #[test]
    fn test_load_applies_port_override() {
        let dir = TempDir::new().unwrap();
        let config = load(&dir.path().join("absent.toml"), Some("COM9".to_string()));
        assert_eq!(config.serial.port, "COM9");
    }
}
