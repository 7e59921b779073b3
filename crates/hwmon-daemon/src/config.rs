//! Configuration loading with safe fallbacks
//!
//! Loading never fails: a missing file, a syntax error, or an invalid
//! setting is logged and replaced by defaults so the service always starts.

use anyhow::{bail, Result};
use hwmon_core::{Role, SensorRegistry, TextParts};
use hwmon_monitor::{WorkerConfig, DEFAULT_BACKOFF_MS, DEFAULT_INTERVAL_MS, DEFAULT_SHUTDOWN_TIMEOUT_MS};
use hwmon_serial::{Parity, SerialSettings, StopBits, DEFAULT_TIMEOUT_MS};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub sensors: SensorsConfig,
    #[serde(default)]
    pub text: TextConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Port the display device is attached to
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default)]
    pub parity: Parity,
    #[serde(default)]
    pub stop_bits: StopBits,
    #[serde(default = "default_timeout")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_timeout")]
    pub write_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            parity: Parity::None,
            stop_bits: StopBits::One,
            read_timeout_ms: default_timeout(),
            write_timeout_ms: default_timeout(),
        }
    }
}

fn default_port() -> String {
    "COM1".to_string()
}

fn default_baud_rate() -> u32 {
    115200
}

fn default_data_bits() -> u8 {
    8
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_MS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Delay between frames in milliseconds
    #[serde(default = "default_interval")]
    pub interval_ms: u64,
    /// Delay before reconnecting after a failure
    #[serde(default = "default_backoff")]
    pub backoff_ms: u64,
    /// How long to wait for the worker on shutdown
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval(),
            backoff_ms: default_backoff(),
            shutdown_timeout_ms: default_shutdown_timeout(),
        }
    }
}

fn default_interval() -> u64 {
    DEFAULT_INTERVAL_MS
}

fn default_backoff() -> u64 {
    DEFAULT_BACKOFF_MS
}

fn default_shutdown_timeout() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT_MS
}

/// Sensor identifier per role; empty or missing entries leave the role unset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_load: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_temp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_load: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu1_load: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu1_temp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu2_load: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu2_temp: Option<String>,
}

impl SensorsConfig {
    fn get(&self, role: Role) -> Option<&str> {
        let id = match role {
            Role::CpuLoad => &self.cpu_load,
            Role::CpuTemp => &self.cpu_temp,
            Role::MemLoad => &self.mem_load,
            Role::MemValue => &self.mem_value,
            Role::Gpu1Load => &self.gpu1_load,
            Role::Gpu1Temp => &self.gpu1_temp,
            Role::Gpu2Load => &self.gpu2_load,
            Role::Gpu2Temp => &self.gpu2_temp,
        };
        id.as_deref()
    }
}

/// Text around the embedded value of each TXT line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextConfig {
    #[serde(default)]
    pub cpu: TextParts,
    #[serde(default)]
    pub mem: TextParts,
    #[serde(default)]
    pub gpu1: TextParts,
    #[serde(default)]
    pub gpu2: TextParts,
}

impl SerialConfig {
    pub fn settings(&self) -> SerialSettings {
        SerialSettings {
            port: self.port.clone(),
            baud_rate: self.baud_rate,
            data_bits: self.data_bits,
            parity: self.parity,
            stop_bits: self.stop_bits,
            read_timeout_ms: self.read_timeout_ms,
            write_timeout_ms: self.write_timeout_ms,
        }
    }

    /// Settings used when the configured ones are unusable
    pub fn fallback() -> Self {
        Self {
            port: "COM1".to_string(),
            baud_rate: 9600,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: StopBits::One,
            read_timeout_ms: DEFAULT_TIMEOUT_MS,
            write_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

fn validate_transport(serial: &SerialConfig, monitor: &MonitorConfig) -> Result<()> {
    if serial.port.trim().is_empty() {
        bail!("serial.port is empty");
    }
    if serial.baud_rate == 0 {
        bail!("serial.baud_rate must be positive");
    }
    // Data bits, parity and stop bits the serial backend cannot open with
    serial.settings().validate()?;
    if serial.write_timeout_ms == 0 {
        bail!("serial.write_timeout_ms must be positive");
    }
    if monitor.interval_ms == 0 {
        bail!("monitor.interval_ms must be positive");
    }
    if monitor.backoff_ms == 0 {
        bail!("monitor.backoff_ms must be positive");
    }
    Ok(())
}

/// Deserialize one top-level table, defaulting when absent
fn section<T: DeserializeOwned + Default>(table: &toml::Table, key: &str) -> Result<T> {
    match table.get(key) {
        Some(value) => Ok(value.clone().try_into()?),
        None => Ok(T::default()),
    }
}

impl Config {
    /// Parse TOML text, substituting defaults for anything unusable
    pub fn parse(content: &str) -> Self {
        let table: toml::Table = match content.parse() {
            Ok(table) => table,
            Err(e) => {
                warn!(error = %e, "Configuration is not valid TOML, using defaults");
                return Self::fallback();
            }
        };

        let transport = section::<SerialConfig>(&table, "serial").and_then(|serial| {
            let monitor = section::<MonitorConfig>(&table, "monitor")?;
            validate_transport(&serial, &monitor)?;
            Ok((serial, monitor))
        });
        let (serial, monitor) = transport.unwrap_or_else(|e| {
            warn!(error = %e, "Invalid serial/monitor settings, using safe defaults");
            (SerialConfig::fallback(), MonitorConfig::default())
        });

        let sensors = section::<SensorsConfig>(&table, "sensors").unwrap_or_else(|e| {
            warn!(error = %e, "Invalid [sensors] section, no sensors configured");
            SensorsConfig::default()
        });
        let text = section::<TextConfig>(&table, "text").unwrap_or_else(|e| {
            warn!(error = %e, "Invalid [text] section, using empty text");
            TextConfig::default()
        });

        Self {
            serial,
            monitor,
            sensors,
            text,
        }
    }

    /// Configuration used when the file cannot be read at all
    pub fn fallback() -> Self {
        Self {
            serial: SerialConfig::fallback(),
            ..Self::default()
        }
    }

    pub fn serial_settings(&self) -> SerialSettings {
        self.serial.settings()
    }

    /// Convert to WorkerConfig
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            serial: self.serial_settings(),
            interval: Duration::from_millis(self.monitor.interval_ms),
            backoff: Duration::from_millis(self.monitor.backoff_ms),
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.monitor.shutdown_timeout_ms)
    }

    /// Build the role registry
    pub fn registry(&self) -> SensorRegistry {
        let registry = Role::ALL.into_iter().fold(SensorRegistry::new(), |registry, role| {
            match self.sensors.get(role) {
                Some(id) => registry.with_sensor(role, id),
                None => registry,
            }
        });
        registry
            .with_text(Role::CpuTemp, self.text.cpu.clone())
            .with_text(Role::MemValue, self.text.mem.clone())
            .with_text(Role::Gpu1Temp, self.text.gpu1.clone())
            .with_text(Role::Gpu2Temp, self.text.gpu2.clone())
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Config {
    if !path.exists() {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => {
            let config = Config::parse(&content);
            info!(path = %path.display(), "Loaded configuration");
            config
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read configuration, using defaults");
            Config::fallback()
        }
    }
}

/// Example configuration matching the sysinfo provider's identifiers
pub fn example_config() -> Config {
    Config {
        serial: SerialConfig::default(),
        monitor: MonitorConfig::default(),
        sensors: SensorsConfig {
            cpu_load: Some("/cpu/0/load/0".to_string()),
            cpu_temp: Some("/cpu/0/temperature/0".to_string()),
            mem_load: Some("/ram/load/0".to_string()),
            mem_value: Some("/ram/data/0".to_string()),
            gpu1_load: Some("/gpu-nvidia/0/load/0".to_string()),
            gpu1_temp: Some("/gpu-nvidia/0/temperature/0".to_string()),
            gpu2_load: Some("/gpu-nvidia/1/load/0".to_string()),
            gpu2_temp: Some("/gpu-nvidia/1/temperature/0".to_string()),
        },
        text: TextConfig {
            cpu: TextParts::new("CPU ", "C"),
            mem: TextParts::new("RAM ", "G"),
            gpu1: TextParts::new("GPU1 ", "C"),
            gpu2: TextParts::new("GPU2 ", "C"),
        },
    }
}

const EXAMPLE_HEADER: &str = "\
# hwmon configuration
#
# Run `hwmon sensors` to list the sensor identifiers of this machine.
# parity: none | odd | even
# stop_bits: one | two

";

/// Save example configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(&example_config())?;
    std::fs::write(path, format!("{}{}", EXAMPLE_HEADER, content))?;
    Ok(())
}
