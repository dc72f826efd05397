//! Configuration loading and validation

use anyhow::{Context, Result};
use movebridge_core::{PeripheralCandidate, PeripheralType, RegistrationPolicy};
use movebridge_service::{RigDevice, ServiceEndpoint, SimulatedRig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Configuration file {0} not found")]
    NotFound(String),
    #[error("Unsupported configuration format \"{0}\" (expected .json or .toml)")]
    UnknownFormat(String),
    #[error("No controllers specified")]
    NoControllers,
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Print the manifest descriptor before the first tick
    #[serde(default)]
    pub debug: bool,
    /// Abort startup on the first rejected peripheral
    #[serde(default)]
    pub strict: bool,
    /// Name the channels are published under
    #[serde(default = "default_device_name")]
    pub device_name: String,
    #[serde(default)]
    pub controllers: Vec<PeripheralCandidate>,
    #[serde(default)]
    pub service: ServiceEndpoint,
    #[serde(default)]
    pub tick: TickConfig,
    #[serde(default)]
    pub simulation: SimulatedRig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickConfig {
    /// Delay between ticks in milliseconds
    #[serde(default = "default_poll_delay")]
    pub poll_delay_ms: u64,
    /// Log a frame summary every n ticks (0 disables)
    #[serde(default = "default_summary_every")]
    pub summary_every: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            poll_delay_ms: default_poll_delay(),
            summary_every: default_summary_every(),
        }
    }
}

fn default_device_name() -> String {
    "MoveDevice".to_string()
}

fn default_poll_delay() -> u64 {
    10
}

fn default_summary_every() -> u64 {
    500
}

impl Config {
    pub fn policy(&self) -> RegistrationPolicy {
        if self.strict {
            RegistrationPolicy::Strict
        } else {
            RegistrationPolicy::SkipInvalid
        }
    }

    /// Reject configurations that cannot start a session
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.controllers.is_empty() {
            return Err(ConfigError::NoControllers);
        }
        Ok(())
    }
}

enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> Result<Format, ConfigError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "json" => Ok(Format::Json),
        "toml" => Ok(Format::Toml),
        _ => Err(ConfigError::UnknownFormat(ext)),
    }
}

/// Load configuration from a JSON or TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()).into());
    }
    let format = format_of(path)?;
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let config: Config = match format {
        Format::Json => serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON configuration in {}", path.display()))?,
        Format::Toml => toml::from_str(&content)
            .with_context(|| format!("Invalid TOML configuration in {}", path.display()))?,
    };
    info!(
        path = %path.display(),
        controllers = config.controllers.len(),
        "Loaded configuration"
    );
    Ok(config)
}

/// Example configuration: one wand, one nav and a virtual headset
pub fn default_config() -> Config {
    let controllers = vec![
        PeripheralCandidate::new("left", 0, PeripheralType::WandController),
        PeripheralCandidate::new("nav", 1, PeripheralType::NavController),
        PeripheralCandidate::new("head", 0, PeripheralType::VirtualHMD),
    ];
    let simulation = SimulatedRig {
        devices: vec![
            RigDevice::new(0, PeripheralType::WandController),
            RigDevice::new(1, PeripheralType::NavController),
            RigDevice::new(0, PeripheralType::VirtualHMD),
        ],
        ..Default::default()
    };
    Config {
        debug: false,
        strict: false,
        device_name: default_device_name(),
        controllers,
        service: ServiceEndpoint::default(),
        tick: TickConfig::default(),
        simulation,
    }
}

/// Save the example configuration, in the format the extension names
pub fn save_default_config(path: &Path) -> Result<()> {
    let config = default_config();
    let content = match format_of(path)? {
        Format::Json => serde_json::to_string_pretty(&config)?,
        Format::Toml => toml::to_string_pretty(&config)?,
    };
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
