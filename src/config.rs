//! Configuration management for the X-Air remote
//!
//! Handles loading and validation of the optional YAML configuration file.
//! Every field has a default, so an empty file (or no file) is valid.

use std::net::IpAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::osc::XAIR_PORT;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub mixer: MixerConfig,
    /// Hardware surface; `None` means a log-only console surface
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surface: Option<SurfaceConfig>,
}

/// Mixer connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MixerConfig {
    /// Fixed mixer address; discovery is skipped when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_discovery_timeout")]
    pub discovery_timeout_ms: u64,
    #[serde(default = "default_validate_timeout")]
    pub validate_timeout_ms: u64,
    #[serde(default = "default_keepalive_interval")]
    pub keepalive_interval_ms: u64,
    #[serde(default = "default_replay_delay")]
    pub replay_delay_ms: u64,
}

/// MIDI control-surface configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SurfaceConfig {
    /// Case-insensitive substring of the MIDI input port name
    #[serde(default = "default_port_pattern")]
    pub input_port: String,
    #[serde(default = "default_port_pattern")]
    pub output_port: String,
    /// Shut down when the surface disappears
    #[serde(default)]
    pub monitor: bool,
    #[serde(default = "default_monitor_interval")]
    pub monitor_interval_ms: u64,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            address: None,
            port: default_port(),
            discovery_timeout_ms: default_discovery_timeout(),
            validate_timeout_ms: default_validate_timeout(),
            keepalive_interval_ms: default_keepalive_interval(),
            replay_delay_ms: default_replay_delay(),
        }
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            input_port: default_port_pattern(),
            output_port: default_port_pattern(),
            monitor: false,
            monitor_interval_ms: default_monitor_interval(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::from_yaml(&contents).with_context(|| format!("Invalid config file: {}", path))
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(contents: &str) -> Result<Self> {
        // serde_yaml rejects an empty document for a struct
        let config: AppConfig = if contents.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        let mixer = &self.mixer;
        if let Some(address) = &mixer.address {
            address
                .parse::<IpAddr>()
                .with_context(|| format!("Mixer address '{}' is not an IP address", address))?;
        }
        if mixer.port == 0 {
            anyhow::bail!("Mixer port cannot be 0");
        }
        if mixer.discovery_timeout_ms == 0 || mixer.validate_timeout_ms == 0 {
            anyhow::bail!("Mixer timeouts must be greater than 0");
        }
        if mixer.keepalive_interval_ms == 0 {
            anyhow::bail!("Mixer keepalive_interval_ms must be greater than 0");
        }

        if let Some(surface) = &self.surface {
            if surface.input_port.is_empty() {
                anyhow::bail!("Surface input_port cannot be empty");
            }
            if surface.output_port.is_empty() {
                anyhow::bail!("Surface output_port cannot be empty");
            }
            if surface.monitor_interval_ms == 0 {
                anyhow::bail!("Surface monitor_interval_ms must be greater than 0");
            }
        }

        Ok(())
    }

    /// Configured mixer address, if any
    pub fn mixer_address(&self) -> Option<IpAddr> {
        self.mixer.address.as_deref().and_then(|a| a.parse().ok())
    }
}

impl MixerConfig {
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    pub fn validate_timeout(&self) -> Duration {
        Duration::from_millis(self.validate_timeout_ms)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }

    pub fn replay_delay(&self) -> Duration {
        Duration::from_millis(self.replay_delay_ms)
    }
}

impl SurfaceConfig {
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }
}

fn default_port() -> u16 { XAIR_PORT }
fn default_discovery_timeout() -> u64 { 15_000 }
fn default_validate_timeout() -> u64 { 500 }
fn default_keepalive_interval() -> u64 { 5_000 }
fn default_replay_delay() -> u64 { 2 }
fn default_port_pattern() -> String { "X-Touch".to_string() }
fn default_monitor_interval() -> u64 { 1_000 }
