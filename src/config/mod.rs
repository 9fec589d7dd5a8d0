//! Configuration management for Launchpad GW
//!
//! Loads the YAML configuration file. Every field has a default, so a missing
//! file or a partial file is fine.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::info;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub surface: SurfaceConfig,
    pub obs: ObsConfig,
}

/// Launchpad port selection
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Case-insensitive substring of the MIDI port names
    pub port_pattern: String,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            port_pattern: default_port_pattern(),
        }
    }
}

/// OBS WebSocket configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObsConfig {
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Pause between connection attempts; 0 retries immediately
    pub reconnect_delay_ms: u64,
}

impl Default for ObsConfig {
    fn default() -> Self {
        Self {
            host: default_obs_host(),
            port: default_obs_port(),
            password: None,
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

impl ObsConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config = Self::parse(&contents)
            .with_context(|| format!("Invalid config file: {}", path))?;

        Ok(config)
    }

    /// Load `path`, falling back to defaults when the file does not exist
    pub async fn load_or_default(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            info!("Config file '{}' not found, using defaults", path);
            return Ok(Self::default());
        }
        Self::load(path).await
    }

    /// Parse and validate YAML text
    pub fn parse(contents: &str) -> Result<Self> {
        // An empty document is an empty mapping
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: AppConfig =
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.surface.port_pattern.trim().is_empty() {
            anyhow::bail!("surface.port_pattern cannot be empty");
        }
        if self.obs.host.trim().is_empty() {
            anyhow::bail!("obs.host cannot be empty");
        }
        if self.obs.port == 0 {
            anyhow::bail!("obs.port must be between 1 and 65535");
        }
        Ok(())
    }
}

// Default value functions
fn default_port_pattern() -> String { "Launchpad".to_string() }
fn default_obs_host() -> String { "localhost".to_string() }
fn default_obs_port() -> u16 { 4444 }
fn default_reconnect_delay_ms() -> u64 { 1000 }
