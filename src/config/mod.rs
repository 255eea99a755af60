//! Configuration management for the panel gateway
//!
//! Handles loading, parsing, and hot-reloading of YAML configuration files.
//! The `settings` section holds the persisted [`SystemSettings`] shown on the
//! system pages.

pub mod watcher;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

pub use watcher::ConfigWatcher;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub controller: ControllerConfig,
    #[serde(default)]
    pub panel: PanelConfig,
    pub project: ProjectConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
    #[serde(default)]
    pub settings: SystemSettings,
}

/// Controller connection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControllerConfig {
    pub host: String,
    #[serde(default = "default_controller_port")]
    pub port: u16,
    /// Device number of this panel on the controller
    #[serde(default = "default_channel")]
    pub channel: u16,
    #[serde(default = "default_system_number")]
    pub system: u16,
}

/// Emulated panel model and screen size
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PanelConfig {
    #[serde(default = "default_panel_type")]
    pub panel_type: String,
    #[serde(default = "default_width")]
    pub width: i32,
    #[serde(default = "default_height")]
    pub height: i32,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            panel_type: default_panel_type(),
            width: default_width(),
            height: default_height(),
        }
    }
}

/// Project file location
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectConfig {
    pub path: String,
}

/// Log output
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for daily rolling log files; console only when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    #[serde(default = "default_log_prefix")]
    pub file_prefix: String,
}

/// Persisted panel settings, editable from the system pages
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemSettings {
    pub panel_type: String,
    pub firmware: String,
    pub controller_host: String,
    pub controller_port: u16,
    pub channel: u16,
    /// Master volume 0-100
    pub volume: u8,
    pub mute: bool,
    /// Play button sounds
    pub system_sound: bool,
    pub single_beep: String,
    pub double_beep: String,
    /// Page-flip passwords 1-4 (`@PWD`)
    pub passwords: Vec<String>,
    /// Log filter applied at runtime
    pub log_level: String,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            panel_type: default_panel_type(),
            firmware: env!("CARGO_PKG_VERSION").to_string(),
            controller_host: String::new(),
            controller_port: default_controller_port(),
            channel: default_channel(),
            volume: 100,
            mute: false,
            system_sound: true,
            single_beep: "singleBeep.wav".to_string(),
            double_beep: "doubleBeep.wav".to_string(),
            passwords: vec![String::new(); 4],
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let mut config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path))?;

        // Validate the loaded configuration
        config.validate()?;
        config.sync_settings();

        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, path: &str) -> Result<()> {
        let yaml = serde_yaml::to_string(self)
            .context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.controller.host.is_empty() {
            anyhow::bail!("Controller host cannot be empty");
        }
        if self.controller.port == 0 {
            anyhow::bail!("Controller port cannot be 0");
        }
        // NetLinx reserves 10000-29999 for touch panels
        if !(10000..=29999).contains(&self.controller.channel) {
            anyhow::bail!(
                "Panel channel {} is invalid (must be 10000-29999)",
                self.controller.channel
            );
        }

        if self.panel.width <= 0 || self.panel.height <= 0 {
            anyhow::bail!(
                "Panel size {}x{} is invalid",
                self.panel.width,
                self.panel.height
            );
        }

        if self.project.path.is_empty() {
            anyhow::bail!("Project path cannot be empty");
        }

        if let Some(logging) = &self.logging {
            validate_log_level(&logging.level).context("Invalid logging section")?;
        }
        validate_log_level(&self.settings.log_level).context("Invalid settings section")?;

        if self.settings.volume > 100 {
            anyhow::bail!("Volume {} is invalid (must be 0-100)", self.settings.volume);
        }

        Ok(())
    }

    /// Copy connection values into the settings shown on system pages
    fn sync_settings(&mut self) {
        self.settings.controller_host = self.controller.host.clone();
        self.settings.controller_port = self.controller.port;
        self.settings.channel = self.controller.channel;
        self.settings.panel_type = self.panel.panel_type.clone();
        if self.settings.passwords.len() < 4 {
            self.settings.passwords.resize(4, String::new());
        }
    }
}

fn validate_log_level(level: &str) -> Result<()> {
    match level.to_ascii_lowercase().as_str() {
        "error" | "warn" | "info" | "debug" | "trace" | "off" => Ok(()),
        other => anyhow::bail!("Unknown log level '{}'", other),
    }
}

fn default_controller_port() -> u16 { 1319 }
fn default_channel() -> u16 { 10001 }
fn default_system_number() -> u16 { 0 }
fn default_panel_type() -> String { "MVP-5200i".to_string() }
fn default_width() -> i32 { 1024 }
fn default_height() -> i32 { 768 }
fn default_log_level() -> String { "info".to_string() }
fn default_log_prefix() -> String { "tpanel-gw.log".to_string() }

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
controller:
  host: 192.168.1.10
  channel: 10002
project:
  path: project.yaml
settings:
  volume: 40
"#;

    #[tokio::test]
    async fn test_load_fills_settings() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, CONFIG)?;

        let config = AppConfig::load(&path.to_string_lossy()).await?;
        assert_eq!(config.controller.port, 1319);
        assert_eq!(config.panel.width, 1024);
        assert_eq!(config.settings.volume, 40);
        assert_eq!(config.settings.controller_host, "192.168.1.10");
        assert_eq!(config.settings.channel, 10002);
        assert_eq!(config.settings.passwords.len(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_round_trip() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.yaml");
        let path = path.to_string_lossy().to_string();
        let config: AppConfig = serde_yaml::from_str(CONFIG)?;
        config.save(&path).await?;
        let loaded = AppConfig::load(&path).await?;
        assert_eq!(loaded.project.path, "project.yaml");
        Ok(())
    }

    #[test]
    fn test_validation_errors() {
        let mut config: AppConfig = serde_yaml::from_str(CONFIG).unwrap();
        assert!(config.validate().is_ok());

        config.controller.channel = 5;
        assert!(config.validate().is_err());
        config.controller.channel = 10001;

        config.settings.log_level = "loud".into();
        assert!(config.validate().is_err());
        config.settings.log_level = "debug".into();

        config.panel.width = 0;
        assert!(config.validate().is_err());
    }
}
