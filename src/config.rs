use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::metadata::MAX_PERMISSION_LEVEL;
use crate::registry::AdminOptions;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub plugin: PluginConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PluginConfig {
    #[serde(default = "default_plugin_id")]
    pub id: String,
    pub data_dir: PathBuf,
    #[serde(default = "default_admin_prefix")]
    pub admin_prefix: String,
    #[serde(default = "default_admin_permission")]
    pub admin_permission: u8,
    #[serde(default = "default_locale")]
    pub fallback_locale: String,
}

fn default_plugin_id() -> String {
    "multi_search".to_string()
}
fn default_admin_prefix() -> String {
    "!!ms".to_string()
}
fn default_admin_permission() -> u8 {
    4
}
fn default_locale() -> String {
    "en_us".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConsoleConfig {
    #[serde(default = "default_console_name")]
    pub name: String,
    #[serde(default = "default_admin_permission")]
    pub permission: u8,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            name: default_console_name(),
            permission: default_admin_permission(),
            locale: default_locale(),
            output: default_output(),
        }
    }
}

fn default_console_name() -> String {
    "Console".to_string()
}
fn default_output() -> String {
    "plain".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "human".to_string()
}

impl Config {
    /// All defaults, rooted at `data_dir`.
    pub fn minimal(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugin: PluginConfig {
                id: default_plugin_id(),
                data_dir: data_dir.into(),
                admin_prefix: default_admin_prefix(),
                admin_permission: default_admin_permission(),
                fallback_locale: default_locale(),
            },
            console: ConsoleConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    pub fn admin_options(&self) -> AdminOptions {
        AdminOptions {
            prefix: self.plugin.admin_prefix.clone(),
            permission: self.plugin.admin_permission,
        }
    }

    pub fn validate(&self) -> Result<()> {
        // Validate plugin
        if self.plugin.id.trim().is_empty() || self.plugin.id.contains('.') {
            anyhow::bail!("plugin.id must be non-empty and must not contain '.'");
        }
        if self.plugin.admin_prefix.is_empty()
            || self.plugin.admin_prefix.chars().any(char::is_whitespace)
        {
            anyhow::bail!("plugin.admin_prefix must be a single non-empty token");
        }
        if self.plugin.admin_permission > MAX_PERMISSION_LEVEL {
            anyhow::bail!("plugin.admin_permission must be in 0..={}", MAX_PERMISSION_LEVEL);
        }

        // Validate console
        if self.console.permission > MAX_PERMISSION_LEVEL {
            anyhow::bail!("console.permission must be in 0..={}", MAX_PERMISSION_LEVEL);
        }
        match self.console.output.as_str() {
            "plain" | "json" => {}
            other => anyhow::bail!(
                "Unknown console output: '{}'. Must be plain or json.",
                other
            ),
        }

        // Validate logging
        match self.logging.format.as_str() {
            "human" | "json" => {}
            other => anyhow::bail!(
                "Unknown logging format: '{}'. Must be human or json.",
                other
            ),
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}
