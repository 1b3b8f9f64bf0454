//! Local CLI settings.
//!
//! Stored in `<config dir>/tollbooth/config.toml`. `tollbooth login` writes
//! the `token` key here.

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::output::{self, OutputFormat};

pub const API_URL_KEY: &str = "api-url";
pub const TOKEN_KEY: &str = "token";

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., api-url)
        key: String,
        /// Value to set
        value: String,
    },

    /// Get a configuration value
    Get {
        key: String,
    },

    /// Show all configuration
    Show,

    /// Reset configuration to defaults
    Reset {
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

impl CliConfig {
    fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Values safe to print. The token is masked.
    fn displayable(&self) -> BTreeMap<String, String> {
        self.values
            .iter()
            .map(|(k, v)| {
                let v = if k == TOKEN_KEY { mask(v) } else { v.clone() };
                (k.clone(), v)
            })
            .collect()
    }
}

fn mask(token: &str) -> String {
    let visible: String = token.chars().take(6).collect();
    format!("{}…", visible)
}

fn config_path() -> Result<PathBuf> {
    let dir = dirs::config_dir().context("Could not determine config directory")?;
    Ok(dir.join("tollbooth").join("config.toml"))
}

fn load_config() -> Result<CliConfig> {
    CliConfig::read(&config_path()?)
}

fn save_config(cfg: &CliConfig) -> Result<()> {
    cfg.write(&config_path()?)
}

/// Read one stored value, if any.
pub fn load_value(key: &str) -> Option<String> {
    load_config().ok().and_then(|cfg| cfg.values.get(key).cloned())
}

/// Store or clear one value.
pub fn store_value(key: &str, value: Option<String>) -> Result<()> {
    let mut cfg = load_config()?;
    match value {
        Some(value) => cfg.values.insert(key.to_string(), value),
        None => cfg.values.remove(key),
    };
    save_config(&cfg)
}

pub async fn execute(cmd: ConfigCommands, format: OutputFormat) -> Result<()> {
    match cmd {
        ConfigCommands::Set { key, value } => {
            store_value(&key, Some(value.clone()))?;
            match format {
                OutputFormat::Table => output::print_success(&format!("{} updated", key)),
                _ => output::print_item(&serde_json::json!({ "key": key, "value": value }), format)?,
            }
        }

        ConfigCommands::Get { key } => match load_value(&key) {
            Some(value) => {
                let value = if key == TOKEN_KEY { mask(&value) } else { value };
                match format {
                    OutputFormat::Table => println!("{}", value),
                    _ => output::print_item(
                        &serde_json::json!({ "key": key, "value": value }),
                        format,
                    )?,
                }
            }
            None => output::print_error(&format!("Key '{}' not found", key)),
        },

        ConfigCommands::Show => {
            let cfg = load_config()?;
            if cfg.values.is_empty() {
                output::print_info("No configuration values set.");
                return Ok(());
            }

            let values = cfg.displayable();
            match format {
                OutputFormat::Table => {
                    output::print_header("Configuration");
                    for (k, v) in &values {
                        output::print_detail(k, v);
                    }
                }
                _ => output::print_item(&values, format)?,
            }
        }

        ConfigCommands::Reset { force } => {
            if !force {
                output::print_info("This will reset all CLI configuration. Use --force to confirm.");
                return Ok(());
            }

            let path = config_path()?;
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
            }
            output::print_success("Configuration reset to defaults");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        assert!(CliConfig::read(&path).unwrap().values.is_empty());

        let mut cfg = CliConfig::default();
        cfg.values.insert(API_URL_KEY.into(), "http://gateway:8080".into());
        cfg.write(&path).unwrap();

        let loaded = CliConfig::read(&path).unwrap();
        assert_eq!(loaded.values[API_URL_KEY], "http://gateway:8080");
    }

    #[test]
    fn test_token_is_masked_for_display() {
        let mut cfg = CliConfig::default();
        cfg.values.insert(TOKEN_KEY.into(), "eyJhbGciOiJIUzI1NiJ9.payload.sig".into());
        cfg.values.insert(API_URL_KEY.into(), "http://localhost:8080".into());

        let shown = cfg.displayable();
        assert_eq!(shown[TOKEN_KEY], "eyJhbG…");
        assert_eq!(shown[API_URL_KEY], "http://localhost:8080");
    }
}
