use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::power::endpoints;

pub const CONFIG_FILE: &str = "config.toml";

/// Top-level configuration loaded from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub power: PowerConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Directory served at `/` when it exists (the web frontend)
    #[serde(default = "default_static_dir")]
    pub static_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            static_dir: default_static_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_community")]
    pub community: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            community: default_community(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// First day of the historical record that gets fetched
    #[serde(default = "default_history_start")]
    pub history_start: NaiveDate,
    #[serde(default = "default_window_days")]
    pub default_window_days: u32,
    /// Upper bound accepted for `window_days` on probability requests
    #[serde(default = "default_max_window_days")]
    pub max_window_days: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            history_start: default_history_start(),
            default_window_days: default_window_days(),
            max_window_days: default_max_window_days(),
        }
    }
}

fn default_bind() -> String { "0.0.0.0:8000".to_string() }
fn default_static_dir() -> Option<String> { Some("frontend".to_string()) }
fn default_base_url() -> String { format!("{}{}", endpoints::POWER_API, endpoints::DAILY_POINT) }
fn default_community() -> String { endpoints::COMMUNITY_RE.to_string() }
fn default_timeout() -> u64 { 60 }
fn default_user_agent() -> String { "tempestra/0.1.0".to_string() }
fn default_history_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(1981, 1, 1).unwrap_or_default()
}
fn default_window_days() -> u32 { 15 }
fn default_max_window_days() -> u32 { 60 }

impl AppConfig {
    /// Load from `path`, falling back to defaults when the file is absent.
    /// `TEMPESTRA_BIND` and `POWER_BASE_URL` override the file.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let data = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            Self::from_toml(&data)
                .with_context(|| format!("Failed to parse config {}", path.display()))?
        } else {
            tracing::info!("No config at {}, using defaults", path.display());
            Self::default()
        };

        if let Ok(bind) = std::env::var("TEMPESTRA_BIND") {
            if !bind.is_empty() {
                config.server.bind = bind;
            }
        }
        if let Ok(url) = std::env::var("POWER_BASE_URL") {
            if !url.is_empty() {
                config.power.base_url = url;
            }
        }

        Ok(config)
    }

    pub fn from_toml(data: &str) -> Result<Self> {
        toml::from_str(data).context("Invalid config TOML")
    }
}
