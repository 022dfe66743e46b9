use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

const DEFAULT_CATALOG_BASE_URL: &str = "https://play.google.com";
const DEFAULT_PROXY_TIMEOUT_SECS: u64 = 10;

/// Process configuration loaded from environment variables (and `.env`).
/// Tunables and custom seeds live in the optional TOML `FileConfig`.
#[derive(Debug, Clone)]
pub struct Config {
    pub catalog_base_url: String,
    /// Egress endpoints. Empty means direct connection only.
    pub proxies: Vec<String>,
    pub proxy_timeout_secs: u64,
    /// Postgres cache backend. In-memory when unset.
    pub database_url: Option<String>,
    pub config_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            catalog_base_url: std::env::var("CATALOG_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_CATALOG_BASE_URL.to_string()),
            proxies: parse_proxy_list(&std::env::var("PROXIES").unwrap_or_default()),
            proxy_timeout_secs: match std::env::var("PROXY_TIMEOUT") {
                Ok(v) => v
                    .trim()
                    .parse()
                    .with_context(|| format!("PROXY_TIMEOUT must be a number, got {v:?}"))?,
                Err(_) => DEFAULT_PROXY_TIMEOUT_SECS,
            },
            database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            config_path: std::env::var("NICHESCAN_CONFIG").ok().map(PathBuf::from),
        };

        Ok(config)
    }

    /// Log the loaded configuration without leaking credentials.
    pub fn log_redacted(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  CATALOG_BASE_URL: {}", self.catalog_base_url);
        tracing::info!("  PROXIES: {} configured", self.proxies.len());
        tracing::info!("  PROXY_TIMEOUT: {}s", self.proxy_timeout_secs);
        tracing::info!(
            "  DATABASE_URL: {}",
            self.database_url
                .as_deref()
                .map(preview)
                .unwrap_or_else(|| "<not set, using in-memory cache>".to_string())
        );
        if let Some(path) = &self.config_path {
            tracing::info!("  NICHESCAN_CONFIG: {}", path.display());
        }
    }
}

/// First 12 characters of a secret plus its length.
fn preview(val: &str) -> String {
    let head: String = val.chars().take(12).collect();
    format!("{head}...({} chars)", val.chars().count())
}

/// Split a comma-separated endpoint list, dropping blanks.
pub fn parse_proxy_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// TOML-backed tunables and custom seeds.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub pacing: PacingSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub niches: Vec<CustomNiche>,
    #[serde(default)]
    pub categories: Vec<CustomCategory>,
}

/// Request pacing, in seconds unless noted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PacingSettings {
    pub min_delay_secs: f64,
    pub jitter_max_secs: f64,
    pub human_pause_min_secs: f64,
    pub human_pause_max_secs: f64,
    pub reading_pause_probability: f64,
    pub reading_pause_min_secs: f64,
    pub reading_pause_max_secs: f64,
    pub backoff_cap_secs: f64,
    pub session_cooldown_secs: f64,
    pub poll_interval_ms: u64,
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            min_delay_secs: 10.0,
            jitter_max_secs: 3.0,
            human_pause_min_secs: 1.0,
            human_pause_max_secs: 4.0,
            reading_pause_probability: 0.12,
            reading_pause_min_secs: 5.0,
            reading_pause_max_secs: 10.0,
            backoff_cap_secs: 60.0,
            session_cooldown_secs: 90.0,
            poll_interval_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    pub ttl_hours: f64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { ttl_hours: 6.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomNiche {
    pub name: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomCategory {
    pub name: String,
    pub queries: Vec<String>,
}

/// Load and parse a TOML config file.
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_file_config(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

pub fn parse_file_config(content: &str) -> Result<FileConfig> {
    Ok(toml::from_str(content)?)
}
