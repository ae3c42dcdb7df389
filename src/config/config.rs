// SPDX-License-Identifier: GPL-3.0-only
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::photos::PhotoFormat;

/// Wire format requested from the remote catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiFormat {
    Json,
    Jsonp,
}

impl FromStr for ApiFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "jsonp" => Ok(Self::Jsonp),
            other => Err(anyhow::anyhow!("Unmanaged format: {}", other)),
        }
    }
}

/// How often the scheduled trigger fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoSyncInterval {
    Disabled,
    Hourly,
    TwiceDaily,
    Daily,
}

impl AutoSyncInterval {
    pub fn period(&self) -> Option<Duration> {
        match self {
            Self::Disabled => None,
            Self::Hourly => Some(Duration::from_secs(3600)),
            Self::TwiceDaily => Some(Duration::from_secs(12 * 3600)),
            Self::Daily => Some(Duration::from_secs(24 * 3600)),
        }
    }
}

impl FromStr for AutoSyncInterval {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "disabled" => Ok(Self::Disabled),
            "hourly" => Ok(Self::Hourly),
            "twicedaily" => Ok(Self::TwiceDaily),
            "daily" => Ok(Self::Daily),
            other => Err(anyhow::anyhow!("Unknown auto sync interval: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Key sent with every catalog request
    pub api_key: Option<String>,

    /// Remote catalog endpoint URL
    pub api_url: String,

    /// Wire format of catalog responses
    pub api_format: ApiFormat,

    /// Callback name wrapping JSONP payloads
    pub jsonp_callback: String,

    /// SQLite database holding properties, the sync lock and run logs
    pub store_db_path: PathBuf,

    /// Directory where property photos are written
    pub upload_dir: PathBuf,

    /// Local API bind address (e.g., "127.0.0.1:8080")
    pub local_api_bind: SocketAddr,

    /// Scheduled sync frequency
    pub auto_sync_interval: AutoSyncInterval,

    /// JPEG quality used when re-encoding photos (5-100)
    pub photos_quality: u8,

    /// Bounding box photos are resized into, as "WIDTHxHEIGHT"
    pub photos_size: String,

    /// Number of ads requested per catalog page
    pub page_limit: usize,

    /// Timeout of a single catalog request, in seconds
    pub request_timeout_secs: u64,

    /// Timeout of a single photo download, in seconds
    pub photo_timeout_secs: u64,

    /// Attempts made for each photo download
    pub photo_download_retries: u32,

    /// Lifetime of the sync lock, in seconds
    pub lock_ttl_secs: u64,

    /// How long a run log stays readable, in days
    pub log_retention_days: u64,

    /// Number of run timestamps kept in the history index
    pub log_history_len: usize,

    /// Host theme identifier probed by the theme adapters
    pub theme: Option<String>,

    /// Overrides the active adapter's modification time skew, in seconds
    pub timestamp_skew_secs: Option<i64>,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from TOML file with environment variable overrides
    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var("ESTATE_SYNC_CONFIG")
            .unwrap_or_else(|_| "config.toml".to_string());

        let mut config = if std::path::Path::new(&config_path).exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path))?;
            Self::from_toml_str(&contents)?
        } else {
            Config::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply `ESTATE_SYNC_*` overrides read through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("ESTATE_SYNC_API_KEY") {
            self.api_key = Some(val);
        }
        if let Some(val) = lookup("ESTATE_SYNC_API_URL") {
            self.api_url = val;
        }
        if let Some(val) = lookup("ESTATE_SYNC_API_FORMAT") {
            self.api_format = val.parse()?;
        }
        if let Some(val) = lookup("ESTATE_SYNC_STORE_DB_PATH") {
            self.store_db_path = PathBuf::from(val);
        }
        if let Some(val) = lookup("ESTATE_SYNC_UPLOAD_DIR") {
            self.upload_dir = PathBuf::from(val);
        }
        if let Some(val) = lookup("ESTATE_SYNC_LOCAL_API_BIND") {
            self.local_api_bind = SocketAddr::from_str(&val)?;
        }
        if let Some(val) = lookup("ESTATE_SYNC_AUTO_SYNC_INTERVAL") {
            self.auto_sync_interval = val.parse()?;
        }
        if let Some(val) = lookup("ESTATE_SYNC_PHOTOS_QUALITY") {
            self.photos_quality = val.parse()?;
        }
        if let Some(val) = lookup("ESTATE_SYNC_PHOTOS_SIZE") {
            self.photos_size = val;
        }
        if let Some(val) = lookup("ESTATE_SYNC_THEME") {
            self.theme = Some(val);
        }
        if let Some(val) = lookup("ESTATE_SYNC_TIMESTAMP_SKEW_SECS") {
            self.timestamp_skew_secs = Some(val.parse()?);
        }
        if let Some(val) = lookup("ESTATE_SYNC_LOG_LEVEL") {
            self.log_level = val;
        }
        Ok(())
    }

    /// Reject values that would only fail later, in the middle of a run
    pub fn validate(&self) -> anyhow::Result<()> {
        url::Url::parse(&self.api_url)
            .with_context(|| format!("Invalid api_url: {}", self.api_url))?;

        if !(5..=100).contains(&self.photos_quality) {
            return Err(anyhow::anyhow!(
                "photos_quality must be between 5 and 100, got {}",
                self.photos_quality
            ));
        }

        self.photo_format()?;

        if self.page_limit == 0 {
            return Err(anyhow::anyhow!("page_limit must be greater than zero"));
        }

        Ok(())
    }

    pub fn photo_format(&self) -> anyhow::Result<PhotoFormat> {
        PhotoFormat::parse(&self.photos_size, self.photos_quality)
    }

    /// The api key, if one is configured and not blank
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn lock_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.lock_ttl_secs as i64)
    }

    pub fn log_retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.log_retention_days as i64)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: String::from("http://api.gedeon.im"),
            api_format: ApiFormat::Json,
            jsonp_callback: String::from("jsonp"),
            store_db_path: PathBuf::from("estate-sync.db"),
            upload_dir: PathBuf::from("uploads"),
            local_api_bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            auto_sync_interval: AutoSyncInterval::Disabled,
            photos_quality: 55,
            photos_size: String::from("1024x768"),
            page_limit: 100,
            request_timeout_secs: 10,
            photo_timeout_secs: 30,
            photo_download_retries: 3,
            lock_ttl_secs: 120,
            log_retention_days: 7,
            log_history_len: 30,
            theme: None,
            timestamp_skew_secs: None,
            log_level: String::from("info"),
        }
    }
}
