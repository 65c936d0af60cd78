use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Data directory path
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Log level used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Owner recorded on newly registered feeds
    #[serde(default = "default_user_name")]
    pub user_name: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            user_name: default_user_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Time between scrape cycles, as a duration string ("30s", "1m", "1h30m")
    #[serde(default = "default_interval")]
    pub interval: String,
    /// Per-fetch deadline in seconds
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// User-Agent header sent with every feed request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Largest feed body accepted, in bytes
    #[serde(default = "default_max_feed_bytes")]
    pub max_feed_bytes: usize,
    /// Scrape cycles started per tick
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Skip items with an unparsable pubDate instead of aborting the cycle
    #[serde(default)]
    pub skip_invalid_dates: bool,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            request_timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            max_feed_bytes: default_max_feed_bytes(),
            concurrency: default_concurrency(),
            skip_invalid_dates: false,
        }
    }
}

impl ScrapeConfig {
    /// Parsed scrape interval
    pub fn interval(&self) -> crate::Result<Duration> {
        parse_interval(&self.interval)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gator")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_user_name() -> String {
    "gator".to_string()
}

fn default_interval() -> String {
    "1m".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    "gator".to_string()
}

fn default_max_feed_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_concurrency() -> usize {
    1
}

/// Parse a duration string made of number/unit pairs, e.g. "90s", "1m",
/// "1h30m", "1.5h", "250ms". Valid units are ns, us (or µs), ms, s, m, h.
///
/// The result must be strictly positive.
pub fn parse_interval(input: &str) -> crate::Result<Duration> {
    let invalid = |reason: &str| {
        crate::Error::Config(format!("invalid interval {:?}: {}", input, reason))
    };

    let mut rest = input.trim();
    if rest.is_empty() {
        return Err(invalid("empty duration"));
    }

    let mut total_nanos = 0f64;

    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_end == 0 {
            return Err(invalid("expected a number"));
        }
        let value: f64 = rest[..number_end]
            .parse()
            .map_err(|_| invalid("malformed number"))?;
        rest = &rest[number_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_end] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => return Err(invalid("missing unit")),
            _ => return Err(invalid("unknown unit")),
        };
        rest = &rest[unit_end..];

        total_nanos += value * scale;
    }

    if total_nanos < 1.0 {
        return Err(invalid("interval must be positive"));
    }
    if total_nanos > u64::MAX as f64 {
        return Err(invalid("interval too large"));
    }

    Ok(Duration::from_nanos(total_nanos.round() as u64))
}

/// Expand tilde (~) in path to user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if let Some(stripped) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        } else if path_str == "~" {
            if let Some(home) = dirs::home_dir() {
                return home;
            }
        }
    }
    path.to_path_buf()
}

impl AppConfig {
    /// Load configuration from the default location or return defaults
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific file, falling back to defaults when it is missing
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> crate::Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&config_path, self.to_toml()?)?;

        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> crate::Result<String> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Get the configuration file path
    /// Always uses ~/.config/gator/config.toml on all platforms
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("gator")
            .join("config.toml")
    }

    /// Get the database file path
    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join("gator.db")
    }

    /// Get the data directory (with tilde expansion)
    pub fn data_dir(&self) -> PathBuf {
        expand_tilde(&self.general.data_dir)
    }
}
