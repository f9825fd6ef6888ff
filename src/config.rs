//! Configuration loading.
//!
//! Configuration is loaded from a TOML file with the following resolution
//! order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.heimdall/config.toml` (user)
//! 3. `/etc/heimdall/config.toml` (system)
//! 4. built-in defaults
//!
//! Environment variables are applied on top of whatever the file said, so a
//! deployment can override single values without shipping a file.

use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::collect::SourceEndpoint;
use crate::fetch::RetryConfig;
use crate::source::Source;
use crate::store::persist::default_dump_path;
use crate::{HeimdallError, Result};

const HOUR: u64 = 3600;

/// Daemon and gateway configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub position: PositionConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Upstream HTTP behaviour shared by every collector.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Whole-call timeout per attempt (default: 30).
    pub timeout_secs: u64,
    /// Attempts including the first one (default: 3).
    pub max_retries: u32,
    pub backoff_initial_ms: u64,
    pub backoff_max_ms: u64,
    pub backoff_jitter_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            backoff_initial_ms: 1_000,
            backoff_max_ms: 10_000,
            backoff_jitter_ms: 2_000,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new()
            .max_attempts(self.max_retries)
            .initial_delay(Duration::from_millis(self.backoff_initial_ms))
            .max_delay(Duration::from_millis(self.backoff_max_ms))
            .jitter(Duration::from_millis(self.backoff_jitter_ms))
    }
}

/// Upstream endpoints and credentials.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Sent as `api_key` to every NASA endpoint (default: `DEMO_KEY`).
    pub nasa_api_key: String,
    pub iss_url: String,
    pub osdr_url: String,
    pub apod_url: String,
    pub neo_url: String,
    pub donki_flr_url: String,
    pub donki_cme_url: String,
    pub spacex_url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            nasa_api_key: "DEMO_KEY".into(),
            iss_url: "https://api.wheretheiss.at/v1/satellites/25544".into(),
            osdr_url: "https://visualization.osdr.nasa.gov/biodata/api/v2/datasets/".into(),
            apod_url: "https://api.nasa.gov/planetary/apod".into(),
            neo_url: "https://api.nasa.gov/neo/rest/v1/feed".into(),
            donki_flr_url: "https://api.nasa.gov/DONKI/FLR".into(),
            donki_cme_url: "https://api.nasa.gov/DONKI/CME".into(),
            spacex_url: "https://api.spacexdata.com/v4/launches/next".into(),
        }
    }
}

impl UpstreamConfig {
    /// Endpoint for a cache-style source. SpaceX takes no key.
    pub fn endpoint(&self, source: Source) -> SourceEndpoint {
        let url = match source {
            Source::Apod => &self.apod_url,
            Source::Neo => &self.neo_url,
            Source::Flr => &self.donki_flr_url,
            Source::Cme => &self.donki_cme_url,
            Source::Spacex => return SourceEndpoint::new(&self.spacex_url),
        };
        SourceEndpoint::new(url).with_api_key(&self.nasa_api_key)
    }
}

/// Snapshot freshness and retention.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL for frequently changing sources (default: 6).
    pub ttl_short_hours: u64,
    /// TTL for daily content (default: 24).
    pub ttl_long_hours: u64,
    /// Snapshots kept per source after each collection (default: 5).
    pub keep_latest: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_short_hours: 6,
            ttl_long_hours: 24,
            keep_latest: 5,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self, source: Source) -> Duration {
        let hours = if source.uses_long_ttl() {
            self.ttl_long_hours
        } else {
            self.ttl_short_hours
        };
        Duration::from_secs(hours.saturating_mul(HOUR))
    }
}

/// Poll interval per job, in seconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub iss_secs: u64,
    pub osdr_secs: u64,
    pub apod_secs: u64,
    pub neo_secs: u64,
    pub flr_secs: u64,
    pub cme_secs: u64,
    pub spacex_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            iss_secs: 120,
            osdr_secs: 600,
            apod_secs: 24 * HOUR,
            neo_secs: 2 * HOUR,
            flr_secs: HOUR,
            cme_secs: HOUR,
            spacex_secs: HOUR,
        }
    }
}

impl ScheduleConfig {
    pub fn iss_interval(&self) -> Duration {
        Duration::from_secs(self.iss_secs)
    }

    pub fn osdr_interval(&self) -> Duration {
        Duration::from_secs(self.osdr_secs)
    }

    pub fn source_interval(&self, source: Source) -> Duration {
        Duration::from_secs(match source {
            Source::Apod => self.apod_secs,
            Source::Neo => self.neo_secs,
            Source::Flr => self.flr_secs,
            Source::Cme => self.cme_secs,
            Source::Spacex => self.spacex_secs,
        })
    }
}

/// Orbital-telemetry read and retention windows.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PositionConfig {
    /// Newest position older than this is reported as no data (default: 10).
    pub freshness_minutes: u64,
    /// Positions older than this are purged after each collection (default: 14).
    pub retention_days: u64,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            freshness_minutes: 10,
            retention_days: 14,
        }
    }
}

impl PositionConfig {
    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.freshness_minutes.saturating_mul(60))
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_days.saturating_mul(24 * HOUR))
    }
}

/// Store dump location.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Where the daemon dumps the store on shutdown. Defaults to
    /// `~/.cache/heimdall/store.json`.
    pub snapshot_path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn dump_path(&self) -> PathBuf {
        self.snapshot_path.clone().unwrap_or_else(default_dump_path)
    }
}

impl Config {
    /// Load configuration from the standard locations, then apply
    /// environment overrides.
    ///
    /// An explicit path must exist. Without one, the first existing file of
    /// `~/.heimdall/config.toml` and `/etc/heimdall/config.toml` is used, or
    /// the built-in defaults if neither exists.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a single TOML file, without environment overrides.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HeimdallError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            HeimdallError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(HeimdallError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".heimdall").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc/heimdall/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    /// Override values from environment-style key/value pairs.
    ///
    /// `lookup` returns the raw value for a key, or `None` when unset. A
    /// value that does not parse is a configuration error naming the key.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvOverrides { lookup };

        env.string("NASA_API_KEY", &mut self.upstream.nasa_api_key);
        env.string("ISS_API_URL", &mut self.upstream.iss_url);
        env.string("OSDR_API_URL", &mut self.upstream.osdr_url);
        env.string("APOD_API_URL", &mut self.upstream.apod_url);
        env.string("NEO_API_URL", &mut self.upstream.neo_url);
        env.string("DONKI_FLR_URL", &mut self.upstream.donki_flr_url);
        env.string("DONKI_CME_URL", &mut self.upstream.donki_cme_url);
        env.string("SPACEX_API_URL", &mut self.upstream.spacex_url);

        env.parse("HTTP_TIMEOUT_SECONDS", &mut self.http.timeout_secs)?;
        env.parse("HTTP_MAX_RETRIES", &mut self.http.max_retries)?;
        env.parse("HTTP_BACKOFF_INITIAL_MS", &mut self.http.backoff_initial_ms)?;
        env.parse("HTTP_BACKOFF_MAX_MS", &mut self.http.backoff_max_ms)?;
        env.parse("HTTP_BACKOFF_JITTER_MS", &mut self.http.backoff_jitter_ms)?;

        env.parse("CACHE_TTL_SHORT_HOURS", &mut self.cache.ttl_short_hours)?;
        env.parse("CACHE_TTL_LONG_HOURS", &mut self.cache.ttl_long_hours)?;
        env.parse("CACHE_KEEP_LATEST", &mut self.cache.keep_latest)?;

        env.parse("ISS_POLL_INTERVAL_SECONDS", &mut self.schedule.iss_secs)?;
        env.parse("OSDR_POLL_INTERVAL_SECONDS", &mut self.schedule.osdr_secs)?;

        env.parse("ISS_FRESHNESS_MINUTES", &mut self.position.freshness_minutes)?;
        env.parse("ISS_RETENTION_DAYS", &mut self.position.retention_days)?;

        if let Some(path) = (env.lookup)("HEIMDALL_SNAPSHOT_PATH") {
            self.store.snapshot_path = Some(PathBuf::from(path));
        }
        Ok(())
    }
}

struct EnvOverrides<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvOverrides<F> {
    fn string(&self, key: &str, target: &mut String) {
        if let Some(value) = (self.lookup)(key) {
            *target = value;
        }
    }

    fn parse<T>(&self, key: &str, target: &mut T) -> Result<()>
    where
        T: FromStr,
        T::Err: Display,
    {
        if let Some(raw) = (self.lookup)(key) {
            *target = raw.trim().parse().map_err(|e| {
                HeimdallError::Configuration(format!("invalid value for {key} ({raw:?}): {e}"))
            })?;
        }
        Ok(())
    }
}
