//! Configuration management for breachwatch.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides. Credentials are never read from or
//! written to this file.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration.
///
/// This is loaded from `~/.config/breachwatch/config.toml` (or platform
/// equivalent). If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Dispatch settings shared by all providers
    pub search: SearchConfig,
    /// Have I Been Pwned settings
    pub haveibeenpwned: HibpConfig,
    /// DeHashed settings
    pub dehashed: DehashedConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit path.
    ///
    /// Unlike [`load`](Self::load), a missing file is an error.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `BREACHWATCH_DEFAULT_PROVIDERS`: comma-separated default provider list
    /// - `BREACHWATCH_TIMEOUT_SECS`: override per-call HTTP timeout
    /// - `BREACHWATCH_HIBP_QPS`: override HIBP queries per second
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup function.
    ///
    /// Unparseable values are ignored and logged.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("BREACHWATCH_DEFAULT_PROVIDERS") {
            let providers: Vec<String> = val
                .split(',')
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect();
            if !providers.is_empty() {
                tracing::debug!("Override search.default_providers from env: {:?}", providers);
                self.search.default_providers = providers;
            }
        }

        if let Some(val) = lookup("BREACHWATCH_TIMEOUT_SECS") {
            match val.parse() {
                Ok(secs) => {
                    self.search.timeout_secs = secs;
                    tracing::debug!("Override search.timeout_secs from env: {}", secs);
                }
                Err(_) => tracing::warn!("Ignoring invalid BREACHWATCH_TIMEOUT_SECS: {}", val),
            }
        }

        if let Some(val) = lookup("BREACHWATCH_HIBP_QPS") {
            match val.parse() {
                Ok(qps) => {
                    self.haveibeenpwned.queries_per_second = qps;
                    tracing::debug!("Override haveibeenpwned.queries_per_second from env: {}", qps);
                }
                Err(_) => tracing::warn!("Ignoring invalid BREACHWATCH_HIBP_QPS: {}", val),
            }
        }
    }

    /// Check value ranges.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.search.timeout_secs == 0 {
            return Err(invalid("search.timeout_secs", "must be greater than 0"));
        }
        if self.search.max_concurrent_providers == 0 {
            return Err(invalid(
                "search.max_concurrent_providers",
                "must be greater than 0",
            ));
        }
        if !self.haveibeenpwned.queries_per_second.is_finite()
            || self.haveibeenpwned.queries_per_second <= 0.0
        {
            return Err(invalid(
                "haveibeenpwned.queries_per_second",
                "must be a finite number greater than 0",
            ));
        }
        if self.dehashed.page_size == 0 {
            return Err(invalid("dehashed.page_size", "must be greater than 0"));
        }
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/breachwatch/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "breachwatch", "breachwatch")
            .ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Default Have I Been Pwned API base URL.
pub const DEFAULT_HIBP_BASE_URL: &str = "https://haveibeenpwned.com/api/v3/";

/// Default Have I Been Pwned pacing rate in queries per second.
pub const DEFAULT_HIBP_QUERIES_PER_SECOND: f64 = 5.0;

/// Default DeHashed search endpoint.
pub const DEFAULT_DEHASHED_BASE_URL: &str = "https://api.dehashed.com/v2/search";

/// Default DeHashed page size.
pub const DEFAULT_DEHASHED_PAGE_SIZE: u64 = 25;

/// Dispatch settings shared by all providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Providers queried when a request names none
    pub default_providers: Vec<String>,
    /// Per-call HTTP timeout in seconds
    pub timeout_secs: u64,
    /// Number of providers queried at once
    pub max_concurrent_providers: usize,
    /// Deadline for a whole provider invocation in seconds (0 = none)
    pub provider_deadline_secs: u64,
    /// User agent string sent when credentials carry none
    pub user_agent: String,
}

impl SearchConfig {
    /// Per-call timeout as a `Duration`.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Provider deadline, if one is configured.
    #[must_use]
    pub fn provider_deadline(&self) -> Option<Duration> {
        (self.provider_deadline_secs > 0).then(|| Duration::from_secs(self.provider_deadline_secs))
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_providers: vec!["haveibeenpwned".to_string()],
            timeout_secs: 10,
            max_concurrent_providers: 4,
            provider_deadline_secs: 0,
            user_agent: crate::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Have I Been Pwned settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HibpConfig {
    /// API base URL (must end with `/`)
    pub base_url: String,
    /// Client-side pacing rate
    pub queries_per_second: f64,
    /// Also fetch pastes by default
    pub include_pastes: bool,
    /// Also fetch the data class catalogue by default
    pub include_data_classes: bool,
}

impl Default for HibpConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_HIBP_BASE_URL.to_string(),
            queries_per_second: DEFAULT_HIBP_QUERIES_PER_SECOND,
            include_pastes: false,
            include_data_classes: false,
        }
    }
}

/// DeHashed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DehashedConfig {
    /// Search endpoint
    pub base_url: String,
    /// Default page size
    pub page_size: u64,
}

impl Default for DehashedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DEHASHED_BASE_URL.to_string(),
            page_size: DEFAULT_DEHASHED_PAGE_SIZE,
        }
    }
}
