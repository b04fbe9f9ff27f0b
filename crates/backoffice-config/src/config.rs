//! Configuration for the back-office API client.

use crate::{ConfigError, ConfigResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Backend used when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default proactive refresh interval. The backend issues access cookies with a
/// five minute lifetime, so this must stay below 300.
pub const DEFAULT_PROACTIVE_REFRESH_SECS: u64 = 240;

const ENV_API_URL: &str = "COFFEESHOP_API_URL";
const ENV_LOG_LEVEL: &str = "COFFEESHOP_LOG_LEVEL";

/// Paths of the authentication endpoints on the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Current user ("who am I").
    pub me: String,
    /// Access-token refresh using the refresh cookie.
    pub refresh: String,
    /// Server-side session invalidation.
    pub logout: String,
    /// Username/password login that sets the session cookies.
    pub login: String,
    /// Account registration.
    pub register: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            me: "/me/".to_string(),
            refresh: "/api/token/refresh/".to_string(),
            logout: "/api/logout/".to_string(),
            login: "/api/login/".to_string(),
            register: "/api/register/".to_string(),
        }
    }
}

impl Endpoints {
    /// Returns true if `path` is one of the authentication endpoints.
    ///
    /// Query strings are ignored.
    pub fn is_auth_endpoint(&self, path: &str) -> bool {
        let path = path.split('?').next().unwrap_or(path);
        [
            &self.me,
            &self.refresh,
            &self.logout,
            &self.login,
            &self.register,
        ]
        .iter()
        .any(|endpoint| endpoint.as_str() == path)
    }
}

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Backend base URL.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Authentication endpoint paths.
    #[serde(default)]
    pub endpoints: Endpoints,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Proactive refresh interval in seconds; `null` disables the timer.
    #[serde(default = "default_proactive_refresh_secs")]
    pub proactive_refresh_secs: Option<u64>,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_proactive_refresh_secs() -> Option<u64> {
    Some(DEFAULT_PROACTIVE_REFRESH_SECS)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api_base_url: default_api_base_url(),
            endpoints: Endpoints::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            proactive_refresh_secs: default_proactive_refresh_secs(),
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file if present, falling back to
    /// defaults, then apply environment overrides.
    pub fn load(paths: &Paths) -> ConfigResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            debug!(path = %config_path.display(), "Loading config file");
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> ConfigResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Override configuration from process environment variables.
    fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply `COFFEESHOP_API_URL` and `COFFEESHOP_LOG_LEVEL` using `lookup`.
    ///
    /// Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(url) = non_empty(ENV_API_URL) {
            self.api_base_url = url;
        }
        if let Some(level) = non_empty(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> ConfigResult<()> {
        self.api_base_url()?;

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        for path in [
            &self.endpoints.me,
            &self.endpoints.refresh,
            &self.endpoints.logout,
            &self.endpoints.login,
            &self.endpoints.register,
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid(format!(
                    "endpoint path must start with '/': {path}"
                )));
            }
        }

        Ok(())
    }

    /// Get the backend base URL as a parsed URL. Only http and https are accepted.
    pub fn api_base_url(&self) -> ConfigResult<Url> {
        let url = Url::parse(&self.api_base_url)?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::Invalid(format!(
                "unsupported API URL scheme: {other}"
            ))),
        }
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Proactive refresh interval, or `None` when disabled.
    pub fn proactive_refresh_interval(&self) -> Option<Duration> {
        self.proactive_refresh_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}
