//! Configuration loading for Shopfront.
//!
//! Reads `~/.shopfront/config.toml` (or the file named by `SHOPFRONT_CONFIG`).
//! A missing file is not an error: every setting has a default. String values
//! may reference environment variables as `${VAR}`.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_PATH_ENV: &str = "SHOPFRONT_CONFIG";
pub const BASE_URL_ENV: &str = "SHOPFRONT_API_BASE_URL";

pub const DEFAULT_BASE_URL: &str = "https://shop.example.com";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RESEND_COOLDOWN_SECS: u32 = 60;
pub const DEFAULT_EMAIL_REDIRECT_DELAY_SECS: u64 = 3;

// Default value function for serde (bool::default() is false, so only true needs a fn)
const fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
pub struct ShopfrontConfig {
    pub api: Option<ApiConfig>,
    pub verification: Option<VerificationConfig>,
    pub session: Option<SessionConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    /// Refuse plain-HTTP backends. Default: true.
    #[serde(default = "default_true")]
    pub https_only: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout_secs: None,
            https_only: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct VerificationConfig {
    /// Seconds before another OTP may be requested. Default: 60.
    pub resend_cooldown_secs: Option<u32>,
    /// Delay before leaving a confirmed email link for the login page. Default: 3.
    pub email_redirect_delay_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionConfig {
    /// Where issued credentials are persisted. Default: `~/.shopfront/session.json`.
    pub path: Option<String>,
}

/// Resolved backend settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    pub base_url: String,
    pub request_timeout: Duration,
    pub https_only: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            https_only: true,
        }
    }
}

/// Resolved timing settings for the verification flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationSettings {
    pub resend_cooldown_secs: u32,
    pub email_redirect_delay: Duration,
}

impl Default for VerificationSettings {
    fn default() -> Self {
        Self {
            resend_cooldown_secs: DEFAULT_RESEND_COOLDOWN_SECS,
            email_redirect_delay: Duration::from_secs(DEFAULT_EMAIL_REDIRECT_DELAY_SECS),
        }
    }
}

pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var = &after[..end];
                if var.is_empty() {
                    out.push_str("${}");
                } else {
                    out.push_str(&env::var(var).unwrap_or_default());
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

/// Expand a leading `~/` to the home directory.
#[must_use]
pub fn expand_home(value: &str) -> PathBuf {
    if let Some(rest) = value.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(value)
}

#[must_use]
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".shopfront"))
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var(CONFIG_PATH_ENV)
        && !path.trim().is_empty()
    {
        return Some(expand_home(path.trim()));
    }
    config_dir().map(|dir| dir.join("config.toml"))
}

impl ShopfrontConfig {
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let path = match config_path() {
            Some(path) => path,
            None => return Ok(None),
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(config),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// Backend settings, with `SHOPFRONT_API_BASE_URL` taking precedence over
    /// the file.
    #[must_use]
    pub fn api_settings(&self) -> ApiSettings {
        let defaults = ApiSettings::default();
        let section = self.api.as_ref();

        let from_env = env::var(BASE_URL_ENV)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let base_url = from_env
            .or_else(|| {
                section
                    .and_then(|api| api.base_url.as_deref())
                    .map(expand_env_vars)
                    .map(|value| value.trim().to_string())
                    .filter(|value| !value.is_empty())
            })
            .unwrap_or(defaults.base_url);

        let request_timeout = match section.and_then(|api| api.request_timeout_secs) {
            Some(0) => {
                tracing::warn!("api.request_timeout_secs must be positive; using default");
                defaults.request_timeout
            }
            Some(secs) => Duration::from_secs(secs),
            None => defaults.request_timeout,
        };

        ApiSettings {
            base_url,
            request_timeout,
            https_only: section.is_none_or(|api| api.https_only),
        }
    }

    #[must_use]
    pub fn verification_settings(&self) -> VerificationSettings {
        let defaults = VerificationSettings::default();
        let section = self.verification.as_ref();

        let resend_cooldown_secs = match section.and_then(|v| v.resend_cooldown_secs) {
            Some(0) => {
                tracing::warn!("verification.resend_cooldown_secs must be positive; using default");
                defaults.resend_cooldown_secs
            }
            Some(secs) => secs,
            None => defaults.resend_cooldown_secs,
        };

        let email_redirect_delay = match section.and_then(|v| v.email_redirect_delay_secs) {
            Some(0) => {
                tracing::warn!(
                    "verification.email_redirect_delay_secs must be positive; using default"
                );
                defaults.email_redirect_delay
            }
            Some(secs) => Duration::from_secs(secs),
            None => defaults.email_redirect_delay,
        };

        VerificationSettings {
            resend_cooldown_secs,
            email_redirect_delay,
        }
    }

    /// Location of the persisted session file, if one can be determined.
    #[must_use]
    pub fn session_path(&self) -> Option<PathBuf> {
        self.session
            .as_ref()
            .and_then(|session| session.path.as_deref())
            .map(expand_env_vars)
            .filter(|value| !value.trim().is_empty())
            .map(|value| expand_home(value.trim()))
            .or_else(|| config_dir().map(|dir| dir.join("session.json")))
    }
}
