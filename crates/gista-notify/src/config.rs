//! Configuration loading for the CrewAI notification client.
//!
//! Configuration is merged in priority order:
//! 1. Environment variables (highest priority)
//! 2. Configuration file (`gista.toml`)
//! 3. Built-in defaults (lowest priority)
//!
//! Environment variable names match the ones the production service
//! deployment already exports, so they do not share a common prefix.

use std::{fmt, path::Path, time::Duration};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::{
    client::ClientConfig,
    error::{NotifyError, Result},
    retry::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY},
};

/// Configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = "gista.toml";

/// Production CrewAI deployment, used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://api-yufqiolzaa-uc.a.run.app";

/// Variable holding the service-to-service API key.
pub const API_KEY_VAR: &str = "SERVICE_API_KEY";

/// Variables that must be present for the client to work.
pub const REQUIRED_VARS: [&str; 2] = ["CREW_AI_API_BASE_URL", API_KEY_VAR];

/// Raw notification settings before validation.
#[derive(Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// CrewAI base URL.
    ///
    /// Environment variable: `CREW_AI_API_BASE_URL`, falling back to
    /// `API_BASE_URL`
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Service-to-service API key.
    ///
    /// Environment variable: `SERVICE_API_KEY`
    #[serde(default)]
    pub api_key: Option<String>,
    /// Attempts per request, including the first.
    ///
    /// Environment variable: `API_MAX_RETRIES`
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Pause between attempts in seconds.
    ///
    /// Environment variable: `API_RETRY_DELAY`
    #[serde(default = "default_retry_delay")]
    pub retry_delay_seconds: u64,
    /// Per-attempt request timeout in seconds.
    ///
    /// Environment variable: `API_TIMEOUT`
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl NotifyConfig {
    /// Loads configuration from defaults, `gista.toml` and the environment.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Configuration` if a source holds a value of the
    /// wrong type.
    pub fn load() -> Result<Self> {
        Self::load_from(CONFIG_FILE)
    }

    /// Loads configuration using `path` as the configuration file.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Configuration` if a source holds a value of the
    /// wrong type.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config: Self = Self::figment(path)
            .extract()
            .map_err(|e| NotifyError::configuration(format!("failed to load configuration: {e}")))?;

        tracing::info!(base_url = %config.base_url(), "Notification configuration loaded");
        Ok(config)
    }

    /// Builds the layered configuration sources.
    ///
    /// The API key is read verbatim rather than through `Env`, which would
    /// parse `007123` as the number `7123`.
    pub fn figment(path: impl AsRef<Path>) -> Figment {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(env_var("API_BASE_URL", "base_url"))
            .merge(env_var("CREW_AI_API_BASE_URL", "base_url"))
            .merge(env_var("API_MAX_RETRIES", "max_retries"))
            .merge(env_var("API_RETRY_DELAY", "retry_delay_seconds"))
            .merge(env_var("API_TIMEOUT", "timeout_seconds"));

        match Env::var(API_KEY_VAR) {
            Some(api_key) => figment.merge(Serialized::default("api_key", api_key)),
            None => figment,
        }
    }

    /// Returns the base URL in the form described by [`normalize_base_url`].
    pub fn base_url(&self) -> String {
        normalize_base_url(&self.base_url)
    }

    /// Returns the API key with everything after the first four characters
    /// masked, for logging.
    pub fn api_key_masked(&self) -> String {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => {
                let visible: String = key.chars().take(4).collect();
                format!("{visible}***")
            },
            _ => "<not set>".to_string(),
        }
    }

    /// Validates the settings and converts them into a client configuration.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Configuration` when the API key is missing or
    /// blank, or when `max_retries` is zero.
    pub fn to_client_config(&self) -> Result<ClientConfig> {
        let api_key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                NotifyError::configuration("SERVICE_API_KEY environment variable is not set")
            })?;

        if self.max_retries == 0 {
            return Err(NotifyError::configuration("max_retries must be at least 1"));
        }

        Ok(ClientConfig {
            base_url: self.base_url(),
            api_key: api_key.to_string(),
            max_retries: self.max_retries,
            retry_delay: Duration::from_secs(self.retry_delay_seconds),
            timeout: Duration::from_secs(self.timeout_seconds),
            user_agent: self.user_agent.clone(),
        })
    }

    /// Reports which required environment variables are set.
    pub fn required_vars() -> Vec<VarStatus> {
        REQUIRED_VARS
            .into_iter()
            .map(|name| VarStatus {
                name,
                set: Env::var(name).is_some_and(|value| !value.trim().is_empty()),
            })
            .collect()
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            max_retries: default_max_retries(),
            retry_delay_seconds: default_retry_delay(),
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl fmt::Debug for NotifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key_masked())
            .field("max_retries", &self.max_retries)
            .field("retry_delay_seconds", &self.retry_delay_seconds)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Presence of one required environment variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VarStatus {
    /// Variable name.
    pub name: &'static str,
    /// Whether it holds a non-blank value.
    pub set: bool,
}

/// Maps a single environment variable onto a configuration key.
fn env_var(name: &'static str, key: &'static str) -> Env {
    Env::raw().only(&[name]).map(move |_| key.into())
}

/// Strips surrounding whitespace, trailing slashes and a trailing `/api`.
///
/// Endpoint paths already start with `/api`, so a base URL copied from
/// API documentation would otherwise produce `/api/api/...`. A blank value
/// falls back to [`DEFAULT_BASE_URL`].
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return DEFAULT_BASE_URL.to_string();
    }

    match trimmed.strip_suffix("/api") {
        Some(stripped) => {
            tracing::debug!(base_url = stripped, "Removed trailing /api from base URL");
            stripped.trim_end_matches('/').to_string()
        },
        None => trimmed.to_string(),
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_retry_delay() -> u64 {
    DEFAULT_RETRY_DELAY.as_secs()
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("gista-notify/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_key(key: &str) -> NotifyConfig {
        NotifyConfig { api_key: Some(key.to_string()), ..Default::default() }
    }

    #[test]
    fn defaults_match_service_conventions() {
        let config = NotifyConfig::default();

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay_seconds, 1);
        assert_eq!(config.timeout_seconds, 30);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn trailing_api_segment_is_stripped() {
        let cases = [
            ("https://crew.example.com/api", "https://crew.example.com"),
            ("https://crew.example.com/api/", "https://crew.example.com"),
            ("https://crew.example.com/", "https://crew.example.com"),
            ("https://crew.example.com/apis", "https://crew.example.com/apis"),
            ("   ", DEFAULT_BASE_URL),
        ];

        for (raw, expected) in cases {
            let config = NotifyConfig { base_url: raw.to_string(), ..with_key("k") };
            assert_eq!(config.base_url(), expected, "base url {raw:?}");
        }
    }

    #[test]
    fn missing_api_key_is_a_configuration_error() {
        let missing = NotifyConfig::default().to_client_config();
        assert!(matches!(missing, Err(NotifyError::Configuration { .. })));

        let blank = with_key("   ").to_client_config();
        assert!(matches!(blank, Err(NotifyError::Configuration { .. })));
    }

    #[test]
    fn zero_retries_rejected() {
        let config = NotifyConfig { max_retries: 0, ..with_key("k") };
        assert!(matches!(config.to_client_config(), Err(NotifyError::Configuration { .. })));
    }

    #[test]
    fn client_config_conversion() {
        let config = NotifyConfig {
            base_url: "https://crew.example.com/api".to_string(),
            retry_delay_seconds: 2,
            timeout_seconds: 10,
            ..with_key(" secret-key ")
        };

        let client_config = config.to_client_config().unwrap();

        assert_eq!(client_config.base_url, "https://crew.example.com");
        assert_eq!(client_config.api_key, "secret-key");
        assert_eq!(client_config.retry_delay, Duration::from_secs(2));
        assert_eq!(client_config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn api_key_never_printed() {
        let config = with_key("supersecret");

        assert_eq!(config.api_key_masked(), "supe***");
        assert!(!format!("{config:?}").contains("supersecret"));
        assert_eq!(NotifyConfig::default().api_key_masked(), "<not set>");
    }
}
