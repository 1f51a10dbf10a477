//! Application configuration loaded from environment variables.

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use userbot_client::{
    Credentials, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, DEFAULT_WAIT_TIMEOUT,
};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Userbot credentials and endpoint
    pub userbot: UserbotConfig,

    /// HTTP transport configuration
    #[serde(default)]
    pub http: HttpConfig,

    /// Request polling configuration
    #[serde(default)]
    pub poll: PollConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserbotConfig {
    /// Userbot API token
    pub api_token: SecretString,

    /// Signature key; enables signed requests and webhook verification
    #[serde(default)]
    pub signature_key: Option<SecretString>,

    /// API base URL override
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    /// Interval between status checks
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub interval: Duration,

    /// How long to wait for a request to complete
    #[serde(default = "default_poll_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
            timeout: default_poll_timeout(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

fn default_poll_timeout() -> Duration {
    DEFAULT_WAIT_TIMEOUT
}

fn default_log_level() -> String {
    "info".into()
}

impl UserbotConfig {
    /// Credentials for the configured generation. A blank signature key
    /// selects the legacy protocol.
    pub fn credentials(&self) -> Credentials {
        let token = self.api_token.expose_secret().clone();
        match &self.signature_key {
            Some(key) if !key.expose_secret().trim().is_empty() => {
                Credentials::signed(token, key.expose_secret().clone())
            }
            _ => Credentials::new(token),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Self::build(config::Config::builder().add_source(
            config::Environment::default()
                .separator("__")
                // Tokens may look numeric; keep strings as strings.
                .try_parsing(false),
        ))
    }

    fn build(builder: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use userbot_client::Generation;

    fn builder() -> config::ConfigBuilder<config::builder::DefaultState> {
        config::Config::builder()
            .set_override("userbot.api_token", "test-token")
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = Config::build(builder()).unwrap();

        assert_eq!(config.http.timeout, Duration::from_secs(5));
        assert_eq!(config.http.user_agent, "Robot");
        assert_eq!(config.poll.interval, Duration::from_secs(1));
        assert_eq!(config.poll.timeout, Duration::from_secs(10));
        assert_eq!(config.log.level, "info");
        assert!(config.userbot.endpoint.is_none());
        assert_eq!(config.userbot.credentials().generation(), Generation::Legacy);
    }

    #[test]
    fn test_overrides() {
        let config = Config::build(
            builder()
                .set_override("userbot.signature_key", "key")
                .unwrap()
                .set_override("userbot.endpoint", "http://localhost:8080")
                .unwrap()
                .set_override("poll.interval", "250ms")
                .unwrap()
                .set_override("http.timeout", "2s")
                .unwrap(),
        )
        .unwrap();

        let credentials = config.userbot.credentials();
        assert_eq!(credentials.generation(), Generation::Signed);
        assert_eq!(credentials.api_token(), "test-token");
        assert_eq!(config.poll.interval, Duration::from_millis(250));
        assert_eq!(config.http.timeout, Duration::from_secs(2));
        assert_eq!(
            config.userbot.endpoint.as_deref(),
            Some("http://localhost:8080")
        );
    }

    #[test]
    fn test_blank_signature_key_is_legacy() {
        let config = Config::build(
            builder()
                .set_override("userbot.signature_key", "  ")
                .unwrap(),
        )
        .unwrap();

        assert_eq!(config.userbot.credentials().generation(), Generation::Legacy);
    }

    #[test]
    fn test_api_token_required() {
        assert!(Config::build(config::Config::builder()).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config::build(builder()).unwrap();
        assert!(!format!("{config:?}").contains("test-token"));
    }
}
