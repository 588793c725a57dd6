//! Configuration loading and management.
//!
//! Loads configuration from embedded config.toml with environment variable overrides.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::auth::secure::SecureString;

/// Embedded configuration file content.
const CONFIG_TOML: &str = include_str!("../config.toml");

/// Placeholder prefix used by the embedded defaults for values that must be supplied.
const PLACEHOLDER_PREFIX: &str = "YOUR_";

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub modmed: ModMedConfig,
    pub token: TokenConfig,
    pub http: HttpConfig,
    pub scheduling: SchedulingConfig,
    pub logging: LoggingConfig,
}

/// Connection details for the OAuth2-protected FHIR upstream.
#[derive(Debug, Clone, Deserialize)]
pub struct ModMedConfig {
    pub base_url: String,
    pub firm_url_prefix: String,
    pub api_key: SecureString,
    pub username: String,
    pub password: SecureString,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    /// Tokens expiring within this many seconds are treated as expired.
    pub expiry_margin_seconds: u64,
    /// Lifetime assumed when the token endpoint omits `expires_in`.
    pub fallback_ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulingConfig {
    pub increment_minutes: i64,
    pub min_duration_minutes: Option<i64>,
    pub max_duration_minutes: Option<i64>,
    #[serde(default)]
    pub reject_past: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Config {
    /// Load configuration from embedded config.toml with environment variable overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::defaults()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load a `.env` file (if present) and then the configuration.
    pub fn load_with_dotenv() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            // .env file is optional
            if !e.not_found() {
                return Err(e).context("Failed to load .env file");
            }
        }
        Self::load()
    }

    /// Parse the embedded defaults without overrides or validation.
    pub fn defaults() -> Result<Self> {
        toml::from_str(CONFIG_TOML).context("Failed to parse embedded config.toml")
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = env::var("MODMED_BASE_URL") {
            self.modmed.base_url = base_url;
        }

        if let Ok(prefix) = env::var("MODMED_FIRM_URL_PREFIX") {
            self.modmed.firm_url_prefix = prefix;
        }

        if let Ok(api_key) = env::var("MODMED_API_KEY") {
            self.modmed.api_key = SecureString::new(api_key);
        }

        if let Ok(username) = env::var("MODMED_USERNAME") {
            self.modmed.username = username;
        }

        if let Ok(password) = env::var("MODMED_PASSWORD") {
            self.modmed.password = SecureString::new(password);
        }

        if let Ok(log_level) = env::var("RUST_LOG") {
            self.logging.level = log_level;
        }
    }

    /// Validate that required configuration is present.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("MODMED_FIRM_URL_PREFIX", self.modmed.firm_url_prefix.as_str()),
            ("MODMED_API_KEY", self.modmed.api_key.as_str()),
            ("MODMED_USERNAME", self.modmed.username.as_str()),
            ("MODMED_PASSWORD", self.modmed.password.as_str()),
        ];

        for (var, value) in required {
            if value.is_empty() || value.starts_with(PLACEHOLDER_PREFIX) {
                anyhow::bail!(
                    "{} not configured. Set the environment variable or update config.toml",
                    var
                );
            }
        }

        url::Url::parse(&self.modmed.base_url)
            .with_context(|| format!("Invalid MODMED_BASE_URL: {}", self.modmed.base_url))?;

        if self.scheduling.increment_minutes <= 0 {
            anyhow::bail!("scheduling.increment_minutes must be positive");
        }

        Ok(())
    }

    /// Firm-scoped root shared by the token endpoint and the FHIR API.
    fn firm_root(&self) -> String {
        format!(
            "{}/firm/{}",
            self.modmed.base_url.trim_end_matches('/'),
            self.modmed.firm_url_prefix
        )
    }

    /// Get the OAuth2 grant endpoint.
    pub fn token_url(&self) -> String {
        format!("{}/ema/ws/oauth2/grant", self.firm_root())
    }

    /// Get the FHIR API base URL.
    pub fn fhir_base_url(&self) -> String {
        format!("{}/ema/fhir/v2", self.firm_root())
    }

    pub fn expiry_margin(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.token.expiry_margin_seconds as i64)
    }

    pub fn fallback_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.token.fallback_ttl_seconds as i64)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_seconds)
    }

    pub fn http_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.http.connect_timeout_seconds)
    }
}

#[cfg(test)]
pub(crate) fn test_config(base_url: &str) -> Config {
    Config {
        modmed: ModMedConfig {
            base_url: base_url.into(),
            firm_url_prefix: "testfirm".into(),
            api_key: SecureString::from("test-api-key".to_string()),
            username: "frontdesk".into(),
            password: SecureString::from("hunter2".to_string()),
        },
        token: TokenConfig {
            expiry_margin_seconds: 60,
            fallback_ttl_seconds: 1500,
        },
        http: HttpConfig {
            timeout_seconds: 5,
            connect_timeout_seconds: 5,
        },
        scheduling: SchedulingConfig {
            increment_minutes: 5,
            min_duration_minutes: Some(15),
            max_duration_minutes: Some(480),
            reject_past: false,
        },
        logging: LoggingConfig {
            level: "info".into(),
        },
    }
}
