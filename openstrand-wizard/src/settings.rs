// Runtime configuration
//
// Sources, lowest to highest precedence:
//   built-in defaults -> `openstrand-wizard.toml` (or `--config <path>`) -> `OPENSTRAND_*` env vars
//
// IMPORTANT: `auth_token` is a Supabase session token. Never log it unmasked.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::utils::logging::{mask_sensitive, redact_url_query};

pub const DEFAULT_CONFIG_FILE: &str = "openstrand-wizard";
pub const DEFAULT_API_BASE_URL: &str = "https://api.openstrand.ai/api/v1";
pub const DEFAULT_POST_PUBLISH_ROUTE: &str = "/catalog";
pub const ENV_PREFIX: &str = "OPENSTRAND";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone, Deserialize)]
pub struct WizardConfig {
    pub api_base_url: String,
    #[serde(default)]
    pub auth_token: Option<String>,
    pub request_timeout_secs: u64,
    pub post_publish_route: String,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl std::fmt::Debug for WizardConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WizardConfig")
            .field("api_base_url", &self.api_base_url)
            .field("auth_token", &self.auth_token.as_deref().map(mask_sensitive))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("post_publish_route", &self.post_publish_route)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            auth_token: None,
            request_timeout_secs: 30,
            post_publish_route: DEFAULT_POST_PUBLISH_ROUTE.to_string(),
            log_dir: None,
        }
    }
}

impl WizardConfig {
    /// Load configuration. With `path = None` the default file is optional; an explicit
    /// path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let defaults = WizardConfig::default();
        let mut builder = config::Config::builder()
            .set_default("api_base_url", defaults.api_base_url)?
            .set_default("request_timeout_secs", defaults.request_timeout_secs)?
            .set_default("post_publish_route", defaults.post_publish_route)?;

        builder = match path {
            Some(p) => builder.add_source(config::File::from(p).required(true)),
            None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        let cfg: WizardConfig = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;

        cfg.normalized().validate()
    }

    fn normalized(mut self) -> Self {
        self.api_base_url = self.api_base_url.trim().trim_end_matches('/').to_string();
        self.auth_token = self
            .auth_token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        self
    }

    pub fn validate(self) -> Result<Self, SettingsError> {
        let parsed = url::Url::parse(&self.api_base_url).map_err(|e| {
            SettingsError::Invalid(format!("api_base_url '{}': {}", self.api_base_url, e))
        })?;
        if parsed.scheme() != "https" && parsed.scheme() != "http" {
            return Err(SettingsError::Invalid(format!(
                "api_base_url must use http or https (got '{}')",
                parsed.scheme()
            )));
        }
        if !(1..=600).contains(&self.request_timeout_secs) {
            return Err(SettingsError::Invalid(
                "request_timeout_secs must be between 1 and 600".to_string(),
            ));
        }
        if !self.post_publish_route.starts_with('/') {
            return Err(SettingsError::Invalid(
                "post_publish_route must start with '/'".to_string(),
            ));
        }
        Ok(self)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    pub fn base_url_for_log(&self) -> String {
        redact_url_query(&self.api_base_url)
    }
}
