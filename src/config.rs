// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from a static JSON file and environment variables.
//!
//! The file describes which scheduler modules and OAuth providers are
//! enabled. Secrets are normally injected as environment variables and
//! override whatever the file contains. Configuration is resolved once at
//! startup and never mutated afterwards.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::path::Path;
use validator::Validate;

/// Default location of the static configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/app.json";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Frontend URL for OAuth redirects and CORS
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
    /// Document store backend
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Master switch for all scheduler modules.
    #[serde(default = "default_true")]
    pub scheduler_enabled: bool,
    /// Scheduler modules to run, in registration order.
    #[serde(default)]
    pub scheduler_modules: Vec<String>,
    /// Tuning for the scheduler jobs.
    #[serde(default)]
    pub scheduler: SchedulerSettings,

    /// OAuth provider settings keyed by provider name (e.g. "strava").
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderSettings>,
    /// Additional remote services (name -> base URL), e.g. "payout".
    #[serde(default)]
    pub remote_services: BTreeMap<String, String>,

    // --- Secrets (normally from env) ---
    /// Secret used to derive the token encryption key
    #[serde(default)]
    pub token_encryption_key: String,
    /// HMAC key for signing the OAuth state parameter
    #[serde(default)]
    pub oauth_state_key: String,
}

/// Which document store to connect to.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DatabaseConfig {
    /// Google Cloud Firestore (set FIRESTORE_EMULATOR_HOST for the emulator).
    Firestore {
        #[serde(rename = "projectId")]
        project_id: String,
    },
    /// Process-local store, for development and tests.
    #[default]
    Memory,
}

/// Intervals and batch sizes for scheduler jobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerSettings {
    #[serde(default = "default_payout_interval")]
    pub payout_interval_secs: u64,
    #[serde(default = "default_payout_batch_size")]
    pub payout_batch_size: usize,
    #[serde(default = "default_token_refresh_interval")]
    pub token_refresh_interval_secs: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            payout_interval_secs: default_payout_interval(),
            payout_batch_size: default_payout_batch_size(),
            token_refresh_interval_secs: default_token_refresh_interval(),
        }
    }
}

/// Settings for one OAuth provider.
///
/// `oauth_url` is the provider's OAuth base; the driver appends
/// `/authorize`, `/token` and `/deauthorize`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProviderSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[validate(length(min = 1, message = "client_id must not be empty"))]
    pub client_id: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "client_secret must not be empty"))]
    pub client_secret: String,
    #[validate(url)]
    pub oauth_url: String,
    /// Our OAuth callback, registered with the provider
    #[validate(url)]
    pub redirect_url: String,
    /// Our webhook callback, sent when subscribing
    #[validate(url)]
    pub webhook_url: String,
    /// Provider endpoint managing webhook subscriptions
    #[validate(url)]
    pub subscribe_url: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "verify_token must not be empty"))]
    pub verify_token: String,
    /// Provider REST API base
    #[serde(default = "default_api_url")]
    #[validate(url)]
    pub api_url: String,
    #[serde(default = "default_scope")]
    pub scope: String,
}

fn default_true() -> bool {
    true
}

fn default_port() -> u16 {
    8080
}

fn default_frontend_url() -> String {
    "http://localhost:5173".to_string()
}

fn default_payout_interval() -> u64 {
    60
}

fn default_payout_batch_size() -> usize {
    25
}

fn default_token_refresh_interval() -> u64 {
    300
}

fn default_api_url() -> String {
    "https://www.strava.com/api/v3".to_string()
}

fn default_scope() -> String {
    "read,activity:read_all".to_string()
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        let mut providers = BTreeMap::new();
        providers.insert(
            "strava".to_string(),
            ProviderSettings {
                enabled: true,
                client_id: "test_client_id".to_string(),
                client_secret: "test_secret".to_string(),
                oauth_url: "https://www.strava.com/oauth".to_string(),
                redirect_url: "http://localhost:8080/oauth/strava/callback".to_string(),
                webhook_url: "http://localhost:8080/webhook/strava".to_string(),
                subscribe_url: "https://www.strava.com/api/v3/push_subscriptions".to_string(),
                verify_token: "test_verify_token".to_string(),
                api_url: default_api_url(),
                scope: default_scope(),
            },
        );

        Self {
            port: 8080,
            frontend_url: default_frontend_url(),
            database: DatabaseConfig::Memory,
            scheduler_enabled: true,
            scheduler_modules: Vec::new(),
            scheduler: SchedulerSettings::default(),
            providers,
            remote_services: BTreeMap::new(),
            token_encryption_key: "test_token_key_32_bytes_minimum!".to_string(),
            oauth_state_key: "test_state_key".to_string(),
        }
    }
}

impl Config {
    /// Default config for tests.
    pub fn test_default() -> Self {
        Self::default()
    }

    /// Load configuration from the static file and environment variables.
    ///
    /// The file path comes from `APP_CONFIG`; when unset, `config/app.json`
    /// is used if present and an empty document otherwise.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let raw = match env::var("APP_CONFIG") {
            Ok(path) => read_config_file(&path)?,
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                read_config_file(DEFAULT_CONFIG_PATH)?
            }
            Err(_) => "{}".to_string(),
        };

        let mut config = Self::from_json_str(&raw)?;
        config.apply_env_overrides(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration document without env overrides or validation.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply environment overrides using `lookup` to resolve variable names.
    ///
    /// Provider secrets use `{PROVIDER}_CLIENT_ID`, `{PROVIDER}_CLIENT_SECRET`
    /// and `{PROVIDER}_VERIFY_TOKEN` (provider name upper-cased).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT").and_then(|v| v.parse().ok()) {
            self.port = port;
        }
        if let Some(url) = lookup("FRONTEND_URL") {
            self.frontend_url = url;
        }
        if let Some(project_id) = lookup("GCP_PROJECT_ID") {
            self.database = DatabaseConfig::Firestore { project_id };
        }
        if let Some(modules) = lookup("SCHEDULER_MODULES") {
            self.scheduler_modules = modules
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(enabled) = lookup("SCHEDULER_ENABLED") {
            self.scheduler_enabled = matches!(enabled.trim(), "1" | "true" | "yes");
        }
        if let Some(key) = lookup("TOKEN_ENCRYPTION_KEY") {
            self.token_encryption_key = key.trim().to_string();
        }
        if let Some(key) = lookup("OAUTH_STATE_KEY") {
            self.oauth_state_key = key.trim().to_string();
        }

        for (name, settings) in self.providers.iter_mut() {
            let prefix = name.to_uppercase();
            if let Some(v) = lookup(&format!("{}_CLIENT_ID", prefix)) {
                settings.client_id = v.trim().to_string();
            }
            if let Some(v) = lookup(&format!("{}_CLIENT_SECRET", prefix)) {
                settings.client_secret = v.trim().to_string();
            }
            if let Some(v) = lookup(&format!("{}_VERIFY_TOKEN", prefix)) {
                settings.verify_token = v.trim().to_string();
            }
        }
    }

    /// Check secrets are present and every enabled provider is well-formed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_encryption_key.is_empty() {
            return Err(ConfigError::Missing("TOKEN_ENCRYPTION_KEY"));
        }
        if self.oauth_state_key.is_empty() {
            return Err(ConfigError::Missing("OAUTH_STATE_KEY"));
        }

        // `tokio::time::interval` panics on a zero period.
        if self.scheduler.payout_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "scheduler.payoutIntervalSecs must be positive".to_string(),
            ));
        }
        if self.scheduler.token_refresh_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "scheduler.tokenRefreshIntervalSecs must be positive".to_string(),
            ));
        }

        for (name, settings) in self.providers.iter().filter(|(_, s)| s.enabled) {
            settings
                .validate()
                .map_err(|e| ConfigError::Invalid(format!("provider {}: {}", name, e)))?;
        }

        for (name, url) in &self.remote_services {
            reqwest::Url::parse(url)
                .map_err(|e| ConfigError::Invalid(format!("remote service {}: {}", name, e)))?;
        }

        Ok(())
    }

    /// Settings for an enabled provider.
    pub fn provider(&self, name: &str) -> Option<&ProviderSettings> {
        self.providers.get(name).filter(|s| s.enabled)
    }
}

fn read_config_file(path: &str) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::Io(format!("{}: {}", path, e)))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Failed to read configuration file {0}")]
    Io(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"{
        "port": 9000,
        "schedulerModules": ["payout-queue", "token-refresh"],
        "providers": {
            "strava": {
                "client_id": "1234",
                "oauth_url": "https://www.strava.com/oauth",
                "redirect_url": "https://api.example.com/oauth/strava/callback",
                "webhook_url": "https://api.example.com/webhook/strava",
                "subscribe_url": "https://www.strava.com/api/v3/push_subscriptions"
            }
        },
        "remoteServices": { "payout": "https://payout.example.com" }
    }"#;

    fn env_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_config_from_json_defaults() {
        let config = Config::from_json_str(SAMPLE).expect("Config should parse");

        assert_eq!(config.port, 9000);
        assert_eq!(config.frontend_url, "http://localhost:5173");
        assert_eq!(config.database, DatabaseConfig::Memory);
        assert!(config.scheduler_enabled);
        assert_eq!(config.scheduler_modules, vec!["payout-queue", "token-refresh"]);

        let strava = config.provider("strava").expect("strava configured");
        assert!(strava.enabled);
        assert_eq!(strava.api_url, "https://www.strava.com/api/v3");
        assert!(strava.client_secret.is_empty());
    }

    #[test]
    fn test_env_overrides_secrets() {
        let mut config = Config::from_json_str(SAMPLE).unwrap();
        let env = env_map(&[
            ("STRAVA_CLIENT_SECRET", " s3cret \n"),
            ("STRAVA_VERIFY_TOKEN", "verify"),
            ("TOKEN_ENCRYPTION_KEY", "enc"),
            ("OAUTH_STATE_KEY", "state"),
            ("GCP_PROJECT_ID", "my-project"),
            ("SCHEDULER_MODULES", "token-refresh, ,payout-queue"),
        ]);

        config.apply_env_overrides(|k| env.get(k).cloned());

        let strava = config.provider("strava").unwrap();
        assert_eq!(strava.client_secret, "s3cret");
        assert_eq!(strava.verify_token, "verify");
        assert_eq!(
            config.database,
            DatabaseConfig::Firestore {
                project_id: "my-project".to_string()
            }
        );
        assert_eq!(config.scheduler_modules, vec!["token-refresh", "payout-queue"]);
        config.validate().expect("Config should validate");
    }

    #[test]
    fn test_validate_requires_secrets() {
        let config = Config::from_json_str(SAMPLE).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing("TOKEN_ENCRYPTION_KEY"))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_provider_url() {
        let mut config = Config::test_default();
        if let Some(strava) = config.providers.get_mut("strava") {
            strava.oauth_url = "not a url".to_string();
        }
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_zero_intervals() {
        let mut config = Config::test_default();
        config.scheduler.payout_interval_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::test_default();
        config.scheduler.token_refresh_interval_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_disabled_provider_skips_validation() {
        let mut config = Config::test_default();
        if let Some(strava) = config.providers.get_mut("strava") {
            strava.enabled = false;
            strava.client_id.clear();
        }
        assert!(config.validate().is_ok());
        assert!(config.provider("strava").is_none());
    }

    #[test]
    fn test_database_config_firestore() {
        let config =
            Config::from_json_str(r#"{"database": {"kind": "firestore", "projectId": "p1"}}"#)
                .unwrap();
        assert_eq!(
            config.database,
            DatabaseConfig::Firestore {
                project_id: "p1".to_string()
            }
        );
    }
}
