//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::store::session::{DEFAULT_HANDOFF_KEY, DEFAULT_KEY_PREFIX};

/// Prefix shared by every environment variable the assistant reads.
pub const ENV_PREFIX: &str = "SETTLEMENT_ASSIST_";

/// Assistant configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantConfig {
    /// Simulated latency before a regular reply.
    pub reply_delay: Duration,
    /// Simulated latency before a context-aware reply.
    pub contextual_reply_delay: Duration,
    /// Delay before the self-test error message appears.
    pub error_test_delay: Duration,
    /// Pause between the farewell message and navigating away.
    pub handoff_delay: Duration,
    /// Prefix of per-session message keys in the store.
    pub storage_key_prefix: String,
    /// Well-known key the handoff record is written to.
    pub handoff_key: String,
    /// Path of the primary chat surface.
    pub main_chat_path: String,
    /// Location of the libSQL database used by the CLI.
    pub db_path: PathBuf,
    /// Directory for log files written by the CLI.
    pub log_dir: PathBuf,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            reply_delay: Duration::from_millis(1000),
            contextual_reply_delay: Duration::from_millis(600),
            error_test_delay: Duration::from_millis(1000),
            handoff_delay: Duration::from_millis(1500),
            storage_key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            handoff_key: DEFAULT_HANDOFF_KEY.to_string(),
            main_chat_path: "/chat".to_string(),
            db_path: PathBuf::from("./data/settlement-assist.db"),
            log_dir: PathBuf::from("./logs"),
        }
    }
}

impl AssistantConfig {
    /// Read configuration from the environment, falling back to defaults
    /// (with a warning) for anything unset or malformed.
    pub fn from_env() -> Self {
        Self::from_lookup_lenient(|key| std::env::var(key).ok())
    }

    /// Read configuration from the environment, rejecting malformed values.
    pub fn try_from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Unset variables keep their
    /// defaults; malformed ones are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        let config = Self {
            reply_delay: parse_millis(var("REPLY_DELAY_MS"), "REPLY_DELAY_MS")?
                .unwrap_or(defaults.reply_delay),
            contextual_reply_delay: parse_millis(
                var("CONTEXTUAL_DELAY_MS"),
                "CONTEXTUAL_DELAY_MS",
            )?
            .unwrap_or(defaults.contextual_reply_delay),
            error_test_delay: parse_millis(var("ERROR_TEST_DELAY_MS"), "ERROR_TEST_DELAY_MS")?
                .unwrap_or(defaults.error_test_delay),
            handoff_delay: parse_millis(var("HANDOFF_DELAY_MS"), "HANDOFF_DELAY_MS")?
                .unwrap_or(defaults.handoff_delay),
            storage_key_prefix: non_empty(var("STORAGE_PREFIX"), "STORAGE_PREFIX")?
                .unwrap_or(defaults.storage_key_prefix),
            handoff_key: non_empty(var("HANDOFF_KEY"), "HANDOFF_KEY")?
                .unwrap_or(defaults.handoff_key),
            main_chat_path: non_empty(var("MAIN_CHAT_PATH"), "MAIN_CHAT_PATH")?
                .unwrap_or(defaults.main_chat_path),
            db_path: var("DB_PATH").map(PathBuf::from).unwrap_or(defaults.db_path),
            log_dir: var("LOG_DIR").map(PathBuf::from).unwrap_or(defaults.log_dir),
        };
        config.validate()?;
        Ok(config)
    }

    /// Session keys are `prefix + session_id`, so a handoff key inside that
    /// namespace could be overwritten by a session's messages.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.handoff_key.starts_with(&self.storage_key_prefix) {
            return Err(ConfigError::InvalidValue {
                key: format!("{ENV_PREFIX}HANDOFF_KEY"),
                message: format!(
                    "{:?} collides with the storage prefix {:?}",
                    self.handoff_key, self.storage_key_prefix
                ),
            });
        }
        Ok(())
    }

    fn from_lookup_lenient<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        match Self::from_lookup(&lookup) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid assistant configuration, using defaults");
                Self::default()
            }
        }
    }
}

fn parse_millis(value: Option<String>, key: &str) -> Result<Option<Duration>, ConfigError> {
    let Some(value) = value else {
        return Ok(None);
    };
    value
        .trim()
        .parse::<u64>()
        .map(|ms| Some(Duration::from_millis(ms)))
        .map_err(|e| ConfigError::InvalidValue {
            key: format!("{ENV_PREFIX}{key}"),
            message: format!("expected milliseconds, got {value:?}: {e}"),
        })
}

fn non_empty(value: Option<String>, key: &str) -> Result<Option<String>, ConfigError> {
    match value {
        Some(v) if v.trim().is_empty() => Err(ConfigError::InvalidValue {
            key: format!("{ENV_PREFIX}{key}"),
            message: "must not be empty".to_string(),
        }),
        other => Ok(other),
    }
}
