//! Runtime configuration.
//!
//! Every setting has a default and can be overridden with a
//! `PHARMALYTICS_*` environment variable.

use std::path::PathBuf;
use std::str::FromStr;

use pharmalytics_llm::{InferenceConfig, TaskKind};
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Engine settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Upper bound on concurrent inference calls per check
    pub max_workers: usize,
    pub alternatives_limit: usize,
    pub history_limit: usize,
    pub database_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            alternatives_limit: 3,
            history_limit: 10,
            database_path: PathBuf::from("pharmalytics.db"),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (environment, test map, ...).
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(path) = lookup("PHARMALYTICS_DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }
        parse_into(&lookup, "PHARMALYTICS_MAX_WORKERS", &mut config.max_workers)?;
        parse_into(&lookup, "PHARMALYTICS_ALTERNATIVES_LIMIT", &mut config.alternatives_limit)?;
        parse_into(&lookup, "PHARMALYTICS_HISTORY_LIMIT", &mut config.history_limit)?;

        if config.max_workers == 0 {
            return Err(ConfigError::Invalid {
                key: "PHARMALYTICS_MAX_WORKERS".into(),
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(config)
    }
}

/// Inference endpoint settings from the environment.
pub fn inference_config_from_env() -> ConfigResult<InferenceConfig> {
    inference_config_from_lookup(|key| std::env::var(key).ok())
}

pub fn inference_config_from_lookup<F>(lookup: F) -> ConfigResult<InferenceConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = InferenceConfig::default();
    if let Some(url) = lookup("PHARMALYTICS_INFERENCE_URL") {
        config.base_url = url;
    }
    if let Some(key) = lookup("PHARMALYTICS_API_KEY") {
        config.api_key = key;
    }
    parse_into(&lookup, "PHARMALYTICS_TIMEOUT_SECS", &mut config.timeout_secs)?;
    parse_into(&lookup, "PHARMALYTICS_MAX_NEW_TOKENS", &mut config.max_new_tokens)?;
    parse_into(&lookup, "PHARMALYTICS_TEMPERATURE", &mut config.temperature)?;
    parse_into(&lookup, "PHARMALYTICS_MAX_RETRIES", &mut config.max_retries)?;
    parse_into(&lookup, "PHARMALYTICS_RETRY_BACKOFF_MS", &mut config.retry_backoff_ms)?;

    for (task, key) in [
        (TaskKind::Interaction, "PHARMALYTICS_MODEL_INTERACTION"),
        (TaskKind::Dosage, "PHARMALYTICS_MODEL_DOSAGE"),
        (TaskKind::SideEffect, "PHARMALYTICS_MODEL_SIDE_EFFECT"),
        (TaskKind::Extraction, "PHARMALYTICS_MODEL_EXTRACTION"),
    ] {
        if let Some(model) = lookup(key) {
            config.models.insert(task, model);
        }
    }
    Ok(config)
}

fn parse_into<F, T>(lookup: &F, key: &str, target: &mut T) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(key) {
        *target = raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key: key.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}
