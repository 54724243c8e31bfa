use crate::engine::{Apportionment, ScheduleSettings};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    /// Directory holding campaigns.json and the event / price logs.
    pub data_dir: PathBuf,
    pub sub_epoch_seconds: i64,
    pub epoch_seconds: i64,
    pub apportionment: Apportionment,
    /// Used for campaigns that do not state their reward token decimals.
    pub reward_token_decimals: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_path = required(&env_map, "DATABASE_PATH")?;
        let data_dir = PathBuf::from(required(&env_map, "DATA_DIR")?);

        let sub_epoch_seconds = positive_seconds(&env_map, "SUB_EPOCH_SECONDS", "300")?;
        let epoch_seconds = positive_seconds(&env_map, "EPOCH_SECONDS", "14400")?;

        let raw_apportionment = env_map
            .get("POOL_APPORTIONMENT")
            .map(|s| s.as_str())
            .unwrap_or("even");
        let apportionment = Apportionment::parse(raw_apportionment).ok_or_else(|| {
            ConfigError::InvalidValue(
                "POOL_APPORTIONMENT".to_string(),
                format!("must be even or front_loaded, got {}", raw_apportionment),
            )
        })?;

        let reward_token_decimals = env_map
            .get("REWARD_TOKEN_DECIMALS")
            .map(|s| s.as_str())
            .unwrap_or("18")
            .parse::<u32>()
            .ok()
            .filter(|d| *d <= 36)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "REWARD_TOKEN_DECIMALS".to_string(),
                    "must be an integer between 0 and 36".to_string(),
                )
            })?;

        Ok(Config {
            database_path,
            data_dir,
            sub_epoch_seconds,
            epoch_seconds,
            apportionment,
            reward_token_decimals,
        })
    }

    pub fn schedule_settings(&self) -> ScheduleSettings {
        ScheduleSettings {
            sub_epoch_seconds: self.sub_epoch_seconds,
            epoch_seconds: self.epoch_seconds,
            apportionment: self.apportionment,
        }
    }
}

fn required(env_map: &HashMap<String, String>, key: &str) -> Result<String, ConfigError> {
    env_map
        .get(key)
        .cloned()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnv(key.to_string()))
}

fn positive_seconds(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<i64, ConfigError> {
    env_map
        .get(key)
        .map(|s| s.as_str())
        .unwrap_or(default)
        .parse::<i64>()
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| {
            ConfigError::InvalidValue(key.to_string(), "must be a positive integer".to_string())
        })
}
