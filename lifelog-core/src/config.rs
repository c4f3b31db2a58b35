//! Application configuration

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

pub const ENV_DATA_DIR: &str = "LIFELOG_DATA_DIR";
pub const ENV_SEED_EXAMPLES: &str = "LIFELOG_SEED_EXAMPLES";
pub const ENV_SAVE_DELAY_MS: &str = "LIFELOG_SAVE_DELAY_MS";
pub const ENV_SIGN_IN_DELAY_MS: &str = "LIFELOG_SIGN_IN_DELAY_MS";
pub const ENV_SAMPLE_RATE: &str = "LIFELOG_SAMPLE_RATE";
pub const ENV_LOG: &str = "LIFELOG_LOG";

/// Settings needed to assemble a [`crate::Lifelog`]
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding the database file
    pub data_dir: PathBuf,
    pub database_file: String,
    /// Seed example entries when nothing has ever been stored
    pub seed_examples: bool,
    /// Artificial delay before an entry is saved
    pub save_delay_ms: u64,
    /// Artificial delay of sign-in and sign-up
    pub sign_in_delay_ms: u64,
    /// Preferred microphone sample rate in Hz
    pub sample_rate: u32,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("lifelog"),
            database_file: "lifelog.db".to_string(),
            seed_examples: true,
            save_delay_ms: 600,
            sign_in_delay_ms: 800,
            sample_rate: 16000,
            log_filter: "lifelog=info".to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults overridden by `LIFELOG_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(value) = lookup(ENV_SEED_EXAMPLES) {
            config.seed_examples = parse_bool(ENV_SEED_EXAMPLES, &value)?;
        }
        if let Some(value) = lookup(ENV_SAVE_DELAY_MS) {
            config.save_delay_ms = parse_number(ENV_SAVE_DELAY_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_SIGN_IN_DELAY_MS) {
            config.sign_in_delay_ms = parse_number(ENV_SIGN_IN_DELAY_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_SAMPLE_RATE) {
            config.sample_rate = parse_number(ENV_SAMPLE_RATE, &value)?;
            if config.sample_rate == 0 {
                return Err(Error::Config(format!("{ENV_SAMPLE_RATE} must be positive")));
            }
        }
        if let Some(filter) = lookup(ENV_LOG) {
            config.log_filter = filter;
        }

        Ok(config)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }

    pub fn save_delay(&self) -> Duration {
        Duration::from_millis(self.save_delay_ms)
    }

    pub fn sign_in_delay(&self) -> Duration {
        Duration::from_millis(self.sign_in_delay_ms)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!("{key}: expected a boolean, got {other:?}"))),
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key}: expected a number, got {value:?}")))
}
