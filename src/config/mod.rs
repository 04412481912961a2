#[cfg(test)]
mod tests;

use std::path::PathBuf;

use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::reconciler::DEFAULT_MAX_ATTEMPTS;

pub const USAGE: &str = "Usage: balance-reconciler [ledger].csv [operations].csv [log_level:optional] > [accounts].csv";
pub const DATABASE_VAR: &str = "RECONCILER_DATABASE";
pub const MAX_ATTEMPTS_VAR: &str = "RECONCILER_MAX_ATTEMPTS";
pub const CACHE_CAPACITY_VAR: &str = "RECONCILER_CACHE_CAPACITY";
pub const DEFAULT_CACHE_CAPACITY: u64 = 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{}", USAGE)]
    Usage,
    #[error("Invalid value [{value}] for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub ledger_path: PathBuf,
    pub operations_path: PathBuf,
    pub log_level: LevelFilter,
    /// SQLite database file. The in-memory store is used when absent.
    pub database: Option<PathBuf>,
    pub max_attempts: usize,
    pub cache_capacity: u64
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let args: Vec<String> = std::env::args().collect();
        Self::from_sources(&args, |key| std::env::var(key).ok())
    }

    /// Builds the configuration from command line `args` (program name first) and an
    /// environment lookup.
    pub fn from_sources(args: &[String], env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if args.len() < 3 {
            return Err(ConfigError::Usage);
        }

        let log_level = args.get(3)
            .map(|level| parse_log_level(level))
            .unwrap_or(LevelFilter::ERROR);

        let database = env(DATABASE_VAR)
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        let max_attempts = match env(MAX_ATTEMPTS_VAR) {
            Some(value) => parse_positive(MAX_ATTEMPTS_VAR, &value)? as usize,
            None => DEFAULT_MAX_ATTEMPTS
        };

        let cache_capacity = match env(CACHE_CAPACITY_VAR) {
            Some(value) => parse_positive(CACHE_CAPACITY_VAR, &value)?,
            None => DEFAULT_CACHE_CAPACITY
        };

        Ok(Self {
            ledger_path: PathBuf::from(&args[1]),
            operations_path: PathBuf::from(&args[2]),
            log_level,
            database,
            max_attempts,
            cache_capacity
        })
    }
}

fn parse_positive(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason
    };

    match value.trim().parse::<u64>() {
        Ok(0) => Err(invalid("must be at least 1".to_string())),
        Ok(parsed) => Ok(parsed),
        Err(error) => Err(invalid(error.to_string()))
    }
}

pub fn parse_log_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => {
            //NOTE: Logging is not set up yet at this point, so this goes straight to stderr
            eprintln!("Invalid log level '{}', defaulting to 'error'", level);
            LevelFilter::ERROR
        }
    }
}
