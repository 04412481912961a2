use super::{Config, ConfigError, CACHE_CAPACITY_VAR, DATABASE_VAR, DEFAULT_CACHE_CAPACITY, MAX_ATTEMPTS_VAR};
use crate::reconciler::DEFAULT_MAX_ATTEMPTS;
use anyhow::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(key, value)| (key.to_string(), value.to_string())).collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_config_defaults_to_in_memory_store() -> Result<()> {
    let config = Config::from_sources(&args(&["bin", "ledger.csv", "ops.csv"]), env_of(&[]))?;

    assert_eq!(config.ledger_path, PathBuf::from("ledger.csv"));
    assert_eq!(config.operations_path, PathBuf::from("ops.csv"));
    assert_eq!(config.log_level, LevelFilter::ERROR);
    assert_eq!(config.database, None);
    assert_eq!(config.max_attempts, DEFAULT_MAX_ATTEMPTS);
    assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);

    Ok(())
}

#[test]
fn test_config_reads_environment_overrides() -> Result<()> {
    let env = env_of(&[(DATABASE_VAR, "/tmp/ledger.db"), (MAX_ATTEMPTS_VAR, "5"), (CACHE_CAPACITY_VAR, "8")]);
    let config = Config::from_sources(&args(&["bin", "ledger.csv", "ops.csv", "DEBUG"]), env)?;

    assert_eq!(config.log_level, LevelFilter::DEBUG);
    assert_eq!(config.database, Some(PathBuf::from("/tmp/ledger.db")));
    assert_eq!(config.max_attempts, 5);
    assert_eq!(config.cache_capacity, 8);

    Ok(())
}

#[test]
fn test_config_rejects_missing_arguments_and_bad_values() {
    assert_eq!(Config::from_sources(&args(&["bin", "ledger.csv"]), env_of(&[])), Err(ConfigError::Usage));

    let zero = Config::from_sources(&args(&["bin", "l.csv", "o.csv"]), env_of(&[(MAX_ATTEMPTS_VAR, "0")]));
    let garbage = Config::from_sources(&args(&["bin", "l.csv", "o.csv"]), env_of(&[(CACHE_CAPACITY_VAR, "lots")]));

    assert!(matches!(zero, Err(ConfigError::InvalidValue { key: MAX_ATTEMPTS_VAR, .. })));
    assert!(matches!(garbage, Err(ConfigError::InvalidValue { key: CACHE_CAPACITY_VAR, .. })));
}

#[test]
fn test_invalid_log_level_falls_back_to_error() -> Result<()> {
    let config = Config::from_sources(&args(&["bin", "l.csv", "o.csv", "chatty"]), env_of(&[]))?;

    assert_eq!(config.log_level, LevelFilter::ERROR);

    Ok(())
}
