use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, Result};
use tempfile::TempDir;

fn run_samples(database: Option<&Path>) -> Result<String> {
    let binary_path = env!("CARGO_BIN_EXE_balance-reconciler");
    let mut command = Command::new(binary_path);
    command
        .arg(Path::new("samples").join("ledger.csv"))
        .arg(Path::new("samples").join("operations.csv"))
        .env_remove("RECONCILER_DATABASE");

    if let Some(database) = database {
        command.env("RECONCILER_DATABASE", database);
    }

    let output = command.output()?;

    assert!(output.status.success());

    Ok(String::from_utf8(output.stdout)?)
}

fn parse_table(stdout: &str) -> HashMap<String, (String, String, String)> {
    stdout.lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(',').collect();
            (fields.len() == 4).then(|| (fields[0].to_string(), (fields[1].to_string(), fields[2].to_string(), fields[3].to_string())))
        })
        .collect()
}

fn assert_sample_results(stdout: &str) -> Result<()> {
    assert_eq!(stdout.lines().next(), Some("account,owner,balance,default"));

    let results = parse_table(stdout);
    assert_eq!(results.len(), 3);

    // t1 (EXPENSE 30) and t2 (INCOME 20) reversed; t4 belongs to bob and is skipped.
    let checking = results.get("checking").ok_or_else(|| anyhow!("checking missing from output"))?;
    assert_eq!(checking, &("u1".to_string(), "110.00".to_string(), "false".to_string()));

    // t3 (INCOME 0.50) requested twice, reversed once.
    let savings = results.get("savings").ok_or_else(|| anyhow!("savings missing from output"))?;
    assert_eq!(savings, &("u1".to_string(), "250.00".to_string(), "true".to_string()));

    // t5 has a corrupt amount, so bob's whole batch is rejected and the anonymous delete is unauthorized.
    let wallet = results.get("wallet").ok_or_else(|| anyhow!("wallet missing from output"))?;
    assert_eq!(wallet, &("u2".to_string(), "40".to_string(), "true".to_string()));

    Ok(())
}

#[test]
fn test_cli_reconciles_sample_with_in_memory_store() -> Result<()> {
    let stdout = run_samples(None)?;

    assert_sample_results(&stdout)
}

#[test]
fn test_cli_reconciles_sample_with_sqlite_store() -> Result<()> {
    let directory = TempDir::new()?;
    let database = directory.path().join("ledger.db");

    let stdout = run_samples(Some(&database))?;

    assert_sample_results(&stdout)?;
    assert!(database.exists());

    Ok(())
}

#[test]
fn test_cli_without_arguments_prints_usage() -> Result<()> {
    let binary_path = env!("CARGO_BIN_EXE_balance-reconciler");

    let output = Command::new(binary_path).output()?;

    assert!(!output.status.success());
    assert!(String::from_utf8(output.stderr)?.contains("Usage: balance-reconciler"));

    Ok(())
}
