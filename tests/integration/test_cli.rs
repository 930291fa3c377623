//! End-to-end runs of the pki-health binary

use crate::helpers::{mount_snapshot_json, root_ca, run_pki_health, run_pki_health_ok};
use anyhow::Result;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

fn write_snapshot(temp: &TempDir, days: i64) -> Result<()> {
  let root = root_ca("CLI Root", days)?;
  let snapshot = mount_snapshot_json("pki", &[("r1", root.pem())]);
  fs::write(temp.path().join("snapshot.json"), serde_json::to_string_pretty(&snapshot)?)?;
  Ok(())
}

#[test]
fn test_list_json() -> Result<()> {
  let temp = TempDir::new()?;
  let output = run_pki_health_ok(temp.path(), &["list", "--json"])?;
  let listing: Value = serde_json::from_slice(&output.stdout)?;

  let check = &listing["ca_validity_period"];
  assert!(check["description"].is_string());
  assert_eq!(check["default_config"]["root_expiry_warning"], "365d");
  Ok(())
}

#[test]
fn test_run_healthy_mount_exits_zero() -> Result<()> {
  let temp = TempDir::new()?;
  write_snapshot(&temp, 1000)?;

  let output = run_pki_health_ok(temp.path(), &["run", "--snapshot", "snapshot.json"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("ca_validity_period"), "{}", stdout);
  assert!(stdout.contains("/pki/issuer/r1"), "{}", stdout);
  Ok(())
}

#[test]
fn test_run_exit_code_reflects_worst_status() -> Result<()> {
  let temp = TempDir::new()?;
  write_snapshot(&temp, 100)?;

  let output = run_pki_health(temp.path(), &["run", "--snapshot", "snapshot.json", "--json"])?;
  assert_eq!(output.status.code(), Some(3));

  let results: Value = serde_json::from_slice(&output.stdout)?;
  let findings = results["ca_validity_period"].as_array().expect("result list");
  assert_eq!(findings.len(), 1);
  assert_eq!(findings[0]["status"], "warning");
  assert_eq!(findings[0]["endpoint"], "/pki/issuer/r1");
  Ok(())
}

#[test]
fn test_run_with_config_file() -> Result<()> {
  let temp = TempDir::new()?;
  write_snapshot(&temp, 100)?;
  fs::write(
    temp.path().join("health.toml"),
    "[ca_validity_period]\nroot_expiry_critical = \"200d\"\n",
  )?;

  let output = run_pki_health(
    temp.path(),
    &["run", "--snapshot", "snapshot.json", "--config", "health.toml", "--json"],
  )?;
  assert_eq!(output.status.code(), Some(4));
  Ok(())
}

#[test]
fn test_run_default_disabled_skips_checks() -> Result<()> {
  let temp = TempDir::new()?;
  write_snapshot(&temp, 20)?;

  let output = run_pki_health_ok(
    temp.path(),
    &["run", "--snapshot", "snapshot.json", "--default-disabled", "--json"],
  )?;
  let results: Value = serde_json::from_slice(&output.stdout)?;
  assert_eq!(results, serde_json::json!({}));
  Ok(())
}

#[test]
fn test_run_rejects_unknown_option() -> Result<()> {
  let temp = TempDir::new()?;
  write_snapshot(&temp, 1000)?;
  fs::write(
    temp.path().join("health.toml"),
    "[ca_validity_period]\nroot_expiry_critcal = \"10d\"\n",
  )?;

  let output = run_pki_health(
    temp.path(),
    &["run", "--snapshot", "snapshot.json", "--config", "health.toml"],
  )?;
  assert_eq!(output.status.code(), Some(1));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("root_expiry_critcal"), "{}", stderr);
  Ok(())
}

#[test]
fn test_run_missing_snapshot() -> Result<()> {
  let temp = TempDir::new()?;
  let output = run_pki_health(temp.path(), &["run", "--snapshot", "nope.json"])?;
  assert_eq!(output.status.code(), Some(1));
  Ok(())
}

#[test]
fn test_run_help_documents_exit_codes() -> Result<()> {
  let temp = TempDir::new()?;
  let output = run_pki_health_ok(temp.path(), &["run", "--help"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("Exit codes:"), "{}", stdout);
  assert!(stdout.contains("also used for command-line usage errors"), "{}", stdout);

  // Usage errors share code 2 with an informational result.
  let output = run_pki_health(temp.path(), &["run"])?;
  assert_eq!(output.status.code(), Some(2));
  assert!(output.stdout.is_empty());
  Ok(())
}
