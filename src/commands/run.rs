//! Health check command
//!
//! Runs every built-in check against a snapshot of the mount and reports the
//! graded results. The exit code reflects the worst status found.

use pki_health::checks::create_default_executor;
use pki_health::core::config::HealthConfig;
use pki_health::core::error::{HealthError, HealthResult};
use pki_health::core::executor::ExecutionResults;
use pki_health::core::transport::SnapshotTransport;
use pki_health::ResultStatus;
use std::path::PathBuf;
use tracing::info;

/// Options for `pki-health run`
pub struct RunOptions {
  pub snapshot: PathBuf,
  pub mount: String,
  pub config: Option<PathBuf>,
  pub default_disabled: bool,
  pub json: bool,
}

/// Run all checks and print their results
///
/// Returns the process exit code derived from the worst result status.
pub fn run_health_check(options: RunOptions) -> HealthResult<i32> {
  let transport = SnapshotTransport::load(&options.snapshot)?;
  let mut executor = create_default_executor(options.mount.clone(), Box::new(transport))?;

  let mut config = match options.config {
    Some(ref path) => HealthConfig::load(path)?,
    None => HealthConfig::default(),
  };
  // The flag wins over whatever the file says.
  if options.default_disabled {
    config.default_enabled = Some(false);
  }
  info!(checks = executor.checks().len(), mount = %options.mount, "building check configuration");
  executor.apply_config(&config)?;

  let results = executor.execute()?;

  if options.json {
    let json_output = serde_json::to_string_pretty(&results)
      .map_err(|e| HealthError::message(format!("Failed to serialize JSON: {}", e)))?;
    println!("{}", json_output);
  } else {
    print_results(&options.mount, &results);
  }

  Ok(exit_code_for(&results))
}

fn print_results(mount: &str, results: &ExecutionResults) {
  println!("🏥 Health checks for mount '{}'\n", mount);

  for (check, check_results) in results {
    println!("📋 {}", check);
    if check_results.is_empty() {
      println!("   (no findings)");
    }
    for result in check_results {
      println!("   {} [{}] {}", status_icon(result.status), result.status, result.message);
      if !result.endpoint.is_empty() {
        println!("      at {}", result.endpoint);
      }
    }
    println!();
  }

  let worst = worst_status(results);
  println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
  match worst {
    Some(status) => println!("Worst status: {}", status),
    None => println!("No checks produced results"),
  }
}

fn status_icon(status: ResultStatus) -> &'static str {
  match status {
    ResultStatus::NotApplicable => "➖",
    ResultStatus::Ok => "✅",
    ResultStatus::Informational => "ℹ️",
    ResultStatus::Warning => "⚠️",
    ResultStatus::Critical => "❌",
    ResultStatus::InvalidVersion | ResultStatus::InsufficientPermissions => "🔒",
  }
}

fn worst_status(results: &ExecutionResults) -> Option<ResultStatus> {
  ResultStatus::worst(results.values().flatten().map(|r| &r.status))
}

/// 0 for ok/not applicable, then 2-5 by increasing severity. 2 is also
/// what the argument parser exits with on usage errors.
fn exit_code_for(results: &ExecutionResults) -> i32 {
  match worst_status(results) {
    None | Some(ResultStatus::NotApplicable) | Some(ResultStatus::Ok) => 0,
    Some(ResultStatus::Informational) => 2,
    Some(ResultStatus::Warning) => 3,
    Some(ResultStatus::Critical) => 4,
    Some(ResultStatus::InvalidVersion) | Some(ResultStatus::InsufficientPermissions) => 5,
  }
}
