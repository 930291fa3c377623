//! List registered checks and their defaults

use pki_health::checks::default_checks;
use pki_health::core::error::{HealthError, HealthResult};
use serde_json::{Map, Value, json};

/// Print every built-in check with its description and default options
pub fn run_list(json: bool) -> HealthResult<()> {
  let checks = default_checks();

  if json {
    let mut listing = Map::new();
    for check in &checks {
      listing.insert(
        check.name().to_string(),
        json!({
          "description": check.description(),
          "default_config": Value::Object(check.default_config()),
        }),
      );
    }
    let json_output = serde_json::to_string_pretty(&listing)
      .map_err(|e| HealthError::message(format!("Failed to serialize JSON: {}", e)))?;
    println!("{}", json_output);
    return Ok(());
  }

  println!("📋 Registered checks:");
  for check in &checks {
    println!("   • {}: {}", check.name(), check.description());
    for (option, value) in check.default_config() {
      println!("       {} = {}", option, value);
    }
  }

  Ok(())
}
