//! Check configuration: option maps, override files and durations
//!
//! Checks declare defaults as flat `option -> value` maps. Operators override
//! them from a TOML (or JSON) file with one table per check name:
//!
//! ```toml
//! default_enabled = true
//!
//! [ca_validity_period]
//! root_expiry_critical = "60d"
//! intermediate_expiry_warning = "90d"
//! ```

use crate::core::error::{ConfigError, HealthError, HealthResult, ResultExt};
use chrono::Duration;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Flat option name -> raw value mapping for one check
pub type ConfigMap = Map<String, Value>;

/// Option every check carries, synthesized when a check does not declare it
pub const ENABLED_KEY: &str = "enabled";

/// Operator-supplied overrides, keyed by check name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthConfig {
  /// Executor-wide default for checks that do not pin `enabled` themselves
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub default_enabled: Option<bool>,

  /// Per-check option overrides. Unknown check names are carried but ignored
  /// by the executor.
  #[serde(flatten)]
  pub checks: BTreeMap<String, ConfigMap>,
}

impl HealthConfig {
  /// Load overrides from a `.json` file, or TOML for any other extension
  pub fn load(path: &Path) -> HealthResult<Self> {
    if !path.exists() {
      return Err(
        ConfigError::NotFound {
          path: path.to_path_buf(),
        }
        .into(),
      );
    }

    let content = fs::read_to_string(path).with_context(|| format!("Failed to read config from {}", path.display()))?;

    let is_json = path.extension().and_then(|ext| ext.to_str()) == Some("json");
    let config: HealthConfig = if is_json {
      serde_json::from_str(&content).with_context(|| format!("Failed to parse config from {}", path.display()))?
    } else {
      toml_edit::de::from_str(&content).with_context(|| format!("Failed to parse config from {}", path.display()))?
    };

    Ok(config)
  }

  pub fn overrides_for(&self, check: &str) -> Option<&ConfigMap> {
    self.checks.get(check)
  }
}

/// Parse a duration such as `"30d"`, `"12h"`, `"1d12h30m"` or `"3600"`
///
/// Bare integers are seconds. Units are `s`, `m`, `h` and `d`. Negative
/// durations are rejected.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
  let trimmed = input.trim();
  if trimmed.is_empty() {
    return Err("empty duration".to_string());
  }
  if trimmed.starts_with('-') {
    return Err(format!("negative duration '{}' is not allowed", input));
  }

  if let Ok(seconds) = trimmed.parse::<i64>() {
    return Duration::try_seconds(seconds).ok_or_else(|| format!("duration '{}' is out of range", input));
  }

  let mut total = Duration::zero();
  let mut digits = String::new();
  for ch in trimmed.chars() {
    if ch.is_ascii_digit() {
      digits.push(ch);
      continue;
    }

    if digits.is_empty() {
      return Err(format!("invalid duration '{}': expected a number before '{}'", input, ch));
    }
    let amount: i64 = digits
      .parse()
      .map_err(|_| format!("invalid duration '{}': number too large", input))?;
    digits.clear();

    let part = match ch {
      's' => Duration::try_seconds(amount),
      'm' => Duration::try_minutes(amount),
      'h' => Duration::try_hours(amount),
      'd' => Duration::try_days(amount),
      other => return Err(format!("invalid duration '{}': unknown unit '{}'", input, other)),
    }
    .ok_or_else(|| format!("duration '{}' is out of range", input))?;

    total = total
      .checked_add(&part)
      .ok_or_else(|| format!("duration '{}' is out of range", input))?;
  }

  if !digits.is_empty() {
    return Err(format!("invalid duration '{}': missing unit after '{}'", input, digits));
  }

  Ok(total)
}

/// Render a duration in the largest unit that represents it exactly
pub fn format_duration(duration: Duration) -> String {
  let seconds = duration.num_seconds();
  if seconds != 0 && seconds % 86_400 == 0 {
    format!("{}d", seconds / 86_400)
  } else if seconds != 0 && seconds % 3_600 == 0 {
    format!("{}h", seconds / 3_600)
  } else if seconds != 0 && seconds % 60 == 0 {
    format!("{}m", seconds / 60)
  } else {
    format!("{}s", seconds)
  }
}

/// Serde helper decoding a duration from a string or a number of seconds
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Raw {
    Seconds(i64),
    Text(String),
  }

  let parsed = match Raw::deserialize(deserializer)? {
    Raw::Seconds(seconds) if seconds < 0 => Err(format!("negative duration '{}' is not allowed", seconds)),
    Raw::Seconds(seconds) => Duration::try_seconds(seconds).ok_or_else(|| format!("duration '{}' is out of range", seconds)),
    Raw::Text(text) => parse_duration(&text),
  };
  parsed.map_err(serde::de::Error::custom)
}

/// Decode a merged option map into a check's typed configuration
pub fn decode_check_config<T>(check: &str, config: &ConfigMap) -> HealthResult<T>
where
  T: for<'de> Deserialize<'de>,
{
  serde_json::from_value(Value::Object(config.clone())).map_err(|e| {
    HealthError::Config(ConfigError::InvalidCheckConfig {
      check: check.to_string(),
      reason: e.to_string(),
    })
  })
}
