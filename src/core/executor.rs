//! Check executor
//!
//! Owns the fetcher (and with it the resource cache) plus the ordered list of
//! registered checks. A run is always `build_config` followed by `execute`:
//!
//! ```text
//! Executor::new(mount, transport)
//!   add_check(..) x N
//!   build_config(&overrides)   -> every check configured, or nothing is
//!   execute()                  -> check name -> results, or the first error
//! ```
//!
//! Both calls are all-or-nothing: one failing check aborts the whole call.

use crate::checks::trait_def::{Check, CheckResult, EvaluationContext};
use crate::core::config::{ConfigMap, ENABLED_KEY, HealthConfig};
use crate::core::error::{ConfigError, HealthError, HealthResult};
use crate::core::fetch::{MOUNT_PLACEHOLDER, ResourceFetcher};
use crate::core::transport::Transport;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Results of one run, keyed by check name
pub type ExecutionResults = BTreeMap<String, Vec<CheckResult>>;

pub struct Executor {
  fetcher: ResourceFetcher,
  default_enabled: bool,
  config: BTreeMap<String, ConfigMap>,
  configured: bool,
  checks: Vec<Box<dyn Check>>,
}

impl Executor {
  /// Create an executor for `mount`. The mount name is substituted textually
  /// into check paths, so it may not contain the placeholder itself.
  pub fn new(mount: impl Into<String>, transport: Box<dyn Transport>) -> HealthResult<Self> {
    let mount = mount.into();
    if mount.is_empty() || mount.contains(MOUNT_PLACEHOLDER) {
      return Err(HealthError::registration(format!("invalid mount name: {:?}", mount)));
    }

    Ok(Self {
      fetcher: ResourceFetcher::new(mount, transport),
      default_enabled: true,
      config: BTreeMap::new(),
      configured: false,
      checks: Vec::new(),
    })
  }

  /// Executor-wide policy for checks that do not pin `enabled` themselves.
  /// Takes effect on the next `build_config`.
  pub fn set_default_enabled(&mut self, enabled: bool) {
    self.default_enabled = enabled;
  }

  pub fn default_enabled(&self) -> bool {
    self.default_enabled
  }

  /// Register a check; order determines execution order
  pub fn add_check(&mut self, check: Box<dyn Check>) {
    self.checks.push(check);
    self.configured = false;
  }

  pub fn checks(&self) -> &[Box<dyn Check>] {
    &self.checks
  }

  pub fn mount(&self) -> &str {
    self.fetcher.mount()
  }

  pub fn fetcher(&self) -> &ResourceFetcher {
    &self.fetcher
  }

  /// Merged configuration of every check after a successful `build_config`
  pub fn merged_config(&self) -> &BTreeMap<String, ConfigMap> {
    &self.config
  }

  /// Merge overrides from a loaded config file, honoring its
  /// `default_enabled` when present
  pub fn apply_config(&mut self, config: &HealthConfig) -> HealthResult<()> {
    if let Some(enabled) = config.default_enabled {
      self.default_enabled = enabled;
    }
    self.build_config(&config.checks)
  }

  /// Resolve every check's configuration from its defaults, the executor-wide
  /// enabled policy and `overrides`. Overrides for unknown check names are
  /// ignored; unknown options of a known check are rejected.
  pub fn build_config(&mut self, overrides: &BTreeMap<String, ConfigMap>) -> HealthResult<()> {
    self.configured = false;
    self.config.clear();

    let mut merged: BTreeMap<String, ConfigMap> = BTreeMap::new();
    for (index, check) in self.checks.iter_mut().enumerate() {
      let name = check.name().to_string();
      if name.is_empty() || merged.contains_key(&name) {
        return Err(HealthError::registration(format!(
          "bad checker {}: name is empty or already present: {:?}",
          index, name
        )));
      }

      let mut config = check.default_config();
      reconcile_enabled(&mut config, self.default_enabled);

      if let Some(check_overrides) = overrides.get(&name) {
        for (option, value) in check_overrides {
          if !config.contains_key(option) {
            return Err(
              ConfigError::UnknownOption {
                check: name,
                option: option.clone(),
              }
              .into(),
            );
          }
          config.insert(option.clone(), value.clone());
        }
      }

      check.load_config(&config).map_err(|err| match err {
        HealthError::Config(_) => err,
        other => HealthError::Config(ConfigError::InvalidCheckConfig {
          check: name.clone(),
          reason: other.to_string(),
        }),
      })?;

      debug!(check = %name, enabled = check.is_enabled(), "check configured");
      merged.insert(name, config);
    }

    for name in overrides.keys().filter(|name| !merged.contains_key(*name)) {
      warn!(check = %name, "ignoring overrides for unregistered check");
    }

    self.config = merged;
    self.configured = true;
    Ok(())
  }

  /// Run every enabled check against the current time
  pub fn execute(&mut self) -> HealthResult<ExecutionResults> {
    self.execute_at(Utc::now())
  }

  /// Run every enabled check, grading against `now`
  pub fn execute_at(&mut self, now: DateTime<Utc>) -> HealthResult<ExecutionResults> {
    if !self.configured {
      return Err(ConfigError::NotBuilt.into());
    }

    let mut results = ExecutionResults::new();
    for check in self.checks.iter_mut() {
      if !check.is_enabled() {
        info!(check = check.name(), "skipping disabled check");
        continue;
      }

      info!(check = check.name(), "running check");
      check.fetch_resources(&mut self.fetcher)?;

      let ctx = EvaluationContext {
        now,
        resources: self.fetcher.cache(),
        mount: self.fetcher.mount(),
      };
      let mut check_results = check.evaluate(&ctx)?;
      for result in &mut check_results {
        result.endpoint = self.fetcher.template_path(&result.endpoint);
      }

      debug!(check = check.name(), results = check_results.len(), "check evaluated");
      results.insert(check.name().to_string(), check_results);
    }

    Ok(results)
  }
}

/// A check may always disable itself, but never enable itself against a
/// disabled executor-wide default.
fn reconcile_enabled(config: &mut ConfigMap, default_enabled: bool) {
  match config.get(ENABLED_KEY) {
    None => {
      config.insert(ENABLED_KEY.to_string(), Value::Bool(default_enabled));
    }
    Some(Value::Bool(true)) if !default_enabled => {
      config.insert(ENABLED_KEY.to_string(), Value::Bool(false));
    }
    _ => {}
  }
}
