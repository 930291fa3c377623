//! Check trait abstraction for mount health checks
//!
//! Every check implements the `Check` trait. The executor drives each check
//! through the same lifecycle on every run:
//!
//! 1. `default_config` / `load_config` - once per `build_config`
//! 2. `fetch_resources` - pulls remote state through the shared fetcher
//! 3. `evaluate` - grades what was fetched into `CheckResult`s
//!
//! Checks that need the same remote resource share one cached fetch, and can
//! share anything they derive from it through the fetch's parsed cache.

use crate::core::cache::ResourceCache;
use crate::core::config::ConfigMap;
use crate::core::error::{HealthError, HealthResult};
use crate::core::fetch::ResourceFetcher;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Severity of a check finding, ordered from benign to severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResultStatus {
  NotApplicable,
  Ok,
  Informational,
  Warning,
  Critical,
  InvalidVersion,
  InsufficientPermissions,
}

/// Single source of truth for status names, indexed by discriminant
const STATUS_NAMES: [(ResultStatus, &str); 7] = [
  (ResultStatus::NotApplicable, "not_applicable"),
  (ResultStatus::Ok, "ok"),
  (ResultStatus::Informational, "informational"),
  (ResultStatus::Warning, "warning"),
  (ResultStatus::Critical, "critical"),
  (ResultStatus::InvalidVersion, "invalid_version"),
  (ResultStatus::InsufficientPermissions, "insufficient_permissions"),
];

impl ResultStatus {
  /// Every status, in severity order
  pub const ALL: [ResultStatus; 7] = [
    ResultStatus::NotApplicable,
    ResultStatus::Ok,
    ResultStatus::Informational,
    ResultStatus::Warning,
    ResultStatus::Critical,
    ResultStatus::InvalidVersion,
    ResultStatus::InsufficientPermissions,
  ];

  /// Canonical snake_case name
  pub fn name(self) -> &'static str {
    STATUS_NAMES[self as usize].1
  }

  /// Inverse of [`ResultStatus::name`]
  pub fn from_name(name: &str) -> Option<Self> {
    STATUS_NAMES
      .iter()
      .find(|(_, candidate)| *candidate == name)
      .map(|(status, _)| *status)
  }

  /// Worst status among `statuses`, or `None` when empty
  pub fn worst<'a>(statuses: impl IntoIterator<Item = &'a ResultStatus>) -> Option<Self> {
    statuses.into_iter().copied().max()
  }
}

impl fmt::Display for ResultStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for ResultStatus {
  type Err = HealthError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::from_name(s).ok_or_else(|| HealthError::message(format!("unknown result status '{}'", s)))
  }
}

impl Serialize for ResultStatus {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.name())
  }
}

impl<'de> Deserialize<'de> for ResultStatus {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let name = String::deserialize(deserializer)?;
    Self::from_name(&name).ok_or_else(|| serde::de::Error::custom(format!("unknown result status '{}'", name)))
  }
}

/// One graded finding produced by a check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
  /// Severity of the finding
  pub status: ResultStatus,
  /// Remote path the finding is about; the mount placeholder is replaced by
  /// the executor before results are returned
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub endpoint: String,
  /// Human-readable message
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub message: String,
}

impl CheckResult {
  pub fn new(status: ResultStatus, endpoint: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      status,
      endpoint: endpoint.into(),
      message: message.into(),
    }
  }

  /// Create a passing result
  pub fn ok(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
    Self::new(ResultStatus::Ok, endpoint, message)
  }
}

/// Read-only view handed to `Check::evaluate`
pub struct EvaluationContext<'a> {
  /// Clock reading shared by every check in one run
  pub now: DateTime<Utc>,
  /// Everything fetched so far in this run, by any check
  pub resources: &'a ResourceCache,
  /// Mount the executor runs against
  pub mount: &'a str,
}

/// Health check trait
///
/// # Example
///
/// ```rust,ignore
/// struct IssuerCountCheck { enabled: bool, issuers: usize }
///
/// impl Check for IssuerCountCheck {
///   fn name(&self) -> &str { "issuer_count" }
///   fn description(&self) -> &str { "Reports how many issuers the mount holds" }
///   fn default_config(&self) -> ConfigMap { ConfigMap::new() }
///   fn load_config(&mut self, config: &ConfigMap) -> HealthResult<()> {
///     self.enabled = config["enabled"].as_bool().unwrap_or(true);
///     Ok(())
///   }
///   fn is_enabled(&self) -> bool { self.enabled }
///   fn fetch_resources(&mut self, fetcher: &mut ResourceFetcher) -> HealthResult<()> {
///     self.issuers = pki::fetch_issuer_ids(fetcher)?.len();
///     Ok(())
///   }
///   fn evaluate(&self, _ctx: &EvaluationContext) -> HealthResult<Vec<CheckResult>> {
///     Ok(vec![CheckResult::ok("/{{mount}}/issuers", format!("{} issuers", self.issuers))])
///   }
/// }
/// ```
pub trait Check {
  /// Unique, non-empty name (snake_case); also the config section name
  fn name(&self) -> &str;

  /// Human-readable description of what this check validates
  fn description(&self) -> &str;

  /// Every option the check accepts, with its default value. Overrides for
  /// keys missing here are rejected.
  fn default_config(&self) -> ConfigMap;

  /// Decode and validate the fully merged configuration
  fn load_config(&mut self, config: &ConfigMap) -> HealthResult<()>;

  /// Whether the last loaded configuration enabled this check
  fn is_enabled(&self) -> bool;

  /// Pull whatever remote state the check needs into the shared cache
  fn fetch_resources(&mut self, fetcher: &mut ResourceFetcher) -> HealthResult<()>;

  /// Grade fetched state into zero or more results
  fn evaluate(&self, ctx: &EvaluationContext<'_>) -> HealthResult<Vec<CheckResult>>;
}
