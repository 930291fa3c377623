//! CA validity period check
//!
//! Grades every issuer on the mount by how close its certificate is to
//! expiry. Roots and intermediates get separate thresholds since a root is
//! usually far more expensive to rotate.

use super::pki::{self, IssuerCertificate};
use super::trait_def::{Check, CheckResult, EvaluationContext, ResultStatus};
use crate::core::config::{ConfigMap, decode_check_config, deserialize_duration, format_duration};
use crate::core::error::HealthResult;
use crate::core::fetch::ResourceFetcher;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

pub const NAME: &str = "ca_validity_period";

/// Severities walked in order; the first matching window wins
const SEVERITY_ORDER: [ResultStatus; 3] = [ResultStatus::Critical, ResultStatus::Warning, ResultStatus::Informational];

/// Expiry windows for one class of CA
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryThresholds {
  pub critical: Duration,
  pub warning: Duration,
  pub informational: Duration,
}

impl ExpiryThresholds {
  fn window(&self, status: ResultStatus) -> Duration {
    match status {
      ResultStatus::Critical => self.critical,
      ResultStatus::Warning => self.warning,
      _ => self.informational,
    }
  }

  /// Most severe status whose window `now + threshold` reaches `not_after`,
  /// with the threshold that matched. A window reaching past the end of the
  /// representable calendar covers every expiry.
  pub fn grade(&self, not_after: DateTime<Utc>, now: DateTime<Utc>) -> Option<(ResultStatus, Duration)> {
    SEVERITY_ORDER.iter().find_map(|&status| {
      let window = self.window(status);
      let reached = now
        .checked_add_signed(window)
        .is_none_or(|boundary| boundary >= not_after);
      reached.then_some((status, window))
    })
  }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CaValidityPeriodConfig {
  enabled: bool,
  #[serde(deserialize_with = "deserialize_duration")]
  root_expiry_critical: Duration,
  #[serde(deserialize_with = "deserialize_duration")]
  root_expiry_warning: Duration,
  #[serde(deserialize_with = "deserialize_duration")]
  root_expiry_informational: Duration,
  #[serde(deserialize_with = "deserialize_duration")]
  intermediate_expiry_critical: Duration,
  #[serde(deserialize_with = "deserialize_duration")]
  intermediate_expiry_warning: Duration,
  #[serde(deserialize_with = "deserialize_duration")]
  intermediate_expiry_informational: Duration,
}

/// Check grading issuer certificates by remaining lifetime
pub struct CaValidityPeriodCheck {
  enabled: bool,
  root: ExpiryThresholds,
  intermediate: ExpiryThresholds,
  issuers: Vec<(String, Arc<IssuerCertificate>)>,
}

impl CaValidityPeriodCheck {
  pub fn new() -> Self {
    Self {
      enabled: true,
      root: ExpiryThresholds {
        critical: Duration::days(30),
        warning: Duration::days(365),
        informational: Duration::days(730),
      },
      intermediate: ExpiryThresholds {
        critical: Duration::days(30),
        warning: Duration::days(60),
        informational: Duration::days(180),
      },
      issuers: Vec::new(),
    }
  }

  pub fn root_thresholds(&self) -> ExpiryThresholds {
    self.root
  }

  pub fn intermediate_thresholds(&self) -> ExpiryThresholds {
    self.intermediate
  }

  fn grade_issuer(&self, name: &str, cert: &IssuerCertificate, now: DateTime<Utc>) -> CheckResult {
    let thresholds = if cert.is_self_signed_root() {
      &self.root
    } else {
      &self.intermediate
    };
    let expiry = cert.not_after().format("%Y-%m-%d");
    let endpoint = pki::issuer_endpoint(name);

    match thresholds.grade(cert.not_after(), now) {
      Some((status, window)) => CheckResult::new(
        status,
        endpoint,
        format!(
          "Issuer ({})'s expiration ({}) is within the {} window of {}",
          name,
          expiry,
          status,
          format_duration(window)
        ),
      ),
      None => CheckResult::ok(endpoint, format!("Issuer ({})'s expiration ({}) is OK", name, expiry)),
    }
  }
}

impl Default for CaValidityPeriodCheck {
  fn default() -> Self {
    Self::new()
  }
}

impl Check for CaValidityPeriodCheck {
  fn name(&self) -> &str {
    NAME
  }

  fn description(&self) -> &str {
    "Grades root and intermediate issuers by time left until expiry"
  }

  fn default_config(&self) -> ConfigMap {
    let mut defaults = ConfigMap::new();
    for (option, value) in [
      ("root_expiry_critical", "30d"),
      ("intermediate_expiry_critical", "30d"),
      ("root_expiry_warning", "365d"),
      ("intermediate_expiry_warning", "60d"),
      ("root_expiry_informational", "730d"),
      ("intermediate_expiry_informational", "180d"),
    ] {
      defaults.insert(option.to_string(), json!(value));
    }
    defaults
  }

  fn load_config(&mut self, config: &ConfigMap) -> HealthResult<()> {
    let parsed: CaValidityPeriodConfig = decode_check_config(NAME, config)?;

    self.enabled = parsed.enabled;
    self.root = ExpiryThresholds {
      critical: parsed.root_expiry_critical,
      warning: parsed.root_expiry_warning,
      informational: parsed.root_expiry_informational,
    };
    self.intermediate = ExpiryThresholds {
      critical: parsed.intermediate_expiry_critical,
      warning: parsed.intermediate_expiry_warning,
      informational: parsed.intermediate_expiry_informational,
    };
    Ok(())
  }

  fn is_enabled(&self) -> bool {
    self.enabled
  }

  fn fetch_resources(&mut self, fetcher: &mut ResourceFetcher) -> HealthResult<()> {
    self.issuers = pki::fetch_issuer_certificates(fetcher)?;
    Ok(())
  }

  fn evaluate(&self, ctx: &EvaluationContext<'_>) -> HealthResult<Vec<CheckResult>> {
    Ok(
      self
        .issuers
        .iter()
        .map(|(name, cert)| self.grade_issuer(name, cert, ctx.now))
        .collect(),
    )
  }
}
