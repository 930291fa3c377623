//! Shared fixtures for the integration suite

use anyhow::{Context, Result, bail};
use pki_health::checks::pki::{self, IssuerCertificate};
use pki_health::checks::{Check, CheckResult, EvaluationContext, ResultStatus};
use pki_health::core::cache::Operation;
use pki_health::core::error::{HealthError, HealthResult};
use pki_health::core::fetch::{ResourceFetcher, template_path};
use pki_health::{ConfigMap, SnapshotTransport, Transport};
use rcgen::{BasicConstraints, Certificate, CertificateParams, DnType, IsCa, KeyPair};
use serde_json::{Value, json};
use std::path::Path;
use std::process::{Command, Output};
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;

/// Every (operation, path) a transport was asked for, in call order
pub type CallLog = Arc<Mutex<Vec<(Operation, String)>>>;

/// Snapshot transport that records each remote call
pub struct RecordingTransport {
  inner: SnapshotTransport,
  calls: CallLog,
}

impl RecordingTransport {
  pub fn new(inner: SnapshotTransport) -> (Self, CallLog) {
    let calls = CallLog::default();
    (
      Self {
        inner,
        calls: Arc::clone(&calls),
      },
      calls,
    )
  }
}

impl Transport for RecordingTransport {
  fn list(&self, path: &str) -> Result<Option<Value>> {
    self.calls.lock().unwrap().push((Operation::List, path.to_string()));
    self.inner.list(path)
  }

  fn read(&self, path: &str) -> Result<Option<Value>> {
    self.calls.lock().unwrap().push((Operation::Read, path.to_string()));
    self.inner.read(path)
  }
}

/// Number of recorded calls for `operation` on `path`
pub fn call_count(calls: &CallLog, operation: Operation, path: &str) -> usize {
  calls
    .lock()
    .unwrap()
    .iter()
    .filter(|(op, p)| *op == operation && p == path)
    .count()
}

/// A CA certificate together with the key that signs on its behalf
pub struct TestCa {
  pub cert: Certificate,
  pub key: KeyPair,
}

impl TestCa {
  pub fn pem(&self) -> String {
    self.cert.pem()
  }
}

fn ca_params(common_name: &str, expires_in_days: i64) -> Result<CertificateParams> {
  let mut params = CertificateParams::new(Vec::<String>::new())?;
  params.distinguished_name.push(DnType::CommonName, common_name);
  params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
  let now = OffsetDateTime::now_utc();
  params.not_before = now - time::Duration::days(1);
  params.not_after = now + time::Duration::days(expires_in_days);
  Ok(params)
}

/// Self-signed root CA expiring in `expires_in_days`
pub fn root_ca(common_name: &str, expires_in_days: i64) -> Result<TestCa> {
  let key = KeyPair::generate()?;
  let cert = ca_params(common_name, expires_in_days)?.self_signed(&key)?;
  Ok(TestCa { cert, key })
}

/// CA certificate signed by `parent`
///
/// Passing the parent's own common name yields a certificate whose subject
/// equals its issuer field while its signature does not verify against its
/// own key.
pub fn signed_ca(common_name: &str, expires_in_days: i64, parent: &TestCa) -> Result<TestCa> {
  let key = KeyPair::generate()?;
  let cert = ca_params(common_name, expires_in_days)?.signed_by(&key, &parent.cert, &parent.key)?;
  Ok(TestCa { cert, key })
}

/// Snapshot of a mount holding `issuers` as (id, PEM) pairs
pub fn mount_snapshot(mount: &str, issuers: &[(&str, String)]) -> SnapshotTransport {
  let mut snapshot = SnapshotTransport::new().with_list(
    format!("/{}/issuers", mount),
    issuers.iter().map(|(id, _)| id.to_string()),
  );
  for (id, pem) in issuers {
    snapshot = snapshot.with_read(
      format!("/{}/issuer/{}/json", mount, id),
      json!({ "certificate": pem, "issuer_id": id }),
    );
  }
  snapshot
}

/// Same snapshot in the on-disk format read by the CLI
pub fn mount_snapshot_json(mount: &str, issuers: &[(&str, String)]) -> Value {
  let mut list = serde_json::Map::new();
  list.insert(
    format!("/{}/issuers", mount),
    json!(issuers.iter().map(|(id, _)| *id).collect::<Vec<_>>()),
  );

  let mut read = serde_json::Map::new();
  for (id, pem) in issuers {
    read.insert(format!("/{}/issuer/{}/json", mount, id), json!({ "certificate": pem }));
  }

  json!({ "list": list, "read": read })
}

/// Configurable check used to drive the executor
pub struct StubCheck {
  name: String,
  defaults: ConfigMap,
  enabled: bool,
  reads: Vec<String>,
  results: Vec<CheckResult>,
  evaluation_failure: Option<String>,
  runs: Arc<Mutex<usize>>,
}

impl StubCheck {
  pub fn new(name: &str) -> Self {
    Self {
      name: name.to_string(),
      defaults: ConfigMap::new(),
      enabled: false,
      reads: Vec::new(),
      results: Vec::new(),
      evaluation_failure: None,
      runs: Arc::default(),
    }
  }

  /// Pin `enabled` in the check's own defaults
  pub fn self_enabled(mut self, enabled: bool) -> Self {
    self.defaults.insert("enabled".into(), json!(enabled));
    self
  }

  pub fn option(mut self, key: &str, value: Value) -> Self {
    self.defaults.insert(key.into(), value);
    self
  }

  /// READ `path` (may use the mount placeholder) while fetching
  pub fn reads(mut self, path: &str) -> Self {
    self.reads.push(path.to_string());
    self
  }

  pub fn returns(mut self, result: CheckResult) -> Self {
    self.results.push(result);
    self
  }

  /// Fail in `evaluate` with `message`
  pub fn fails_evaluation(mut self, message: &str) -> Self {
    self.evaluation_failure = Some(message.to_string());
    self
  }

  /// Counter of completed evaluations
  pub fn runs(&self) -> Arc<Mutex<usize>> {
    Arc::clone(&self.runs)
  }
}

impl Check for StubCheck {
  fn name(&self) -> &str {
    &self.name
  }

  fn description(&self) -> &str {
    "stub"
  }

  fn default_config(&self) -> ConfigMap {
    self.defaults.clone()
  }

  fn load_config(&mut self, config: &ConfigMap) -> HealthResult<()> {
    self.enabled = config.get("enabled").and_then(Value::as_bool).unwrap_or(false);
    Ok(())
  }

  fn is_enabled(&self) -> bool {
    self.enabled
  }

  fn fetch_resources(&mut self, fetcher: &mut ResourceFetcher) -> HealthResult<()> {
    for path in &self.reads {
      fetcher.fetch_if_not_fetched(Operation::Read, path)?;
    }
    Ok(())
  }

  fn evaluate(&self, ctx: &EvaluationContext<'_>) -> HealthResult<Vec<CheckResult>> {
    if let Some(message) = &self.evaluation_failure {
      return Err(HealthError::evaluation(&self.name, message.as_str()));
    }
    // Everything fetched earlier must be visible through the context.
    for path in &self.reads {
      let templated = template_path(path, ctx.mount);
      if ctx.resources.get(Operation::Read, &templated).is_none() {
        return Err(HealthError::evaluation(&self.name, format!("{} missing from context", templated)));
      }
    }
    *self.runs.lock().unwrap() += 1;
    Ok(self.results.clone())
  }
}

/// Check that keeps the issuer certificates it was handed
pub struct CertificateCollector {
  name: String,
  enabled: bool,
  seen: Arc<Mutex<Vec<Arc<IssuerCertificate>>>>,
}

impl CertificateCollector {
  pub fn new(name: &str) -> (Self, Arc<Mutex<Vec<Arc<IssuerCertificate>>>>) {
    let seen = Arc::default();
    (
      Self {
        name: name.to_string(),
        enabled: false,
        seen: Arc::clone(&seen),
      },
      seen,
    )
  }
}

impl Check for CertificateCollector {
  fn name(&self) -> &str {
    &self.name
  }

  fn description(&self) -> &str {
    "collects issuer certificates"
  }

  fn default_config(&self) -> ConfigMap {
    ConfigMap::new()
  }

  fn load_config(&mut self, config: &ConfigMap) -> HealthResult<()> {
    self.enabled = config.get("enabled").and_then(Value::as_bool).unwrap_or(false);
    Ok(())
  }

  fn is_enabled(&self) -> bool {
    self.enabled
  }

  fn fetch_resources(&mut self, fetcher: &mut ResourceFetcher) -> HealthResult<()> {
    let issuers = pki::fetch_issuer_certificates(fetcher)?;
    self.seen.lock().unwrap().extend(issuers.into_iter().map(|(_, cert)| cert));
    Ok(())
  }

  fn evaluate(&self, _ctx: &EvaluationContext<'_>) -> HealthResult<Vec<CheckResult>> {
    Ok(
      self
        .seen
        .lock()
        .unwrap()
        .iter()
        .map(|cert| CheckResult::new(ResultStatus::Informational, pki::issuer_endpoint(cert.issuer_id()), ""))
        .collect(),
    )
  }
}

/// Run the pki-health binary, returning its raw output whatever the exit code
pub fn run_pki_health(cwd: &Path, args: &[&str]) -> Result<Output> {
  Command::new(env!("CARGO_BIN_EXE_pki-health"))
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run pki-health")
}

/// Run the pki-health binary and require a zero exit code
pub fn run_pki_health_ok(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = run_pki_health(cwd, args)?;
  if !output.status.success() {
    bail!(
      "pki-health {:?} failed:\nstdout: {}\nstderr: {}",
      args,
      String::from_utf8_lossy(&output.stdout),
      String::from_utf8_lossy(&output.stderr)
    );
  }
  Ok(output)
}
