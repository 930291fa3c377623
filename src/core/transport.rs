//! Transport seam between the executor and the remote mount
//!
//! The core only ever asks for two things: LIST a path (payload shaped
//! `{"keys": [...]}`) and READ a path (an arbitrary JSON object). Errors are
//! opaque `anyhow` errors; the fetcher adds operation and path context.

use crate::core::error::{ConfigError, HealthResult, ResultExt};
use anyhow::{Result, bail};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Remote operations against arbitrary, already-templated paths
///
/// `Ok(None)` means the remote has nothing at that path.
pub trait Transport {
  fn list(&self, path: &str) -> Result<Option<Value>>;

  fn read(&self, path: &str) -> Result<Option<Value>>;
}

/// Offline transport answering from a captured snapshot of a mount
///
/// ```json
/// {
///   "list": { "/pki/issuers": ["a1", "b2"] },
///   "read": { "/pki/issuer/a1/json": { "certificate": "-----BEGIN CERTIFICATE-----..." } },
///   "fail": ["/pki/issuer/b2/json"]
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotTransport {
  #[serde(default)]
  list: BTreeMap<String, Vec<String>>,
  #[serde(default)]
  read: BTreeMap<String, Value>,
  /// Paths that answer with a permission error, for either operation
  #[serde(default)]
  fail: BTreeSet<String>,
}

impl SnapshotTransport {
  pub fn new() -> Self {
    Self::default()
  }

  /// Load a snapshot from a JSON file
  pub fn load(path: &Path) -> HealthResult<Self> {
    if !path.exists() {
      return Err(ConfigError::NotFound {
        path: path.to_path_buf(),
      }
      .into());
    }
    let content =
      fs::read_to_string(path).with_context(|| format!("Failed to read snapshot from {}", path.display()))?;
    let snapshot: SnapshotTransport =
      serde_json::from_str(&content).with_context(|| format!("Failed to parse snapshot from {}", path.display()))?;
    Ok(snapshot)
  }

  pub fn with_list(mut self, path: impl Into<String>, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
    self.list.insert(path.into(), keys.into_iter().map(Into::into).collect());
    self
  }

  pub fn with_read(mut self, path: impl Into<String>, data: Value) -> Self {
    self.read.insert(path.into(), data);
    self
  }

  pub fn with_failure(mut self, path: impl Into<String>) -> Self {
    self.fail.insert(path.into());
    self
  }

  fn check_failure(&self, path: &str) -> Result<()> {
    if self.fail.contains(path) {
      bail!("permission denied");
    }
    Ok(())
  }
}

impl Transport for SnapshotTransport {
  fn list(&self, path: &str) -> Result<Option<Value>> {
    self.check_failure(path)?;
    Ok(self.list.get(path).map(|keys| json!({ "keys": keys })))
  }

  fn read(&self, path: &str) -> Result<Option<Value>> {
    self.check_failure(path)?;
    Ok(self.read.get(path).cloned())
  }
}
