//! Per-run resource cache
//!
//! Entries live in an arena and are addressed by templated path, then operation.
//! Nothing is evicted: a fresh executor is the only way to get a cold cache.

use crate::core::error::{HealthError, HealthResult};
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Remote operation kinds the transport understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
  List,
  Read,
}

impl fmt::Display for Operation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Operation::List => write!(f, "LIST"),
      Operation::Read => write!(f, "READ"),
    }
  }
}

type ParsedValue = Arc<dyn Any + Send + Sync>;

/// One memoized fetch and whatever checks derived from it
pub struct CachedFetch {
  operation: Operation,
  path: String,
  response: Option<Value>,
  parsed: HashMap<String, ParsedValue>,
}

impl CachedFetch {
  pub(crate) fn new(operation: Operation, path: String, response: Option<Value>) -> Self {
    Self {
      operation,
      path,
      response,
      parsed: HashMap::new(),
    }
  }

  pub fn operation(&self) -> Operation {
    self.operation
  }

  /// Fully templated path this entry was fetched for
  pub fn path(&self) -> &str {
    &self.path
  }

  /// Raw payload; `None` when the remote had nothing at this path
  pub fn response(&self) -> Option<&Value> {
    self.response.as_ref()
  }

  /// Number of derived values memoized on this entry
  pub fn parsed_len(&self) -> usize {
    self.parsed.len()
  }

  /// Look up a derived value previously stored under `key`
  pub fn parsed<T: Any + Send + Sync>(&self, key: &str) -> HealthResult<Option<Arc<T>>> {
    match self.parsed.get(key) {
      Some(value) => self.downcast(key, value.clone()).map(Some),
      None => Ok(None),
    }
  }

  /// Return the derived value under `key`, computing it from the raw payload
  /// on first use. A failed computation stores nothing.
  pub fn parsed_or_try_insert<T, F>(&mut self, key: &str, parse: F) -> HealthResult<Arc<T>>
  where
    T: Any + Send + Sync,
    F: FnOnce(Option<&Value>) -> HealthResult<T>,
  {
    if let Some(existing) = self.parsed.get(key) {
      return self.downcast(key, existing.clone());
    }

    let value = Arc::new(parse(self.response.as_ref())?);
    self.parsed.insert(key.to_string(), value.clone());
    Ok(value)
  }

  fn downcast<T: Any + Send + Sync>(&self, key: &str, value: ParsedValue) -> HealthResult<Arc<T>> {
    value.downcast::<T>().map_err(|_| {
      HealthError::resource(
        format!("{} {}", self.operation, self.path),
        format!("parsed cache entry '{}' holds an unexpected type", key),
      )
    })
  }
}

impl fmt::Debug for CachedFetch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CachedFetch")
      .field("operation", &self.operation)
      .field("path", &self.path)
      .field("response", &self.response)
      .field("parsed_keys", &self.parsed.keys().collect::<Vec<_>>())
      .finish()
  }
}

/// Arena of cached fetches keyed by operation and templated path
#[derive(Debug, Default)]
pub struct ResourceCache {
  entries: Vec<CachedFetch>,
  index: HashMap<String, HashMap<Operation, usize>>,
}

impl ResourceCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, operation: Operation, path: &str) -> Option<&CachedFetch> {
    self.slot(operation, path).map(|idx| &self.entries[idx])
  }

  pub fn get_mut(&mut self, operation: Operation, path: &str) -> Option<&mut CachedFetch> {
    self.slot(operation, path).map(|idx| &mut self.entries[idx])
  }

  /// Store a new entry. An existing entry for the same key is kept and returned
  /// instead, so a key can never be populated twice.
  pub fn insert(&mut self, fetch: CachedFetch) -> &mut CachedFetch {
    let idx = match self.slot(fetch.operation, &fetch.path) {
      Some(idx) => idx,
      None => {
        let idx = self.entries.len();
        self
          .index
          .entry(fetch.path.clone())
          .or_default()
          .insert(fetch.operation, idx);
        self.entries.push(fetch);
        idx
      }
    };
    &mut self.entries[idx]
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  fn slot(&self, operation: Operation, path: &str) -> Option<usize> {
    self.index.get(path).and_then(|by_op| by_op.get(&operation)).copied()
  }
}
