//! Fetch-if-absent primitive
//!
//! `ResourceFetcher` is the only way checks reach remote state. It templates
//! the mount into each path, consults the cache, and calls the transport at
//! most once per `(operation, templated path)`.

use crate::core::cache::{CachedFetch, Operation, ResourceCache};
use crate::core::error::{HealthError, HealthResult};
use crate::core::transport::Transport;
use tracing::debug;

/// Placeholder substituted with the mount name in every path
pub const MOUNT_PLACEHOLDER: &str = "{{mount}}";

/// Substitute `mount` for every occurrence of the placeholder
pub fn template_path(path: &str, mount: &str) -> String {
  path.replace(MOUNT_PLACEHOLDER, mount)
}

pub struct ResourceFetcher {
  mount: String,
  transport: Box<dyn Transport>,
  cache: ResourceCache,
}

impl ResourceFetcher {
  pub(crate) fn new(mount: String, transport: Box<dyn Transport>) -> Self {
    Self {
      mount,
      transport,
      cache: ResourceCache::new(),
    }
  }

  pub fn mount(&self) -> &str {
    &self.mount
  }

  pub fn template_path(&self, path: &str) -> String {
    template_path(path, &self.mount)
  }

  pub fn cache(&self) -> &ResourceCache {
    &self.cache
  }

  /// Return the cached fetch for `raw_path`, calling the transport only when
  /// no entry exists yet. Transport failures are not cached.
  pub fn fetch_if_not_fetched(&mut self, operation: Operation, raw_path: &str) -> HealthResult<&mut CachedFetch> {
    let path = self.template_path(raw_path);

    if self.cache.get(operation, &path).is_some() {
      debug!(%operation, %path, "resource cache hit");
      // Looked up twice so the early return does not hold the borrow.
      return self
        .cache
        .get_mut(operation, &path)
        .ok_or_else(|| HealthError::message(format!("cache entry for {} {} vanished", operation, path)));
    }

    debug!(%operation, %path, "fetching resource");
    let response = match operation {
      Operation::List => self.transport.list(&path),
      Operation::Read => self.transport.read(&path),
    }
    .map_err(|source| HealthError::Fetch {
      operation,
      path: path.clone(),
      source,
    })?;

    Ok(self.cache.insert(CachedFetch::new(operation, path, response)))
  }
}
