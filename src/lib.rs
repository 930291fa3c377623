//! Pluggable health checks for PKI secrets-engine mounts
//!
//! Checks are registered with an [`Executor`], configured once through
//! [`Executor::build_config`] and run with [`Executor::execute`]. Remote state
//! is fetched through a shared, memoizing fetcher so checks that need the same
//! resource trigger a single transport call per run.

pub mod checks;
pub mod core;

pub use checks::{Check, CheckResult, ResultStatus, create_default_executor};
pub use crate::core::config::{ConfigMap, HealthConfig};
pub use crate::core::error::{HealthError, HealthResult};
pub use crate::core::executor::{ExecutionResults, Executor};
pub use crate::core::transport::{SnapshotTransport, Transport};
