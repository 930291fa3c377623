//! Health checks for PKI mounts
//!
//! Every check implements the `Check` trait and is driven by the executor in
//! `core::executor`. Checks reach remote state only through the shared
//! fetcher, so resources such as the issuer listing are fetched once per run.
//!
//! # Built-in Checks
//!
//! - **ca_validity_period**: Grades root and intermediate issuers by time left until expiry
//!
//! # Example
//!
//! ```rust,ignore
//! use pki_health::checks::create_default_executor;
//!
//! let mut executor = create_default_executor("pki", Box::new(transport))?;
//! executor.build_config(&overrides)?;
//! for (check, results) in executor.execute()? {
//!   for result in results {
//!     println!("{} [{}] {}", check, result.status, result.message);
//!   }
//! }
//! ```

pub mod ca_validity_period;
pub mod pki;
mod registry;
pub mod trait_def;

// Re-export public API
pub use registry::{create_default_executor, default_checks};
pub use trait_def::{Check, CheckResult, EvaluationContext, ResultStatus};
