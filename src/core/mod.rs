//! Core engine for pki-health
//!
//! - **cache**: Per-run resource cache keyed by templated path and operation
//! - **config**: Check option maps, override files and duration parsing
//! - **error**: Error types with contextual help and exit codes
//! - **executor**: Config merge and the fetch/evaluate/post-process pipeline
//! - **fetch**: Mount templating and the fetch-if-absent primitive
//! - **transport**: Remote LIST/READ seam and the offline snapshot transport

pub mod cache;
pub mod config;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod transport;
