//! CLI commands for pki-health
//!
//! - **run**: Execute every built-in check against a mount snapshot
//! - **list**: Show the registered checks and their default configuration

pub mod list;
pub mod run;

pub use list::run_list;
pub use run::{RunOptions, run_health_check};
