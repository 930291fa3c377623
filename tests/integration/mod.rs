//! Integration tests for pki-health

mod helpers;
mod test_cli;
