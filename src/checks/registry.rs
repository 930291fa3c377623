//! Built-in check registration

use super::ca_validity_period::CaValidityPeriodCheck;
use super::trait_def::Check;
use crate::core::error::HealthResult;
use crate::core::executor::Executor;
use crate::core::transport::Transport;

/// Fresh instances of every built-in check, in execution order
pub fn default_checks() -> Vec<Box<dyn Check>> {
  vec![Box::new(CaValidityPeriodCheck::new())]
}

/// Create an executor with all built-in checks registered
pub fn create_default_executor(mount: impl Into<String>, transport: Box<dyn Transport>) -> HealthResult<Executor> {
  let mut executor = Executor::new(mount, transport)?;

  for check in default_checks() {
    executor.add_check(check);
  }

  Ok(executor)
}
