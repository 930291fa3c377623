//! Error types for pki-health with contextual messages and exit codes
//!
//! Every error raised while building configuration or executing checks is
//! fatal to that call. The variants mirror where the failure happened so the
//! binary can map them to exit codes and print a useful hint.

use crate::core::cache::Operation;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for error conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// Operator error (bad check registration, bad config, bad args)
  User = 1,
  /// Remote state could not be fetched or understood
  System = 6,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for pki-health
#[derive(Debug)]
pub enum HealthError {
  /// A check (or the executor itself) was registered with an invalid identity
  Registration { message: String },

  /// Configuration errors
  Config(ConfigError),

  /// The transport failed to LIST or READ a path
  Fetch {
    operation: Operation,
    path: String,
    source: anyhow::Error,
  },

  /// A fetched payload could not be interpreted
  Resource { resource: String, message: String },

  /// A check could not produce results from otherwise valid data
  Evaluation { check: String, message: String },

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl HealthError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    HealthError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  pub fn registration(msg: impl Into<String>) -> Self {
    HealthError::Registration { message: msg.into() }
  }

  pub fn resource(resource: impl Into<String>, msg: impl Into<String>) -> Self {
    HealthError::Resource {
      resource: resource.into(),
      message: msg.into(),
    }
  }

  pub fn evaluation(check: impl Into<String>, msg: impl Into<String>) -> Self {
    HealthError::Evaluation {
      check: check.into(),
      message: msg.into(),
    }
  }

  /// Add context to an existing error
  ///
  /// Message and invalid-config errors keep their shape. I/O errors are
  /// folded into a message error carrying the context; other structured
  /// variants already name what failed and are returned unchanged.
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      HealthError::Message { message, context, help } => HealthError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      HealthError::Config(ConfigError::InvalidCheckConfig { check, reason }) => {
        HealthError::Config(ConfigError::InvalidCheckConfig {
          check,
          reason: format!("{}: {}", ctx_str, reason),
        })
      }
      HealthError::Io(err) => HealthError::Message {
        message: err.to_string(),
        context: Some(ctx_str),
        help: None,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      HealthError::Registration { .. } => ExitCode::User,
      HealthError::Config(_) => ExitCode::User,
      HealthError::Fetch { .. } => ExitCode::System,
      HealthError::Resource { .. } => ExitCode::System,
      HealthError::Evaluation { .. } => ExitCode::System,
      HealthError::Io(_) => ExitCode::System,
      HealthError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      HealthError::Config(e) => e.help_message(),
      HealthError::Fetch { source, .. } => {
        let reason = source.to_string();
        if reason.contains("permission denied") || reason.contains("403") {
          Some("The token in use may lack list/read capabilities on this mount.".to_string())
        } else {
          None
        }
      }
      HealthError::Registration { .. } => Some("Every registered check needs a unique, non-empty name.".to_string()),
      HealthError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for HealthError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      HealthError::Registration { message } => write!(f, "Bad check registration: {}", message),
      HealthError::Config(e) => write!(f, "{}", e),
      HealthError::Fetch {
        operation,
        path,
        source,
      } => write!(f, "error fetching {} {}: {}", operation, path, source),
      HealthError::Resource { resource, message } => write!(f, "failed to parse {}: {}", resource, message),
      HealthError::Evaluation { check, message } => write!(f, "check '{}' failed to evaluate: {}", check, message),
      HealthError::Io(e) => write!(f, "I/O error: {}", e),
      HealthError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for HealthError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      HealthError::Io(e) => Some(e),
      HealthError::Fetch { source, .. } => Some(&**source),
      _ => None,
    }
  }
}

impl From<ConfigError> for HealthError {
  fn from(err: ConfigError) -> Self {
    HealthError::Config(err)
  }
}

impl From<io::Error> for HealthError {
  fn from(err: io::Error) -> Self {
    HealthError::Io(err)
  }
}

impl From<String> for HealthError {
  fn from(msg: String) -> Self {
    HealthError::message(msg)
  }
}

impl From<&str> for HealthError {
  fn from(msg: &str) -> Self {
    HealthError::message(msg)
  }
}

impl From<toml_edit::de::Error> for HealthError {
  fn from(err: toml_edit::de::Error) -> Self {
    HealthError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_json::Error> for HealthError {
  fn from(err: serde_json::Error) -> Self {
    HealthError::message(format!("JSON error: {}", err))
  }
}

impl From<anyhow::Error> for HealthError {
  fn from(err: anyhow::Error) -> Self {
    HealthError::message(err.to_string())
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// An override names an option the check does not declare
  UnknownOption { check: String, option: String },

  /// The merged config could not be decoded or failed validation
  InvalidCheckConfig { check: String, reason: String },

  /// Config file could not be found
  NotFound { path: PathBuf },

  /// `execute` was called before a successful `build_config`
  NotBuilt,
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::UnknownOption { check, .. } => Some(format!(
        "Run `pki-health list` to see the options '{}' accepts.",
        check
      )),
      ConfigError::InvalidCheckConfig { .. } => {
        Some("Durations accept seconds or unit suffixes such as \"30d\", \"12h\" or \"1d12h\".".to_string())
      }
      ConfigError::NotFound { .. } => Some("Check the path passed to --snapshot or --config.".to_string()),
      ConfigError::NotBuilt => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::UnknownOption { check, option } => {
        write!(f, "unknown configuration option for {}: {}", check, option)
      }
      ConfigError::InvalidCheckConfig { check, reason } => {
        write!(f, "error saving merged config for {}: {}", check, reason)
      }
      ConfigError::NotFound { path } => write!(f, "File not found: {}", path.display()),
      ConfigError::NotBuilt => write!(f, "Check configuration has not been built; call build_config first"),
    }
  }
}

/// Result type alias for pki-health
pub type HealthResult<T> = Result<T, HealthError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> HealthResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> HealthResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<HealthError>,
{
  fn context(self, ctx: impl Into<String>) -> HealthResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> HealthResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &HealthError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
