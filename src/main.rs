mod commands;

use clap::{Parser, Subcommand};
use pki_health::core::error::{HealthError, print_error};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Health checks for PKI secrets-engine mounts
#[derive(Parser)]
#[command(name = "pki-health")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run every built-in check against a mount snapshot
  #[command(after_help = RUN_EXIT_CODES)]
  Run {
    /// JSON snapshot of the mount (list/read/fail sections)
    #[arg(long)]
    snapshot: PathBuf,
    /// Mount name substituted into check paths
    #[arg(long, default_value = "pki")]
    mount: String,
    /// TOML or JSON file with per-check overrides
    #[arg(long)]
    config: Option<PathBuf>,
    /// Disable checks unless the config file enables them explicitly
    #[arg(long)]
    default_disabled: bool,
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },

  /// List registered checks and their default configuration
  List {
    /// Output the listing in JSON format
    #[arg(long)]
    json: bool,
  },
}

/// Exit status of `run`. Code 2 is shared with command-line usage errors
/// reported by the argument parser; `--json` output tells them apart.
const RUN_EXIT_CODES: &str = "\
Exit codes:
  0  worst status is ok or not_applicable
  1  invalid check registration or configuration
  2  worst status is informational (also used for command-line usage errors)
  3  worst status is warning
  4  worst status is critical
  5  worst status is invalid_version or insufficient_permissions
  6  the mount could not be fetched or parsed";

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let result = match cli.command {
    Commands::Run {
      snapshot,
      mount,
      config,
      default_disabled,
      json,
    } => commands::run_health_check(commands::RunOptions {
      snapshot,
      mount,
      config,
      default_disabled,
      json,
    }),
    Commands::List { json } => commands::run_list(json).map(|()| 0),
  };

  match result {
    Ok(code) => std::process::exit(code),
    Err(err) => handle_error(err),
  }
}

fn handle_error(err: HealthError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
