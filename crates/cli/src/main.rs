// Tally CLI - config-driven two-source reconciliation

mod exit_codes;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Reconcile two record sets by key")]
#[command(version)]
struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run reconciliation from a TOML config file
    #[command(after_help = "\
Examples:
  tally run inventory.recon.toml
  tally run inventory.recon.toml --json
  tally run inventory.recon.toml --output result.json --records records.csv
  tally run inventory.recon.toml --aggregates-dir out/ --fail-on-diagnostics

Exit codes:
  0  every key matched
  3  differences found
  4  diagnostics present (with --fail-on-diagnostics)
  5  invalid config
  6  input or schema error")]
    Run {
        /// Path to the .recon.toml config file
        config: PathBuf,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write one CSV row per reconciled key
        #[arg(long)]
        records: Option<PathBuf>,

        /// Write one CSV per configured aggregation into this directory
        #[arg(long)]
        aggregates_dir: Option<PathBuf>,

        /// Exit non-zero when any diagnostic was reported
        #[arg(long, env = "TALLY_FAIL_ON_DIAGNOSTICS")]
        fail_on_diagnostics: bool,
    },

    /// Validate a recon config without running
    #[command(after_help = "\
Examples:
  tally validate inventory.recon.toml")]
    Validate {
        /// Path to the .recon.toml config file
        config: PathBuf,
    },
}

/// Install the stderr log subscriber. Engine `log` records are bridged in.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| level.to_string()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            config,
            json,
            output,
            records,
            aggregates_dir,
            fail_on_diagnostics,
        } => recon::cmd_run(recon::RunArgs {
            config,
            json,
            output,
            records,
            aggregates_dir,
            fail_on_diagnostics,
        }),
        Commands::Validate { config } => recon::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    /// Engine error with its registered exit code.
    pub fn recon(err: tally_recon::ReconError) -> Self {
        let code = exit_codes::recon_exit_code(&err);
        let hint = match &err {
            tally_recon::ReconError::MissingKeyField { side, .. } => Some(format!(
                "check the [[key]] {side} field names against the {side} file header"
            )),
            tally_recon::ReconError::ValueParse { .. } => {
                Some("remove the column from [left.types]/[right.types] to infer it".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
