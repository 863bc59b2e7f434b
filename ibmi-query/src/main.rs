//! IBM i employee query client.
//!
//! This binary connects to an IBM i server using the `IBMI_HOST`,
//! `IBMI_USER` and `IBMI_PASS` environment variables, runs the fixed
//! employee salary query and prints one line per row. A `.env` file in the
//! working directory or any parent is loaded first; variables already set
//! in the process environment win.
//!
//! # Security Guarantees
//! - Read-only query only
//! - Password never printed or logged
//! - Diagnostics go to stderr; stdout carries only the result lines

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use ibmi_query_core::driver::AS400_SCHEME;
use ibmi_query_core::odbc::DEFAULT_ODBC_DRIVER;
use ibmi_query_core::{ConnectionConfig, DriverRegistry, QueryRunner, init_logging};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error, info, warn};

#[derive(Parser)]
#[command(name = "ibmi-query")]
#[command(about = "Prints the employee salary table of an IBM i server")]
#[command(version)]
#[command(long_about = "
ibmi-query - Employee salary listing for IBM i

Connects to the server named by IBMI_HOST as IBMI_USER/IBMI_PASS (read from
the environment or a .env file), runs

  select employee_code, employee_name, monthly_salary from spiobjuser.nmpp960

and prints one '<code> <name> <salary>' line per row.

By default every failure is reported as a single line on stdout and the
process exits 0. Use --strict to validate the environment first and exit 1
on any failure.

EXAMPLES:
  IBMI_HOST=ibmi.example.com IBMI_USER=payroll IBMI_PASS=secret ibmi-query
  IBMI_HOST=ibmi.example.com IBMI_USER=payroll ibmi-query --prompt-password
  ibmi-query --dry-run
  ibmi-query drivers
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Command>,

    /// Validate configuration and fail with a non-zero exit code
    #[arg(
        long,
        env = "IBMI_STRICT",
        help = "Validate IBMI_* variables before connecting and exit 1 on failure"
    )]
    pub strict: bool,

    /// Print what would run without connecting
    #[arg(long, help = "Print the target and query without connecting")]
    pub dry_run: bool,

    /// Read the password from the terminal
    #[arg(
        long,
        help = "Prompt for the password when IBMI_PASS is unset or empty"
    )]
    pub prompt_password: bool,

    /// ODBC driver name
    #[arg(
        long,
        env = "IBMI_ODBC_DRIVER",
        default_value = DEFAULT_ODBC_DRIVER,
        help = "Name of the installed IBM i ODBC driver"
    )]
    pub odbc_driver: String,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the employee query (default)
    Run,
    /// List registered database drivers
    Drivers,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress diagnostics
    #[arg(short, long, help = "Suppress all diagnostics except errors")]
    pub quiet: bool,
}

fn main() -> ExitCode {
    // Before parsing so that IBMI_STRICT and IBMI_ODBC_DRIVER may come from .env
    let dotenv = load_dotenv(None);
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.global.verbose, cli.global.quiet) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    match dotenv {
        Ok(Some(path)) => debug!("Loaded environment from {}", path.display()),
        Ok(None) => debug!("No .env file found"),
        Err(e) => warn!("Ignoring unreadable .env file: {}", e),
    }

    match execute(&cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: &Cli) -> anyhow::Result<ExitCode> {
    let registry = DriverRegistry::with_default_drivers(&cli.odbc_driver);

    match cli.command {
        Some(Command::Drivers) => {
            list_drivers(&registry, &cli.odbc_driver)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Run) | None => run_query(cli, &registry),
    }
}

/// Runs the query once and maps the outcome to an exit code.
fn run_query(cli: &Cli, registry: &DriverRegistry) -> anyhow::Result<ExitCode> {
    let mut config = ConnectionConfig::from_env();
    debug!("Loaded {}", config);

    if cli.prompt_password && !config.credentials().has_password() {
        let password = rpassword::prompt_password(format!(
            "Password for {}@{}: ",
            config.credentials().user(),
            config.host()
        ))
        .context("Failed to read password from terminal")?;
        config.credentials_mut().set_password(password);
    }

    let runner = QueryRunner::new(registry, &config).strict(cli.strict);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if cli.dry_run {
        return match runner.dry_run(&mut out) {
            Ok(()) => Ok(ExitCode::SUCCESS),
            Err(e) => {
                writeln!(out, "{e}").context("Failed to write to stdout")?;
                Ok(exit_code_for_failure(cli.strict))
            }
        };
    }

    let outcome = runner.run_and_report(&mut out);
    if outcome.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        info!("Run did not complete");
        Ok(exit_code_for_failure(cli.strict))
    }
}

/// Loads `path`, or the nearest `.env`, into the process environment.
///
/// A missing file is not an error. Existing variables are not overridden.
fn load_dotenv(path: Option<&Path>) -> Result<Option<PathBuf>, dotenvy::Error> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path).map(|()| path.to_path_buf()),
        None => dotenvy::dotenv(),
    };
    match loaded {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Best-effort runs always exit 0; strict runs exit 1 on failure.
fn exit_code_for_failure(strict: bool) -> ExitCode {
    if strict {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Lists registered driver schemes and their target format.
fn list_drivers(registry: &DriverRegistry, odbc_driver: &str) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    render_drivers(registry, odbc_driver, &mut out).context("Failed to write to stdout")
}

fn render_drivers<W: Write>(
    registry: &DriverRegistry,
    odbc_driver: &str,
    out: &mut W,
) -> std::io::Result<()> {
    writeln!(out, "Registered Drivers:")?;
    writeln!(out)?;

    for scheme in registry.schemes() {
        writeln!(out, "{scheme}:")?;
        writeln!(out, "  Target:      jdbc:{scheme}://<host>")?;
        if scheme == AS400_SCHEME {
            writeln!(out, "  ODBC driver: {odbc_driver}")?;
        }
        writeln!(out)?;
    }

    if !registry.contains(AS400_SCHEME) {
        writeln!(out, "{AS400_SCHEME}: unavailable")?;
        writeln!(out, "  Rebuild with --features odbc to enable the IBM i driver")?;
        writeln!(out)?;
    }

    writeln!(out, "Environment:")?;
    writeln!(out, "  IBMI_HOST   target server address")?;
    writeln!(out, "  IBMI_USER   login user")?;
    writeln!(out, "  IBMI_PASS   login password")?;
    Ok(())
}
