//! The connect, query, print, disconnect cycle.
//!
//! [`QueryRunner::run`] performs one cycle and propagates any failure.
//! [`QueryRunner::run_and_report`] is the single top-level handler: it
//! prints the failure's message on the same output and returns an outcome
//! instead of an error.
//!
//! Output lines, in order:
//! 1. `Trying to connect...`
//! 2. `Connected with <description>` once connection, statement and cursor
//!    are all open
//! 3. `employee_code, employee_name, monthly_salary`
//! 4. one `<code> <name> <salary>` line per row
//!
//! On failure the message is printed after whatever was already written.
//! Rows printed before a mid-iteration failure are not retracted.

use crate::Result;
use crate::config::ConnectionConfig;
use crate::driver::DriverRegistry;
use crate::error::{ErrorKind, IbmiQueryError, redact_connection_target};
use crate::record::EmployeeRecords;
use std::io::Write;
use std::time::Instant;
use tracing::{debug, error, info};

/// Printed before any connection attempt.
pub const STATUS_LINE: &str = "Trying to connect...";

/// Column header printed after the confirmation line.
pub const HEADER_LINE: &str = "employee_code, employee_name, monthly_salary";

/// The one query this client runs.
pub const EMPLOYEE_QUERY: &str =
    "select employee_code, employee_name, monthly_salary from spiobjuser.nmpp960";

/// Result of a reported run.
#[derive(Debug)]
pub enum RunOutcome {
    /// Every row was printed and all handles were released
    Completed {
        /// Number of row lines printed
        rows: u64,
    },
    /// The run failed; the message has already been printed
    Failed(IbmiQueryError),
}

impl RunOutcome {
    /// Failure class, if the run failed.
    pub const fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Completed { .. } => None,
            Self::Failed(e) => Some(e.kind()),
        }
    }

    /// Whether the run completed.
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Runs the employee query once against the configured server.
///
/// # Example
/// ```rust
/// use ibmi_query_core::config::ConnectionConfig;
/// use ibmi_query_core::driver::DriverRegistry;
/// use ibmi_query_core::runner::QueryRunner;
///
/// let registry = DriverRegistry::new();
/// let config = ConnectionConfig::new("ibmi", "user", "pass");
/// let mut out = Vec::new();
///
/// let outcome = QueryRunner::new(&registry, &config).run_and_report(&mut out);
/// assert!(!outcome.is_success());
///
/// let text = String::from_utf8(out).unwrap();
/// assert_eq!(text.lines().count(), 2);
/// assert_eq!(text.lines().next(), Some("Trying to connect..."));
/// ```
pub struct QueryRunner<'a> {
    registry: &'a DriverRegistry,
    config: &'a ConnectionConfig,
    strict: bool,
}

impl<'a> QueryRunner<'a> {
    /// Creates a best-effort runner: configuration is not validated.
    pub const fn new(registry: &'a DriverRegistry, config: &'a ConnectionConfig) -> Self {
        Self {
            registry,
            config,
            strict: false,
        }
    }

    /// Enables or disables strict configuration validation.
    #[must_use]
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Performs one connect, query, print, disconnect cycle.
    ///
    /// Connection, statement and cursor are dropped, in reverse order of
    /// acquisition, before this function returns on every path.
    ///
    /// # Errors
    /// - `DriverUnavailable` if no driver can be loaded for the target
    /// - `DatabaseOperationFailed` or `Decode` for any driver-side failure
    /// - `Configuration` in strict mode when the configuration is invalid
    /// - `Output` if writing to `out` fails
    pub fn run<W: Write>(&self, out: &mut W) -> Result<u64> {
        writeln!(out, "{STATUS_LINE}")?;

        if self.strict {
            self.config.validate()?;
        }

        let target = self.config.connection_target();
        info!("Target: {}", redact_connection_target(&target));

        let started = Instant::now();
        let driver = self.registry.load(&target)?;
        debug!(elapsed_ms = elapsed_ms(started), "Driver '{}' loaded", driver.name());

        let started = Instant::now();
        let connection = driver.connect(&target, self.config.credentials())?;
        let description = connection.description();
        debug!(elapsed_ms = elapsed_ms(started), "Connection established");

        let mut statement = connection.create_statement()?;
        debug!("Statement allocated");
        let started = Instant::now();
        let mut cursor = statement.execute_query(EMPLOYEE_QUERY)?;
        debug!(elapsed_ms = elapsed_ms(started), "Query executed");

        writeln!(out, "Connected with {description}")?;
        writeln!(out, "{HEADER_LINE}")?;

        let started = Instant::now();
        let mut rows: u64 = 0;
        for record in EmployeeRecords::new(cursor.as_mut()) {
            writeln!(out, "{}", record?)?;
            rows = rows.saturating_add(1);
        }
        out.flush()?;

        info!("✓ Printed {} rows", rows);
        debug!(elapsed_ms = elapsed_ms(started), "Cursor exhausted");
        Ok(rows)
    }

    /// Runs once and handles any failure at the top level.
    ///
    /// The failure's message is printed as a single line on `out`. If that
    /// write itself fails the error is only logged.
    pub fn run_and_report<W: Write>(&self, out: &mut W) -> RunOutcome {
        match self.run(out) {
            Ok(rows) => RunOutcome::Completed { rows },
            Err(e) => {
                error!("Run failed ({}): {}", e.kind(), e);
                if let Err(write_err) = writeln!(out, "{e}").and_then(|()| out.flush()) {
                    error!("Failed to report error: {}", write_err);
                }
                RunOutcome::Failed(e)
            }
        }
    }

    /// Prints what a run would do without loading a driver or connecting.
    ///
    /// # Errors
    /// Returns `Output` if writing fails, or `Configuration` in strict mode.
    pub fn dry_run<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "{STATUS_LINE}")?;
        if self.strict {
            self.config.validate()?;
        }
        writeln!(
            out,
            "Dry run: would connect to {}",
            redact_connection_target(&self.config.connection_target())
        )?;
        writeln!(
            out,
            "Dry run: as user '{}'",
            self.config.credentials().user()
        )?;
        writeln!(out, "Dry run: would execute: {EMPLOYEE_QUERY}")?;
        out.flush()?;
        Ok(())
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
