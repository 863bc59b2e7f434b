//! Driver traits for scoped database access.
//!
//! A [`Driver`] opens a [`Connection`], which hands out a [`Statement`],
//! which executes a query and yields a forward-only [`Cursor`] of [`Row`]s.
//! Each handle borrows from the one that created it, so the borrow checker
//! enforces release order, and each implementation releases its underlying
//! resource in `Drop`. Whatever path a run takes out of its scope, every
//! handle is closed exactly once.
//!
//! Drivers are not loaded by name at run time. They are registered in a
//! [`DriverRegistry`] under the scheme of the targets they serve.

mod registry;

pub use registry::{DriverLoader, DriverRegistry, scheme_of};

use crate::Result;
use crate::credentials::Credentials;

/// Scheme served by the IBM i driver.
pub const AS400_SCHEME: &str = "as400";

/// A loaded database driver.
pub trait Driver {
    /// Short driver name for logs and the `drivers` listing.
    fn name(&self) -> &str;

    /// Opens a connection to `target`, authenticating with `credentials`.
    ///
    /// # Errors
    /// Returns `DriverUnavailable` if the driver turns out to be unusable
    /// while connecting, and `DatabaseOperationFailed` for network or
    /// authentication failures.
    fn connect(&self, target: &str, credentials: &Credentials)
    -> Result<Box<dyn Connection + '_>>;
}

/// An open connection. Closed when dropped.
pub trait Connection {
    /// Opaque, password-free description of the connection.
    fn description(&self) -> String;

    /// Allocates a statement handle on this connection.
    ///
    /// # Errors
    /// Returns `DatabaseOperationFailed` if the driver refuses the allocation.
    fn create_statement(&self) -> Result<Box<dyn Statement + '_>>;
}

/// A statement handle. Freed when dropped.
pub trait Statement {
    /// Executes `sql` and opens a cursor over its result set.
    ///
    /// # Errors
    /// Returns `DatabaseOperationFailed` for malformed SQL, missing objects,
    /// authority failures, or a statement that produced no result set.
    fn execute_query(&mut self, sql: &str) -> Result<Box<dyn Cursor + '_>>;
}

/// Forward-only, single-pass cursor. Closed when dropped.
pub trait Cursor {
    /// Advances to the next row, or returns `None` once the result set is
    /// exhausted.
    ///
    /// # Errors
    /// Returns `DatabaseOperationFailed` if fetching fails.
    fn next_row(&mut self) -> Result<Option<Box<dyn Row + '_>>>;
}

/// The current row of a cursor, with by-name column access.
///
/// Both accessors return `Ok(None)` for SQL NULL.
pub trait Row {
    /// Reads a column as text.
    ///
    /// # Errors
    /// Returns `Decode` if no column has that name, `DatabaseOperationFailed`
    /// if the driver fails to read it.
    fn text(&mut self, column: &str) -> Result<Option<String>>;

    /// Reads a column as a 32-bit integer.
    ///
    /// # Errors
    /// Returns `Decode` if no column has that name or the value is not an
    /// integer, `DatabaseOperationFailed` if the driver fails to read it.
    fn int(&mut self, column: &str) -> Result<Option<i32>>;
}
