//! `odbc-api` backed implementation of the driver traits.

use super::{connection_string, host_of, redacted_connection_string};
use crate::Result;
use crate::credentials::Credentials;
use crate::driver::{self, AS400_SCHEME};
use crate::error::IbmiQueryError;
use odbc_api::handles::{StatementImpl, StatementRef};
use odbc_api::{
    ConnectionOptions, Cursor as _, CursorImpl, CursorRow, Environment, Nullable, Prepared,
    ResultSetMetadata as _,
};
use std::collections::HashMap;
use tracing::debug;
use zeroize::Zeroizing;

/// SQLSTATEs the driver manager raises when the driver itself is missing:
/// data source or driver not found, and driver library failed to load.
const DRIVER_MISSING_STATES: [[u8; 5]; 2] = [*b"IM002", *b"IM003"];

/// SQLSTATEs for values that cannot be converted to the requested C type.
const CONVERSION_STATES: [[u8; 5]; 2] = [*b"22018", *b"07006"];

/// IBM i driver going through the ODBC driver manager.
///
/// Owns the ODBC environment; connections borrow it.
pub struct As400OdbcDriver {
    environment: Environment,
    odbc_driver: String,
}

impl As400OdbcDriver {
    /// Allocates the ODBC environment.
    ///
    /// # Errors
    /// Returns `DriverUnavailable` if the driver manager cannot allocate an
    /// environment handle.
    pub fn new(odbc_driver: impl Into<String>) -> Result<Self> {
        let environment = Environment::new().map_err(|e| {
            IbmiQueryError::driver_unavailable(
                AS400_SCHEME,
                format!("ODBC environment could not be allocated: {e}"),
            )
        })?;

        Ok(Self {
            environment,
            odbc_driver: odbc_driver.into(),
        })
    }
}

impl driver::Driver for As400OdbcDriver {
    fn name(&self) -> &str {
        &self.odbc_driver
    }

    fn connect(
        &self,
        target: &str,
        credentials: &Credentials,
    ) -> Result<Box<dyn driver::Connection + '_>> {
        let host = host_of(target);
        debug!(
            "Connecting with {}",
            redacted_connection_string(&self.odbc_driver, host, credentials)
        );

        let conn_str = Zeroizing::new(connection_string(&self.odbc_driver, host, credentials));
        let connection = self
            .environment
            .connect_with_connection_string(&conn_str, ConnectionOptions::default())
            .map_err(map_odbc_error)?;

        if let Ok(dbms) = connection.database_management_system_name() {
            debug!("Server reports DBMS '{}'", dbms.trim());
        }
        Ok(Box::new(OdbcConnection {
            inner: connection,
            host: host.to_string(),
        }))
    }
}

struct OdbcConnection<'e> {
    inner: odbc_api::Connection<'e>,
    host: String,
}

impl driver::Connection for OdbcConnection<'_> {
    fn description(&self) -> String {
        format!("{AS400_SCHEME} connection to {}", self.host)
    }

    fn create_statement(&self) -> Result<Box<dyn driver::Statement + '_>> {
        Ok(Box::new(OdbcStatement {
            connection: &self.inner,
            prepared: None,
        }))
    }
}

struct OdbcStatement<'c, 'e> {
    connection: &'c odbc_api::Connection<'e>,
    prepared: Option<Prepared<StatementImpl<'c>>>,
}

impl driver::Statement for OdbcStatement<'_, '_> {
    fn execute_query(&mut self, sql: &str) -> Result<Box<dyn driver::Cursor + '_>> {
        let connection = self.connection;
        let prepared = self
            .prepared
            .insert(connection.prepare(sql).map_err(map_odbc_error)?);

        let mut cursor = prepared
            .execute(())
            .map_err(map_odbc_error)?
            .ok_or_else(|| {
                IbmiQueryError::database_operation("Statement did not return a result set")
            })?;

        let columns = column_indices(&mut cursor)?;
        debug!("Result set has {} columns", columns.len());
        Ok(Box::new(OdbcCursor {
            inner: cursor,
            columns,
        }))
    }
}

fn column_indices(cursor: &mut CursorImpl<StatementRef<'_>>) -> Result<HashMap<String, u16>> {
    let count = cursor.num_result_cols().map_err(map_odbc_error)?;
    let count = u16::try_from(count).unwrap_or(0);

    let mut columns = HashMap::with_capacity(usize::from(count));
    for index in 1..=count {
        let name = cursor.col_name(index).map_err(map_odbc_error)?;
        columns.insert(name.trim().to_ascii_lowercase(), index);
    }
    Ok(columns)
}

struct OdbcCursor<'s> {
    inner: CursorImpl<StatementRef<'s>>,
    columns: HashMap<String, u16>,
}

impl driver::Cursor for OdbcCursor<'_> {
    fn next_row(&mut self) -> Result<Option<Box<dyn driver::Row + '_>>> {
        let columns = &self.columns;
        match self.inner.next_row().map_err(map_odbc_error)? {
            Some(row) => Ok(Some(Box::new(OdbcRow { row, columns }))),
            None => Ok(None),
        }
    }
}

struct OdbcRow<'r> {
    row: CursorRow<'r>,
    columns: &'r HashMap<String, u16>,
}

impl OdbcRow<'_> {
    fn index_of(&self, column: &str) -> Result<u16> {
        self.columns
            .get(&column.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| IbmiQueryError::decode(column, "column not found in result set"))
    }
}

impl driver::Row for OdbcRow<'_> {
    fn text(&mut self, column: &str) -> Result<Option<String>> {
        let index = self.index_of(column)?;
        let mut buf = Vec::new();
        let non_null = self
            .row
            .get_text(index, &mut buf)
            .map_err(|e| map_column_error(column, e))?;
        Ok(non_null.then(|| String::from_utf8_lossy(&buf).into_owned()))
    }

    fn int(&mut self, column: &str) -> Result<Option<i32>> {
        let index = self.index_of(column)?;
        let mut value = Nullable::<i32>::null();
        self.row
            .get_data(index, &mut value)
            .map_err(|e| map_column_error(column, e))?;
        Ok(value.into_opt())
    }
}

fn sql_state(err: &odbc_api::Error) -> Option<[u8; 5]> {
    match err {
        odbc_api::Error::Diagnostics { record, .. } => Some(record.state.0),
        _ => None,
    }
}

/// Diagnostic text as returned by the driver manager.
///
/// `odbc-api` hands out UTF-16 messages with the wide function set and
/// bytes with the `narrow` feature.
trait DiagnosticText {
    fn decode(&self) -> String;
}

impl DiagnosticText for [u8] {
    fn decode(&self) -> String {
        String::from_utf8_lossy(self).into_owned()
    }
}

impl DiagnosticText for [u16] {
    fn decode(&self) -> String {
        String::from_utf16_lossy(self)
    }
}

/// Driver message text without the `odbc-api` wrapper.
fn diagnostic_message(err: &odbc_api::Error) -> String {
    if let odbc_api::Error::Diagnostics { record, .. } = err {
        let text = record.message.as_slice().decode();
        let text = text.trim_end_matches('\0').trim();
        if !text.is_empty() {
            return text.to_string();
        }
    }
    err.to_string()
}

fn is_driver_missing(state: &[u8; 5]) -> bool {
    DRIVER_MISSING_STATES.contains(state)
}

fn is_conversion_failure(state: &[u8; 5]) -> bool {
    CONVERSION_STATES.contains(state)
}

fn map_odbc_error(err: odbc_api::Error) -> IbmiQueryError {
    match sql_state(&err) {
        Some(state) if is_driver_missing(&state) => {
            IbmiQueryError::driver_unavailable(AS400_SCHEME, diagnostic_message(&err))
        }
        _ => IbmiQueryError::database_operation(diagnostic_message(&err)),
    }
}

fn map_column_error(column: &str, err: odbc_api::Error) -> IbmiQueryError {
    match sql_state(&err) {
        Some(state) if is_conversion_failure(&state) => {
            IbmiQueryError::decode(column, diagnostic_message(&err))
        }
        _ => map_odbc_error(err),
    }
}
