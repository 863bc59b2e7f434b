//! Typed decoding of employee rows.

use crate::Result;
use crate::driver::{Cursor, Row};
use std::iter::FusedIterator;

/// Employee code column
pub const EMPLOYEE_CODE: &str = "employee_code";
/// Employee name column
pub const EMPLOYEE_NAME: &str = "employee_name";
/// Monthly salary column
pub const MONTHLY_SALARY: &str = "monthly_salary";

/// Rendering of a NULL text column.
pub const NULL_TEXT: &str = "null";

/// One row of the salary query.
///
/// Rows are decoded and printed one at a time; nothing accumulates them.
/// `Display` renders the console line: the three fields separated by single
/// spaces.
///
/// ```rust
/// use ibmi_query_core::record::EmployeeRecord;
///
/// let record = EmployeeRecord {
///     employee_code: "E1".to_string(),
///     employee_name: "John Doe".to_string(),
///     monthly_salary: 5000,
/// };
/// assert_eq!(record.to_string(), "E1 John Doe 5000");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeRecord {
    /// Employee code as stored on the server
    pub employee_code: String,
    /// Employee name as stored on the server
    pub employee_name: String,
    /// Monthly salary in whole currency units
    pub monthly_salary: i32,
}

impl EmployeeRecord {
    /// Decodes the current row by column name.
    ///
    /// A NULL text column becomes `null` and a NULL salary becomes `0`.
    ///
    /// # Errors
    /// Returns `Decode` if a column is missing or of the wrong type, and
    /// passes through any driver failure.
    pub fn from_row(row: &mut dyn Row) -> Result<Self> {
        Ok(Self {
            employee_code: text_or_null(row.text(EMPLOYEE_CODE)?),
            employee_name: text_or_null(row.text(EMPLOYEE_NAME)?),
            monthly_salary: row.int(MONTHLY_SALARY)?.unwrap_or_default(),
        })
    }
}

fn text_or_null(value: Option<String>) -> String {
    value.unwrap_or_else(|| NULL_TEXT.to_string())
}

impl std::fmt::Display for EmployeeRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.employee_code, self.employee_name, self.monthly_salary
        )
    }
}

/// Lazy, single-pass sequence of decoded records over a cursor.
///
/// Yields at most one error, after which iteration stops.
pub struct EmployeeRecords<'c, 'h> {
    cursor: &'c mut (dyn Cursor + 'h),
    done: bool,
}

impl<'c, 'h> EmployeeRecords<'c, 'h> {
    /// Wraps a freshly opened cursor.
    pub fn new(cursor: &'c mut (dyn Cursor + 'h)) -> Self {
        Self {
            cursor,
            done: false,
        }
    }
}

impl Iterator for EmployeeRecords<'_, '_> {
    type Item = Result<EmployeeRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let decoded = match self.cursor.next_row() {
            Ok(Some(mut row)) => EmployeeRecord::from_row(row.as_mut()),
            Ok(None) => {
                self.done = true;
                return None;
            }
            Err(e) => Err(e),
        };

        if decoded.is_err() {
            self.done = true;
        }
        Some(decoded)
    }
}

impl FusedIterator for EmployeeRecords<'_, '_> {}
