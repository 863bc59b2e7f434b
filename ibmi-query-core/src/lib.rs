//! Core plumbing for the ibmi-query client.
//!
//! One run reads the connection parameters from the environment, loads the
//! IBM i driver from an explicit registry, opens a connection, statement and
//! cursor for the fixed employee query, prints each row as it is fetched, and
//! releases every handle before returning.
//!
//! # Security Guarantees
//! - Passwords are held in zeroizing buffers and never logged or displayed
//! - The only statement ever executed is a read-only `select`
//!
//! # Architecture
//! - Driver table instead of by-name driver loading ([`driver::DriverRegistry`])
//! - RAII handles: connection, statement and cursor close on drop
//! - Typed row decoding with by-name column lookup ([`record::EmployeeRecord`])
//! - A single top-level failure handler ([`runner::QueryRunner::run_and_report`])

pub mod config;
pub mod credentials;
pub mod driver;
pub mod error;
pub mod logging;
pub mod odbc;
pub mod record;
pub mod runner;

// Re-export commonly used types
pub use config::ConnectionConfig;
pub use credentials::Credentials;
pub use driver::{Connection, Cursor, Driver, DriverRegistry, Row, Statement};
pub use error::{ErrorKind, IbmiQueryError, Result};
pub use logging::init_logging;
pub use record::EmployeeRecord;
pub use runner::{EMPLOYEE_QUERY, HEADER_LINE, QueryRunner, RunOutcome, STATUS_LINE};
