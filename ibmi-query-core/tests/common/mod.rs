//! Recording test double for the driver traits.
//!
//! Every handle counts its open in the constructor and its close in `Drop`,
//! so tests can assert each handle was released exactly once.

#![allow(dead_code)]

use ibmi_query_core::driver::{AS400_SCHEME, Connection, Cursor, Driver, Row, Statement};
use ibmi_query_core::{
    ConnectionConfig, Credentials, DriverRegistry, IbmiQueryError, QueryRunner, Result, RunOutcome,
};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Open/close bookkeeping for one handle kind.
#[derive(Default)]
pub struct Counter {
    opened: Cell<u32>,
    closed: Cell<u32>,
    max_open: Cell<u32>,
}

impl Counter {
    fn open(&self) {
        self.opened.set(self.opened.get().saturating_add(1));
        let live = self.live();
        if live > self.max_open.get() {
            self.max_open.set(live);
        }
    }

    fn close(&self) {
        self.closed.set(self.closed.get().saturating_add(1));
    }

    pub fn opened(&self) -> u32 {
        self.opened.get()
    }

    pub fn closed(&self) -> u32 {
        self.closed.get()
    }

    pub fn live(&self) -> u32 {
        self.opened.get().saturating_sub(self.closed.get())
    }

    pub fn max_open(&self) -> u32 {
        self.max_open.get()
    }
}

#[derive(Default)]
pub struct Ledger {
    pub connections: Counter,
    pub statements: Counter,
    pub cursors: Counter,
    pub targets: RefCell<Vec<String>>,
    pub users: RefCell<Vec<String>>,
    pub passwords: RefCell<Vec<String>>,
    pub queries: RefCell<Vec<String>>,
}

impl Ledger {
    /// Asserts every opened handle was closed exactly once.
    pub fn assert_all_released(&self) {
        for (kind, counter) in [
            ("connection", &self.connections),
            ("statement", &self.statements),
            ("cursor", &self.cursors),
        ] {
            assert_eq!(
                counter.opened(),
                counter.closed(),
                "{kind}: opened {} closed {}",
                counter.opened(),
                counter.closed()
            );
            assert!(counter.max_open() <= 1, "{kind}: more than one open at once");
        }
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Text(String),
    Int(i32),
    Null,
}

pub type FakeRowData = HashMap<String, Value>;

/// Builds a well-formed employee row.
pub fn employee(code: &str, name: &str, salary: i32) -> FakeRowData {
    HashMap::from([
        ("employee_code".to_string(), Value::Text(code.to_string())),
        ("employee_name".to_string(), Value::Text(name.to_string())),
        ("monthly_salary".to_string(), Value::Int(salary)),
    ])
}

/// Behaviour of the fake server for one test.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub rows: Vec<FakeRowData>,
    pub connect_error: Option<String>,
    pub reject_empty_host: bool,
    pub statement_error: Option<String>,
    pub query_error: Option<String>,
    /// Fail the fetch after this many rows were returned
    pub fetch_error_after: Option<(usize, String)>,
}

impl Script {
    pub fn with_rows(rows: Vec<FakeRowData>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }
}

pub struct FakeDriver {
    script: Script,
    ledger: Rc<Ledger>,
}

impl Driver for FakeDriver {
    fn name(&self) -> &str {
        "fake"
    }

    fn connect(&self, target: &str, credentials: &Credentials) -> Result<Box<dyn Connection + '_>> {
        self.ledger.targets.borrow_mut().push(target.to_string());
        self.ledger.users.borrow_mut().push(credentials.user().to_string());
        self.ledger
            .passwords
            .borrow_mut()
            .push(credentials.password().to_string());

        if self.script.reject_empty_host && target == "jdbc:as400://" {
            return Err(IbmiQueryError::database_operation(
                "The application requester cannot establish the connection. ()",
            ));
        }
        if let Some(message) = &self.script.connect_error {
            return Err(IbmiQueryError::database_operation(message.clone()));
        }

        self.ledger.connections.open();
        Ok(Box::new(FakeConnection {
            script: &self.script,
            ledger: Rc::clone(&self.ledger),
        }))
    }
}

struct FakeConnection<'d> {
    script: &'d Script,
    ledger: Rc<Ledger>,
}

impl Drop for FakeConnection<'_> {
    fn drop(&mut self) {
        self.ledger.connections.close();
    }
}

impl Connection for FakeConnection<'_> {
    fn description(&self) -> String {
        "FakeConnection@1".to_string()
    }

    fn create_statement(&self) -> Result<Box<dyn Statement + '_>> {
        if let Some(message) = &self.script.statement_error {
            return Err(IbmiQueryError::database_operation(message.clone()));
        }
        self.ledger.statements.open();
        Ok(Box::new(FakeStatement {
            script: self.script,
            ledger: Rc::clone(&self.ledger),
        }))
    }
}

struct FakeStatement<'d> {
    script: &'d Script,
    ledger: Rc<Ledger>,
}

impl Drop for FakeStatement<'_> {
    fn drop(&mut self) {
        self.ledger.statements.close();
    }
}

impl Statement for FakeStatement<'_> {
    fn execute_query(&mut self, sql: &str) -> Result<Box<dyn Cursor + '_>> {
        self.ledger.queries.borrow_mut().push(sql.to_string());
        if let Some(message) = &self.script.query_error {
            return Err(IbmiQueryError::database_operation(message.clone()));
        }
        self.ledger.cursors.open();
        Ok(Box::new(FakeCursor {
            script: self.script,
            ledger: Rc::clone(&self.ledger),
            position: 0,
        }))
    }
}

struct FakeCursor<'d> {
    script: &'d Script,
    ledger: Rc<Ledger>,
    position: usize,
}

impl Drop for FakeCursor<'_> {
    fn drop(&mut self) {
        self.ledger.cursors.close();
    }
}

impl Cursor for FakeCursor<'_> {
    fn next_row(&mut self) -> Result<Option<Box<dyn Row + '_>>> {
        if let Some((after, message)) = &self.script.fetch_error_after {
            if self.position == *after {
                return Err(IbmiQueryError::database_operation(message.clone()));
            }
        }
        let Some(data) = self.script.rows.get(self.position) else {
            return Ok(None);
        };
        self.position = self.position.saturating_add(1);
        Ok(Some(Box::new(FakeRow { data })))
    }
}

struct FakeRow<'r> {
    data: &'r FakeRowData,
}

impl FakeRow<'_> {
    fn value(&self, column: &str) -> Result<&Value> {
        self.data
            .get(column)
            .ok_or_else(|| IbmiQueryError::decode(column, "column not found"))
    }
}

impl Row for FakeRow<'_> {
    fn text(&mut self, column: &str) -> Result<Option<String>> {
        Ok(match self.value(column)? {
            Value::Text(s) => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            Value::Null => None,
        })
    }

    fn int(&mut self, column: &str) -> Result<Option<i32>> {
        match self.value(column)? {
            Value::Int(i) => Ok(Some(*i)),
            Value::Text(s) => s
                .parse()
                .map(Some)
                .map_err(|_| IbmiQueryError::decode(column, format!("'{s}' is not an integer"))),
            Value::Null => Ok(None),
        }
    }
}

/// Registry serving the `as400` scheme with a fake driver following `script`.
pub fn registry_with(script: Script, ledger: &Rc<Ledger>) -> DriverRegistry {
    let ledger = Rc::clone(ledger);
    let mut registry = DriverRegistry::new();
    registry.register(
        AS400_SCHEME,
        Box::new(move || {
            Ok(Box::new(FakeDriver {
                script: script.clone(),
                ledger: Rc::clone(&ledger),
            }) as Box<dyn Driver>)
        }),
    );
    registry
}

pub fn default_config() -> ConnectionConfig {
    ConnectionConfig::new("ibmi.example.com", "payroll", "hunter2")
}

/// Runs once through the top-level handler and returns the printed lines.
pub fn run_lines(
    registry: &DriverRegistry,
    config: &ConnectionConfig,
) -> (RunOutcome, Vec<String>) {
    let mut out = Vec::new();
    let outcome = QueryRunner::new(registry, config).run_and_report(&mut out);
    let text = String::from_utf8(out).expect("output is UTF-8");
    (outcome, text.lines().map(str::to_string).collect())
}
