//! A scripted in-memory driver for connection tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use quarry_core::grammar::GenericGrammar;
use quarry_core::value::Value;

use crate::connection::Connection;
use crate::driver::{Driver, DriverError, ExecResult, Row};

/// One driver call, recorded in order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Query { sql: String, bindings: Vec<Value> },
    Execute { sql: String, bindings: Vec<Value> },
    ExecRaw { sql: String },
    Begin,
    Commit,
    Rollback,
}

#[derive(Debug, Default)]
struct Script {
    calls: Vec<Call>,
    queries: VecDeque<Result<Vec<Row>, DriverError>>,
    executes: VecDeque<Result<ExecResult, DriverError>>,
    raws: VecDeque<Result<(), DriverError>>,
    begins: VecDeque<Result<(), DriverError>>,
    commits: VecDeque<Result<(), DriverError>>,
    rollbacks: VecDeque<Result<(), DriverError>>,
}

/// Records every call and pops scripted results; unscripted calls
/// succeed with an empty result. Clones share the same script, so a
/// test keeps a handle after the connection takes ownership of one.
#[derive(Debug, Default, Clone)]
pub(crate) struct FakeDriver {
    script: Rc<RefCell<Script>>,
}

impl FakeDriver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn queue_rows(&self, rows: Vec<Row>) {
        self.script.borrow_mut().queries.push_back(Ok(rows));
    }

    pub(crate) fn fail_query(&self, error: DriverError) {
        self.script.borrow_mut().queries.push_back(Err(error));
    }

    pub(crate) fn queue_exec(&self, result: ExecResult) {
        self.script.borrow_mut().executes.push_back(Ok(result));
    }

    pub(crate) fn fail_execute(&self, error: DriverError) {
        self.script.borrow_mut().executes.push_back(Err(error));
    }

    pub(crate) fn fail_raw(&self, error: DriverError) {
        self.script.borrow_mut().raws.push_back(Err(error));
    }

    pub(crate) fn fail_begin(&self, error: DriverError) {
        self.script.borrow_mut().begins.push_back(Err(error));
    }

    pub(crate) fn fail_commit(&self, error: DriverError) {
        self.script.borrow_mut().commits.push_back(Err(error));
    }

    pub(crate) fn fail_rollback(&self, error: DriverError) {
        self.script.borrow_mut().rollbacks.push_back(Err(error));
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.script.borrow().calls.clone()
    }
}

impl Driver for FakeDriver {
    fn query(&mut self, sql: &str, bindings: &[Value]) -> Result<Vec<Row>, DriverError> {
        let mut script = self.script.borrow_mut();
        script.calls.push(Call::Query {
            sql: String::from(sql),
            bindings: bindings.to_vec(),
        });
        script.queries.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    fn execute(&mut self, sql: &str, bindings: &[Value]) -> Result<ExecResult, DriverError> {
        let mut script = self.script.borrow_mut();
        script.calls.push(Call::Execute {
            sql: String::from(sql),
            bindings: bindings.to_vec(),
        });
        script
            .executes
            .pop_front()
            .unwrap_or_else(|| Ok(ExecResult::default()))
    }

    fn exec_raw(&mut self, sql: &str) -> Result<(), DriverError> {
        let mut script = self.script.borrow_mut();
        script.calls.push(Call::ExecRaw {
            sql: String::from(sql),
        });
        script.raws.pop_front().unwrap_or(Ok(()))
    }

    fn begin(&mut self) -> Result<(), DriverError> {
        let mut script = self.script.borrow_mut();
        script.calls.push(Call::Begin);
        script.begins.pop_front().unwrap_or(Ok(()))
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        let mut script = self.script.borrow_mut();
        script.calls.push(Call::Commit);
        script.commits.pop_front().unwrap_or(Ok(()))
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        let mut script = self.script.borrow_mut();
        script.calls.push(Call::Rollback);
        script.rollbacks.pop_front().unwrap_or(Ok(()))
    }
}

/// Builds a row from column name and value pairs.
pub(crate) fn row(columns: &[(&str, Value)]) -> Row {
    Row::new(
        columns
            .iter()
            .map(|(name, value)| (String::from(*name), value.clone()))
            .collect(),
    )
}

/// A connection over the fake driver with the generic grammar.
pub(crate) fn connection(driver: &FakeDriver) -> Connection {
    Connection::new(Box::new(GenericGrammar::new()), Box::new(driver.clone()))
}
