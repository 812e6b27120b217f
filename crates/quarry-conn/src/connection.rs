//! Statement execution with logging, routing, and reconnection.
//!
//! A [`Connection`] owns a [`Grammar`] plus one or two [`Driver`]
//! handles and runs every statement through one funnel: bindings are
//! prepared, reads are routed to the replica when one is safe to use,
//! failures are classified, and a dropped connection is re-established
//! and retried once when no transaction is open.

use std::fmt;

use quarry_core::grammar::Grammar;
use quarry_core::value::Value;
use tracing::{debug, warn};

use crate::detect::caused_by_lost_connection;
use crate::driver::{Driver, DriverError, DriverHandles, ExecResult, Reconnector, Row};
use crate::error::{Error, Result};
use crate::transaction::TransactionRecord;

/// One executed statement, recorded while query logging is on.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryLogEntry {
    /// Statement text with `?` placeholders.
    pub query: String,
    /// Bindings in placeholder order, in driver-ready form.
    pub bindings: Vec<Value>,
}

/// A database connection.
pub struct Connection {
    name: String,
    grammar: Box<dyn Grammar>,
    write: Option<Box<dyn Driver>>,
    read: Option<Box<dyn Driver>>,
    reconnector: Option<Reconnector>,
    read_on_write: bool,
    sticky: bool,
    pub(crate) records_modified: bool,
    pub(crate) transactions: usize,
    pub(crate) transaction_records: Vec<TransactionRecord>,
    query_log: Vec<QueryLogEntry>,
    logging: bool,
    pretending: bool,
}

impl Connection {
    /// Creates a connection over a single write handle.
    #[must_use]
    pub fn new(grammar: Box<dyn Grammar>, write: Box<dyn Driver>) -> Self {
        Self {
            name: String::new(),
            grammar,
            write: Some(write),
            read: None,
            reconnector: None,
            read_on_write: false,
            sticky: false,
            records_modified: false,
            transactions: 0,
            transaction_records: Vec::new(),
            query_log: Vec::new(),
            logging: false,
            pretending: false,
        }
    }

    /// Names the connection for log context.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a replica handle that serves reads.
    #[must_use]
    pub fn with_read(mut self, read: Box<dyn Driver>) -> Self {
        self.read = Some(read);
        self
    }

    /// Installs the closure that rebuilds driver handles after a lost
    /// connection.
    #[must_use]
    pub fn with_reconnector(
        mut self,
        reconnector: impl FnMut() -> std::result::Result<DriverHandles, DriverError> + 'static,
    ) -> Self {
        self.reconnector = Some(Box::new(reconnector));
        self
    }

    /// Keeps reads on the write handle once this connection has
    /// modified records.
    #[must_use]
    pub fn with_sticky(mut self, sticky: bool) -> Self {
        self.sticky = sticky;
        self
    }

    /// Routes every read through the write handle.
    #[must_use]
    pub fn with_read_on_write(mut self, read_on_write: bool) -> Self {
        self.read_on_write = read_on_write;
        self
    }

    /// The connection name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The grammar statements compile through.
    #[must_use]
    pub fn grammar(&self) -> &dyn Grammar {
        self.grammar.as_ref()
    }

    /// Whether the connection is only pretending to execute.
    #[must_use]
    pub const fn pretending(&self) -> bool {
        self.pretending
    }

    // ----- statements -----

    /// Runs a select and returns its rows.
    ///
    /// # Errors
    ///
    /// [`Error::Query`] when the statement fails.
    pub fn select(&mut self, sql: &str, bindings: &[Value]) -> Result<Vec<Row>> {
        self.run(sql, bindings, true, |driver, sql, bindings| {
            driver.query(sql, bindings)
        })
    }

    /// Runs a select on the write handle regardless of routing.
    ///
    /// # Errors
    ///
    /// [`Error::Query`] when the statement fails.
    pub fn select_from_write(&mut self, sql: &str, bindings: &[Value]) -> Result<Vec<Row>> {
        self.run(sql, bindings, false, |driver, sql, bindings| {
            driver.query(sql, bindings)
        })
    }

    /// Runs a select and returns only the first row.
    ///
    /// # Errors
    ///
    /// [`Error::Query`] when the statement fails.
    pub fn select_one(&mut self, sql: &str, bindings: &[Value]) -> Result<Option<Row>> {
        Ok(self.select(sql, bindings)?.into_iter().next())
    }

    /// Runs a write statement.
    ///
    /// # Errors
    ///
    /// [`Error::Query`] when the statement fails.
    pub fn statement(&mut self, sql: &str, bindings: &[Value]) -> Result<ExecResult> {
        let result = self.run(sql, bindings, false, |driver, sql, bindings| {
            driver.execute(sql, bindings)
        })?;
        if !self.pretending {
            self.records_have_been_modified(true);
        }
        Ok(result)
    }

    /// Runs a write statement and reports the affected row count.
    ///
    /// # Errors
    ///
    /// [`Error::Query`] when the statement fails.
    pub fn affecting_statement(&mut self, sql: &str, bindings: &[Value]) -> Result<u64> {
        let result = self.run(sql, bindings, false, |driver, sql, bindings| {
            driver.execute(sql, bindings)
        })?;
        if !self.pretending {
            self.records_have_been_modified(result.rows_affected > 0);
        }
        Ok(result.rows_affected)
    }

    /// Runs a raw statement with no bindings.
    ///
    /// # Errors
    ///
    /// [`Error::Query`] when the statement fails.
    pub fn unprepared(&mut self, sql: &str) -> Result<()> {
        self.run(sql, &[], false, |driver, sql, _| driver.exec_raw(sql))?;
        if !self.pretending {
            self.records_have_been_modified(true);
        }
        Ok(())
    }

    // ----- the execution funnel -----

    /// Runs one statement: prepare bindings, execute, retry a lost
    /// connection once, then log.
    fn run<T, F>(&mut self, sql: &str, bindings: &[Value], use_read: bool, op: F) -> Result<T>
    where
        T: Default,
        F: Fn(&mut dyn Driver, &str, &[Value]) -> std::result::Result<T, DriverError>,
    {
        self.reconnect_if_missing()?;
        let prepared = self.prepare_bindings(bindings);
        debug!(connection = %self.name, sql = %sql, "Executing SQL");
        let result = match self.run_once(sql, &prepared, use_read, &op) {
            Ok(value) => value,
            Err(error) => self.retry_if_lost_connection(error, sql, &prepared, use_read, &op)?,
        };
        self.log_query(sql, prepared);
        Ok(result)
    }

    fn run_once<T, F>(
        &mut self,
        sql: &str,
        bindings: &[Value],
        use_read: bool,
        op: &F,
    ) -> Result<T>
    where
        T: Default,
        F: Fn(&mut dyn Driver, &str, &[Value]) -> std::result::Result<T, DriverError>,
    {
        if self.pretending {
            return Ok(T::default());
        }
        let driver = self.driver_for(use_read)?;
        op(driver, sql, bindings).map_err(|source| query_error(sql, bindings, source))
    }

    /// Inside a transaction every failure propagates; outside, a lost
    /// connection is re-established and the statement retried once.
    fn retry_if_lost_connection<T, F>(
        &mut self,
        error: Error,
        sql: &str,
        bindings: &[Value],
        use_read: bool,
        op: &F,
    ) -> Result<T>
    where
        T: Default,
        F: Fn(&mut dyn Driver, &str, &[Value]) -> std::result::Result<T, DriverError>,
    {
        if self.transactions >= 1 {
            return Err(error);
        }
        if !error.driver_error().is_some_and(caused_by_lost_connection) {
            return Err(error);
        }
        warn!(connection = %self.name, "Reconnecting after lost connection");
        self.reconnect()?;
        self.run_once(sql, bindings, use_read, op)
    }

    /// Picks the handle a statement runs on. Reads fall back to the
    /// write handle inside transactions, under sticky routing after a
    /// write, or when no replica is configured.
    pub(crate) fn driver_for(&mut self, use_read: bool) -> Result<&mut (dyn Driver + 'static)> {
        let use_write = !use_read
            || self.transactions > 0
            || self.read_on_write
            || (self.records_modified && self.sticky)
            || self.read.is_none();
        let slot = if use_write {
            &mut self.write
        } else {
            &mut self.read
        };
        slot.as_deref_mut()
            .ok_or_else(|| Error::Driver(DriverError::new("database connection is closed")))
    }

    // ----- bindings -----

    /// Converts bindings to driver-ready form: datetimes through the
    /// grammar's date format, booleans to integers.
    #[must_use]
    pub fn prepare_bindings(&self, bindings: &[Value]) -> Vec<Value> {
        bindings
            .iter()
            .map(|value| match value {
                Value::DateTime(when) => {
                    Value::Text(when.format(self.grammar.date_format()).to_string())
                }
                Value::Bool(flag) => Value::Int(i64::from(*flag)),
                other => other.clone(),
            })
            .collect()
    }

    // ----- modification tracking -----

    /// Latches the modified flag sticky read routing checks.
    pub fn records_have_been_modified(&mut self, modified: bool) {
        if !self.records_modified {
            self.records_modified = modified;
        }
    }

    /// Clears the modified flag.
    pub fn forget_record_modification_state(&mut self) {
        self.records_modified = false;
    }

    // ----- query log -----

    /// Starts recording executed statements.
    pub fn enable_query_log(&mut self) {
        self.logging = true;
    }

    /// Stops recording executed statements.
    pub fn disable_query_log(&mut self) {
        self.logging = false;
    }

    /// Clears the recorded statements.
    pub fn flush_query_log(&mut self) {
        self.query_log.clear();
    }

    /// The statements recorded so far.
    #[must_use]
    pub fn query_log(&self) -> &[QueryLogEntry] {
        &self.query_log
    }

    fn log_query(&mut self, sql: &str, bindings: Vec<Value>) {
        if self.logging {
            self.query_log.push(QueryLogEntry {
                query: String::from(sql),
                bindings,
            });
        }
    }

    /// Runs the callback with execution disabled and returns the
    /// statements it would have run.
    ///
    /// # Errors
    ///
    /// Whatever the callback raises; pretend and logging state are
    /// restored first.
    pub fn pretend<F>(&mut self, callback: F) -> Result<Vec<QueryLogEntry>>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let logging = self.logging;
        self.logging = true;
        self.query_log.clear();
        self.pretending = true;
        let result = callback(self);
        self.pretending = false;
        self.logging = logging;
        result.map(|()| self.query_log.clone())
    }

    // ----- reconnection -----

    /// Rebuilds driver handles through the installed reconnector and
    /// resets transaction state.
    ///
    /// # Errors
    ///
    /// [`Error::NoReconnector`] without a reconnector, or the error the
    /// reconnector reports.
    pub fn reconnect(&mut self) -> Result<()> {
        let Some(reconnector) = self.reconnector.as_mut() else {
            return Err(Error::NoReconnector);
        };
        let handles = reconnector()?;
        self.write = Some(handles.write);
        self.read = handles.read;
        self.transactions = 0;
        self.transaction_records.clear();
        Ok(())
    }

    pub(crate) fn reconnect_if_missing(&mut self) -> Result<()> {
        if self.write.is_none() {
            self.reconnect()?;
        }
        Ok(())
    }

    /// Drops both driver handles; the next statement reconnects.
    pub fn disconnect(&mut self) {
        self.write = None;
        self.read = None;
        self.transactions = 0;
        self.transaction_records.clear();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.name)
            .field("grammar", &self.grammar.name())
            .field("transactions", &self.transactions)
            .field("records_modified", &self.records_modified)
            .field("pretending", &self.pretending)
            .finish_non_exhaustive()
    }
}

fn query_error(sql: &str, bindings: &[Value], source: DriverError) -> Error {
    Error::Query {
        message: source.message.clone(),
        sql: substitute_bindings(sql, bindings),
        source,
    }
}

/// Replaces each `?` with its binding rendered inline; placeholders
/// past the end of the binding list stay as `?`.
fn substitute_bindings(sql: &str, bindings: &[Value]) -> String {
    let mut values = bindings.iter();
    let mut segments = sql.split('?');
    let mut out = String::from(segments.next().unwrap_or_default());
    for segment in segments {
        match values.next() {
            Some(value) => out.push_str(&value.to_sql_inline()),
            None => out.push('?'),
        }
        out.push_str(segment);
    }
    out
}
