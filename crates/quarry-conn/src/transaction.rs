//! Nested transactions with savepoints, deadlock retries, and
//! after-commit callbacks.
//!
//! The first level opens a real driver transaction; deeper levels
//! become savepoints named `trans2`, `trans3`, and so on when the
//! grammar supports them. [`Connection::transaction`] retries the
//! whole unit when a deadlock rolls it back, and callbacks registered
//! through [`Connection::after_commit`] run once the outermost level
//! commits.

use std::mem;

use tracing::{debug, warn};

use crate::connection::Connection;
use crate::detect::{caused_by_concurrency_error, caused_by_lost_connection};
use crate::error::{Error, Result};

/// One open transaction level and the callbacks queued under it.
pub(crate) struct TransactionRecord {
    pub(crate) level: usize,
    pub(crate) callbacks: Vec<Box<dyn FnOnce()>>,
}

impl Connection {
    /// The number of open transaction levels.
    #[must_use]
    pub const fn transaction_level(&self) -> usize {
        self.transactions
    }

    /// Runs the callback inside a transaction, committing on success
    /// and rolling back on error. Deadlocks retry the whole callback
    /// up to `attempts` times.
    ///
    /// # Errors
    ///
    /// The callback's error once retries are exhausted, or the error
    /// from beginning, committing, or rolling back.
    pub fn transaction<T, F>(&mut self, attempts: usize, mut callback: F) -> Result<T>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        let attempts = attempts.max(1);
        let mut current = 0;
        loop {
            current += 1;
            self.begin_transaction()?;

            // A handler returning Ok means the attempt may be retried.
            let result = match callback(self) {
                Ok(value) => value,
                Err(error) => {
                    self.handle_callback_error(error, current, attempts)?;
                    continue;
                }
            };

            match self.commit() {
                Ok(()) => return Ok(result),
                Err(error) => self.handle_commit_error(error, current, attempts)?,
            }
        }
    }

    /// Opens a new transaction level.
    ///
    /// # Errors
    ///
    /// The driver's error when beginning the transaction or creating
    /// the savepoint fails.
    pub fn begin_transaction(&mut self) -> Result<()> {
        self.create_transaction()?;
        self.transactions += 1;
        self.transaction_records.push(TransactionRecord {
            level: self.transactions,
            callbacks: Vec::new(),
        });
        debug!(connection = %self.name(), level = self.transactions, "Transaction begun");
        Ok(())
    }

    fn create_transaction(&mut self) -> Result<()> {
        if self.transactions == 0 {
            self.reconnect_if_missing()?;
            let begun = self.driver_for(false)?.begin().map_err(Error::Driver);
            if let Err(error) = begun {
                self.handle_begin_error(error)?;
            }
        } else if self.grammar().supports_savepoints() {
            self.create_savepoint()?;
        }
        Ok(())
    }

    fn create_savepoint(&mut self) -> Result<()> {
        let name = format!("trans{}", self.transactions + 1);
        let sql = self.grammar().compile_savepoint(&name);
        self.driver_for(false)?.exec_raw(&sql).map_err(Error::Driver)
    }

    /// A lost connection at begin time gets one reconnect and retry;
    /// anything else propagates.
    fn handle_begin_error(&mut self, error: Error) -> Result<()> {
        if !error.driver_error().is_some_and(caused_by_lost_connection) {
            return Err(error);
        }
        warn!(connection = %self.name(), "Reconnecting after lost connection");
        self.reconnect()?;
        self.driver_for(false)?.begin().map_err(Error::Driver)
    }

    /// Commits the current transaction level. Only the outermost level
    /// reaches the driver; closing it fires the after-commit callbacks.
    ///
    /// # Errors
    ///
    /// The driver's error when the commit fails.
    pub fn commit(&mut self) -> Result<()> {
        if self.transactions == 1 {
            self.driver_for(false)?.commit().map_err(Error::Driver)?;
        }
        self.transactions = self.transactions.saturating_sub(1);
        debug!(connection = %self.name(), level = self.transactions, "Transaction committed");
        if self.transactions == 0 {
            self.fire_after_commit_callbacks();
        }
        Ok(())
    }

    /// Rolls back the current transaction level.
    ///
    /// # Errors
    ///
    /// The driver's error when the rollback fails.
    pub fn rollback(&mut self) -> Result<()> {
        self.rollback_to(self.transactions.saturating_sub(1))
    }

    /// Rolls back to the given transaction level. Levels outside the
    /// open range are ignored.
    ///
    /// # Errors
    ///
    /// The driver's error when the rollback fails.
    pub fn rollback_to(&mut self, to_level: usize) -> Result<()> {
        if to_level >= self.transactions {
            return Ok(());
        }
        if let Err(error) = self.perform_rollback(to_level) {
            return Err(self.handle_rollback_error(error));
        }
        self.transactions = to_level;
        self.discard_records_above(to_level);
        debug!(connection = %self.name(), level = self.transactions, "Transaction rolled back");
        Ok(())
    }

    fn perform_rollback(&mut self, to_level: usize) -> Result<()> {
        if to_level == 0 {
            self.driver_for(false)?.rollback().map_err(Error::Driver)?;
        } else if self.grammar().supports_savepoints() {
            let name = format!("trans{}", to_level + 1);
            let sql = self.grammar().compile_savepoint_rollback(&name);
            self.driver_for(false)?.exec_raw(&sql).map_err(Error::Driver)?;
        }
        Ok(())
    }

    fn handle_rollback_error(&mut self, error: Error) -> Error {
        if error.driver_error().is_some_and(caused_by_lost_connection) {
            self.transactions = 0;
            self.transaction_records.clear();
        }
        error
    }

    /// Runs the callback after the outermost transaction commits, or
    /// immediately when no transaction is open.
    pub fn after_commit(&mut self, callback: impl FnOnce() + 'static) {
        if let Some(record) = self.transaction_records.last_mut() {
            record.callbacks.push(Box::new(callback));
        } else {
            callback();
        }
    }

    fn fire_after_commit_callbacks(&mut self) {
        for record in mem::take(&mut self.transaction_records) {
            for callback in record.callbacks {
                callback();
            }
        }
    }

    fn discard_records_above(&mut self, level: usize) {
        self.transaction_records.retain(|record| record.level <= level);
    }

    /// MySQL rolls the whole transaction back on deadlock, so a nested
    /// level cannot retry locally and rethrows to the outermost one.
    fn handle_callback_error(&mut self, error: Error, current: usize, attempts: usize) -> Result<()> {
        let concurrency = error.driver_error().is_some_and(caused_by_concurrency_error);
        if concurrency && self.transactions > 1 {
            self.transactions -= 1;
            self.discard_records_above(self.transactions);
            return Err(error);
        }
        self.rollback()?;
        if concurrency && current < attempts {
            return Ok(());
        }
        Err(error)
    }

    fn handle_commit_error(&mut self, error: Error, current: usize, attempts: usize) -> Result<()> {
        self.transactions = self.transactions.saturating_sub(1);
        if error.driver_error().is_some_and(caused_by_concurrency_error) && current < attempts {
            return Ok(());
        }
        if error.driver_error().is_some_and(caused_by_lost_connection) {
            self.transactions = 0;
            self.transaction_records.clear();
        }
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use quarry_core::value::Value;

    use super::*;
    use crate::driver::{DriverError, DriverHandles};
    use crate::test_driver::{connection, Call, FakeDriver};

    fn deadlock() -> DriverError {
        DriverError::new("Deadlock found when trying to get lock")
    }

    #[test]
    fn test_transaction_commits_and_returns() {
        let driver = FakeDriver::new();
        let mut conn = connection(&driver);

        let value = conn
            .transaction(1, |conn| {
                conn.statement("update \"users\" set \"active\" = ?", &[Value::Int(1)])?;
                Ok(42)
            })
            .expect("commits");

        assert_eq!(value, 42);
        assert_eq!(conn.transaction_level(), 0);
        assert_eq!(
            driver.calls(),
            vec![
                Call::Begin,
                Call::Execute {
                    sql: String::from("update \"users\" set \"active\" = ?"),
                    bindings: vec![Value::Int(1)],
                },
                Call::Commit,
            ]
        );
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let driver = FakeDriver::new();
        driver.fail_execute(DriverError::new("Unknown column 'nme'"));
        let mut conn = connection(&driver);

        let error = conn
            .transaction(3, |conn| {
                conn.statement("update \"users\" set nme = ?", &[Value::Int(1)])
            })
            .expect_err("rolls back");

        assert!(matches!(error, Error::Query { .. }));
        assert_eq!(conn.transaction_level(), 0);
        // not a concurrency error, so no second attempt
        assert_eq!(driver.calls().len(), 3);
        assert_eq!(driver.calls()[2], Call::Rollback);
    }

    #[test]
    fn test_deadlock_retries_until_success() {
        let driver = FakeDriver::new();
        driver.fail_execute(deadlock());
        let mut conn = connection(&driver);

        conn.transaction(2, |conn| {
            conn.statement("update \"jobs\" set \"done\" = ?", &[Value::Int(1)])
                .map(|_| ())
        })
        .expect("second attempt succeeds");

        let calls = driver.calls();
        assert_eq!(calls.len(), 6);
        assert_eq!(calls[0], Call::Begin);
        assert_eq!(calls[2], Call::Rollback);
        assert_eq!(calls[3], Call::Begin);
        assert_eq!(calls[5], Call::Commit);
    }

    #[test]
    fn test_deadlock_exhausts_attempts() {
        let driver = FakeDriver::new();
        driver.fail_execute(deadlock());
        driver.fail_execute(deadlock());
        let mut conn = connection(&driver);

        let error = conn
            .transaction(2, |conn| {
                conn.statement("update \"jobs\" set \"done\" = ?", &[Value::Int(1)])
            })
            .expect_err("attempts exhausted");

        assert!(matches!(error, Error::Query { .. }));
        assert_eq!(conn.transaction_level(), 0);
        assert_eq!(driver.calls().last(), Some(&Call::Rollback));
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        let driver = FakeDriver::new();
        let mut conn = connection(&driver);

        let ran = Rc::new(Cell::new(0));
        let seen = Rc::clone(&ran);
        conn.transaction(0, move |_| {
            seen.set(seen.get() + 1);
            Ok(())
        })
        .expect("commits");

        assert_eq!(ran.get(), 1);
    }

    #[test]
    fn test_nested_transactions_use_savepoints() {
        let driver = FakeDriver::new();
        let mut conn = connection(&driver);

        conn.transaction(1, |conn| {
            conn.transaction(1, |inner| {
                inner
                    .statement("delete from \"logs\"", &[])
                    .map(|_| ())
            })
        })
        .expect("commits");

        assert_eq!(
            driver.calls(),
            vec![
                Call::Begin,
                Call::ExecRaw {
                    sql: String::from("SAVEPOINT trans2"),
                },
                Call::Execute {
                    sql: String::from("delete from \"logs\""),
                    bindings: vec![],
                },
                Call::Commit,
            ]
        );
    }

    #[test]
    fn test_nested_deadlock_rethrows_to_outer_level() {
        let driver = FakeDriver::new();
        let mut conn = connection(&driver);

        let error = conn
            .transaction(1, |conn| {
                conn.transaction(5, |_| -> Result<()> { Err(Error::Driver(deadlock())) })
            })
            .expect_err("outer level gives up");

        assert!(matches!(error, Error::Driver(_)));
        assert_eq!(conn.transaction_level(), 0);
        // the nested level only decrements; the outer one rolls back
        assert_eq!(
            driver.calls(),
            vec![
                Call::Begin,
                Call::ExecRaw {
                    sql: String::from("SAVEPOINT trans2"),
                },
                Call::Rollback,
            ]
        );
    }

    #[test]
    fn test_rollback_to_savepoint() {
        let driver = FakeDriver::new();
        let mut conn = connection(&driver);

        conn.begin_transaction().expect("begins");
        conn.begin_transaction().expect("begins");
        conn.rollback().expect("rolls back savepoint");
        assert_eq!(conn.transaction_level(), 1);
        conn.rollback().expect("rolls back");
        assert_eq!(conn.transaction_level(), 0);

        assert_eq!(
            driver.calls(),
            vec![
                Call::Begin,
                Call::ExecRaw {
                    sql: String::from("SAVEPOINT trans2"),
                },
                Call::ExecRaw {
                    sql: String::from("ROLLBACK TO SAVEPOINT trans2"),
                },
                Call::Rollback,
            ]
        );
    }

    #[test]
    fn test_rollback_outside_open_range_is_silent() {
        let driver = FakeDriver::new();
        let mut conn = connection(&driver);

        conn.rollback().expect("nothing to roll back");
        conn.begin_transaction().expect("begins");
        conn.rollback_to(5).expect("level not open");

        assert_eq!(conn.transaction_level(), 1);
        assert_eq!(driver.calls(), vec![Call::Begin]);
    }

    #[test]
    fn test_after_commit_waits_for_outermost_commit() {
        let driver = FakeDriver::new();
        let mut conn = connection(&driver);
        let fired = Rc::new(Cell::new(false));

        conn.begin_transaction().expect("begins");
        conn.begin_transaction().expect("begins");
        let flag = Rc::clone(&fired);
        conn.after_commit(move || flag.set(true));

        conn.commit().expect("inner commit");
        assert!(!fired.get());
        conn.commit().expect("outer commit");
        assert!(fired.get());
    }

    #[test]
    fn test_after_commit_runs_immediately_without_transaction() {
        let driver = FakeDriver::new();
        let mut conn = connection(&driver);
        let fired = Rc::new(Cell::new(false));

        let flag = Rc::clone(&fired);
        conn.after_commit(move || flag.set(true));
        assert!(fired.get());
    }

    #[test]
    fn test_rolled_back_level_drops_its_callbacks() {
        let driver = FakeDriver::new();
        let mut conn = connection(&driver);
        let fired = Rc::new(Cell::new(0));

        conn.begin_transaction().expect("begins");
        let outer = Rc::clone(&fired);
        conn.after_commit(move || outer.set(outer.get() + 1));

        conn.begin_transaction().expect("begins");
        let inner = Rc::clone(&fired);
        conn.after_commit(move || inner.set(inner.get() + 10));

        conn.rollback().expect("drops the inner level");
        conn.commit().expect("outer commit");

        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_rollback_error_from_lost_connection_resets_level() {
        let driver = FakeDriver::new();
        driver.fail_rollback(DriverError::new("MySQL server has gone away"));
        let mut conn = connection(&driver);

        conn.begin_transaction().expect("begins");
        let error = conn.rollback().expect_err("rollback fails");

        assert!(matches!(error, Error::Driver(_)));
        assert_eq!(conn.transaction_level(), 0);
    }

    #[test]
    fn test_savepoint_failure_leaves_the_level_open() {
        let driver = FakeDriver::new();
        driver.fail_raw(DriverError::new("SAVEPOINT is not allowed here"));
        let mut conn = connection(&driver);

        conn.begin_transaction().expect("begins");
        let error = conn.begin_transaction().expect_err("savepoint fails");

        assert!(matches!(error, Error::Driver(_)));
        assert_eq!(conn.transaction_level(), 1);
    }

    #[test]
    fn test_commit_error_from_lost_connection_resets_level() {
        let driver = FakeDriver::new();
        driver.fail_commit(DriverError::new("MySQL server has gone away"));
        let mut conn = connection(&driver);

        let error = conn
            .transaction(1, |_| Ok(()))
            .expect_err("commit fails");

        assert!(matches!(error, Error::Driver(_)));
        assert_eq!(conn.transaction_level(), 0);
    }

    #[test]
    fn test_begin_reconnects_after_lost_connection() {
        let driver = FakeDriver::new();
        driver.fail_begin(DriverError::new("Lost connection to MySQL server"));
        let fresh = FakeDriver::new();
        let handle = fresh.clone();
        let mut conn = connection(&driver).with_reconnector(move || {
            Ok(DriverHandles {
                write: Box::new(handle.clone()),
                read: None,
            })
        });

        conn.begin_transaction().expect("begins on fresh handle");

        assert_eq!(conn.transaction_level(), 1);
        assert_eq!(driver.calls(), vec![Call::Begin]);
        assert_eq!(fresh.calls(), vec![Call::Begin]);
    }
}
