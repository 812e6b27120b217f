//! # quarry-conn
//!
//! Runs queries built with `quarry-core` against a database driver.
//!
//! This crate provides:
//! - A [`Connection`] that executes compiled statements with query
//!   logging, lost-connection retries, and read/write routing
//! - Transactions that nest by savepoint and retry deadlocks
//! - Builder execution from [`Connection::get`] down to aggregates,
//!   chunked walks, and lazy row streams
//! - Length-aware, simple, and cursor page shapes
//!
//! The driver seam is the [`Driver`] trait; anything that can run a
//! prepared statement can sit behind a connection.
//!
//! ## Running Queries
//!
//! ```rust
//! use quarry_conn::{Connection, Driver, DriverError, ExecResult, Row};
//! use quarry_core::{Builder, GenericGrammar, Value};
//!
//! struct Recorder;
//!
//! impl Driver for Recorder {
//!     fn query(&mut self, _sql: &str, _bindings: &[Value]) -> Result<Vec<Row>, DriverError> {
//!         Ok(Vec::new())
//!     }
//!     fn execute(&mut self, _sql: &str, _bindings: &[Value]) -> Result<ExecResult, DriverError> {
//!         Ok(ExecResult::default())
//!     }
//!     fn exec_raw(&mut self, _sql: &str) -> Result<(), DriverError> {
//!         Ok(())
//!     }
//!     fn begin(&mut self) -> Result<(), DriverError> {
//!         Ok(())
//!     }
//!     fn commit(&mut self) -> Result<(), DriverError> {
//!         Ok(())
//!     }
//!     fn rollback(&mut self) -> Result<(), DriverError> {
//!         Ok(())
//!     }
//! }
//!
//! let mut conn = Connection::new(Box::new(GenericGrammar::new()), Box::new(Recorder));
//! let rows = conn.get(&Builder::table("users").where_eq("active", true))?;
//! assert!(rows.is_empty());
//! # Ok::<(), quarry_conn::Error>(())
//! ```

pub mod chunk;
pub mod connection;
pub mod detect;
pub mod driver;
pub mod error;
pub mod exec;
pub mod paginate;
pub mod transaction;

#[cfg(test)]
pub(crate) mod test_driver;

pub use chunk::Lazy;
pub use connection::{Connection, QueryLogEntry};
pub use detect::{caused_by_concurrency_error, caused_by_duplicate_key, caused_by_lost_connection};
pub use driver::{Driver, DriverError, DriverHandles, ExecResult, Reconnector, Row};
pub use error::{Error, Result};
pub use paginate::{CursorOptions, CursorPage, LengthAwarePage, PageOptions, SimplePage};
pub use quarry_core::Cursor;
