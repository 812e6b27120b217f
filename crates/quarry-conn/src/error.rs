//! Error types for statement execution.

use thiserror::Error;

use crate::driver::DriverError;

/// Errors raised while executing statements through a
/// [`Connection`](crate::Connection).
#[derive(Debug, Error)]
pub enum Error {
    /// The query could not be built or compiled.
    #[error(transparent)]
    Builder(#[from] quarry_core::Error),

    /// A statement failed. The message embeds the SQL with bindings
    /// substituted in for readability.
    #[error("{message} (SQL: {sql})")]
    Query {
        /// The driver's message text.
        message: String,
        /// The statement, bindings inlined.
        sql: String,
        /// The underlying driver error.
        #[source]
        source: DriverError,
    },

    /// A driver call failed outside statement execution.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// `sole` matched no rows.
    #[error("no records found")]
    NotFound,

    /// `sole` matched more than one row.
    #[error("multiple records found")]
    MultipleRecords,

    /// A keyed chunk walk could not read its key column back.
    #[error("the chunk operation was aborted because the [{0}] column is not present in the query result")]
    MissingChunkColumn(String),

    /// The connection dropped and no reconnector is installed.
    #[error("lost connection and no reconnector available")]
    NoReconnector,
}

impl Error {
    /// The driver error underneath, when there is one.
    #[must_use]
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            Self::Query { source, .. } | Self::Driver(source) => Some(source),
            Self::Builder(_)
            | Self::NotFound
            | Self::MultipleRecords
            | Self::MissingChunkColumn(_)
            | Self::NoReconnector => None,
        }
    }
}

/// Result type alias for connection operations.
pub type Result<T> = std::result::Result<T, Error>;
