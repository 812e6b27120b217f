//! Error types for query construction and compilation.

use thiserror::Error;

/// Errors raised while building or compiling a query, always before
/// any statement reaches a connection.
#[derive(Debug, Error)]
pub enum Error {
    /// A clause received an argument it cannot represent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The active grammar has no compilation for this construct.
    #[error("unsupported by this database engine: {0}")]
    Unsupported(String),

    /// An operation that walks results in a stable order was invoked
    /// on a query with no explicit ordering.
    #[error("you must specify an orderBy clause when using this function")]
    MissingOrderBy,

    /// A cursor token does not carry a value for an order column.
    #[error("unable to find parameter [{0}] in pagination item")]
    CursorParameter(String),
}

/// Result type alias for builder and grammar operations.
pub type Result<T> = std::result::Result<T, Error>;
