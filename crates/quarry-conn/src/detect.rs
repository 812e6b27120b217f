//! Classifying driver errors by message text and SQLSTATE.
//!
//! Client libraries rarely agree on error types, but the message texts
//! the engines emit are stable. These catalogues cover the deadlock,
//! dropped-connection, and unique-key wordings of the engines this
//! crate targets, so retry policy stays out of driver code.

use crate::driver::DriverError;

/// Deadlocks and serialization failures worth retrying.
const CONCURRENCY_ERRORS: &[&str] = &[
    "Deadlock found when trying to get lock",
    "deadlock detected",
    "The database file is locked",
    "database is locked",
    "database table is locked",
    "A table in the database is locked",
    "has been chosen as the deadlock victim",
    "Lock wait timeout exceeded; try restarting transaction",
    "WSREP detected deadlock/conflict and aborted the transaction. Try restarting the transaction",
];

/// Wordings that mean the server connection is gone.
const LOST_CONNECTION_ERRORS: &[&str] = &[
    "server has gone away",
    "no connection to the server",
    "Lost connection",
    "is dead or not enabled",
    "Error while sending",
    "decryption failed or bad record mac",
    "server closed the connection unexpectedly",
    "SSL connection has been closed unexpectedly",
    "Error writing data to the connection",
    "Resource deadlock avoided",
    "child connection forced to terminate due to client_idle_limit",
    "query_wait_timeout",
    "reset by peer",
    "Physical connection is not usable",
    "TCP Provider: Error code 0x68",
    "ORA-03114",
    "Packets out of order. Expected",
    "Adaptive Server connection failed",
    "Communication link failure",
    "connection is no longer usable",
    "Login timeout expired",
    "Connection refused",
    "running with the --read-only option so it cannot execute this statement",
    "The connection is broken and recovery is not possible",
    "SSL SYSCALL error: EOF detected",
    "Connection timed out",
    "The last transaction was aborted due to Seamless Scaling. Please retry.",
    "Temporary failure in name resolution",
    "Broken pipe",
    "No route to host",
    "The client was disconnected by the server because of inactivity. See wait_timeout and interactive_timeout for configuring this behavior.",
    "could not translate host name",
    "TCP Provider: Error code 0x274C",
];

/// Unique-key collision wordings.
const DUPLICATE_KEY_ERRORS: &[&str] = &[
    "Duplicate entry",
    "UNIQUE constraint failed",
    "duplicate key value violates unique constraint",
    "Violation of UNIQUE KEY constraint",
    "Integrity constraint violation: 1062",
];

/// Whether the error is a deadlock or serialization failure, the kind
/// a transaction can retry from the top.
#[must_use]
pub fn caused_by_concurrency_error(error: &DriverError) -> bool {
    if error.code.as_deref() == Some("40001") {
        return true;
    }
    contains_any(&error.message, CONCURRENCY_ERRORS)
}

/// Whether the error means the server connection dropped.
#[must_use]
pub fn caused_by_lost_connection(error: &DriverError) -> bool {
    contains_any(&error.message, LOST_CONNECTION_ERRORS)
}

/// Whether the error reports a unique-key collision.
#[must_use]
pub fn caused_by_duplicate_key(error: &DriverError) -> bool {
    if matches!(error.code.as_deref(), Some("23000" | "23505")) {
        return true;
    }
    contains_any(&error.message, DUPLICATE_KEY_ERRORS)
}

fn contains_any(message: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| message.contains(needle))
}
