//! Raw SQL expressions.

use std::fmt;

/// A raw SQL fragment that bypasses identifier quoting and
/// parameterization entirely.
///
/// The wrapped text is emitted verbatim and never enters the binding
/// sequence. Callers own the injection-safety of whatever they wrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression(String);

impl Expression {
    /// Wraps a raw SQL fragment.
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    /// Returns the wrapped SQL text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shorthand for [`Expression::new`].
#[must_use]
pub fn raw(sql: impl Into<String>) -> Expression {
    Expression::new(sql)
}
