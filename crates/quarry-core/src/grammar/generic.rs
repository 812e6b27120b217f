//! Generic ANSI grammar.

use super::Grammar;

/// The ANSI baseline grammar: double-quoted identifiers, `?`
/// placeholders, no JSON or fulltext support.
#[derive(Debug, Default, Clone)]
pub struct GenericGrammar {
    table_prefix: String,
}

impl GenericGrammar {
    /// Creates a grammar with no table prefix.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            table_prefix: String::new(),
        }
    }

    /// Creates a grammar prefixing every table name.
    #[must_use]
    pub fn with_table_prefix(prefix: impl Into<String>) -> Self {
        Self {
            table_prefix: prefix.into(),
        }
    }
}

impl Grammar for GenericGrammar {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn table_prefix(&self) -> &str {
        &self.table_prefix
    }
}
