//! # quarry-mysql
//!
//! MySQL-specific extensions for `quarry-core`.
//!
//! # How MySQL differs from other grammars
//!
//! - **Identifier quoting**: MySQL quotes identifiers with backticks
//!   instead of the ANSI double quote. See [identifier quoting].
//! - **[JSON operations]**: `column->path` selectors compile to
//!   `json_extract`/`json_unquote`, null checks distinguish missing
//!   keys from stored JSON `null` literals, and containment and
//!   length predicates map onto `json_contains` and `json_length`.
//! - **[Fulltext search]**: fulltext predicates compile to
//!   `match (...) against (...)` with natural language, boolean, and
//!   query expansion modes.
//! - **[INSERT IGNORE]**: rows that would collide with an existing
//!   key can be skipped with `insert ignore`.
//! - **[Upserts]**: `insert ... on duplicate key update` updates the
//!   colliding row in place, optionally reusing the values that would
//!   have been inserted.
//! - **Ordered, limited writes**: UPDATE and DELETE accept `order by`
//!   and `limit` when the statement has no joins.
//! - **Row locks**: `for update` and `lock in share mode` suffixes,
//!   and seeded `RAND(N)` ordering.
//!
//! [identifier quoting]: https://dev.mysql.com/doc/refman/8.0/en/identifiers.html
//! [JSON operations]: https://dev.mysql.com/doc/refman/8.0/en/json-function-reference.html
//! [Fulltext search]: https://dev.mysql.com/doc/refman/8.0/en/fulltext-search.html
//! [INSERT IGNORE]: https://dev.mysql.com/doc/refman/8.0/en/insert.html
//! [Upserts]: https://dev.mysql.com/doc/refman/8.0/en/insert-on-duplicate.html
//!
//! ## Example
//!
//! ```rust
//! use quarry_core::{Builder, Direction, Grammar};
//! use quarry_mysql::MySqlGrammar;
//!
//! let query = Builder::table("users")
//!     .where_eq("votes", 100)
//!     .order_by("name", Direction::Asc)
//!     .take(10);
//!
//! let sql = MySqlGrammar::new().compile_select(&query).unwrap();
//! assert_eq!(
//!     sql,
//!     "select * from `users` where `votes` = ? order by `name` asc limit 10"
//! );
//! ```

mod grammar;

pub use grammar::MySqlGrammar;
