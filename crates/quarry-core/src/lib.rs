//! # quarry-core
//!
//! A fluent SQL query builder with dialect-aware compilation.
//!
//! This crate provides:
//! - A chainable [`Builder`] that accumulates clauses as a typed tree
//! - Per-dialect [`Grammar`] compilation with an ANSI baseline
//! - Positional bindings kept in lockstep with `?` placeholders
//! - Opaque [`Cursor`] tokens for keyset pagination
//!
//! ## Building Queries
//!
//! Methods take `self` and hand it back, so queries read top to
//! bottom; compilation is a separate, repeatable step:
//!
//! ```rust
//! use quarry_core::{Builder, Direction, GenericGrammar, Grammar};
//!
//! let query = Builder::table("users")
//!     .select(["id", "name"])
//!     .where_eq("status", 1)
//!     .order_by("id", Direction::Asc)
//!     .take(10);
//!
//! let sql = GenericGrammar::new().compile_select(&query).unwrap();
//! assert_eq!(
//!     sql,
//!     "select \"id\", \"name\" from \"users\" where \"status\" = ? order by \"id\" asc limit 10"
//! );
//! ```
//!
//! ## Bindings Stay Aligned
//!
//! Every value flows through a binding bucket rather than the SQL
//! text, so user input never reaches the statement:
//!
//! ```rust
//! use quarry_core::{Builder, Value};
//!
//! let hostile = "'; drop table users; --";
//! let query = Builder::table("users").where_eq("name", hostile);
//!
//! assert_eq!(
//!     query.flat_bindings(),
//!     vec![Value::Text(String::from(hostile))]
//! );
//! ```

pub mod ast;
pub mod builder;
pub mod cursor;
pub mod error;
pub mod expression;
pub mod grammar;
pub mod value;

pub use ast::{
    Aggregate, Assign, BindingKind, Bindings, Column, Conjunction, DatePart, Direction, Distinct,
    FulltextMode, FulltextOptions, HavingClause, JoinKind, Lock, OrderClause, Param, SelectExpr,
    TableRef, Union, UpsertUpdate, WhereClause,
};
pub use builder::{Builder, JoinClause, BITWISE_OPERATORS, OPERATORS};
pub use cursor::Cursor;
pub use error::{Error, Result};
pub use expression::{raw, Expression};
pub use grammar::{GenericGrammar, Grammar};
pub use value::{ToValue, Value};
