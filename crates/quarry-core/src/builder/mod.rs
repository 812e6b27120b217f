//! Fluent query builder.
//!
//! A [`Builder`] is a mutable clause tree plus the binding buckets that
//! mirror it. Methods move `self` and hand it back, so queries chain:
//!
//! ```ignore
//! let q = Builder::table("users")
//!     .select(["id", "name"])
//!     .where_eq("status", 1)
//!     .order_by("id", Direction::Asc)
//!     .take(10);
//! let sql = GenericGrammar::new().compile_select(&q)?;
//! ```
//!
//! The builder never touches a connection; compilation happens through a
//! [`Grammar`](crate::grammar::Grammar) and execution lives upstream.

mod joins;
mod wheres;

pub use joins::JoinClause;

use crate::ast::{
    Aggregate, BindingKind, Bindings, Column, Conjunction, Direction, Distinct, HavingClause,
    Lock, OrderClause, Param, SelectExpr, TableRef, Union, WhereClause,
};
use crate::error::Result;
use crate::expression::Expression;
use crate::grammar::Grammar;
use crate::value::{ToValue, Value};

/// Comparison operators accepted by the clause methods.
///
/// The list spans the dialects this crate targets; anything else is
/// treated as a value with an implied `=`.
pub const OPERATORS: &[&str] = &[
    "=",
    "<",
    ">",
    "<=",
    ">=",
    "<>",
    "!=",
    "<=>",
    "like",
    "like binary",
    "not like",
    "ilike",
    "&",
    "|",
    "^",
    "<<",
    ">>",
    "&~",
    "is",
    "is not",
    "rlike",
    "not rlike",
    "regexp",
    "not regexp",
    "~",
    "~*",
    "!~",
    "!~*",
    "similar to",
    "not similar to",
    "not ilike",
    "~~*",
    "!~~*",
    "sounds like",
];

/// Operators compiled as bitwise predicates.
pub const BITWISE_OPERATORS: &[&str] = &["&", "|", "^", "<<", ">>", "&~"];

/// A single SQL statement under construction.
///
/// The clause fields are public: the builder *is* the query AST, and
/// grammars and execution layers read it directly. The fluent methods
/// keep [`Bindings`] in lockstep with the tree; code mutating fields
/// directly takes on that bookkeeping itself.
#[derive(Debug, Clone, Default)]
pub struct Builder {
    /// Aggregate projection replacing the column list when set.
    pub aggregate: Option<Aggregate>,
    /// Selected expressions; `None` compiles to `*`.
    pub columns: Option<Vec<SelectExpr>>,
    /// Distinct projection state.
    pub distinct: Distinct,
    /// Target table or derived table.
    pub from: Option<TableRef>,
    /// Join clauses in application order.
    pub joins: Vec<JoinClause>,
    /// Predicate tree.
    pub wheres: Vec<WhereClause>,
    /// Grouping columns.
    pub groups: Vec<Column>,
    /// Having predicates.
    pub havings: Vec<HavingClause>,
    /// Ordering terms.
    pub orders: Vec<OrderClause>,
    /// Row limit, inlined at compile time.
    pub limit: Option<u64>,
    /// Row offset, inlined at compile time.
    pub offset: Option<u64>,
    /// Union branches.
    pub unions: Vec<Union>,
    /// Ordering applied to the whole union.
    pub union_orders: Vec<OrderClause>,
    /// Limit applied to the whole union.
    pub union_limit: Option<u64>,
    /// Offset applied to the whole union.
    pub union_offset: Option<u64>,
    /// Row-locking clause.
    pub lock: Option<Lock>,
    /// Positional binding buckets mirroring the tree.
    pub bindings: Bindings,
    /// Route execution to the write handle even for reads.
    pub use_write: bool,
}

impl Builder {
    /// Creates an empty query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query targeting `table`.
    #[must_use]
    pub fn table(table: impl Into<TableRef>) -> Self {
        Self::new().from(table)
    }

    /// A fresh query suitable for sub-query composition against the
    /// same table.
    #[must_use]
    pub(crate) fn for_nested(&self) -> Self {
        let mut q = Self::new();
        q.from.clone_from(&self.from);
        q
    }

    // ----- select -----

    /// Replaces the select list.
    #[must_use]
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SelectExpr>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self.bindings.clear(BindingKind::Select);
        self
    }

    /// Appends to the select list.
    #[must_use]
    pub fn add_select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SelectExpr>,
    {
        let added = columns.into_iter().map(Into::into);
        match self.columns.as_mut() {
            Some(existing) => existing.extend(added),
            None => self.columns = Some(added.collect()),
        }
        self
    }

    /// Appends a raw select expression with its bindings.
    #[must_use]
    pub fn select_raw(
        mut self,
        expression: impl Into<String>,
        bindings: impl IntoIterator<Item = Value>,
    ) -> Self {
        let item = SelectExpr::Col(Column::Raw(Expression::new(expression)));
        match self.columns.as_mut() {
            Some(existing) => existing.push(item),
            None => self.columns = Some(vec![item]),
        }
        self.bindings.extend(BindingKind::Select, bindings);
        self
    }

    /// Appends an aliased sub-query to the select list.
    #[must_use]
    pub fn select_sub(mut self, query: Self, alias: impl Into<String>) -> Self {
        self.bindings
            .extend(BindingKind::Select, query.bindings.flatten());
        let item = SelectExpr::Sub {
            query: Box::new(query),
            alias: alias.into(),
        };
        match self.columns.as_mut() {
            Some(existing) => existing.push(item),
            None => self.columns = Some(vec![item]),
        }
        self
    }

    /// Marks the query `select distinct`.
    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = Distinct::All;
        self
    }

    /// Restricts distinctness to the given columns. Aggregates count
    /// over the list; plain selects treat this as [`distinct`](Self::distinct).
    #[must_use]
    pub fn distinct_columns<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        self.distinct = Distinct::Columns(columns.into_iter().map(Into::into).collect());
        self
    }

    // ----- from -----

    /// Sets the target table.
    #[must_use]
    pub fn from(mut self, table: impl Into<TableRef>) -> Self {
        self.from = Some(table.into());
        self
    }

    /// Sets the target table under an alias.
    #[must_use]
    pub fn from_as(self, table: impl Into<String>, alias: impl Into<String>) -> Self {
        self.from(format!("{} as {}", table.into(), alias.into()))
    }

    /// Sets a raw from fragment with its bindings.
    #[must_use]
    pub fn from_raw(
        mut self,
        expression: impl Into<String>,
        bindings: impl IntoIterator<Item = Value>,
    ) -> Self {
        self.from = Some(TableRef::Raw(Expression::new(expression)));
        self.bindings.extend(BindingKind::From, bindings);
        self
    }

    /// Targets an aliased derived table.
    #[must_use]
    pub fn from_sub(mut self, query: Self, alias: impl Into<String>) -> Self {
        self.bindings
            .extend(BindingKind::From, query.bindings.flatten());
        self.from = Some(TableRef::Sub {
            query: Box::new(query),
            alias: alias.into(),
        });
        self
    }

    // ----- group by / having -----

    /// Appends grouping columns.
    #[must_use]
    pub fn group_by<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        self.groups.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Appends a raw grouping fragment with its bindings.
    #[must_use]
    pub fn group_by_raw(
        mut self,
        sql: impl Into<String>,
        bindings: impl IntoIterator<Item = Value>,
    ) -> Self {
        self.groups.push(Column::Raw(Expression::new(sql)));
        self.bindings.extend(BindingKind::GroupBy, bindings);
        self
    }

    /// Adds a having predicate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`](crate::Error::InvalidArgument)
    /// when a null value is paired with a non-equality operator.
    pub fn having(
        self,
        column: impl Into<Column>,
        operator: &str,
        value: impl ToValue,
    ) -> Result<Self> {
        self.having_with(column, operator, value, Conjunction::And)
    }

    /// Adds an or-connected having predicate.
    ///
    /// # Errors
    ///
    /// Same as [`Builder::having`].
    pub fn or_having(
        self,
        column: impl Into<Column>,
        operator: &str,
        value: impl ToValue,
    ) -> Result<Self> {
        self.having_with(column, operator, value, Conjunction::Or)
    }

    fn having_with(
        mut self,
        column: impl Into<Column>,
        operator: &str,
        value: impl ToValue,
        conjunction: Conjunction,
    ) -> Result<Self> {
        let value = value.to_value();
        let (operator, value) = Self::prepare_operator(operator, value)?;
        let bitwise = Self::is_bitwise_operator(&operator);
        self.bindings.add(BindingKind::Having, value);
        let column = column.into();
        self.havings.push(if bitwise {
            HavingClause::Bitwise {
                conjunction,
                column,
                operator,
                value: Param::Bound,
            }
        } else {
            HavingClause::Basic {
                conjunction,
                column,
                operator,
                value: Param::Bound,
            }
        });
        Ok(self)
    }

    /// Adds a `having … between` predicate.
    #[must_use]
    pub fn having_between(
        mut self,
        column: impl Into<Column>,
        low: impl ToValue,
        high: impl ToValue,
    ) -> Self {
        self.bindings.add(BindingKind::Having, low.to_value());
        self.bindings.add(BindingKind::Having, high.to_value());
        self.havings.push(HavingClause::Between {
            conjunction: Conjunction::And,
            column: column.into(),
            low: Param::Bound,
            high: Param::Bound,
            negated: false,
        });
        self
    }

    /// Adds a raw having fragment with its bindings.
    #[must_use]
    pub fn having_raw(
        self,
        sql: impl Into<String>,
        bindings: impl IntoIterator<Item = Value>,
    ) -> Self {
        self.having_raw_with(sql, bindings, Conjunction::And)
    }

    /// Adds an or-connected raw having fragment.
    #[must_use]
    pub fn or_having_raw(
        self,
        sql: impl Into<String>,
        bindings: impl IntoIterator<Item = Value>,
    ) -> Self {
        self.having_raw_with(sql, bindings, Conjunction::Or)
    }

    fn having_raw_with(
        mut self,
        sql: impl Into<String>,
        bindings: impl IntoIterator<Item = Value>,
        conjunction: Conjunction,
    ) -> Self {
        self.havings.push(HavingClause::Raw {
            conjunction,
            sql: sql.into(),
        });
        self.bindings.extend(BindingKind::Having, bindings);
        self
    }

    // ----- ordering -----

    /// Appends an order term.
    ///
    /// After the first union branch is attached, ordering targets the
    /// whole union instead of the leading query.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<Column>, direction: Direction) -> Self {
        let order = OrderClause::Column {
            column: column.into(),
            direction,
        };
        if self.unions.is_empty() {
            self.orders.push(order);
        } else {
            self.union_orders.push(order);
        }
        self
    }

    /// Appends a descending order term.
    #[must_use]
    pub fn order_by_desc(self, column: impl Into<Column>) -> Self {
        self.order_by(column, Direction::Desc)
    }

    /// Orders by `column` descending; newest-first convention.
    #[must_use]
    pub fn latest(self, column: impl Into<Column>) -> Self {
        self.order_by(column, Direction::Desc)
    }

    /// Orders by `column` ascending; oldest-first convention.
    #[must_use]
    pub fn oldest(self, column: impl Into<Column>) -> Self {
        self.order_by(column, Direction::Asc)
    }

    /// Appends a raw order fragment with its bindings.
    #[must_use]
    pub fn order_by_raw(
        mut self,
        sql: impl Into<String>,
        bindings: impl IntoIterator<Item = Value>,
    ) -> Self {
        let order = OrderClause::Raw { sql: sql.into() };
        if self.unions.is_empty() {
            self.orders.push(order);
            self.bindings.extend(BindingKind::Order, bindings);
        } else {
            self.union_orders.push(order);
            self.bindings.extend(BindingKind::UnionOrder, bindings);
        }
        self
    }

    /// Orders results randomly, compiled per dialect; `seed` may be
    /// empty.
    #[must_use]
    pub fn in_random_order(mut self, seed: impl Into<String>) -> Self {
        let order = OrderClause::Random { seed: seed.into() };
        if self.unions.is_empty() {
            self.orders.push(order);
        } else {
            self.union_orders.push(order);
        }
        self
    }

    /// Drops every order term and its bindings.
    #[must_use]
    pub fn reorder(mut self) -> Self {
        self.orders.clear();
        self.union_orders.clear();
        self.bindings.clear(BindingKind::Order);
        self.bindings.clear(BindingKind::UnionOrder);
        self
    }

    /// Removes order terms naming `column`, keeping raw fragments.
    pub(crate) fn remove_orders_for(&mut self, column: &str) {
        let matches = |order: &OrderClause| {
            matches!(order, OrderClause::Column { column: Column::Name(name), .. } if name == column)
        };
        self.orders.retain(|o| !matches(o));
    }

    // ----- limit / offset -----

    /// Sets the row limit; "no limit" is expressed by never calling
    /// this.
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        if self.unions.is_empty() {
            self.limit = Some(limit);
        } else {
            self.union_limit = Some(limit);
        }
        self
    }

    /// Alias for [`Builder::limit`].
    #[must_use]
    pub fn take(self, limit: u64) -> Self {
        self.limit(limit)
    }

    /// Sets the row offset.
    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        if self.unions.is_empty() {
            self.offset = Some(offset);
        } else {
            self.union_offset = Some(offset);
        }
        self
    }

    /// Alias for [`Builder::offset`].
    #[must_use]
    pub fn skip(self, offset: u64) -> Self {
        self.offset(offset)
    }

    /// Limits the query to the given page of `per_page` rows.
    #[must_use]
    pub fn for_page(self, page: u64, per_page: u64) -> Self {
        self.offset(page.saturating_sub(1) * per_page).limit(per_page)
    }

    /// Keyset-pages forward: rows with `column` above `last_id`,
    /// ascending. Existing orders on `column` are replaced.
    #[must_use]
    pub fn for_page_after_id(
        mut self,
        per_page: u64,
        last_id: Option<Value>,
        column: &str,
    ) -> Self {
        self.remove_orders_for(column);
        if let Some(id) = last_id {
            self = self.push_basic(Conjunction::And, Column::Name(column.into()), ">", id);
        }
        self.order_by(column, Direction::Asc).limit(per_page)
    }

    /// Keyset-pages backward: rows with `column` below `last_id`,
    /// descending.
    #[must_use]
    pub fn for_page_before_id(
        mut self,
        per_page: u64,
        last_id: Option<Value>,
        column: &str,
    ) -> Self {
        self.remove_orders_for(column);
        if let Some(id) = last_id {
            self = self.push_basic(Conjunction::And, Column::Name(column.into()), "<", id);
        }
        self.order_by(column, Direction::Desc).limit(per_page)
    }

    // ----- unions -----

    /// Appends a `union` branch.
    #[must_use]
    pub fn union(self, query: Self) -> Self {
        self.union_with(query, false)
    }

    /// Appends a `union all` branch.
    #[must_use]
    pub fn union_all(self, query: Self) -> Self {
        self.union_with(query, true)
    }

    fn union_with(mut self, query: Self, all: bool) -> Self {
        self.bindings
            .extend(BindingKind::Union, query.bindings.flatten());
        self.unions.push(Union { query, all });
        self
    }

    // ----- locks -----

    /// Requests an exclusive row lock and routes to the write handle.
    #[must_use]
    pub fn lock_for_update(mut self) -> Self {
        self.lock = Some(Lock::ForUpdate);
        self.use_write = true;
        self
    }

    /// Requests a shared row lock and routes to the write handle.
    #[must_use]
    pub fn shared_lock(mut self) -> Self {
        self.lock = Some(Lock::Shared);
        self.use_write = true;
        self
    }

    /// Appends a raw lock fragment and routes to the write handle.
    #[must_use]
    pub fn lock_raw(mut self, fragment: impl Into<String>) -> Self {
        self.lock = Some(Lock::Raw(fragment.into()));
        self.use_write = true;
        self
    }

    /// Routes this query to the write handle regardless of clause.
    #[must_use]
    pub fn use_write(mut self) -> Self {
        self.use_write = true;
        self
    }

    // ----- aggregates -----

    /// Replaces the projection with an aggregate; standing orders are
    /// dropped unless grouping keeps them meaningful.
    pub fn set_aggregate<I, C>(&mut self, function: impl Into<String>, columns: I)
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        self.aggregate = Some(Aggregate {
            function: function.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        });
        if self.groups.is_empty() {
            self.orders.clear();
            self.bindings.clear(BindingKind::Order);
        }
    }

    // ----- clone shapes -----

    /// Clone with the select list and its bindings removed.
    #[must_use]
    pub fn without_columns(mut self) -> Self {
        self.columns = None;
        self.bindings.clear(BindingKind::Select);
        self
    }

    /// Clone with order terms and their bindings removed. Union
    /// ordering is left alone; use [`Builder::reorder`] for both.
    #[must_use]
    pub fn without_orders(mut self) -> Self {
        self.orders.clear();
        self.bindings.clear(BindingKind::Order);
        self
    }

    /// Clone with limit and offset removed.
    #[must_use]
    pub fn without_limits(mut self) -> Self {
        self.limit = None;
        self.offset = None;
        self
    }

    // ----- bindings -----

    /// Pushes a binding into the given bucket.
    pub fn add_binding(&mut self, kind: BindingKind, value: Value) {
        self.bindings.add(kind, value);
    }

    /// Flattened binding sequence matching placeholder order.
    #[must_use]
    pub fn flat_bindings(&self) -> Vec<Value> {
        self.bindings.flatten()
    }

    /// Merges another query's buckets into this one, per bucket.
    pub fn merge_bindings(&mut self, other: &Self) {
        self.bindings.merge(&other.bindings);
    }

    // ----- compilation -----

    /// Compiles this query as a select through `grammar`.
    ///
    /// # Errors
    ///
    /// Propagates grammar errors for constructs the dialect lacks.
    pub fn to_sql(&self, grammar: &dyn Grammar) -> Result<String> {
        grammar.compile_select(self)
    }

    // ----- operator plumbing shared by wheres/havings -----

    /// Applies the operator rules: unknown operators demote to a value
    /// compared with `=`; a null value is only legal with equality-ish
    /// operators.
    pub(crate) fn prepare_operator(operator: &str, value: Value) -> Result<(String, Value)> {
        let lowered = operator.to_lowercase();
        if value.is_null() && OPERATORS.contains(&lowered.as_str()) && !matches!(lowered.as_str(), "=" | "<>" | "!=") {
            return Err(crate::Error::InvalidArgument(String::from(
                "illegal operator and value combination",
            )));
        }
        if OPERATORS.contains(&lowered.as_str()) {
            Ok((lowered, value))
        } else {
            // Treat the would-be operator as the compared value.
            Ok((String::from("="), Value::Text(String::from(operator))))
        }
    }

    pub(crate) fn is_bitwise_operator(operator: &str) -> bool {
        BITWISE_OPERATORS.contains(&operator.to_lowercase().as_str())
    }
}
