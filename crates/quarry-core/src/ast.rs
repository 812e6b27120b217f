//! Query clause tree.
//!
//! Every clause a [`Builder`](crate::Builder) accumulates is a node in
//! one of the closed sum types below. Grammars compile them with
//! exhaustive matches, so adding a clause kind is a compile-error-driven
//! change rather than a stringly-typed dispatch.

use crate::builder::Builder;
use crate::expression::Expression;
use crate::value::Value;

/// How a predicate attaches to the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conjunction {
    /// `and`
    And,
    /// `or`
    Or,
}

impl Conjunction {
    /// SQL keyword for the connector.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// Sort direction for an order clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `asc`
    Asc,
    /// `desc`
    Desc,
}

impl Direction {
    /// SQL keyword for the direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// The opposite direction.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// Join flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// `inner join`
    Inner,
    /// `left join`
    Left,
    /// `right join`
    Right,
    /// `cross join`
    Cross,
}

impl JoinKind {
    /// SQL keyword for the join kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inner => "inner",
            Self::Left => "left",
            Self::Right => "right",
            Self::Cross => "cross",
        }
    }
}

/// A column reference: either an identifier to be quoted per dialect,
/// or a raw expression passed through untouched.
#[derive(Debug, Clone)]
pub enum Column {
    /// Identifier, possibly dotted (`users.id`) or aliased (`id as n`).
    Name(String),
    /// Raw fragment, emitted verbatim.
    Raw(Expression),
}

impl From<&str> for Column {
    fn from(name: &str) -> Self {
        Self::Name(String::from(name))
    }
}

impl From<String> for Column {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<&String> for Column {
    fn from(name: &String) -> Self {
        Self::Name(name.clone())
    }
}

impl From<Expression> for Column {
    fn from(raw: Expression) -> Self {
        Self::Raw(raw)
    }
}

/// An item in the select list.
#[derive(Debug, Clone)]
pub enum SelectExpr {
    /// Plain column or raw expression.
    Col(Column),
    /// Aliased sub-query: `(select …) as alias`.
    Sub {
        /// The inner query.
        query: Box<Builder>,
        /// Alias the derived column is exposed as.
        alias: String,
    },
}

impl<C: Into<Column>> From<C> for SelectExpr {
    fn from(column: C) -> Self {
        Self::Col(column.into())
    }
}

/// Distinct projection state.
#[derive(Debug, Clone, Default)]
pub enum Distinct {
    /// Plain `select`.
    #[default]
    Off,
    /// `select distinct` over the whole projection.
    All,
    /// Distinct restricted to named columns. Aggregates count over the
    /// list; plain selects fall back to [`Distinct::All`].
    Columns(Vec<Column>),
}

impl Distinct {
    /// Whether any distinct form is active.
    #[must_use]
    pub const fn is_on(&self) -> bool {
        !matches!(self, Self::Off)
    }
}

/// A table reference for `from` and join targets.
#[derive(Debug, Clone)]
pub enum TableRef {
    /// Named table, quoted and prefixed per dialect.
    Name(String),
    /// Raw fragment.
    Raw(Expression),
    /// Aliased derived table: `(select …) as alias`.
    Sub {
        /// The inner query.
        query: Box<Builder>,
        /// Alias the derived table is exposed as.
        alias: String,
    },
}

impl From<&str> for TableRef {
    fn from(name: &str) -> Self {
        Self::Name(String::from(name))
    }
}

impl From<String> for TableRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<Expression> for TableRef {
    fn from(raw: Expression) -> Self {
        Self::Raw(raw)
    }
}

/// Where a predicate operand comes from at compile time.
///
/// Bound operands emit a `?` placeholder; their values live in the
/// binding buckets, added when the clause was built. Raw operands are
/// spliced verbatim and never bind.
#[derive(Debug, Clone)]
pub enum Param {
    /// Placeholder; the value sits in the owning binding bucket.
    Bound,
    /// Raw expression, inlined.
    Raw(Expression),
}

/// Date-part extraction applied to a column before comparing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    /// `date(column)`
    Date,
    /// `time(column)`
    Time,
    /// `day(column)`
    Day,
    /// `month(column)`
    Month,
    /// `year(column)`
    Year,
}

impl DatePart {
    /// SQL function name for the extraction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Time => "time",
            Self::Day => "day",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

/// Fulltext matching mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FulltextMode {
    /// Natural language mode (dialect default).
    #[default]
    NaturalLanguage,
    /// Boolean mode.
    Boolean,
}

/// Options for a fulltext predicate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FulltextOptions {
    /// Matching mode.
    pub mode: FulltextMode,
    /// Query expansion (ignored in boolean mode).
    pub expanded: bool,
}

/// A single predicate in a where tree.
#[derive(Debug, Clone)]
pub enum WhereClause {
    /// `column op ?`
    Basic {
        conjunction: Conjunction,
        column: Column,
        operator: String,
        value: Param,
    },
    /// Bitwise-operator comparison; some dialects cast the result.
    Bitwise {
        conjunction: Conjunction,
        column: Column,
        operator: String,
        value: Param,
    },
    /// `column [not] in (…)`; empty lists compile to constant truth.
    In {
        conjunction: Conjunction,
        column: Column,
        values: Vec<Param>,
        negated: bool,
    },
    /// `column [not] in (select …)`
    InSub {
        conjunction: Conjunction,
        column: Column,
        query: Box<Builder>,
        negated: bool,
    },
    /// `column [not] in (1, 2, …)` with integers inlined, skipping
    /// placeholder limits on huge key lists.
    InRaw {
        conjunction: Conjunction,
        column: Column,
        values: Vec<i64>,
        negated: bool,
    },
    /// `column is [not] null`
    Null {
        conjunction: Conjunction,
        column: Column,
        negated: bool,
    },
    /// `column [not] between ? and ?`
    Between {
        conjunction: Conjunction,
        column: Column,
        low: Param,
        high: Param,
        negated: bool,
    },
    /// `column [not] between low_column and high_column`
    BetweenColumns {
        conjunction: Conjunction,
        column: Column,
        low: Column,
        high: Column,
        negated: bool,
    },
    /// `first op second` comparing two columns.
    Column {
        conjunction: Conjunction,
        first: Column,
        operator: String,
        second: Column,
    },
    /// Parenthesized nested predicate group.
    Nested {
        conjunction: Conjunction,
        query: Box<Builder>,
    },
    /// `column op (select …)`
    Sub {
        conjunction: Conjunction,
        column: Column,
        operator: String,
        query: Box<Builder>,
    },
    /// `[not] exists (select …)`
    Exists {
        conjunction: Conjunction,
        query: Box<Builder>,
        negated: bool,
    },
    /// Raw predicate fragment.
    Raw {
        conjunction: Conjunction,
        sql: String,
    },
    /// `(a, b) op (?, ?)` row-value comparison.
    RowValues {
        conjunction: Conjunction,
        columns: Vec<Column>,
        operator: String,
        values: Vec<Param>,
    },
    /// JSON selector compared against an inlined boolean.
    JsonBoolean {
        conjunction: Conjunction,
        column: String,
        operator: String,
        value: Param,
    },
    /// JSON containment check.
    JsonContains {
        conjunction: Conjunction,
        column: String,
        value: Param,
        negated: bool,
    },
    /// JSON array/object length comparison.
    JsonLength {
        conjunction: Conjunction,
        column: String,
        operator: String,
        value: Param,
    },
    /// Fulltext match.
    Fulltext {
        conjunction: Conjunction,
        columns: Vec<Column>,
        value: Param,
        options: FulltextOptions,
    },
    /// Comparison on an extracted date part.
    DateBased {
        conjunction: Conjunction,
        part: DatePart,
        column: Column,
        operator: String,
        value: Param,
    },
}

impl WhereClause {
    /// The connector joining this predicate to the previous one.
    #[must_use]
    pub const fn conjunction(&self) -> Conjunction {
        match self {
            Self::Basic { conjunction, .. }
            | Self::Bitwise { conjunction, .. }
            | Self::In { conjunction, .. }
            | Self::InSub { conjunction, .. }
            | Self::InRaw { conjunction, .. }
            | Self::Null { conjunction, .. }
            | Self::Between { conjunction, .. }
            | Self::BetweenColumns { conjunction, .. }
            | Self::Column { conjunction, .. }
            | Self::Nested { conjunction, .. }
            | Self::Sub { conjunction, .. }
            | Self::Exists { conjunction, .. }
            | Self::Raw { conjunction, .. }
            | Self::RowValues { conjunction, .. }
            | Self::JsonBoolean { conjunction, .. }
            | Self::JsonContains { conjunction, .. }
            | Self::JsonLength { conjunction, .. }
            | Self::Fulltext { conjunction, .. }
            | Self::DateBased { conjunction, .. } => *conjunction,
        }
    }
}

/// A predicate in the having list.
#[derive(Debug, Clone)]
pub enum HavingClause {
    /// `column op ?`
    Basic {
        conjunction: Conjunction,
        column: Column,
        operator: String,
        value: Param,
    },
    /// Bitwise-operator comparison.
    Bitwise {
        conjunction: Conjunction,
        column: Column,
        operator: String,
        value: Param,
    },
    /// `column [not] between ? and ?`
    Between {
        conjunction: Conjunction,
        column: Column,
        low: Param,
        high: Param,
        negated: bool,
    },
    /// Raw fragment.
    Raw {
        conjunction: Conjunction,
        sql: String,
    },
}

impl HavingClause {
    /// The connector joining this predicate to the previous one.
    #[must_use]
    pub const fn conjunction(&self) -> Conjunction {
        match self {
            Self::Basic { conjunction, .. }
            | Self::Bitwise { conjunction, .. }
            | Self::Between { conjunction, .. }
            | Self::Raw { conjunction, .. } => *conjunction,
        }
    }
}

/// A single ordering term.
#[derive(Debug, Clone)]
pub enum OrderClause {
    /// `column asc|desc`
    Column {
        column: Column,
        direction: Direction,
    },
    /// Raw fragment.
    Raw { sql: String },
    /// Dialect-specific random ordering, optionally seeded.
    Random { seed: String },
}

/// One union branch appended to the query.
#[derive(Debug, Clone)]
pub struct Union {
    /// The unioned query.
    pub query: Builder,
    /// `union all` keeps duplicates.
    pub all: bool,
}

/// Right-hand side of an update assignment.
#[derive(Debug, Clone)]
pub enum Assign {
    /// Bound value, emitted as a placeholder.
    Value(Value),
    /// Raw expression spliced into `set` verbatim.
    Expr(Expression),
}

impl From<Value> for Assign {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Expression> for Assign {
    fn from(raw: Expression) -> Self {
        Self::Expr(raw)
    }
}

/// One entry in an upsert's on-conflict update list.
#[derive(Debug, Clone)]
pub enum UpsertUpdate {
    /// Overwrite the column with the value that would have been
    /// inserted.
    Column(String),
    /// Explicit assignment.
    Assign(String, Assign),
}

/// An aggregate projection replacing the column list.
#[derive(Debug, Clone)]
pub struct Aggregate {
    /// Function name (`count`, `max`, …).
    pub function: String,
    /// Aggregated columns; `*` for whole rows.
    pub columns: Vec<Column>,
}

/// Row-locking clause.
#[derive(Debug, Clone)]
pub enum Lock {
    /// Exclusive lock (`for update` where supported).
    ForUpdate,
    /// Shared lock.
    Shared,
    /// Raw lock fragment appended verbatim.
    Raw(String),
}

/// Binding bucket selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Select,
    From,
    Join,
    Where,
    GroupBy,
    Having,
    Order,
    Union,
    UnionOrder,
}

/// Positional binding values, bucketed per clause kind.
///
/// Flattening the buckets in declaration order yields exactly the `?`
/// placeholder sequence the grammar emits for the same tree. Every
/// mutation of the clause tree keeps the two in lockstep; nothing else
/// about query execution is sound if this drifts.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    pub select: Vec<Value>,
    pub from: Vec<Value>,
    pub join: Vec<Value>,
    pub wheres: Vec<Value>,
    pub group_by: Vec<Value>,
    pub having: Vec<Value>,
    pub order: Vec<Value>,
    pub union: Vec<Value>,
    pub union_order: Vec<Value>,
}

impl Bindings {
    /// Pushes one value into a bucket.
    pub fn add(&mut self, kind: BindingKind, value: Value) {
        self.bucket_mut(kind).push(value);
    }

    /// Appends values into a bucket, preserving order.
    pub fn extend(&mut self, kind: BindingKind, values: impl IntoIterator<Item = Value>) {
        self.bucket_mut(kind).extend(values);
    }

    /// Empties one bucket.
    pub fn clear(&mut self, kind: BindingKind) {
        self.bucket_mut(kind).clear();
    }

    /// Appends every bucket of `other` onto the same bucket of `self`.
    pub fn merge(&mut self, other: &Self) {
        self.select.extend(other.select.iter().cloned());
        self.from.extend(other.from.iter().cloned());
        self.join.extend(other.join.iter().cloned());
        self.wheres.extend(other.wheres.iter().cloned());
        self.group_by.extend(other.group_by.iter().cloned());
        self.having.extend(other.having.iter().cloned());
        self.order.extend(other.order.iter().cloned());
        self.union.extend(other.union.iter().cloned());
        self.union_order.extend(other.union_order.iter().cloned());
    }

    /// Flattens the buckets in placeholder order.
    #[must_use]
    pub fn flatten(&self) -> Vec<Value> {
        let mut out = Vec::with_capacity(self.len());
        for bucket in self.buckets() {
            out.extend(bucket.iter().cloned());
        }
        out
    }

    /// Total number of bound values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets().iter().map(|b| b.len()).sum()
    }

    /// Whether no values are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn buckets(&self) -> [&Vec<Value>; 9] {
        [
            &self.select,
            &self.from,
            &self.join,
            &self.wheres,
            &self.group_by,
            &self.having,
            &self.order,
            &self.union,
            &self.union_order,
        ]
    }

    fn bucket_mut(&mut self, kind: BindingKind) -> &mut Vec<Value> {
        match kind {
            BindingKind::Select => &mut self.select,
            BindingKind::From => &mut self.from,
            BindingKind::Join => &mut self.join,
            BindingKind::Where => &mut self.wheres,
            BindingKind::GroupBy => &mut self.group_by,
            BindingKind::Having => &mut self.having,
            BindingKind::Order => &mut self.order,
            BindingKind::Union => &mut self.union,
            BindingKind::UnionOrder => &mut self.union_order,
        }
    }
}
