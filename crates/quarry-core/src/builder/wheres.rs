//! Predicate methods for [`Builder`].
//!
//! Every method appends a [`WhereClause`] node and pushes the matching
//! values into the `where` binding bucket in the same breath, keeping
//! placeholder order and binding order identical by construction.

use super::Builder;
use crate::ast::{
    BindingKind, Column, Conjunction, DatePart, FulltextOptions, Param, WhereClause,
};
use crate::error::{Error, Result};
use crate::expression::Expression;
use crate::value::{ToValue, Value};

impl Builder {
    /// Adds an equality predicate; a null value compares with
    /// `is null`.
    #[must_use]
    pub fn where_eq(self, column: impl Into<Column>, value: impl ToValue) -> Self {
        self.where_eq_with(column.into(), value.to_value(), Conjunction::And)
    }

    /// Or-connected [`Builder::where_eq`].
    #[must_use]
    pub fn or_where_eq(self, column: impl Into<Column>, value: impl ToValue) -> Self {
        self.where_eq_with(column.into(), value.to_value(), Conjunction::Or)
    }

    fn where_eq_with(self, column: Column, value: Value, conjunction: Conjunction) -> Self {
        if value.is_null() {
            return self.push_where(WhereClause::Null {
                conjunction,
                column,
                negated: false,
            });
        }
        if let Some(clause) = Self::json_boolean(&column, "=", &value, conjunction) {
            return self.push_where(clause);
        }
        self.push_basic(conjunction, column, "=", value)
    }

    /// Adds a comparison predicate.
    ///
    /// An operator outside the allow-list is demoted to the compared
    /// value with an implied `=`. A null value pairs only with `=`,
    /// `<>`, or `!=`, turning into the matching null predicate.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] when a null value meets any other
    /// known operator.
    pub fn where_operator(
        self,
        column: impl Into<Column>,
        operator: &str,
        value: impl ToValue,
    ) -> Result<Self> {
        self.where_operator_with(column.into(), operator, value.to_value(), Conjunction::And)
    }

    /// Or-connected [`Builder::where_operator`].
    ///
    /// # Errors
    ///
    /// Same as [`Builder::where_operator`].
    pub fn or_where_operator(
        self,
        column: impl Into<Column>,
        operator: &str,
        value: impl ToValue,
    ) -> Result<Self> {
        self.where_operator_with(column.into(), operator, value.to_value(), Conjunction::Or)
    }

    fn where_operator_with(
        self,
        column: Column,
        operator: &str,
        value: Value,
        conjunction: Conjunction,
    ) -> Result<Self> {
        let (operator, value) = Self::prepare_operator(operator, value)?;
        if value.is_null() {
            return Ok(self.push_where(WhereClause::Null {
                conjunction,
                column,
                negated: !matches!(operator.as_str(), "="),
            }));
        }
        if let Some(clause) = Self::json_boolean(&column, &operator, &value, conjunction) {
            return Ok(self.push_where(clause));
        }
        if Self::is_bitwise_operator(&operator) {
            let mut q = self;
            q.bindings.add(BindingKind::Where, value);
            return Ok(q.push_where(WhereClause::Bitwise {
                conjunction,
                column,
                operator,
                value: Param::Bound,
            }));
        }
        Ok(self.push_basic(conjunction, column, &operator, value))
    }

    /// Expands column/value pairs into an and-joined nested group.
    #[must_use]
    pub fn where_all<I, C, V>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, V)>,
        C: Into<Column>,
        V: ToValue,
    {
        self.where_group(|mut q| {
            for (column, value) in pairs {
                q = q.where_eq(column, value);
            }
            q
        })
    }

    /// Adds a parenthesized predicate group built by the closure.
    ///
    /// An empty group adds nothing.
    #[must_use]
    pub fn where_group(self, f: impl FnOnce(Self) -> Self) -> Self {
        self.where_group_with(f, Conjunction::And)
    }

    /// Or-connected [`Builder::where_group`].
    #[must_use]
    pub fn or_where_group(self, f: impl FnOnce(Self) -> Self) -> Self {
        self.where_group_with(f, Conjunction::Or)
    }

    fn where_group_with(mut self, f: impl FnOnce(Self) -> Self, conjunction: Conjunction) -> Self {
        let nested = f(self.for_nested());
        if nested.wheres.is_empty() {
            return self;
        }
        self.bindings
            .extend(BindingKind::Where, nested.bindings.wheres.iter().cloned());
        self.push_where(WhereClause::Nested {
            conjunction,
            query: Box::new(nested),
        })
    }

    /// Adds a raw predicate fragment with its bindings.
    #[must_use]
    pub fn where_raw(
        self,
        sql: impl Into<String>,
        bindings: impl IntoIterator<Item = Value>,
    ) -> Self {
        self.where_raw_with(sql, bindings, Conjunction::And)
    }

    /// Or-connected [`Builder::where_raw`].
    #[must_use]
    pub fn or_where_raw(
        self,
        sql: impl Into<String>,
        bindings: impl IntoIterator<Item = Value>,
    ) -> Self {
        self.where_raw_with(sql, bindings, Conjunction::Or)
    }

    fn where_raw_with(
        mut self,
        sql: impl Into<String>,
        bindings: impl IntoIterator<Item = Value>,
        conjunction: Conjunction,
    ) -> Self {
        self.bindings.extend(BindingKind::Where, bindings);
        self.push_where(WhereClause::Raw {
            conjunction,
            sql: sql.into(),
        })
    }

    /// Compares two columns.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] on an operator outside the
    /// allow-list.
    pub fn where_column(
        self,
        first: impl Into<Column>,
        operator: &str,
        second: impl Into<Column>,
    ) -> Result<Self> {
        self.where_column_with(first, operator, second, Conjunction::And)
    }

    /// Or-connected [`Builder::where_column`].
    ///
    /// # Errors
    ///
    /// Same as [`Builder::where_column`].
    pub fn or_where_column(
        self,
        first: impl Into<Column>,
        operator: &str,
        second: impl Into<Column>,
    ) -> Result<Self> {
        self.where_column_with(first, operator, second, Conjunction::Or)
    }

    fn where_column_with(
        self,
        first: impl Into<Column>,
        operator: &str,
        second: impl Into<Column>,
        conjunction: Conjunction,
    ) -> Result<Self> {
        let operator = Self::validate_operator(operator)?;
        Ok(self.push_where(WhereClause::Column {
            conjunction,
            first: first.into(),
            operator,
            second: second.into(),
        }))
    }

    // ----- in lists -----

    /// `column in (…)`; an empty list compiles to constant falsity.
    #[must_use]
    pub fn where_in<I, V>(self, column: impl Into<Column>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToValue,
    {
        self.where_in_with(column.into(), values, false, Conjunction::And)
    }

    /// `column not in (…)`; an empty list compiles to constant truth.
    #[must_use]
    pub fn where_not_in<I, V>(self, column: impl Into<Column>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToValue,
    {
        self.where_in_with(column.into(), values, true, Conjunction::And)
    }

    /// Or-connected [`Builder::where_in`].
    #[must_use]
    pub fn or_where_in<I, V>(self, column: impl Into<Column>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToValue,
    {
        self.where_in_with(column.into(), values, false, Conjunction::Or)
    }

    /// Or-connected [`Builder::where_not_in`].
    #[must_use]
    pub fn or_where_not_in<I, V>(self, column: impl Into<Column>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToValue,
    {
        self.where_in_with(column.into(), values, true, Conjunction::Or)
    }

    fn where_in_with<I, V>(
        mut self,
        column: Column,
        values: I,
        negated: bool,
        conjunction: Conjunction,
    ) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToValue,
    {
        let mut params = Vec::new();
        for value in values {
            self.bindings.add(BindingKind::Where, value.to_value());
            params.push(Param::Bound);
        }
        self.push_where(WhereClause::In {
            conjunction,
            column,
            values: params,
            negated,
        })
    }

    /// `column in (select …)`.
    #[must_use]
    pub fn where_in_sub(self, column: impl Into<Column>, query: Self) -> Self {
        self.where_in_sub_with(column.into(), query, false, Conjunction::And)
    }

    /// `column not in (select …)`.
    #[must_use]
    pub fn where_not_in_sub(self, column: impl Into<Column>, query: Self) -> Self {
        self.where_in_sub_with(column.into(), query, true, Conjunction::And)
    }

    fn where_in_sub_with(
        mut self,
        column: Column,
        query: Self,
        negated: bool,
        conjunction: Conjunction,
    ) -> Self {
        self.bindings
            .extend(BindingKind::Where, query.bindings.flatten());
        self.push_where(WhereClause::InSub {
            conjunction,
            column,
            query: Box::new(query),
            negated,
        })
    }

    /// `column in (…)` with integers inlined instead of bound, for
    /// key lists larger than placeholder limits.
    #[must_use]
    pub fn where_integer_in_raw(
        self,
        column: impl Into<Column>,
        values: impl IntoIterator<Item = i64>,
    ) -> Self {
        self.push_where(WhereClause::InRaw {
            conjunction: Conjunction::And,
            column: column.into(),
            values: values.into_iter().collect(),
            negated: false,
        })
    }

    /// Negated [`Builder::where_integer_in_raw`].
    #[must_use]
    pub fn where_integer_not_in_raw(
        self,
        column: impl Into<Column>,
        values: impl IntoIterator<Item = i64>,
    ) -> Self {
        self.push_where(WhereClause::InRaw {
            conjunction: Conjunction::And,
            column: column.into(),
            values: values.into_iter().collect(),
            negated: true,
        })
    }

    // ----- null / between -----

    /// `column is null`.
    #[must_use]
    pub fn where_null(self, column: impl Into<Column>) -> Self {
        self.where_null_with(column.into(), false, Conjunction::And)
    }

    /// `column is not null`.
    #[must_use]
    pub fn where_not_null(self, column: impl Into<Column>) -> Self {
        self.where_null_with(column.into(), true, Conjunction::And)
    }

    /// Or-connected [`Builder::where_null`].
    #[must_use]
    pub fn or_where_null(self, column: impl Into<Column>) -> Self {
        self.where_null_with(column.into(), false, Conjunction::Or)
    }

    /// Or-connected [`Builder::where_not_null`].
    #[must_use]
    pub fn or_where_not_null(self, column: impl Into<Column>) -> Self {
        self.where_null_with(column.into(), true, Conjunction::Or)
    }

    fn where_null_with(self, column: Column, negated: bool, conjunction: Conjunction) -> Self {
        self.push_where(WhereClause::Null {
            conjunction,
            column,
            negated,
        })
    }

    /// `column between ? and ?`.
    #[must_use]
    pub fn where_between(
        self,
        column: impl Into<Column>,
        low: impl ToValue,
        high: impl ToValue,
    ) -> Self {
        self.where_between_with(column.into(), low.to_value(), high.to_value(), false, Conjunction::And)
    }

    /// `column not between ? and ?`.
    #[must_use]
    pub fn where_not_between(
        self,
        column: impl Into<Column>,
        low: impl ToValue,
        high: impl ToValue,
    ) -> Self {
        self.where_between_with(column.into(), low.to_value(), high.to_value(), true, Conjunction::And)
    }

    /// Or-connected [`Builder::where_between`].
    #[must_use]
    pub fn or_where_between(
        self,
        column: impl Into<Column>,
        low: impl ToValue,
        high: impl ToValue,
    ) -> Self {
        self.where_between_with(column.into(), low.to_value(), high.to_value(), false, Conjunction::Or)
    }

    fn where_between_with(
        mut self,
        column: Column,
        low: Value,
        high: Value,
        negated: bool,
        conjunction: Conjunction,
    ) -> Self {
        self.bindings.add(BindingKind::Where, low);
        self.bindings.add(BindingKind::Where, high);
        self.push_where(WhereClause::Between {
            conjunction,
            column,
            low: Param::Bound,
            high: Param::Bound,
            negated,
        })
    }

    /// `column between low_column and high_column`.
    #[must_use]
    pub fn where_between_columns(
        self,
        column: impl Into<Column>,
        low: impl Into<Column>,
        high: impl Into<Column>,
    ) -> Self {
        self.push_where(WhereClause::BetweenColumns {
            conjunction: Conjunction::And,
            column: column.into(),
            low: low.into(),
            high: high.into(),
            negated: false,
        })
    }

    /// Negated [`Builder::where_between_columns`].
    #[must_use]
    pub fn where_not_between_columns(
        self,
        column: impl Into<Column>,
        low: impl Into<Column>,
        high: impl Into<Column>,
    ) -> Self {
        self.push_where(WhereClause::BetweenColumns {
            conjunction: Conjunction::And,
            column: column.into(),
            low: low.into(),
            high: high.into(),
            negated: true,
        })
    }

    // ----- sub-queries -----

    /// `column op (select …)`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] on an operator outside the
    /// allow-list.
    pub fn where_sub(
        mut self,
        column: impl Into<Column>,
        operator: &str,
        query: Self,
    ) -> Result<Self> {
        let operator = Self::validate_operator(operator)?;
        self.bindings
            .extend(BindingKind::Where, query.bindings.flatten());
        Ok(self.push_where(WhereClause::Sub {
            conjunction: Conjunction::And,
            column: column.into(),
            operator,
            query: Box::new(query),
        }))
    }

    /// `exists (select …)`.
    #[must_use]
    pub fn where_exists(self, query: Self) -> Self {
        self.where_exists_with(query, false, Conjunction::And)
    }

    /// `not exists (select …)`.
    #[must_use]
    pub fn where_not_exists(self, query: Self) -> Self {
        self.where_exists_with(query, true, Conjunction::And)
    }

    /// Or-connected [`Builder::where_exists`].
    #[must_use]
    pub fn or_where_exists(self, query: Self) -> Self {
        self.where_exists_with(query, false, Conjunction::Or)
    }

    fn where_exists_with(mut self, query: Self, negated: bool, conjunction: Conjunction) -> Self {
        self.bindings
            .extend(BindingKind::Where, query.bindings.flatten());
        self.push_where(WhereClause::Exists {
            conjunction,
            query: Box::new(query),
            negated,
        })
    }

    /// Row-value comparison `(a, b) op (?, ?)`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] when the column and value counts
    /// differ, or on an unknown operator.
    pub fn where_row_values<C, V>(
        mut self,
        columns: impl IntoIterator<Item = C>,
        operator: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self>
    where
        C: Into<Column>,
        V: ToValue,
    {
        let operator = Self::validate_operator(operator)?;
        let columns: Vec<Column> = columns.into_iter().map(Into::into).collect();
        let values: Vec<Value> = values.into_iter().map(ToValue::to_value).collect();
        if columns.len() != values.len() {
            return Err(Error::InvalidArgument(String::from(
                "the number of columns must match the number of values",
            )));
        }
        let mut params = Vec::with_capacity(values.len());
        for value in values {
            self.bindings.add(BindingKind::Where, value);
            params.push(Param::Bound);
        }
        Ok(self.push_where(WhereClause::RowValues {
            conjunction: Conjunction::And,
            columns,
            operator,
            values: params,
        }))
    }

    // ----- JSON -----

    /// JSON containment on a `column->path` selector.
    #[must_use]
    pub fn where_json_contains(self, column: impl Into<String>, value: impl ToValue) -> Self {
        self.where_json_contains_with(column.into(), value.to_value(), false, Conjunction::And)
    }

    /// Negated JSON containment.
    #[must_use]
    pub fn where_json_doesnt_contain(
        self,
        column: impl Into<String>,
        value: impl ToValue,
    ) -> Self {
        self.where_json_contains_with(column.into(), value.to_value(), true, Conjunction::And)
    }

    /// Or-connected [`Builder::where_json_contains`].
    #[must_use]
    pub fn or_where_json_contains(self, column: impl Into<String>, value: impl ToValue) -> Self {
        self.where_json_contains_with(column.into(), value.to_value(), false, Conjunction::Or)
    }

    fn where_json_contains_with(
        mut self,
        column: String,
        value: Value,
        negated: bool,
        conjunction: Conjunction,
    ) -> Self {
        // The driver receives the JSON-encoded text of the probe value.
        let encoded = value.to_json().to_string();
        self.bindings.add(BindingKind::Where, Value::Text(encoded));
        self.push_where(WhereClause::JsonContains {
            conjunction,
            column,
            value: Param::Bound,
            negated,
        })
    }

    /// JSON length comparison on a `column->path` selector.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] on an operator outside the
    /// allow-list.
    pub fn where_json_length(
        mut self,
        column: impl Into<String>,
        operator: &str,
        value: impl ToValue,
    ) -> Result<Self> {
        let operator = Self::validate_operator(operator)?;
        self.bindings.add(BindingKind::Where, value.to_value());
        Ok(self.push_where(WhereClause::JsonLength {
            conjunction: Conjunction::And,
            column: column.into(),
            operator,
            value: Param::Bound,
        }))
    }

    // ----- fulltext -----

    /// Fulltext match over `columns`.
    #[must_use]
    pub fn where_fulltext<I, C>(
        mut self,
        columns: I,
        value: impl Into<String>,
        options: FulltextOptions,
    ) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        self.bindings
            .add(BindingKind::Where, Value::Text(value.into()));
        self.push_where(WhereClause::Fulltext {
            conjunction: Conjunction::And,
            columns: columns.into_iter().map(Into::into).collect(),
            value: Param::Bound,
            options,
        })
    }

    // ----- date parts -----

    /// Compares the date part of a datetime column.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] on an operator outside the
    /// allow-list.
    pub fn where_date(
        self,
        column: impl Into<Column>,
        operator: &str,
        value: impl ToValue,
    ) -> Result<Self> {
        self.where_date_based(DatePart::Date, column.into(), operator, value.to_value(), Conjunction::And)
    }

    /// Compares the time part of a datetime column.
    ///
    /// # Errors
    ///
    /// Same as [`Builder::where_date`].
    pub fn where_time(
        self,
        column: impl Into<Column>,
        operator: &str,
        value: impl ToValue,
    ) -> Result<Self> {
        self.where_date_based(DatePart::Time, column.into(), operator, value.to_value(), Conjunction::And)
    }

    /// Compares the day-of-month of a datetime column.
    ///
    /// # Errors
    ///
    /// Same as [`Builder::where_date`].
    pub fn where_day(
        self,
        column: impl Into<Column>,
        operator: &str,
        value: impl ToValue,
    ) -> Result<Self> {
        self.where_date_based(DatePart::Day, column.into(), operator, value.to_value(), Conjunction::And)
    }

    /// Compares the month of a datetime column.
    ///
    /// # Errors
    ///
    /// Same as [`Builder::where_date`].
    pub fn where_month(
        self,
        column: impl Into<Column>,
        operator: &str,
        value: impl ToValue,
    ) -> Result<Self> {
        self.where_date_based(DatePart::Month, column.into(), operator, value.to_value(), Conjunction::And)
    }

    /// Compares the year of a datetime column.
    ///
    /// # Errors
    ///
    /// Same as [`Builder::where_date`].
    pub fn where_year(
        self,
        column: impl Into<Column>,
        operator: &str,
        value: impl ToValue,
    ) -> Result<Self> {
        self.where_date_based(DatePart::Year, column.into(), operator, value.to_value(), Conjunction::And)
    }

    fn where_date_based(
        mut self,
        part: DatePart,
        column: Column,
        operator: &str,
        value: Value,
        conjunction: Conjunction,
    ) -> Result<Self> {
        let operator = Self::validate_operator(operator)?;
        let value = normalize_date_value(part, value);
        self.bindings.add(BindingKind::Where, value);
        Ok(self.push_where(WhereClause::DateBased {
            conjunction,
            part,
            column,
            operator,
            value: Param::Bound,
        }))
    }

    // ----- dynamic wheres -----

    /// Parses a `whereNameAndEmailOrPhone`-style identifier into a
    /// conjunction of equality predicates, consuming one parameter per
    /// column segment. CamelCase segments become snake_case columns.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] when the identifier lacks the
    /// `where` prefix, contains an empty segment, or the parameter
    /// count does not match the segment count.
    pub fn where_dynamic(mut self, method: &str, params: Vec<Value>) -> Result<Self> {
        let segments = parse_dynamic(method)?;
        if segments.len() != params.len() {
            return Err(Error::InvalidArgument(format!(
                "dynamic where on [{method}] expects {} parameters, got {}",
                segments.len(),
                params.len()
            )));
        }
        for ((conjunction, column), value) in segments.into_iter().zip(params) {
            self = self.push_basic(conjunction, Column::Name(column), "=", value);
        }
        Ok(self)
    }

    // ----- shared plumbing -----

    /// Appends a basic comparison with its binding; callers guarantee
    /// the operator is legal.
    #[must_use]
    pub(crate) fn push_basic(
        mut self,
        conjunction: Conjunction,
        column: Column,
        operator: &str,
        value: Value,
    ) -> Self {
        self.bindings.add(BindingKind::Where, value);
        self.push_where(WhereClause::Basic {
            conjunction,
            column,
            operator: String::from(operator),
            value: Param::Bound,
        })
    }

    pub(crate) fn push_where(mut self, clause: WhereClause) -> Self {
        self.wheres.push(clause);
        self
    }

    /// Column comparison for callers that already hold a legal
    /// operator.
    pub(crate) fn push_column_compare(
        self,
        conjunction: Conjunction,
        first: Column,
        operator: &str,
        second: Column,
    ) -> Self {
        self.push_where(WhereClause::Column {
            conjunction,
            first,
            operator: String::from(operator),
            second,
        })
    }

    fn json_boolean(
        column: &Column,
        operator: &str,
        value: &Value,
        conjunction: Conjunction,
    ) -> Option<WhereClause> {
        let Column::Name(name) = column else {
            return None;
        };
        let Value::Bool(b) = value else {
            return None;
        };
        if !name.contains("->") {
            return None;
        }
        Some(WhereClause::JsonBoolean {
            conjunction,
            column: name.clone(),
            operator: String::from(operator),
            value: Param::Raw(Expression::new(if *b { "true" } else { "false" })),
        })
    }

    /// Lowercases and checks an operator against the allow-list.
    pub(crate) fn validate_operator(operator: &str) -> Result<String> {
        let lowered = operator.to_lowercase();
        if super::OPERATORS.contains(&lowered.as_str()) {
            Ok(lowered)
        } else {
            Err(Error::InvalidArgument(format!(
                "invalid operator: {operator}"
            )))
        }
    }
}

/// Zero-pads day/month integers and formats datetimes so the compiled
/// comparison matches what the engine's extraction functions return.
fn normalize_date_value(part: DatePart, value: Value) -> Value {
    match (part, value) {
        (DatePart::Date, Value::DateTime(dt)) => Value::Text(dt.format("%Y-%m-%d").to_string()),
        (DatePart::Time, Value::DateTime(dt)) => Value::Text(dt.format("%H:%M:%S").to_string()),
        (DatePart::Day | DatePart::Month, Value::Int(n)) => Value::Text(format!("{n:02}")),
        (_, value) => value,
    }
}

/// Tokenizes the dynamic-where identifier into `(conjunction, column)`
/// pairs.
fn parse_dynamic(method: &str) -> Result<Vec<(Conjunction, String)>> {
    let Some(rest) = method.strip_prefix("where") else {
        return Err(Error::InvalidArgument(format!(
            "dynamic where methods must begin with 'where': {method}"
        )));
    };
    let mut out = Vec::new();
    let mut current = String::new();
    let mut conjunction = Conjunction::And;
    let mut i = 0;
    while i < rest.len() {
        let tail = &rest[i..];
        let boundary = [("And", Conjunction::And), ("Or", Conjunction::Or)]
            .into_iter()
            .find(|(word, _)| {
                tail.starts_with(word)
                    && tail[word.len()..]
                        .chars()
                        .next()
                        .is_some_and(char::is_uppercase)
            });
        if let Some((word, next)) = boundary {
            if current.is_empty() {
                return Err(Error::InvalidArgument(format!(
                    "dynamic where segment is empty in [{method}]"
                )));
            }
            out.push((conjunction, snake_case(&current)));
            current.clear();
            conjunction = next;
            i += word.len();
            continue;
        }
        let ch = tail.chars().next().unwrap_or_default();
        current.push(ch);
        i += ch.len_utf8();
    }
    if current.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "dynamic where segment is empty in [{method}]"
        )));
    }
    out.push((conjunction, snake_case(&current)));
    Ok(out)
}

fn snake_case(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len() + 4);
    for (i, ch) in segment.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
