//! Runs built queries over a connection.
//!
//! Each method compiles a [`Builder`] through the connection's grammar
//! and executes it: row fetches, single-value reads, aggregates, and
//! the insert, update, upsert, and delete families. Bindings always
//! travel next to the SQL they were compiled for.

use std::collections::BTreeMap;

use quarry_core::ast::{Assign, Column, TableRef, UpsertUpdate};
use quarry_core::builder::Builder;
use quarry_core::error::Error as CoreError;
use quarry_core::expression::raw;
use quarry_core::value::{ToValue, Value};

use crate::connection::Connection;
use crate::driver::Row;
use crate::error::{Error, Result};

impl Connection {
    // ----- reads -----

    /// Runs the query and returns all rows.
    ///
    /// # Errors
    ///
    /// Compilation errors from the grammar, or [`Error::Query`] when
    /// execution fails.
    pub fn get(&mut self, query: &Builder) -> Result<Vec<Row>> {
        let sql = query.to_sql(self.grammar())?;
        let bindings = query.flat_bindings();
        if query.use_write {
            self.select_from_write(&sql, &bindings)
        } else {
            self.select(&sql, &bindings)
        }
    }

    /// Runs the query limited to one row.
    ///
    /// # Errors
    ///
    /// Compilation errors from the grammar, or [`Error::Query`] when
    /// execution fails.
    pub fn first(&mut self, query: &Builder) -> Result<Option<Row>> {
        Ok(self.get(&query.clone().take(1))?.into_iter().next())
    }

    /// Fetches a row by its `id` column.
    ///
    /// # Errors
    ///
    /// Compilation errors from the grammar, or [`Error::Query`] when
    /// execution fails.
    pub fn find(&mut self, query: &Builder, id: impl ToValue) -> Result<Option<Row>> {
        self.first(&query.clone().where_eq("id", id))
    }

    /// Returns a single column from the first row.
    ///
    /// # Errors
    ///
    /// Compilation errors from the grammar, or [`Error::Query`] when
    /// execution fails.
    pub fn value(&mut self, query: &Builder, column: &str) -> Result<Option<Value>> {
        let row = self.first(&query.clone().select([column]))?;
        Ok(row.and_then(|row| row.columns().first().map(|(_, value)| value.clone())))
    }

    /// Returns the only matching row.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when no row matches,
    /// [`Error::MultipleRecords`] when more than one does, and the
    /// usual compilation and execution errors.
    pub fn sole(&mut self, query: &Builder) -> Result<Row> {
        let mut rows = self.get(&query.clone().take(2))?;
        match rows.len() {
            0 => Err(Error::NotFound),
            1 => Ok(rows.remove(0)),
            _ => Err(Error::MultipleRecords),
        }
    }

    /// Collects one column from every row.
    ///
    /// # Errors
    ///
    /// Compilation errors from the grammar, or [`Error::Query`] when
    /// execution fails.
    pub fn pluck(&mut self, query: &Builder, column: &str) -> Result<Vec<Value>> {
        let rows = self.get(&query.clone().select([column]))?;
        let key = strip_table(column);
        Ok(rows
            .iter()
            .map(|row| {
                row.get(column)
                    .or_else(|| row.get(key))
                    .cloned()
                    .unwrap_or(Value::Null)
            })
            .collect())
    }

    // ----- existence -----

    /// Whether any row matches the query.
    ///
    /// # Errors
    ///
    /// Compilation errors from the grammar, or [`Error::Query`] when
    /// execution fails.
    pub fn exists(&mut self, query: &Builder) -> Result<bool> {
        let sql = self.grammar().compile_exists(query)?;
        let bindings = query.flat_bindings();
        let rows = if query.use_write {
            self.select_from_write(&sql, &bindings)?
        } else {
            self.select(&sql, &bindings)?
        };
        Ok(rows
            .first()
            .and_then(|row| row.get("exists"))
            .is_some_and(truthy))
    }

    /// Whether no row matches the query.
    ///
    /// # Errors
    ///
    /// Compilation errors from the grammar, or [`Error::Query`] when
    /// execution fails.
    pub fn doesnt_exist(&mut self, query: &Builder) -> Result<bool> {
        Ok(!self.exists(query)?)
    }

    /// Runs the callback unless a row matches.
    ///
    /// # Errors
    ///
    /// Compilation errors from the grammar, or [`Error::Query`] when
    /// execution fails.
    pub fn exists_or<T>(
        &mut self,
        query: &Builder,
        callback: impl FnOnce() -> T,
    ) -> Result<Option<T>> {
        if self.exists(query)? {
            Ok(None)
        } else {
            Ok(Some(callback()))
        }
    }

    /// Runs the callback when a row matches.
    ///
    /// # Errors
    ///
    /// Compilation errors from the grammar, or [`Error::Query`] when
    /// execution fails.
    pub fn doesnt_exist_or<T>(
        &mut self,
        query: &Builder,
        callback: impl FnOnce() -> T,
    ) -> Result<Option<T>> {
        if self.doesnt_exist(query)? {
            Ok(None)
        } else {
            Ok(Some(callback()))
        }
    }

    // ----- aggregates -----

    /// Runs an aggregate function over the query and returns the raw
    /// result. The select list drops away unless unions or havings
    /// depend on it.
    ///
    /// # Errors
    ///
    /// Compilation errors from the grammar, or [`Error::Query`] when
    /// execution fails.
    pub fn aggregate_value<I, C>(
        &mut self,
        query: &Builder,
        function: &str,
        columns: I,
    ) -> Result<Option<Value>>
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        let mut probe = query.clone();
        if probe.unions.is_empty() && probe.havings.is_empty() {
            probe = probe.without_columns();
        }
        probe.set_aggregate(function, columns);
        let rows = self.get(&probe)?;
        Ok(rows.first().and_then(|row| row.get("aggregate")).cloned())
    }

    /// Counts the matching rows.
    ///
    /// # Errors
    ///
    /// Compilation errors from the grammar, or [`Error::Query`] when
    /// execution fails.
    pub fn count(&mut self, query: &Builder) -> Result<i64> {
        Ok(as_count(self.aggregate_value(query, "count", ["*"])?))
    }

    /// The smallest value of a column.
    ///
    /// # Errors
    ///
    /// Compilation errors from the grammar, or [`Error::Query`] when
    /// execution fails.
    pub fn min(&mut self, query: &Builder, column: &str) -> Result<Option<Value>> {
        self.aggregate_value(query, "min", [column])
    }

    /// The largest value of a column.
    ///
    /// # Errors
    ///
    /// Compilation errors from the grammar, or [`Error::Query`] when
    /// execution fails.
    pub fn max(&mut self, query: &Builder, column: &str) -> Result<Option<Value>> {
        self.aggregate_value(query, "max", [column])
    }

    /// The average of a column.
    ///
    /// # Errors
    ///
    /// Compilation errors from the grammar, or [`Error::Query`] when
    /// execution fails.
    pub fn avg(&mut self, query: &Builder, column: &str) -> Result<Option<Value>> {
        self.aggregate_value(query, "avg", [column])
    }

    /// The sum of a column, zero when nothing matches.
    ///
    /// # Errors
    ///
    /// Compilation errors from the grammar, or [`Error::Query`] when
    /// execution fails.
    pub fn sum(&mut self, query: &Builder, column: &str) -> Result<Value> {
        Ok(match self.aggregate_value(query, "sum", [column])? {
            None | Some(Value::Null) => Value::Int(0),
            Some(value) => value,
        })
    }

    /// Counts rows for a paginator, ignoring orders and limits. A
    /// grouped or having-filtered query is counted through a derived
    /// table so the count sees its post-grouping rows.
    pub(crate) fn count_for_pagination(&mut self, query: &Builder) -> Result<i64> {
        let rows = self.run_pagination_count_query(query)?;
        Ok(as_count(
            rows.first().and_then(|row| row.get("aggregate")).cloned(),
        ))
    }

    fn run_pagination_count_query(&mut self, query: &Builder) -> Result<Vec<Row>> {
        if !query.groups.is_empty() || !query.havings.is_empty() {
            let mut inner = query.clone().without_orders().without_limits();
            if inner.columns.is_none() && !query.joins.is_empty() {
                if let Some(table) = base_table_name(query) {
                    inner = inner.select([format!("{table}.*")]);
                }
            }
            let sql = inner.to_sql(self.grammar())?;
            let alias = self.grammar().wrap_value("aggregate_table");
            let mut outer =
                Builder::new().from_raw(format!("({sql}) as {alias}"), inner.flat_bindings());
            outer.set_aggregate("count", ["*"]);
            return self.get(&outer);
        }
        let mut probe = query.clone().without_orders().without_limits();
        if probe.unions.is_empty() {
            probe = probe.without_columns();
        }
        probe.set_aggregate("count", ["*"]);
        self.get(&probe)
    }

    // ----- inserts -----

    /// Inserts the given rows. An empty slice is a no-op.
    ///
    /// # Errors
    ///
    /// Compilation errors from the grammar, or [`Error::Query`] when
    /// execution fails.
    pub fn insert(&mut self, query: &Builder, rows: &[BTreeMap<String, Value>]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let sql = self.grammar().compile_insert(query, rows)?;
        self.statement(&sql, &insert_bindings(rows))?;
        Ok(())
    }

    /// Inserts one row and returns the generated key, when the driver
    /// reports one.
    ///
    /// # Errors
    ///
    /// Compilation errors from the grammar, or [`Error::Query`] when
    /// execution fails.
    pub fn insert_get_id(
        &mut self,
        query: &Builder,
        row: &BTreeMap<String, Value>,
    ) -> Result<Option<i64>> {
        let rows = std::slice::from_ref(row);
        let sql = self.grammar().compile_insert(query, rows)?;
        let result = self.statement(&sql, &insert_bindings(rows))?;
        Ok(result.last_insert_id)
    }

    /// Inserts rows, skipping those that collide on a unique key, and
    /// returns how many landed.
    ///
    /// # Errors
    ///
    /// [`CoreError::Unsupported`] when the dialect has no ignore form,
    /// or [`Error::Query`] when execution fails.
    pub fn insert_or_ignore(
        &mut self,
        query: &Builder,
        rows: &[BTreeMap<String, Value>],
    ) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let sql = self.grammar().compile_insert_or_ignore(query, rows)?;
        self.affecting_statement(&sql, &insert_bindings(rows))
    }

    /// Inserts the rows a sub-query selects.
    ///
    /// # Errors
    ///
    /// Compilation errors from the grammar, or [`Error::Query`] when
    /// execution fails.
    pub fn insert_using(
        &mut self,
        query: &Builder,
        columns: &[String],
        source: &Builder,
    ) -> Result<u64> {
        let select = source.to_sql(self.grammar())?;
        let sql = self.grammar().compile_insert_using(query, columns, &select)?;
        self.affecting_statement(&sql, &source.flat_bindings())
    }

    // ----- updates -----

    /// Updates the matching rows and returns how many changed.
    ///
    /// # Errors
    ///
    /// Compilation errors from the grammar, or [`Error::Query`] when
    /// execution fails.
    pub fn update(&mut self, query: &Builder, values: &[(String, Assign)]) -> Result<u64> {
        let sql = self.grammar().compile_update(query, values)?;
        let bindings = self
            .grammar()
            .prepare_bindings_for_update(&query.bindings, values);
        self.affecting_statement(&sql, &bindings)
    }

    /// Updates the first row matching `attributes`, inserting the
    /// merged attribute and value columns when none exists.
    ///
    /// # Errors
    ///
    /// Compilation errors from the grammar, or [`Error::Query`] when
    /// execution fails.
    pub fn update_or_insert(
        &mut self,
        query: &Builder,
        attributes: &[(String, Value)],
        values: &[(String, Value)],
    ) -> Result<bool> {
        let mut probe = query.clone();
        for (column, value) in attributes {
            probe = probe.where_eq(column.as_str(), value.clone());
        }
        if !self.exists(&probe)? {
            let row: BTreeMap<String, Value> = attributes
                .iter()
                .chain(values)
                .map(|(column, value)| (column.clone(), value.clone()))
                .collect();
            self.insert(&probe, std::slice::from_ref(&row))?;
            return Ok(true);
        }
        if values.is_empty() {
            return Ok(true);
        }
        let assigns: Vec<(String, Assign)> = values
            .iter()
            .map(|(column, value)| (column.clone(), Assign::Value(value.clone())))
            .collect();
        Ok(self.update(&probe.limit(1), &assigns)? > 0)
    }

    /// Inserts rows, updating the named columns when a row collides on
    /// `unique_by`. An empty update list degrades to a plain insert.
    ///
    /// # Errors
    ///
    /// [`CoreError::Unsupported`] when the dialect has no upsert form,
    /// or [`Error::Query`] when execution fails.
    pub fn upsert(
        &mut self,
        query: &Builder,
        rows: &[BTreeMap<String, Value>],
        unique_by: &[String],
        update: &[UpsertUpdate],
    ) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        if update.is_empty() {
            let sql = self.grammar().compile_insert(query, rows)?;
            return self.affecting_statement(&sql, &insert_bindings(rows));
        }
        let sql = self.grammar().compile_upsert(query, rows, unique_by, update)?;
        let mut bindings = insert_bindings(rows);
        for entry in update {
            if let UpsertUpdate::Assign(_, Assign::Value(value)) = entry {
                bindings.push(value.clone());
            }
        }
        self.affecting_statement(&sql, &bindings)
    }

    /// Adds `amount` to a column on every matching row.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidArgument`] when `amount` is not numeric,
    /// plus the usual compilation and execution errors.
    pub fn increment(
        &mut self,
        query: &Builder,
        column: &str,
        amount: &Value,
        extra: &[(String, Assign)],
    ) -> Result<u64> {
        self.step_column(query, "increment", '+', column, amount, extra)
    }

    /// Subtracts `amount` from a column on every matching row.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidArgument`] when `amount` is not numeric,
    /// plus the usual compilation and execution errors.
    pub fn decrement(
        &mut self,
        query: &Builder,
        column: &str,
        amount: &Value,
        extra: &[(String, Assign)],
    ) -> Result<u64> {
        self.step_column(query, "decrement", '-', column, amount, extra)
    }

    fn step_column(
        &mut self,
        query: &Builder,
        method: &str,
        operator: char,
        column: &str,
        amount: &Value,
        extra: &[(String, Assign)],
    ) -> Result<u64> {
        if !amount.is_numeric() {
            return Err(CoreError::InvalidArgument(format!(
                "non-numeric value passed to {method} method"
            ))
            .into());
        }
        let wrapped = self.grammar().wrap(&Column::Name(String::from(column)))?;
        let mut values = vec![(
            String::from(column),
            Assign::Expr(raw(format!(
                "{wrapped} {operator} {}",
                amount.to_sql_inline()
            ))),
        )];
        values.extend(extra.iter().cloned());
        self.update(query, &values)
    }

    // ----- deletes -----

    /// Deletes the matching rows and returns how many went away.
    ///
    /// # Errors
    ///
    /// Compilation errors from the grammar, or [`Error::Query`] when
    /// execution fails.
    pub fn delete(&mut self, query: &Builder) -> Result<u64> {
        let sql = self.grammar().compile_delete(query)?;
        let bindings = self.grammar().prepare_bindings_for_delete(&query.bindings);
        self.affecting_statement(&sql, &bindings)
    }

    /// Empties the query's table.
    ///
    /// # Errors
    ///
    /// Compilation errors from the grammar, or [`Error::Query`] when
    /// execution fails.
    pub fn truncate(&mut self, query: &Builder) -> Result<()> {
        for sql in self.grammar().compile_truncate(query)? {
            self.statement(&sql, &[])?;
        }
        Ok(())
    }
}

/// The part of a column reference rows are actually keyed by: the
/// alias after `as`, or the segment after the last dot.
pub(crate) fn strip_table(column: &str) -> &str {
    column.rsplit(['.', ' ']).next().unwrap_or(column)
}

/// The unaliased base table, for qualifying `table.*` selects.
fn base_table_name(query: &Builder) -> Option<&str> {
    match query.from.as_ref()? {
        TableRef::Name(name) => Some(strip_table_alias(name)),
        TableRef::Raw(_) | TableRef::Sub { .. } => None,
    }
}

fn strip_table_alias(name: &str) -> &str {
    name.rsplit(" as ").next().unwrap_or(name)
}

/// Flattens rows into bindings, each row in its own column order. The
/// compiled placeholders count per row the same way.
fn insert_bindings(rows: &[BTreeMap<String, Value>]) -> Vec<Value> {
    rows.iter().flat_map(|row| row.values().cloned()).collect()
}

#[allow(clippy::float_cmp)]
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Int(n) => *n != 0,
        Value::Float(n) => *n != 0.0,
        Value::Text(text) => !text.is_empty() && text != "0",
        Value::Blob(bytes) => !bytes.is_empty(),
        Value::DateTime(_) => true,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn as_count(value: Option<Value>) -> i64 {
    match value {
        Some(Value::Int(n)) => n,
        Some(Value::Float(n)) => n as i64,
        Some(Value::Text(text)) => text.parse().unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use quarry_mysql::MySqlGrammar;

    use super::*;
    use crate::test_driver::{connection, row, Call, FakeDriver};

    fn users() -> Builder {
        Builder::table("users")
    }

    #[test]
    fn test_get_compiles_and_binds() {
        let driver = FakeDriver::new();
        driver.queue_rows(vec![row(&[("id", Value::Int(7))])]);
        let mut conn = connection(&driver);

        let rows = conn.get(&users().where_eq("id", 7)).expect("selects");

        assert_eq!(rows, vec![row(&[("id", Value::Int(7))])]);
        assert_eq!(
            driver.calls(),
            vec![Call::Query {
                sql: String::from("select * from \"users\" where \"id\" = ?"),
                bindings: vec![Value::Int(7)],
            }]
        );
    }

    #[test]
    fn test_get_honors_write_routing() {
        let write = FakeDriver::new();
        let read = FakeDriver::new();
        let mut conn = connection(&write).with_read(Box::new(read.clone()));

        conn.get(&users()).expect("selects");
        conn.get(&users().use_write()).expect("selects");

        assert_eq!(read.calls().len(), 1);
        assert_eq!(write.calls().len(), 1);
    }

    #[test]
    fn test_first_limits_to_one_row() {
        let driver = FakeDriver::new();
        let mut conn = connection(&driver);

        conn.first(&users()).expect("selects");

        assert_eq!(
            driver.calls(),
            vec![Call::Query {
                sql: String::from("select * from \"users\" limit 1"),
                bindings: vec![],
            }]
        );
    }

    #[test]
    fn test_find_filters_by_id() {
        let driver = FakeDriver::new();
        let mut conn = connection(&driver);

        conn.find(&users(), 42).expect("selects");

        assert_eq!(
            driver.calls(),
            vec![Call::Query {
                sql: String::from("select * from \"users\" where \"id\" = ? limit 1"),
                bindings: vec![Value::Int(42)],
            }]
        );
    }

    #[test]
    fn test_value_returns_first_column() {
        let driver = FakeDriver::new();
        driver.queue_rows(vec![row(&[("email", Value::Text(String::from("a@b.c")))])]);
        let mut conn = connection(&driver);

        let value = conn.value(&users(), "email").expect("selects");

        assert_eq!(value, Some(Value::Text(String::from("a@b.c"))));
        assert_eq!(
            driver.calls(),
            vec![Call::Query {
                sql: String::from("select \"email\" from \"users\" limit 1"),
                bindings: vec![],
            }]
        );
    }

    #[test]
    fn test_sole_demands_exactly_one_row() {
        let driver = FakeDriver::new();
        driver.queue_rows(vec![]);
        driver.queue_rows(vec![row(&[("id", Value::Int(1))])]);
        driver.queue_rows(vec![
            row(&[("id", Value::Int(1))]),
            row(&[("id", Value::Int(2))]),
        ]);
        let mut conn = connection(&driver);

        assert!(matches!(conn.sole(&users()), Err(Error::NotFound)));
        assert_eq!(conn.sole(&users()).expect("one row"), row(&[("id", Value::Int(1))]));
        assert!(matches!(conn.sole(&users()), Err(Error::MultipleRecords)));

        let last = driver.calls().pop().expect("recorded");
        assert_eq!(
            last,
            Call::Query {
                sql: String::from("select * from \"users\" limit 2"),
                bindings: vec![],
            }
        );
    }

    #[test]
    fn test_pluck_strips_table_qualifier() {
        let driver = FakeDriver::new();
        driver.queue_rows(vec![
            row(&[("email", Value::Text(String::from("a@b.c")))]),
            row(&[("email", Value::Null)]),
        ]);
        let mut conn = connection(&driver);

        let values = conn.pluck(&users(), "users.email").expect("plucks");

        assert_eq!(
            values,
            vec![Value::Text(String::from("a@b.c")), Value::Null]
        );
        assert_eq!(
            driver.calls(),
            vec![Call::Query {
                sql: String::from("select \"users\".\"email\" from \"users\""),
                bindings: vec![],
            }]
        );
    }

    #[test]
    fn test_exists_reads_truthiness() {
        let driver = FakeDriver::new();
        driver.queue_rows(vec![row(&[("exists", Value::Int(1))])]);
        driver.queue_rows(vec![row(&[("exists", Value::Int(0))])]);
        driver.queue_rows(vec![]);
        let mut conn = connection(&driver);

        assert!(conn.exists(&users()).expect("selects"));
        assert!(!conn.exists(&users()).expect("selects"));
        assert!(conn.doesnt_exist(&users()).expect("selects"));

        assert_eq!(
            driver.calls()[0],
            Call::Query {
                sql: String::from("select exists(select * from \"users\") as \"exists\""),
                bindings: vec![],
            }
        );
    }

    #[test]
    fn test_exists_or_runs_callback_only_when_absent() {
        let driver = FakeDriver::new();
        driver.queue_rows(vec![row(&[("exists", Value::Int(1))])]);
        driver.queue_rows(vec![row(&[("exists", Value::Int(0))])]);
        let mut conn = connection(&driver);

        assert_eq!(conn.exists_or(&users(), || 5).expect("selects"), None);
        assert_eq!(conn.exists_or(&users(), || 5).expect("selects"), Some(5));
    }

    #[test]
    fn test_count_drops_columns_and_orders() {
        let driver = FakeDriver::new();
        driver.queue_rows(vec![row(&[("aggregate", Value::Int(3))])]);
        let mut conn = connection(&driver);

        let count = conn
            .count(&users().select(["name"]).order_by_desc("id"))
            .expect("counts");

        assert_eq!(count, 3);
        assert_eq!(
            driver.calls(),
            vec![Call::Query {
                sql: String::from("select count(*) as aggregate from \"users\""),
                bindings: vec![],
            }]
        );
    }

    #[test]
    fn test_sum_defaults_to_zero() {
        let driver = FakeDriver::new();
        driver.queue_rows(vec![]);
        driver.queue_rows(vec![row(&[("aggregate", Value::Null)])]);
        driver.queue_rows(vec![row(&[("aggregate", Value::Float(9.5))])]);
        let mut conn = connection(&driver);

        assert_eq!(conn.sum(&users(), "total").expect("sums"), Value::Int(0));
        assert_eq!(conn.sum(&users(), "total").expect("sums"), Value::Int(0));
        assert_eq!(conn.sum(&users(), "total").expect("sums"), Value::Float(9.5));
    }

    #[test]
    fn test_grouped_count_wraps_in_derived_table() {
        let driver = FakeDriver::new();
        driver.queue_rows(vec![row(&[("aggregate", Value::Int(4))])]);
        let mut conn = connection(&driver);

        let total = conn
            .count_for_pagination(
                &users()
                    .where_eq("active", true)
                    .group_by(["role"])
                    .order_by_desc("id")
                    .limit(10),
            )
            .expect("counts");

        assert_eq!(total, 4);
        assert_eq!(
            driver.calls(),
            vec![Call::Query {
                sql: String::from(
                    "select count(*) as aggregate from \
                     (select * from \"users\" where \"active\" = ? group by \"role\") \
                     as \"aggregate_table\"",
                ),
                bindings: vec![Value::Int(1)],
            }]
        );
    }

    #[test]
    fn test_insert_empty_rows_is_a_noop() {
        let driver = FakeDriver::new();
        let mut conn = connection(&driver);

        conn.insert(&users(), &[]).expect("no-op");
        assert_eq!(conn.insert_or_ignore(&users(), &[]).expect("no-op"), 0);

        assert!(driver.calls().is_empty());
    }

    #[test]
    fn test_insert_binds_each_row_in_column_order() {
        let driver = FakeDriver::new();
        let mut conn = connection(&driver);

        let rows = vec![
            BTreeMap::from([
                (String::from("name"), Value::Text(String::from("ada"))),
                (String::from("age"), Value::Int(36)),
            ]),
            BTreeMap::from([
                (String::from("age"), Value::Int(41)),
                (String::from("name"), Value::Text(String::from("grace"))),
            ]),
        ];
        conn.insert(&users(), &rows).expect("inserts");

        assert_eq!(
            driver.calls(),
            vec![Call::Execute {
                sql: String::from(
                    "insert into \"users\" (\"age\", \"name\") values (?, ?), (?, ?)",
                ),
                bindings: vec![
                    Value::Int(36),
                    Value::Text(String::from("ada")),
                    Value::Int(41),
                    Value::Text(String::from("grace")),
                ],
            }]
        );
    }

    #[test]
    fn test_insert_get_id_reports_generated_key() {
        let driver = FakeDriver::new();
        driver.queue_exec(crate::driver::ExecResult {
            rows_affected: 1,
            last_insert_id: Some(99),
        });
        let mut conn = connection(&driver);

        let row = BTreeMap::from([(String::from("name"), Value::Text(String::from("ada")))]);
        let id = conn.insert_get_id(&users(), &row).expect("inserts");

        assert_eq!(id, Some(99));
    }

    #[test]
    fn test_insert_using_carries_source_bindings() {
        let driver = FakeDriver::new();
        let mut conn = connection(&driver);

        let source = Builder::table("invitees")
            .select(["email"])
            .where_eq("approved", 1);
        conn.insert_using(&users(), &[String::from("email")], &source)
            .expect("inserts");

        assert_eq!(
            driver.calls(),
            vec![Call::Execute {
                sql: String::from(
                    "insert into \"users\" (\"email\") \
                     select \"email\" from \"invitees\" where \"approved\" = ?",
                ),
                bindings: vec![Value::Int(1)],
            }]
        );
    }

    #[test]
    fn test_update_orders_assignment_then_where_bindings() {
        let driver = FakeDriver::new();
        driver.queue_exec(crate::driver::ExecResult {
            rows_affected: 2,
            last_insert_id: None,
        });
        let mut conn = connection(&driver);

        let changed = conn
            .update(
                &users().where_eq("active", 0),
                &[(String::from("name"), Assign::Value(Value::Text(String::from("x"))))],
            )
            .expect("updates");

        assert_eq!(changed, 2);
        assert_eq!(
            driver.calls(),
            vec![Call::Execute {
                sql: String::from(
                    "update \"users\" set \"name\" = ? where \"active\" = ?",
                ),
                bindings: vec![Value::Text(String::from("x")), Value::Int(0)],
            }]
        );
    }

    #[test]
    fn test_update_or_insert_inserts_when_absent() {
        let driver = FakeDriver::new();
        driver.queue_rows(vec![row(&[("exists", Value::Int(0))])]);
        let mut conn = connection(&driver);

        let attributes = [(String::from("email"), Value::Text(String::from("a@b.c")))];
        let values = [(String::from("name"), Value::Text(String::from("ada")))];
        assert!(conn
            .update_or_insert(&users(), &attributes, &values)
            .expect("inserts"));

        assert_eq!(
            driver.calls()[1],
            Call::Execute {
                sql: String::from(
                    "insert into \"users\" (\"email\", \"name\") values (?, ?)",
                ),
                bindings: vec![
                    Value::Text(String::from("a@b.c")),
                    Value::Text(String::from("ada")),
                ],
            }
        );
    }

    #[test]
    fn test_update_or_insert_updates_one_row_when_present() {
        let driver = FakeDriver::new();
        driver.queue_rows(vec![row(&[("exists", Value::Int(1))])]);
        driver.queue_exec(crate::driver::ExecResult {
            rows_affected: 1,
            last_insert_id: None,
        });
        let mut conn = Connection::new(Box::new(MySqlGrammar::new()), Box::new(driver.clone()));

        let attributes = [(String::from("email"), Value::Text(String::from("a@b.c")))];
        let values = [(String::from("name"), Value::Text(String::from("ada")))];
        assert!(conn
            .update_or_insert(&users(), &attributes, &values)
            .expect("updates"));

        assert_eq!(
            driver.calls()[1],
            Call::Execute {
                sql: String::from("update `users` set `name` = ? where `email` = ? limit 1"),
                bindings: vec![
                    Value::Text(String::from("ada")),
                    Value::Text(String::from("a@b.c")),
                ],
            }
        );
    }

    #[test]
    fn test_upsert_binds_inserts_then_update_values() {
        let driver = FakeDriver::new();
        let mut conn = Connection::new(Box::new(MySqlGrammar::new()), Box::new(driver.clone()));

        let rows = vec![BTreeMap::from([
            (String::from("email"), Value::Text(String::from("a@b.c"))),
            (String::from("visits"), Value::Int(1)),
        ])];
        conn.upsert(
            &users(),
            &rows,
            &[String::from("email")],
            &[
                UpsertUpdate::Column(String::from("visits")),
                UpsertUpdate::Assign(
                    String::from("note"),
                    Assign::Value(Value::Text(String::from("seen"))),
                ),
            ],
        )
        .expect("upserts");

        assert_eq!(
            driver.calls(),
            vec![Call::Execute {
                sql: String::from(
                    "insert into `users` (`email`, `visits`) values (?, ?) \
                     on duplicate key update `visits` = values(`visits`), `note` = ?",
                ),
                bindings: vec![
                    Value::Text(String::from("a@b.c")),
                    Value::Int(1),
                    Value::Text(String::from("seen")),
                ],
            }]
        );
    }

    #[test]
    fn test_insert_or_ignore_uses_mysql_form() {
        let driver = FakeDriver::new();
        let mut conn = Connection::new(Box::new(MySqlGrammar::new()), Box::new(driver.clone()));

        let rows = vec![BTreeMap::from([(
            String::from("email"),
            Value::Text(String::from("a@b.c")),
        )])];
        conn.insert_or_ignore(&users(), &rows).expect("inserts");

        assert_eq!(
            driver.calls(),
            vec![Call::Execute {
                sql: String::from("insert ignore into `users` (`email`) values (?)"),
                bindings: vec![Value::Text(String::from("a@b.c"))],
            }]
        );
    }

    #[test]
    fn test_increment_inlines_the_step() {
        let driver = FakeDriver::new();
        let mut conn = connection(&driver);

        conn.increment(&users().where_eq("id", 3), "hits", &Value::Int(2), &[])
            .expect("updates");

        assert_eq!(
            driver.calls(),
            vec![Call::Execute {
                sql: String::from(
                    "update \"users\" set \"hits\" = \"hits\" + 2 where \"id\" = ?",
                ),
                bindings: vec![Value::Int(3)],
            }]
        );
    }

    #[test]
    fn test_increment_rejects_non_numeric_amounts() {
        let driver = FakeDriver::new();
        let mut conn = connection(&driver);

        let error = conn
            .increment(&users(), "hits", &Value::Text(String::from("two")), &[])
            .expect_err("rejects");

        assert!(error
            .to_string()
            .contains("non-numeric value passed to increment method"));
        assert!(driver.calls().is_empty());
    }

    #[test]
    fn test_decrement_carries_extra_assignments() {
        let driver = FakeDriver::new();
        let mut conn = connection(&driver);

        conn.decrement(
            &users(),
            "credits",
            &Value::Int(1),
            &[(
                String::from("touched_at"),
                Assign::Value(Value::Text(String::from("2024-03-01 12:30:00"))),
            )],
        )
        .expect("updates");

        assert_eq!(
            driver.calls(),
            vec![Call::Execute {
                sql: String::from(
                    "update \"users\" set \"credits\" = \"credits\" - 1, \"touched_at\" = ?",
                ),
                bindings: vec![Value::Text(String::from("2024-03-01 12:30:00"))],
            }]
        );
    }

    #[test]
    fn test_delete_binds_where_values() {
        let driver = FakeDriver::new();
        driver.queue_exec(crate::driver::ExecResult {
            rows_affected: 1,
            last_insert_id: None,
        });
        let mut conn = connection(&driver);

        let gone = conn.delete(&users().where_eq("id", 9)).expect("deletes");

        assert_eq!(gone, 1);
        assert_eq!(
            driver.calls(),
            vec![Call::Execute {
                sql: String::from("delete from \"users\" where \"id\" = ?"),
                bindings: vec![Value::Int(9)],
            }]
        );
    }

    #[test]
    fn test_truncate_runs_each_statement() {
        let driver = FakeDriver::new();
        let mut conn = connection(&driver);

        conn.truncate(&users()).expect("truncates");

        assert_eq!(
            driver.calls(),
            vec![Call::Execute {
                sql: String::from("truncate table \"users\""),
                bindings: vec![],
            }]
        );
    }

    #[test]
    fn test_strip_table_handles_aliases_and_dots() {
        assert_eq!(strip_table("id"), "id");
        assert_eq!(strip_table("users.id"), "id");
        assert_eq!(strip_table("price as cost"), "cost");
    }
}
