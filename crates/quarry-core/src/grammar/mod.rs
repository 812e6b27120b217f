//! SQL grammar support.
//!
//! Different databases speak slightly different SQL. A [`Grammar`]
//! turns a [`Builder`] clause tree into one dialect's text; the default
//! methods implement the ANSI baseline and dialect grammars override
//! the pieces that diverge.
//!
//! Compilation never touches the binding buckets. A tree compiles to
//! the same string any number of times, and the `?` placeholders it
//! emits line up with [`Builder::flat_bindings`] by construction.

mod generic;

pub use generic::GenericGrammar;

use std::collections::BTreeMap;

use crate::ast::{
    Aggregate, Assign, Bindings, Column, Distinct, FulltextOptions, HavingClause, Lock,
    OrderClause, Param, SelectExpr, TableRef, UpsertUpdate, WhereClause,
};
use crate::builder::Builder;
use crate::error::{Error, Result};
use crate::value::Value;

/// Trait for dialect-specific SQL generation.
pub trait Grammar {
    /// Returns the name of the grammar.
    fn name(&self) -> &'static str;

    /// Prefix prepended to every table name and alias.
    fn table_prefix(&self) -> &str {
        ""
    }

    /// Format string for datetime bindings, in `strftime` syntax.
    fn date_format(&self) -> &'static str {
        "%Y-%m-%d %H:%M:%S"
    }

    /// Whether transactions may nest via savepoints.
    fn supports_savepoints(&self) -> bool {
        true
    }

    // ----- select -----

    /// Compiles the full select statement.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] when the tree uses a construct this
    /// dialect lacks.
    fn compile_select(&self, query: &Builder) -> Result<String> {
        if let Some(aggregate) = &query.aggregate {
            if !query.unions.is_empty() || !query.havings.is_empty() {
                return self.compile_wrapped_aggregate(query, aggregate);
            }
        }
        let mut sql = self.compile_components(query)?;
        if !query.unions.is_empty() {
            sql = format!("{} {}", self.wrap_union(&sql), self.compile_unions(query)?);
        }
        Ok(sql)
    }

    /// Compiles the clause components in their fixed order.
    fn compile_components(&self, query: &Builder) -> Result<String> {
        let mut parts: Vec<String> = Vec::new();
        if let Some(aggregate) = &query.aggregate {
            parts.push(self.compile_aggregate(query, aggregate)?);
        } else {
            parts.push(self.compile_columns(query)?);
        }
        if let Some(from) = &query.from {
            parts.push(format!("from {}", self.wrap_table(from)?));
        }
        if !query.joins.is_empty() {
            parts.push(self.compile_joins(query)?);
        }
        parts.push(self.compile_wheres(query)?);
        if !query.groups.is_empty() {
            parts.push(format!("group by {}", self.columnize(&query.groups)?));
        }
        parts.push(self.compile_havings(query)?);
        parts.push(self.compile_orders(&query.orders)?);
        if let Some(limit) = query.limit {
            parts.push(format!("limit {limit}"));
        }
        if let Some(offset) = query.offset {
            parts.push(format!("offset {offset}"));
        }
        if let Some(lock) = &query.lock {
            parts.push(self.compile_lock(lock));
        }
        Ok(concatenate(&parts))
    }

    fn compile_aggregate(&self, query: &Builder, aggregate: &Aggregate) -> Result<String> {
        let mut column = self.columnize(&aggregate.columns)?;
        match &query.distinct {
            Distinct::Columns(columns) => {
                column = format!("distinct {}", self.columnize(columns)?);
            }
            Distinct::All if column != "*" => {
                column = format!("distinct {column}");
            }
            _ => {}
        }
        Ok(format!("select {}({column}) as aggregate", aggregate.function))
    }

    fn compile_columns(&self, query: &Builder) -> Result<String> {
        let select = if query.distinct.is_on() {
            "select distinct"
        } else {
            "select"
        };
        let list = match &query.columns {
            Some(columns) if !columns.is_empty() => {
                let mut parts = Vec::with_capacity(columns.len());
                for item in columns {
                    parts.push(match item {
                        SelectExpr::Col(column) => self.wrap(column)?,
                        SelectExpr::Sub { query, alias } => format!(
                            "({}) as {}",
                            self.compile_select(query)?,
                            self.wrap_value(alias)
                        ),
                    });
                }
                parts.join(", ")
            }
            _ => String::from("*"),
        };
        Ok(format!("{select} {list}"))
    }

    fn compile_joins(&self, query: &Builder) -> Result<String> {
        let mut parts = Vec::with_capacity(query.joins.len());
        for join in &query.joins {
            let table = self.wrap_table(&join.table)?;
            let conditions = self.compile_where_conditions(&join.query)?;
            parts.push(if conditions.is_empty() {
                format!("{} join {table}", join.kind.as_str())
            } else {
                format!("{} join {table} on {conditions}", join.kind.as_str())
            });
        }
        Ok(parts.join(" "))
    }

    // ----- wheres -----

    /// Compiles the predicate list with its `where` head, or nothing.
    fn compile_wheres(&self, query: &Builder) -> Result<String> {
        let conditions = self.compile_where_conditions(query)?;
        if conditions.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!("where {conditions}"))
        }
    }

    /// Compiles the predicate list bare, for `where`, `on`, and nested
    /// groups alike.
    fn compile_where_conditions(&self, query: &Builder) -> Result<String> {
        let mut out = String::new();
        for (i, clause) in query.wheres.iter().enumerate() {
            if i > 0 {
                out.push(' ');
                out.push_str(clause.conjunction().as_str());
                out.push(' ');
            }
            out.push_str(&self.compile_where_clause(clause)?);
        }
        Ok(out)
    }

    #[allow(clippy::too_many_lines)]
    fn compile_where_clause(&self, clause: &WhereClause) -> Result<String> {
        match clause {
            WhereClause::Basic {
                column,
                operator,
                value,
                ..
            }
            | WhereClause::Bitwise {
                column,
                operator,
                value,
                ..
            } => {
                // JSON-flavored operators may themselves contain `?`.
                let operator = operator.replace('?', "??");
                Ok(format!(
                    "{} {operator} {}",
                    self.wrap(column)?,
                    self.param(value)
                ))
            }
            WhereClause::In {
                column,
                values,
                negated,
                ..
            } => {
                if values.is_empty() {
                    return Ok(String::from(if *negated { "1 = 1" } else { "0 = 1" }));
                }
                let keyword = if *negated { "not in" } else { "in" };
                Ok(format!(
                    "{} {keyword} ({})",
                    self.wrap(column)?,
                    self.parameterize(values)
                ))
            }
            WhereClause::InSub {
                column,
                query,
                negated,
                ..
            } => {
                let keyword = if *negated { "not in" } else { "in" };
                Ok(format!(
                    "{} {keyword} ({})",
                    self.wrap(column)?,
                    self.compile_select(query)?
                ))
            }
            WhereClause::InRaw {
                column,
                values,
                negated,
                ..
            } => {
                let keyword = if *negated { "not in" } else { "in" };
                let list = values
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                Ok(format!("{} {keyword} ({list})", self.wrap(column)?))
            }
            WhereClause::Null {
                column, negated, ..
            } => self.compile_where_null(column, *negated),
            WhereClause::Between {
                column,
                low,
                high,
                negated,
                ..
            } => {
                let keyword = if *negated { "not between" } else { "between" };
                Ok(format!(
                    "{} {keyword} {} and {}",
                    self.wrap(column)?,
                    self.param(low),
                    self.param(high)
                ))
            }
            WhereClause::BetweenColumns {
                column,
                low,
                high,
                negated,
                ..
            } => {
                let keyword = if *negated { "not between" } else { "between" };
                Ok(format!(
                    "{} {keyword} {} and {}",
                    self.wrap(column)?,
                    self.wrap(low)?,
                    self.wrap(high)?
                ))
            }
            WhereClause::Column {
                first,
                operator,
                second,
                ..
            } => Ok(format!(
                "{} {operator} {}",
                self.wrap(first)?,
                self.wrap(second)?
            )),
            WhereClause::Nested { query, .. } => {
                Ok(format!("({})", self.compile_where_conditions(query)?))
            }
            WhereClause::Sub {
                column,
                operator,
                query,
                ..
            } => Ok(format!(
                "{} {operator} ({})",
                self.wrap(column)?,
                self.compile_select(query)?
            )),
            WhereClause::Exists {
                query, negated, ..
            } => {
                let keyword = if *negated { "not exists" } else { "exists" };
                Ok(format!("{keyword} ({})", self.compile_select(query)?))
            }
            WhereClause::Raw { sql, .. } => Ok(sql.clone()),
            WhereClause::RowValues {
                columns,
                operator,
                values,
                ..
            } => Ok(format!(
                "({}) {operator} ({})",
                self.columnize(columns)?,
                self.parameterize(values)
            )),
            WhereClause::JsonBoolean {
                column,
                operator,
                value,
                ..
            } => Ok(format!(
                "{} {operator} {}",
                self.wrap_json_boolean_selector(column)?,
                self.wrap_json_boolean_value(&self.param(value))
            )),
            WhereClause::JsonContains {
                column,
                value,
                negated,
                ..
            } => {
                let not = if *negated { "not " } else { "" };
                Ok(format!(
                    "{not}{}",
                    self.compile_json_contains(column, &self.param(value))?
                ))
            }
            WhereClause::JsonLength {
                column,
                operator,
                value,
                ..
            } => self.compile_json_length(column, operator, &self.param(value)),
            WhereClause::Fulltext {
                columns,
                value,
                options,
                ..
            } => self.compile_fulltext(columns, &self.param(value), options),
            WhereClause::DateBased {
                part,
                column,
                operator,
                value,
                ..
            } => Ok(format!(
                "{}({}) {operator} {}",
                part.as_str(),
                self.wrap(column)?,
                self.param(value)
            )),
        }
    }

    /// Null predicates; dialects special-case JSON selectors.
    fn compile_where_null(&self, column: &Column, negated: bool) -> Result<String> {
        let keyword = if negated { "is not null" } else { "is null" };
        Ok(format!("{} {keyword}", self.wrap(column)?))
    }

    // ----- havings / orders / unions -----

    fn compile_havings(&self, query: &Builder) -> Result<String> {
        if query.havings.is_empty() {
            return Ok(String::new());
        }
        let mut out = String::new();
        for (i, having) in query.havings.iter().enumerate() {
            if i > 0 {
                out.push(' ');
                out.push_str(having.conjunction().as_str());
                out.push(' ');
            }
            out.push_str(&self.compile_having_clause(having)?);
        }
        Ok(format!("having {out}"))
    }

    fn compile_having_clause(&self, having: &HavingClause) -> Result<String> {
        match having {
            HavingClause::Basic {
                column,
                operator,
                value,
                ..
            }
            | HavingClause::Bitwise {
                column,
                operator,
                value,
                ..
            } => Ok(format!(
                "{} {operator} {}",
                self.wrap(column)?,
                self.param(value)
            )),
            HavingClause::Between {
                column,
                low,
                high,
                negated,
                ..
            } => {
                let keyword = if *negated { "not between" } else { "between" };
                Ok(format!(
                    "{} {keyword} {} and {}",
                    self.wrap(column)?,
                    self.param(low),
                    self.param(high)
                ))
            }
            HavingClause::Raw { sql, .. } => Ok(sql.clone()),
        }
    }

    /// Compiles an order list with its `order by` head, or nothing.
    fn compile_orders(&self, orders: &[OrderClause]) -> Result<String> {
        if orders.is_empty() {
            return Ok(String::new());
        }
        let mut parts = Vec::with_capacity(orders.len());
        for order in orders {
            parts.push(match order {
                OrderClause::Column { column, direction } => {
                    format!("{} {}", self.wrap(column)?, direction.as_str())
                }
                OrderClause::Raw { sql } => sql.clone(),
                OrderClause::Random { seed } => self.compile_random(seed),
            });
        }
        Ok(format!("order by {}", parts.join(", ")))
    }

    /// Random-order expression; the seed is dialect-defined.
    fn compile_random(&self, _seed: &str) -> String {
        String::from("RANDOM()")
    }

    /// Parenthesizes a union member.
    fn wrap_union(&self, sql: &str) -> String {
        format!("({sql})")
    }

    fn compile_unions(&self, query: &Builder) -> Result<String> {
        let mut sql = String::new();
        for union in &query.unions {
            sql.push_str(if union.all { " union all " } else { " union " });
            sql.push_str(&self.wrap_union(&self.compile_select(&union.query)?));
        }
        let orders = self.compile_orders(&query.union_orders)?;
        if !orders.is_empty() {
            sql.push(' ');
            sql.push_str(&orders);
        }
        if let Some(limit) = query.union_limit {
            sql.push_str(&format!(" limit {limit}"));
        }
        if let Some(offset) = query.union_offset {
            sql.push_str(&format!(" offset {offset}"));
        }
        Ok(sql.trim_start().to_string())
    }

    /// Aggregates over a union or having-filtered query by wrapping it
    /// as a derived table, so the aggregate sees its final rows.
    fn compile_wrapped_aggregate(&self, query: &Builder, aggregate: &Aggregate) -> Result<String> {
        let selection = self.compile_aggregate(query, aggregate)?;
        let mut inner = query.clone();
        inner.aggregate = None;
        Ok(format!(
            "{selection} from ({}) as {}",
            self.compile_select(&inner)?,
            self.wrap_value(&format!("{}temp_table", self.table_prefix()))
        ))
    }

    /// Wraps a select in an existence probe.
    ///
    /// # Errors
    ///
    /// Same as [`Grammar::compile_select`].
    fn compile_exists(&self, query: &Builder) -> Result<String> {
        Ok(format!(
            "select exists({}) as {}",
            self.compile_select(query)?,
            self.wrap_value("exists")
        ))
    }

    // ----- locks -----

    /// Lock clause; the base grammar only honors raw fragments.
    fn compile_lock(&self, lock: &Lock) -> String {
        match lock {
            Lock::Raw(sql) => sql.clone(),
            Lock::ForUpdate | Lock::Shared => String::new(),
        }
    }

    // ----- insert / update / delete -----

    /// Compiles a multi-row insert. Rows are keyed maps so every row
    /// shares the first row's column order.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] when the query has no target table.
    fn compile_insert(
        &self,
        query: &Builder,
        rows: &[BTreeMap<String, Value>],
    ) -> Result<String> {
        let table = self.wrap_table(self.target_table(query)?)?;
        let Some(first) = rows.first() else {
            return Ok(self.compile_empty_insert(&table));
        };
        let columns = first.keys().cloned().map(Column::Name).collect::<Vec<_>>();
        let placeholders = rows
            .iter()
            .map(|row| format!("({})", vec!["?"; row.len()].join(", ")))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!(
            "insert into {table} ({}) values {placeholders}",
            self.columnize(&columns)?
        ))
    }

    /// Insert with no column values at all.
    fn compile_empty_insert(&self, table: &str) -> String {
        format!("insert into {table} default values")
    }

    /// Insert that skips duplicate-key rows.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] unless the dialect overrides this.
    fn compile_insert_or_ignore(
        &self,
        _query: &Builder,
        _rows: &[BTreeMap<String, Value>],
    ) -> Result<String> {
        Err(Error::Unsupported(String::from(
            "inserting while ignoring errors",
        )))
    }

    /// `insert into … select …`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] when the query has no target table.
    fn compile_insert_using(
        &self,
        query: &Builder,
        columns: &[String],
        select: &str,
    ) -> Result<String> {
        let table = self.wrap_table(self.target_table(query)?)?;
        if columns.is_empty() || (columns.len() == 1 && columns[0] == "*") {
            return Ok(format!("insert into {table} {select}"));
        }
        let columns = columns.iter().cloned().map(Column::Name).collect::<Vec<_>>();
        Ok(format!(
            "insert into {table} ({}) {select}",
            self.columnize(&columns)?
        ))
    }

    /// Insert-or-update on unique-key collision.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] unless the dialect overrides this.
    fn compile_upsert(
        &self,
        _query: &Builder,
        _rows: &[BTreeMap<String, Value>],
        _unique_by: &[String],
        _update: &[UpsertUpdate],
    ) -> Result<String> {
        Err(Error::Unsupported(String::from("upserts")))
    }

    /// Compiles an update statement.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] when the query has no target table.
    fn compile_update(&self, query: &Builder, values: &[(String, Assign)]) -> Result<String> {
        let table = self.wrap_table(self.target_table(query)?)?;
        let columns = self.compile_update_columns(values)?;
        let wheres = self.compile_wheres(query)?;
        if query.joins.is_empty() {
            self.compile_update_without_joins(query, &table, &columns, &wheres)
        } else {
            self.compile_update_with_joins(query, &table, &columns, &wheres)
        }
    }

    fn compile_update_columns(&self, values: &[(String, Assign)]) -> Result<String> {
        let mut parts = Vec::with_capacity(values.len());
        for (column, assign) in values {
            parts.push(format!(
                "{} = {}",
                self.wrap(&Column::Name(column.clone()))?,
                self.assign_value(assign)
            ));
        }
        Ok(parts.join(", "))
    }

    /// Placeholder or inlined expression for one assignment.
    fn assign_value(&self, assign: &Assign) -> String {
        match assign {
            Assign::Value(_) => String::from("?"),
            Assign::Expr(raw) => String::from(raw.as_str()),
        }
    }

    fn compile_update_without_joins(
        &self,
        _query: &Builder,
        table: &str,
        columns: &str,
        wheres: &str,
    ) -> Result<String> {
        Ok(concatenate(&[
            format!("update {table} set {columns}"),
            String::from(wheres),
        ]))
    }

    fn compile_update_with_joins(
        &self,
        query: &Builder,
        table: &str,
        columns: &str,
        wheres: &str,
    ) -> Result<String> {
        let joins = self.compile_joins(query)?;
        Ok(concatenate(&[
            format!("update {table}"),
            joins,
            format!("set {columns}"),
            String::from(wheres),
        ]))
    }

    /// Update bindings: join bucket, then the assignment values, then
    /// every remaining bucket except select.
    fn prepare_bindings_for_update(
        &self,
        bindings: &Bindings,
        values: &[(String, Assign)],
    ) -> Vec<Value> {
        sequence_update_bindings(bindings, values)
    }

    /// Compiles a delete statement.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] when the query has no target table.
    fn compile_delete(&self, query: &Builder) -> Result<String> {
        let table = self.wrap_table(self.target_table(query)?)?;
        let wheres = self.compile_wheres(query)?;
        if query.joins.is_empty() {
            self.compile_delete_without_joins(query, &table, &wheres)
        } else {
            self.compile_delete_with_joins(query, &table, &wheres)
        }
    }

    fn compile_delete_without_joins(
        &self,
        _query: &Builder,
        table: &str,
        wheres: &str,
    ) -> Result<String> {
        Ok(concatenate(&[
            format!("delete from {table}"),
            String::from(wheres),
        ]))
    }

    fn compile_delete_with_joins(
        &self,
        query: &Builder,
        table: &str,
        wheres: &str,
    ) -> Result<String> {
        let alias = table.rsplit(" as ").next().unwrap_or(table);
        let joins = self.compile_joins(query)?;
        Ok(concatenate(&[
            format!("delete {alias} from {table}"),
            joins,
            String::from(wheres),
        ]))
    }

    /// Delete bindings: every bucket except select, in bucket order.
    fn prepare_bindings_for_delete(&self, bindings: &Bindings) -> Vec<Value> {
        let mut out = Vec::new();
        for bucket in [
            &bindings.from,
            &bindings.join,
            &bindings.wheres,
            &bindings.group_by,
            &bindings.having,
            &bindings.order,
            &bindings.union,
            &bindings.union_order,
        ] {
            out.extend(bucket.iter().cloned());
        }
        out
    }

    /// Statements that empty the table, executed in order.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] when the query has no target table.
    fn compile_truncate(&self, query: &Builder) -> Result<Vec<String>> {
        Ok(vec![format!(
            "truncate table {}",
            self.wrap_table(self.target_table(query)?)?
        )])
    }

    // ----- savepoints -----

    fn compile_savepoint(&self, name: &str) -> String {
        format!("SAVEPOINT {name}")
    }

    fn compile_savepoint_rollback(&self, name: &str) -> String {
        format!("ROLLBACK TO SAVEPOINT {name}")
    }

    // ----- wrapping -----

    /// Wraps a column reference.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] for JSON selectors the dialect lacks.
    fn wrap(&self, column: &Column) -> Result<String> {
        match column {
            Column::Raw(raw) => Ok(String::from(raw.as_str())),
            Column::Name(name) => self.wrap_identifier(name),
        }
    }

    /// Wraps a possibly aliased, dotted, or JSON-selecting identifier.
    fn wrap_identifier(&self, name: &str) -> Result<String> {
        if let Some((head, alias)) = split_alias(name) {
            return Ok(format!(
                "{} as {}",
                self.wrap_identifier(head)?,
                self.wrap_value(alias)
            ));
        }
        if name.contains("->") {
            return self.wrap_json_selector(name);
        }
        Ok(self.wrap_segments(name))
    }

    /// Wraps dotted segments; a leading qualifier is a table name and
    /// takes the prefix.
    fn wrap_segments(&self, name: &str) -> String {
        let segments: Vec<&str> = name.split('.').collect();
        let qualified = segments.len() > 1;
        segments
            .iter()
            .enumerate()
            .map(|(i, segment)| {
                if i == 0 && qualified {
                    self.wrap_value(&format!("{}{segment}", self.table_prefix()))
                } else {
                    self.wrap_value(segment)
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Wraps a table reference.
    ///
    /// # Errors
    ///
    /// Same as [`Grammar::compile_select`] for derived tables.
    fn wrap_table(&self, table: &TableRef) -> Result<String> {
        match table {
            TableRef::Raw(raw) => Ok(String::from(raw.as_str())),
            TableRef::Name(name) => Ok(self.wrap_table_identifier(name)),
            TableRef::Sub { query, alias } => Ok(format!(
                "({}) as {}",
                self.compile_select(query)?,
                self.wrap_value(&format!("{}{alias}", self.table_prefix()))
            )),
        }
    }

    /// Wraps a table name, prefixing the final segment and any alias.
    fn wrap_table_identifier(&self, name: &str) -> String {
        if let Some((head, alias)) = split_alias(name) {
            return format!(
                "{} as {}",
                self.wrap_table_identifier(head),
                self.wrap_value(&format!("{}{alias}", self.table_prefix()))
            );
        }
        if let Some(dot) = name.rfind('.') {
            let qualifier = &name[..dot];
            let table = &name[dot + 1..];
            let mut parts: Vec<String> =
                qualifier.split('.').map(|s| self.wrap_value(s)).collect();
            parts.push(self.wrap_value(&format!("{}{table}", self.table_prefix())));
            return parts.join(".");
        }
        self.wrap_value(&format!("{}{name}", self.table_prefix()))
    }

    /// Quotes a single identifier segment; `*` passes through.
    fn wrap_value(&self, value: &str) -> String {
        if value == "*" {
            return String::from("*");
        }
        format!("\"{}\"", value.replace('"', "\"\""))
    }

    /// Comma-joins wrapped columns.
    ///
    /// # Errors
    ///
    /// Same as [`Grammar::wrap`].
    fn columnize(&self, columns: &[Column]) -> Result<String> {
        let mut parts = Vec::with_capacity(columns.len());
        for column in columns {
            parts.push(self.wrap(column)?);
        }
        Ok(parts.join(", "))
    }

    /// Placeholder for a bound operand, inlined text for a raw one.
    fn param(&self, param: &Param) -> String {
        match param {
            Param::Bound => String::from("?"),
            Param::Raw(raw) => String::from(raw.as_str()),
        }
    }

    /// Comma-joins operand placeholders.
    fn parameterize(&self, params: &[Param]) -> String {
        params
            .iter()
            .map(|p| self.param(p))
            .collect::<Vec<_>>()
            .join(", ")
    }

    // ----- JSON -----

    /// Wraps a `column->path` selector for value extraction.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] unless the dialect overrides this.
    fn wrap_json_selector(&self, _column: &str) -> Result<String> {
        Err(Error::Unsupported(String::from("JSON operations")))
    }

    /// Wraps a selector compared against a boolean literal.
    ///
    /// # Errors
    ///
    /// Same as [`Grammar::wrap_json_selector`].
    fn wrap_json_boolean_selector(&self, column: &str) -> Result<String> {
        self.wrap_json_selector(column)
    }

    /// The compiled boolean operand; dialects may cast it.
    fn wrap_json_boolean_value(&self, value: &str) -> String {
        String::from(value)
    }

    /// Splits a selector into a wrapped field and a quoted JSON path.
    ///
    /// # Errors
    ///
    /// Same as [`Grammar::wrap`] for the field part.
    fn wrap_json_field_and_path(&self, column: &str) -> Result<(String, String)> {
        let (field, rest) = match column.split_once("->") {
            Some((field, rest)) => (field, Some(rest)),
            None => (column, None),
        };
        let field = self.wrap_identifier(field)?;
        let path = rest.map_or_else(String::new, |rest| format!(", {}", wrap_json_path(rest)));
        Ok((field, path))
    }

    /// JSON containment predicate.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] unless the dialect overrides this.
    fn compile_json_contains(&self, _column: &str, _value: &str) -> Result<String> {
        Err(Error::Unsupported(String::from("JSON contains operations")))
    }

    /// JSON length predicate.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] unless the dialect overrides this.
    fn compile_json_length(&self, _column: &str, _operator: &str, _value: &str) -> Result<String> {
        Err(Error::Unsupported(String::from("JSON length operations")))
    }

    // ----- fulltext -----

    /// Fulltext predicate.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] unless the dialect overrides this.
    fn compile_fulltext(
        &self,
        _columns: &[Column],
        _value: &str,
        _options: &FulltextOptions,
    ) -> Result<String> {
        Err(Error::Unsupported(String::from(
            "fulltext search operations",
        )))
    }

    // ----- shared -----

    /// The query's target table, required for data manipulation.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] when no table was set.
    fn target_table<'a>(&self, query: &'a Builder) -> Result<&'a TableRef> {
        query
            .from
            .as_ref()
            .ok_or_else(|| Error::InvalidArgument(String::from("query has no target table")))
    }
}

/// Binding sequence for update statements: join bucket, then the assignment
/// values, then every remaining bucket except select.
///
/// Grammars that filter assignments before sequencing call this directly.
pub fn sequence_update_bindings(bindings: &Bindings, values: &[(String, Assign)]) -> Vec<Value> {
    let mut out = bindings.join.clone();
    out.extend(values.iter().filter_map(|(_, assign)| match assign {
        Assign::Value(value) => Some(value.clone()),
        Assign::Expr(_) => None,
    }));
    for bucket in [
        &bindings.from,
        &bindings.wheres,
        &bindings.group_by,
        &bindings.having,
        &bindings.order,
        &bindings.union,
        &bindings.union_order,
    ] {
        out.extend(bucket.iter().cloned());
    }
    out
}

/// Space-joins the non-empty segments.
fn concatenate(parts: &[String]) -> String {
    parts
        .iter()
        .filter(|part| !part.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits `head as alias` case-insensitively on the first ` as `.
fn split_alias(value: &str) -> Option<(&str, &str)> {
    let bytes = value.as_bytes();
    (0..bytes.len().saturating_sub(3))
        .find(|&i| {
            bytes[i] == b' '
                && bytes[i + 1].eq_ignore_ascii_case(&b'a')
                && bytes[i + 2].eq_ignore_ascii_case(&b's')
                && bytes[i + 3] == b' '
        })
        .map(|i| (&value[..i], &value[i + 4..]))
}

/// Quotes a JSON path for inlining: `a->b[0]` becomes `'$."a"."b"[0]'`.
fn wrap_json_path(path: &str) -> String {
    let escaped = path.replace('\'', "''");
    let joined = escaped
        .split("->")
        .map(wrap_json_path_segment)
        .collect::<Vec<_>>()
        .join(".");
    let leading = if joined.starts_with('[') { "" } else { "." };
    format!("'${leading}{joined}'")
}

/// Quotes one path segment, keeping trailing array indices bare.
fn wrap_json_path_segment(segment: &str) -> String {
    if let Some(open) = segment.find('[') {
        if segment.ends_with(']') {
            let key = &segment[..open];
            let index = &segment[open..];
            if key.is_empty() {
                return String::from(index);
            }
            return format!("\"{key}\"{index}");
        }
    }
    format!("\"{segment}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_alias_is_case_insensitive() {
        assert_eq!(split_alias("users AS u"), Some(("users", "u")));
        assert_eq!(split_alias("users as u"), Some(("users", "u")));
        assert_eq!(split_alias("users"), None);
    }

    #[test]
    fn test_wrap_json_path_quotes_segments() {
        assert_eq!(wrap_json_path("a->b"), "'$.\"a\".\"b\"'");
        assert_eq!(wrap_json_path("a->b[0]"), "'$.\"a\".\"b\"[0]'");
        assert_eq!(wrap_json_path("it's"), "'$.\"it''s\"'");
    }

    #[test]
    fn test_concatenate_skips_empty() {
        let parts = [
            String::from("select *"),
            String::new(),
            String::from("from t"),
        ];
        assert_eq!(concatenate(&parts), "select * from t");
    }
}
