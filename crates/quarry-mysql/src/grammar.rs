//! MySQL grammar implementation.

use std::collections::BTreeMap;

use quarry_core::ast::{Assign, Bindings, Column, FulltextMode, FulltextOptions, Lock, UpsertUpdate};
use quarry_core::builder::Builder;
use quarry_core::error::Result;
use quarry_core::grammar::{sequence_update_bindings, Grammar};
use quarry_core::value::Value;

/// MySQL grammar.
#[derive(Debug, Default, Clone)]
pub struct MySqlGrammar {
    table_prefix: String,
}

impl MySqlGrammar {
    /// Creates a grammar with no table prefix.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            table_prefix: String::new(),
        }
    }

    /// Creates a grammar that prepends `prefix` to every table name.
    #[must_use]
    pub fn with_table_prefix(prefix: impl Into<String>) -> Self {
        Self {
            table_prefix: prefix.into(),
        }
    }

    /// `field = json_set(field, path, value)` for a `column->path` assignment.
    ///
    /// Booleans are inlined as JSON literals because a bound `?` would
    /// arrive as `0`/`1` and json_set would store a number.
    fn compile_json_update_column(&self, column: &str, assign: &Assign) -> Result<String> {
        let value = match assign {
            Assign::Value(Value::Bool(flag)) => String::from(if *flag { "true" } else { "false" }),
            Assign::Value(_) => String::from("?"),
            Assign::Expr(raw) => String::from(raw.as_str()),
        };
        let (field, path) = self.wrap_json_field_and_path(column)?;
        Ok(format!("{field} = json_set({field}{path}, {value})"))
    }
}

impl Grammar for MySqlGrammar {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn table_prefix(&self) -> &str {
        &self.table_prefix
    }

    fn wrap_value(&self, value: &str) -> String {
        if value == "*" {
            return String::from("*");
        }
        format!("`{}`", value.replace('`', "``"))
    }

    // JSON columns can hold a literal `null`, which `is null` alone
    // would miss; json_type tells the two apart.
    fn compile_where_null(&self, column: &Column, negated: bool) -> Result<String> {
        if let Column::Name(name) = column {
            if name.contains("->") {
                let (field, path) = self.wrap_json_field_and_path(name)?;
                let selector = format!("json_extract({field}{path})");
                return Ok(if negated {
                    format!("({selector} is not null AND json_type({selector}) != 'NULL')")
                } else {
                    format!("({selector} is null OR json_type({selector}) = 'NULL')")
                });
            }
        }
        let keyword = if negated { "is not null" } else { "is null" };
        Ok(format!("{} {keyword}", self.wrap(column)?))
    }

    fn compile_random(&self, seed: &str) -> String {
        format!("RAND({seed})")
    }

    fn compile_lock(&self, lock: &Lock) -> String {
        match lock {
            Lock::ForUpdate => String::from("for update"),
            Lock::Shared => String::from("lock in share mode"),
            Lock::Raw(sql) => sql.clone(),
        }
    }

    fn compile_empty_insert(&self, table: &str) -> String {
        format!("insert into {table} () values ()")
    }

    fn compile_insert_or_ignore(
        &self,
        query: &Builder,
        rows: &[BTreeMap<String, Value>],
    ) -> Result<String> {
        let sql = self.compile_insert(query, rows)?;
        Ok(sql.replacen("insert", "insert ignore", 1))
    }

    fn compile_upsert(
        &self,
        query: &Builder,
        rows: &[BTreeMap<String, Value>],
        _unique_by: &[String],
        update: &[UpsertUpdate],
    ) -> Result<String> {
        let mut sql = self.compile_insert(query, rows)?;
        sql.push_str(" on duplicate key update ");
        let mut columns = Vec::with_capacity(update.len());
        for entry in update {
            columns.push(match entry {
                UpsertUpdate::Column(column) => {
                    let wrapped = self.wrap(&Column::Name(column.clone()))?;
                    format!("{wrapped} = values({wrapped})")
                }
                UpsertUpdate::Assign(column, assign) => format!(
                    "{} = {}",
                    self.wrap(&Column::Name(column.clone()))?,
                    self.assign_value(assign)
                ),
            });
        }
        sql.push_str(&columns.join(", "));
        Ok(sql)
    }

    fn compile_update_columns(&self, values: &[(String, Assign)]) -> Result<String> {
        let mut parts = Vec::with_capacity(values.len());
        for (column, assign) in values {
            if column.contains("->") {
                parts.push(self.compile_json_update_column(column, assign)?);
            } else {
                parts.push(format!(
                    "{} = {}",
                    self.wrap(&Column::Name(column.clone()))?,
                    self.assign_value(assign)
                ));
            }
        }
        Ok(parts.join(", "))
    }

    fn compile_update_without_joins(
        &self,
        query: &Builder,
        table: &str,
        columns: &str,
        wheres: &str,
    ) -> Result<String> {
        let mut sql = format!("update {table} set {columns}");
        if !wheres.is_empty() {
            sql.push(' ');
            sql.push_str(wheres);
        }
        let orders = self.compile_orders(&query.orders)?;
        if !orders.is_empty() {
            sql.push(' ');
            sql.push_str(&orders);
        }
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" limit {limit}"));
        }
        Ok(sql)
    }

    /// Inlined JSON booleans never reach the placeholder list, so their
    /// values are dropped before sequencing.
    fn prepare_bindings_for_update(
        &self,
        bindings: &Bindings,
        values: &[(String, Assign)],
    ) -> Vec<Value> {
        let kept: Vec<(String, Assign)> = values
            .iter()
            .filter(|(column, assign)| {
                !(column.contains("->") && matches!(assign, Assign::Value(Value::Bool(_))))
            })
            .cloned()
            .collect();
        sequence_update_bindings(bindings, &kept)
    }

    fn compile_delete_without_joins(
        &self,
        query: &Builder,
        table: &str,
        wheres: &str,
    ) -> Result<String> {
        let mut sql = format!("delete from {table}");
        if !wheres.is_empty() {
            sql.push(' ');
            sql.push_str(wheres);
        }
        let orders = self.compile_orders(&query.orders)?;
        if !orders.is_empty() {
            sql.push(' ');
            sql.push_str(&orders);
        }
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" limit {limit}"));
        }
        Ok(sql)
    }

    fn wrap_json_selector(&self, column: &str) -> Result<String> {
        let (field, path) = self.wrap_json_field_and_path(column)?;
        Ok(format!("json_unquote(json_extract({field}{path}))"))
    }

    // No json_unquote here: boolean comparisons go against the raw
    // extracted value.
    fn wrap_json_boolean_selector(&self, column: &str) -> Result<String> {
        let (field, path) = self.wrap_json_field_and_path(column)?;
        Ok(format!("json_extract({field}{path})"))
    }

    fn compile_json_contains(&self, column: &str, value: &str) -> Result<String> {
        let (field, path) = self.wrap_json_field_and_path(column)?;
        Ok(format!("json_contains({field}, {value}{path})"))
    }

    fn compile_json_length(&self, column: &str, operator: &str, value: &str) -> Result<String> {
        let (field, path) = self.wrap_json_field_and_path(column)?;
        Ok(format!("json_length({field}{path}) {operator} {value}"))
    }

    fn compile_fulltext(
        &self,
        columns: &[Column],
        value: &str,
        options: &FulltextOptions,
    ) -> Result<String> {
        let columns = self.columnize(columns)?;
        let mode = match options.mode {
            FulltextMode::Boolean => " in boolean mode",
            FulltextMode::NaturalLanguage => " in natural language mode",
        };
        let expanded = if options.expanded && !matches!(options.mode, FulltextMode::Boolean) {
            " with query expansion"
        } else {
            ""
        };
        Ok(format!("match ({columns}) against ({value}{mode}{expanded})"))
    }
}
