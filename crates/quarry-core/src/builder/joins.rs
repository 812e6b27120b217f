//! Join clauses and the [`Builder`] methods that attach them.

use super::Builder;
use crate::ast::{BindingKind, Column, Conjunction, JoinKind, TableRef};
use crate::error::Result;
use crate::value::ToValue;

/// A single join with its on-conditions.
///
/// Conditions live in an inner [`Builder`] whose predicate list is
/// compiled after `on`; equality between columns is the common case,
/// value-bound filters ride along through the `where_*` delegates.
#[derive(Debug, Clone)]
pub struct JoinClause {
    pub kind: JoinKind,
    pub table: TableRef,
    pub query: Builder,
}

impl JoinClause {
    pub(crate) fn new(kind: JoinKind, table: TableRef) -> Self {
        Self {
            kind,
            table,
            query: Builder::new(),
        }
    }

    /// `on first = second`.
    #[must_use]
    pub fn on_eq(mut self, first: impl Into<Column>, second: impl Into<Column>) -> Self {
        self.query =
            self.query
                .push_column_compare(Conjunction::And, first.into(), "=", second.into());
        self
    }

    /// Or-connected [`JoinClause::on_eq`].
    #[must_use]
    pub fn or_on_eq(mut self, first: impl Into<Column>, second: impl Into<Column>) -> Self {
        self.query =
            self.query
                .push_column_compare(Conjunction::Or, first.into(), "=", second.into());
        self
    }

    /// `on first op second`.
    ///
    /// # Errors
    ///
    /// [`crate::Error::InvalidArgument`] on an operator outside the
    /// allow-list.
    pub fn on(
        mut self,
        first: impl Into<Column>,
        operator: &str,
        second: impl Into<Column>,
    ) -> Result<Self> {
        self.query = self.query.where_column(first, operator, second)?;
        Ok(self)
    }

    /// Or-connected [`JoinClause::on`].
    ///
    /// # Errors
    ///
    /// Same as [`JoinClause::on`].
    pub fn or_on(
        mut self,
        first: impl Into<Column>,
        operator: &str,
        second: impl Into<Column>,
    ) -> Result<Self> {
        self.query = self.query.or_where_column(first, operator, second)?;
        Ok(self)
    }

    /// Join filter against a bound value rather than a column.
    #[must_use]
    pub fn where_eq(mut self, column: impl Into<Column>, value: impl ToValue) -> Self {
        self.query = self.query.where_eq(column, value);
        self
    }

    /// Fallible value filter with an explicit operator.
    ///
    /// # Errors
    ///
    /// Same as [`Builder::where_operator`].
    pub fn where_operator(
        mut self,
        column: impl Into<Column>,
        operator: &str,
        value: impl ToValue,
    ) -> Result<Self> {
        self.query = self.query.where_operator(column, operator, value)?;
        Ok(self)
    }

    /// `column is null` filter inside the join.
    #[must_use]
    pub fn where_null(mut self, column: impl Into<Column>) -> Self {
        self.query = self.query.where_null(column);
        self
    }
}

impl Builder {
    /// Inner join with a single column equality or comparison.
    ///
    /// # Errors
    ///
    /// [`crate::Error::InvalidArgument`] on an operator outside the
    /// allow-list.
    pub fn join(
        self,
        table: impl Into<TableRef>,
        first: impl Into<Column>,
        operator: &str,
        second: impl Into<Column>,
    ) -> Result<Self> {
        let join = JoinClause::new(JoinKind::Inner, table.into()).on(first, operator, second)?;
        Ok(self.add_join(join))
    }

    /// Left join with a single column comparison.
    ///
    /// # Errors
    ///
    /// Same as [`Builder::join`].
    pub fn left_join(
        self,
        table: impl Into<TableRef>,
        first: impl Into<Column>,
        operator: &str,
        second: impl Into<Column>,
    ) -> Result<Self> {
        let join = JoinClause::new(JoinKind::Left, table.into()).on(first, operator, second)?;
        Ok(self.add_join(join))
    }

    /// Right join with a single column comparison.
    ///
    /// # Errors
    ///
    /// Same as [`Builder::join`].
    pub fn right_join(
        self,
        table: impl Into<TableRef>,
        first: impl Into<Column>,
        operator: &str,
        second: impl Into<Column>,
    ) -> Result<Self> {
        let join = JoinClause::new(JoinKind::Right, table.into()).on(first, operator, second)?;
        Ok(self.add_join(join))
    }

    /// Cross join without conditions.
    #[must_use]
    pub fn cross_join(self, table: impl Into<TableRef>) -> Self {
        self.add_join(JoinClause::new(JoinKind::Cross, table.into()))
    }

    /// Inner join whose conditions are assembled by the closure.
    #[must_use]
    pub fn join_on(
        self,
        table: impl Into<TableRef>,
        f: impl FnOnce(JoinClause) -> JoinClause,
    ) -> Self {
        self.add_join(f(JoinClause::new(JoinKind::Inner, table.into())))
    }

    /// Left join whose conditions are assembled by the closure.
    #[must_use]
    pub fn left_join_on(
        self,
        table: impl Into<TableRef>,
        f: impl FnOnce(JoinClause) -> JoinClause,
    ) -> Self {
        self.add_join(f(JoinClause::new(JoinKind::Left, table.into())))
    }

    /// Inner join filtered by a bound value.
    ///
    /// # Errors
    ///
    /// Same as [`Builder::where_operator`].
    pub fn join_where(
        self,
        table: impl Into<TableRef>,
        column: impl Into<Column>,
        operator: &str,
        value: impl ToValue,
    ) -> Result<Self> {
        let join =
            JoinClause::new(JoinKind::Inner, table.into()).where_operator(column, operator, value)?;
        Ok(self.add_join(join))
    }

    /// Inner join against a derived table.
    ///
    /// # Errors
    ///
    /// Same as [`Builder::join`].
    pub fn join_sub(
        self,
        query: Self,
        alias: impl Into<String>,
        first: impl Into<Column>,
        operator: &str,
        second: impl Into<Column>,
    ) -> Result<Self> {
        let table = TableRef::Sub {
            query: Box::new(query),
            alias: alias.into(),
        };
        let join = JoinClause::new(JoinKind::Inner, table).on(first, operator, second)?;
        Ok(self.add_join(join))
    }

    /// Left join against a derived table.
    ///
    /// # Errors
    ///
    /// Same as [`Builder::join`].
    pub fn left_join_sub(
        self,
        query: Self,
        alias: impl Into<String>,
        first: impl Into<Column>,
        operator: &str,
        second: impl Into<Column>,
    ) -> Result<Self> {
        let table = TableRef::Sub {
            query: Box::new(query),
            alias: alias.into(),
        };
        let join = JoinClause::new(JoinKind::Left, table).on(first, operator, second)?;
        Ok(self.add_join(join))
    }

    /// Derived-table bindings precede on-condition bindings, matching
    /// their order inside the compiled join expression.
    fn add_join(mut self, join: JoinClause) -> Self {
        if let TableRef::Sub { query, .. } = &join.table {
            self.bindings
                .extend(BindingKind::Join, query.bindings.flatten());
        }
        self.bindings
            .extend(BindingKind::Join, join.query.bindings.flatten());
        self.joins.push(join);
        self
    }
}
