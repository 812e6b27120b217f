//! Cursor tokens for keyset pagination.
//!
//! A [`Cursor`] records the ordered-column values of a boundary row
//! plus the paging direction, round-tripped through an opaque
//! URL-safe token. [`Builder::apply_cursor`] turns it into the nested
//! keyset predicate for the next page.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

use crate::ast::{BindingKind, Column, Conjunction, Direction, OrderClause, SelectExpr, WhereClause};
use crate::builder::Builder;
use crate::error::{Error, Result};
use crate::expression::Expression;
use crate::value::Value;

const DIRECTION_KEY: &str = "_pointsForward";

/// A pagination boundary: one value per ordered column, plus which way
/// the requested page lies.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    parameters: Vec<(String, Value)>,
    points_forward: bool,
}

impl Cursor {
    /// Builds a cursor from ordered-column values.
    #[must_use]
    pub fn new(parameters: Vec<(String, Value)>, points_forward: bool) -> Self {
        Self {
            parameters,
            points_forward,
        }
    }

    /// The boundary value recorded for `name`.
    ///
    /// # Errors
    ///
    /// [`Error::CursorParameter`] when the cursor does not carry the
    /// column.
    pub fn parameter(&self, name: &str) -> Result<&Value> {
        self.parameters
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
            .ok_or_else(|| Error::CursorParameter(String::from(name)))
    }

    /// All recorded parameters in order.
    #[must_use]
    pub fn parameters(&self) -> &[(String, Value)] {
        &self.parameters
    }

    /// Whether the cursor asks for the page after the boundary row.
    #[must_use]
    pub const fn points_forward(&self) -> bool {
        self.points_forward
    }

    /// Whether the cursor asks for the page before the boundary row.
    #[must_use]
    pub const fn points_backward(&self) -> bool {
        !self.points_forward
    }

    /// Serializes to the opaque token placed in page URLs.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut map = serde_json::Map::new();
        for (name, value) in &self.parameters {
            map.insert(name.clone(), value.to_json());
        }
        map.insert(
            String::from(DIRECTION_KEY),
            serde_json::Value::Bool(self.points_forward),
        );
        URL_SAFE_NO_PAD.encode(serde_json::Value::Object(map).to_string())
    }

    /// Parses a token; anything malformed yields `None` and callers
    /// fall back to the first page.
    #[must_use]
    pub fn decode(token: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(token).ok()?;
        let json: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
        let map = json.as_object()?;
        let points_forward = map.get(DIRECTION_KEY)?.as_bool()?;
        let mut parameters = Vec::with_capacity(map.len().saturating_sub(1));
        for (name, value) in map {
            if name == DIRECTION_KEY {
                continue;
            }
            parameters.push((name.clone(), Value::from_json(value)));
        }
        Some(Self {
            parameters,
            points_forward,
        })
    }
}

impl Builder {
    /// Validates ordering for cursor pagination and returns the
    /// effective `(column, direction)` list, reversing directions for
    /// a backward page.
    ///
    /// Raw order fragments carry no direction and are skipped; union
    /// ordering wins over the leading query's when both exist.
    ///
    /// # Errors
    ///
    /// [`Error::MissingOrderBy`] when no directed column order exists.
    pub fn ensure_order_for_cursor(
        &mut self,
        should_reverse: bool,
    ) -> Result<Vec<(String, Direction)>> {
        if self.orders.is_empty() && self.union_orders.is_empty() {
            return Err(Error::MissingOrderBy);
        }
        if should_reverse {
            for order in self.orders.iter_mut().chain(self.union_orders.iter_mut()) {
                if let OrderClause::Column { direction, .. } = order {
                    *direction = direction.flipped();
                }
            }
        }
        let source = if self.union_orders.is_empty() {
            &self.orders
        } else {
            &self.union_orders
        };
        let mut out = Vec::new();
        for order in source {
            if let OrderClause::Column {
                column: Column::Name(name),
                direction,
            } = order
            {
                out.push((name.clone(), *direction));
            }
        }
        if out.is_empty() {
            return Err(Error::MissingOrderBy);
        }
        Ok(out)
    }

    /// Constrains the query to rows past the cursor's boundary row,
    /// honoring each ordered column in turn. Union branches receive
    /// the same constraint and the union binding bucket is rebuilt to
    /// match.
    ///
    /// # Errors
    ///
    /// [`Error::CursorParameter`] when the cursor lacks a value for an
    /// ordered column.
    pub fn apply_cursor(
        mut self,
        cursor: &Cursor,
        orders: &[(String, Direction)],
    ) -> Result<Self> {
        if orders.is_empty() {
            return Ok(self);
        }
        let group = self.cursor_group(cursor, orders, 0)?;
        self.bindings
            .extend(BindingKind::Where, group.bindings.wheres.iter().cloned());
        self = self.push_where(WhereClause::Nested {
            conjunction: Conjunction::And,
            query: Box::new(group),
        });
        if !self.unions.is_empty() {
            let mut unions = std::mem::take(&mut self.unions);
            for union in &mut unions {
                let branch = std::mem::take(&mut union.query);
                union.query = branch.apply_cursor(cursor, orders)?;
            }
            self.unions = unions;
            let flattened: Vec<Value> = self
                .unions
                .iter()
                .flat_map(|u| u.query.bindings.flatten())
                .collect();
            self.bindings.clear(BindingKind::Union);
            self.bindings.extend(BindingKind::Union, flattened);
        }
        Ok(self)
    }

    /// One level of the keyset predicate:
    /// `(col op ? or (col = ? and (…next level…)))`.
    fn cursor_group(
        &self,
        cursor: &Cursor,
        orders: &[(String, Direction)],
        i: usize,
    ) -> Result<Self> {
        let (name, direction) = &orders[i];
        let operator = if *direction == Direction::Asc { ">" } else { "<" };
        let boundary = cursor.parameter(name)?.clone();
        let mut group = self.for_nested().push_basic(
            Conjunction::And,
            self.cursor_column(name),
            operator,
            boundary.clone(),
        );
        if i + 1 < orders.len() {
            let mut tie = self.for_nested().push_basic(
                Conjunction::And,
                self.cursor_column(name),
                "=",
                boundary,
            );
            let deeper = self.cursor_group(cursor, orders, i + 1)?;
            tie.bindings
                .extend(BindingKind::Where, deeper.bindings.wheres.iter().cloned());
            tie = tie.push_where(WhereClause::Nested {
                conjunction: Conjunction::And,
                query: Box::new(deeper),
            });
            group
                .bindings
                .extend(BindingKind::Where, tie.bindings.wheres.iter().cloned());
            group = group.push_where(WhereClause::Nested {
                conjunction: Conjunction::Or,
                query: Box::new(tie),
            });
        }
        Ok(group)
    }

    /// Resolves an order column through select-list aliases; aliased
    /// computed expressions compare by their original fragment.
    fn cursor_column(&self, name: &str) -> Column {
        let original = self
            .original_column_for(name)
            .unwrap_or_else(|| String::from(name));
        if original.contains('(') || original.contains(')') {
            Column::Raw(Expression::new(original))
        } else {
            Column::Name(original)
        }
    }

    fn original_column_for(&self, alias: &str) -> Option<String> {
        for item in self.columns.as_deref().unwrap_or_default() {
            let text = match item {
                SelectExpr::Col(Column::Name(name)) => name.as_str(),
                SelectExpr::Col(Column::Raw(expr)) => expr.as_str(),
                SelectExpr::Sub { .. } => continue,
            };
            if let Some((head, found)) = split_last_alias(text) {
                if found == alias {
                    return Some(String::from(head));
                }
            }
        }
        None
    }
}

/// Splits on the last ` as `, case-insensitively.
fn split_last_alias(value: &str) -> Option<(&str, &str)> {
    let bytes = value.as_bytes();
    (0..bytes.len().saturating_sub(3))
        .rev()
        .find(|&i| {
            bytes[i] == b' '
                && bytes[i + 1].eq_ignore_ascii_case(&b'a')
                && bytes[i + 2].eq_ignore_ascii_case(&b's')
                && bytes[i + 3] == b' '
        })
        .map(|i| (&value[..i], &value[i + 4..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{GenericGrammar, Grammar};

    fn sql(q: &Builder) -> String {
        GenericGrammar::new().compile_select(q).expect("compiles")
    }

    #[test]
    fn test_token_round_trip() {
        let cursor = Cursor::new(
            vec![
                (String::from("id"), Value::Int(42)),
                (String::from("name"), Value::Text(String::from("ada"))),
            ],
            true,
        );
        let decoded = Cursor::decode(&cursor.encode()).expect("decodes");
        assert_eq!(decoded.parameter("id").unwrap(), &Value::Int(42));
        assert_eq!(
            decoded.parameter("name").unwrap(),
            &Value::Text(String::from("ada"))
        );
        assert!(decoded.points_forward());
    }

    #[test]
    fn test_decode_rejects_malformed_tokens() {
        assert!(Cursor::decode("not/base64!").is_none());
        assert!(Cursor::decode(&URL_SAFE_NO_PAD.encode("not json")).is_none());
        assert!(Cursor::decode(&URL_SAFE_NO_PAD.encode("{\"id\":1}")).is_none());
        assert!(Cursor::decode(&URL_SAFE_NO_PAD.encode("[1,2]")).is_none());
    }

    #[test]
    fn test_missing_parameter_errors() {
        let cursor = Cursor::new(vec![(String::from("id"), Value::Int(1))], true);
        let err = cursor.parameter("created_at").expect_err("missing");
        assert_eq!(
            err.to_string(),
            "unable to find parameter [created_at] in pagination item"
        );
    }

    #[test]
    fn test_ensure_order_requires_directed_order() {
        let mut q = Builder::table("t");
        assert!(matches!(
            q.ensure_order_for_cursor(false),
            Err(Error::MissingOrderBy)
        ));

        let mut q = Builder::table("t").order_by_raw("rand()", []);
        assert!(matches!(
            q.ensure_order_for_cursor(false),
            Err(Error::MissingOrderBy)
        ));
    }

    #[test]
    fn test_ensure_order_reverses_for_backward_pages() {
        let mut q = Builder::table("t")
            .order_by("a", Direction::Asc)
            .order_by_desc("b");
        let orders = q.ensure_order_for_cursor(true).expect("ordered");
        assert_eq!(
            orders,
            vec![
                (String::from("a"), Direction::Desc),
                (String::from("b"), Direction::Asc)
            ]
        );
        assert_eq!(sql(&q), "select * from \"t\" order by \"a\" desc, \"b\" asc");
    }

    #[test]
    fn test_union_orders_take_precedence() {
        let mut q = Builder::table("a")
            .union(Builder::table("b"))
            .order_by("id", Direction::Asc);
        let orders = q.ensure_order_for_cursor(false).expect("ordered");
        assert_eq!(orders, vec![(String::from("id"), Direction::Asc)]);
    }

    #[test]
    fn test_apply_cursor_single_order() {
        let mut q = Builder::table("t").order_by("id", Direction::Asc);
        let orders = q.ensure_order_for_cursor(false).expect("ordered");
        let cursor = Cursor::new(vec![(String::from("id"), Value::Int(10))], true);
        let q = q.apply_cursor(&cursor, &orders).expect("applies");
        assert_eq!(
            sql(&q),
            "select * from \"t\" where (\"id\" > ?) order by \"id\" asc"
        );
        assert_eq!(q.flat_bindings(), vec![Value::Int(10)]);
    }

    #[test]
    fn test_apply_cursor_two_orders_nests_tiebreak() {
        let mut q = Builder::table("t")
            .order_by("a", Direction::Asc)
            .order_by_desc("b");
        let orders = q.ensure_order_for_cursor(false).expect("ordered");
        let cursor = Cursor::new(
            vec![
                (String::from("a"), Value::Int(1)),
                (String::from("b"), Value::Int(5)),
            ],
            true,
        );
        let q = q.apply_cursor(&cursor, &orders).expect("applies");
        assert_eq!(
            sql(&q),
            "select * from \"t\" where (\"a\" > ? or (\"a\" = ? and (\"b\" < ?))) order by \"a\" asc, \"b\" desc"
        );
        assert_eq!(
            q.flat_bindings(),
            vec![Value::Int(1), Value::Int(1), Value::Int(5)]
        );
    }

    #[test]
    fn test_apply_cursor_resolves_select_aliases() {
        let mut q = Builder::table("posts")
            .select(["id", "created_at as published"])
            .order_by("published", Direction::Asc);
        let orders = q.ensure_order_for_cursor(false).expect("ordered");
        let cursor = Cursor::new(
            vec![(String::from("published"), Value::Text(String::from("2024-01-01")))],
            true,
        );
        let q = q.apply_cursor(&cursor, &orders).expect("applies");
        assert_eq!(
            sql(&q),
            "select \"id\", \"created_at\" as \"published\" from \"posts\" where (\"created_at\" > ?) order by \"published\" asc"
        );
    }

    #[test]
    fn test_apply_cursor_keeps_computed_expressions_raw() {
        let mut q = Builder::table("orders")
            .select_raw("round(total) as rounded", [])
            .order_by("rounded", Direction::Asc);
        let orders = q.ensure_order_for_cursor(false).expect("ordered");
        let cursor = Cursor::new(vec![(String::from("rounded"), Value::Int(9))], true);
        let q = q.apply_cursor(&cursor, &orders).expect("applies");
        assert_eq!(
            sql(&q),
            "select round(total) as rounded from \"orders\" where (round(total) > ?) order by \"rounded\" asc"
        );
    }

    #[test]
    fn test_apply_cursor_rewrites_union_branches_and_bucket() {
        let mut q = Builder::table("a")
            .where_eq("x", 1)
            .union(Builder::table("b").where_eq("y", 2))
            .order_by("id", Direction::Asc);
        let orders = q.ensure_order_for_cursor(false).expect("ordered");
        let cursor = Cursor::new(vec![(String::from("id"), Value::Int(7))], true);
        let q = q.apply_cursor(&cursor, &orders).expect("applies");
        assert_eq!(
            sql(&q),
            "(select * from \"a\" where \"x\" = ? and (\"id\" > ?)) union (select * from \"b\" where \"y\" = ? and (\"id\" > ?)) order by \"id\" asc"
        );
        assert_eq!(
            q.flat_bindings(),
            vec![Value::Int(1), Value::Int(7), Value::Int(2), Value::Int(7)]
        );
        assert_eq!(q.bindings.union, vec![Value::Int(2), Value::Int(7)]);
    }

    #[test]
    fn test_missing_cursor_parameter_surfaces() {
        let mut q = Builder::table("t").order_by("id", Direction::Asc);
        let orders = q.ensure_order_for_cursor(false).expect("ordered");
        let cursor = Cursor::new(vec![], true);
        assert!(matches!(
            q.apply_cursor(&cursor, &orders),
            Err(Error::CursorParameter(_))
        ));
    }

    #[test]
    fn test_split_last_alias() {
        assert_eq!(split_last_alias("a as b"), Some(("a", "b")));
        assert_eq!(split_last_alias("cast(x as int) as y"), Some(("cast(x as int)", "y")));
        assert_eq!(split_last_alias("plain"), None);
    }
}
