//! Tests for predicate compilation: the where family, conjunctions,
//! nesting, and the placeholder/binding alignment invariant.

mod common;
use common::*;

use quarry_core::{Builder, Error, Value};

// ===================================================================
// Basic comparisons
// ===================================================================

#[test]
fn equality_and_like_chain() {
    let q = Builder::table("t")
        .where_eq("status", 1)
        .where_operator("name", "like", "A%")
        .expect("valid operator");
    assert_query(
        &q,
        "select * from \"t\" where \"status\" = ? and \"name\" like ?",
        &[int(1), text("A%")],
    );
}

#[test]
fn or_conjunction() {
    let q = Builder::table("t")
        .where_eq("role", "admin")
        .or_where_operator("level", ">=", 9)
        .expect("valid operator");
    assert_query(
        &q,
        "select * from \"t\" where \"role\" = ? or \"level\" >= ?",
        &[text("admin"), int(9)],
    );
}

#[test]
fn operator_casing_is_normalized() {
    let q = Builder::table("t")
        .where_operator("name", "LIKE", "x%")
        .expect("valid operator");
    assert_eq!(sql(&q), "select * from \"t\" where \"name\" like ?");
}

#[test]
fn unknown_operator_demotes_to_value() {
    let q = Builder::table("t")
        .where_operator("name", "resembles", 1)
        .expect("demoted");
    assert_query(&q, "select * from \"t\" where \"name\" = ?", &[text("resembles")]);
}

#[test]
fn null_values_become_null_predicates() {
    let q = Builder::table("t").where_eq("deleted_at", Value::Null);
    assert_query(&q, "select * from \"t\" where \"deleted_at\" is null", &[]);

    let q = Builder::table("t")
        .where_operator("deleted_at", "<>", Value::Null)
        .expect("legal with <>");
    assert_query(&q, "select * from \"t\" where \"deleted_at\" is not null", &[]);
}

#[test]
fn null_with_ordering_operator_is_rejected() {
    let err = Builder::table("t")
        .where_operator("age", ">=", Value::Null)
        .expect_err("illegal combination");
    assert!(matches!(err, Error::InvalidArgument(_)));
}

// ===================================================================
// Groups
// ===================================================================

#[test]
fn nested_groups_parenthesize() {
    let q = Builder::table("t").where_eq("a", 1).where_group(|q| {
        q.where_eq("b", 2).or_where_group(|q| q.where_eq("c", 3).where_eq("d", 4))
    });
    assert_query(
        &q,
        "select * from \"t\" where \"a\" = ? and (\"b\" = ? or (\"c\" = ? and \"d\" = ?))",
        &[int(1), int(2), int(3), int(4)],
    );
}

#[test]
fn pair_list_expands_to_group() {
    let q = Builder::table("t").where_all([("a", 1), ("b", 2)]);
    assert_query(
        &q,
        "select * from \"t\" where (\"a\" = ? and \"b\" = ?)",
        &[int(1), int(2)],
    );
}

// ===================================================================
// Membership and ranges
// ===================================================================

#[test]
fn in_list_binds_each_value() {
    let q = Builder::table("t").where_in("id", [5, 6, 7]);
    assert_query(
        &q,
        "select * from \"t\" where \"id\" in (?, ?, ?)",
        &[int(5), int(6), int(7)],
    );
}

#[test]
fn empty_in_lists_collapse_to_constants() {
    let q = Builder::table("t").where_in("id", Vec::<i64>::new());
    assert_query(&q, "select * from \"t\" where 0 = 1", &[]);

    let q = Builder::table("t").where_not_in("id", Vec::<i64>::new());
    assert_query(&q, "select * from \"t\" where 1 = 1", &[]);
}

#[test]
fn integer_lists_can_inline() {
    let q = Builder::table("t").where_integer_in_raw("id", 1..=4);
    assert_query(&q, "select * from \"t\" where \"id\" in (1, 2, 3, 4)", &[]);
}

#[test]
fn in_subquery_merges_bindings_in_place() {
    let sub = Builder::table("banned").select(["user_id"]).where_eq("permanent", 1);
    let q = Builder::table("users")
        .where_eq("active", 1)
        .where_not_in_sub("id", sub);
    assert_query(
        &q,
        "select * from \"users\" where \"active\" = ? and \"id\" not in (select \"user_id\" from \"banned\" where \"permanent\" = ?)",
        &[int(1), int(1)],
    );
}

#[test]
fn between_and_between_columns() {
    let q = Builder::table("t")
        .where_between("age", 18, 65)
        .where_between_columns("due", "start", "end");
    assert_query(
        &q,
        "select * from \"t\" where \"age\" between ? and ? and \"due\" between \"start\" and \"end\"",
        &[int(18), int(65)],
    );
}

// ===================================================================
// Sub-queries and row values
// ===================================================================

#[test]
fn exists_wraps_subquery() {
    let sub = Builder::table("orders")
        .where_column("orders.user_id", "=", "users.id")
        .expect("valid");
    let q = Builder::table("users").where_not_exists(sub);
    assert_eq!(
        sql(&q),
        "select * from \"users\" where not exists (select * from \"orders\" where \"orders\".\"user_id\" = \"users\".\"id\")"
    );
}

#[test]
fn scalar_subquery_comparison() {
    let avg = Builder::table("orders").select_raw("avg(total)", []);
    let q = Builder::table("users")
        .where_sub("budget", ">", avg)
        .expect("valid");
    assert_eq!(
        sql(&q),
        "select * from \"users\" where \"budget\" > (select avg(total) from \"orders\")"
    );
}

#[test]
fn row_values_compare_tuples() {
    let q = Builder::table("t")
        .where_row_values(["last_update", "order_number"], "<", [int(1), int(2)])
        .expect("valid");
    assert_query(
        &q,
        "select * from \"t\" where (\"last_update\", \"order_number\") < (?, ?)",
        &[int(1), int(2)],
    );
}

#[test]
fn row_values_arity_must_match() {
    let err = Builder::table("t")
        .where_row_values(["a"], "<", [int(1), int(2)])
        .expect_err("mismatch");
    assert!(err.to_string().contains("number of columns"));
}

// ===================================================================
// Date parts and dynamic wheres
// ===================================================================

#[test]
fn date_part_predicates() {
    let q = Builder::table("t")
        .where_date("created_at", "=", text("2024-06-01"))
        .expect("valid")
        .where_month("created_at", "=", 6)
        .expect("valid")
        .where_year("created_at", ">=", 2024)
        .expect("valid");
    assert_query(
        &q,
        "select * from \"t\" where date(\"created_at\") = ? and month(\"created_at\") = ? and year(\"created_at\") >= ?",
        &[text("2024-06-01"), text("06"), int(2024)],
    );
}

#[test]
fn dynamic_where_parses_identifier() {
    let q = Builder::table("users")
        .where_dynamic("whereCityOrZip", vec![text("Oslo"), text("0150")])
        .expect("parses");
    assert_query(
        &q,
        "select * from \"users\" where \"city\" = ? or \"zip\" = ?",
        &[text("Oslo"), text("0150")],
    );
}

// ===================================================================
// Binding alignment across buckets
// ===================================================================

#[test]
fn placeholders_and_bindings_stay_aligned_across_buckets() {
    let sub = Builder::table("sessions").select(["user_id"]).where_eq("fresh", 1);
    let q = Builder::table("users")
        .select_raw("?, name", [int(10)])
        .join_where("contacts", "contacts.kind", "=", "main")
        .expect("valid")
        .where_in_sub("id", sub)
        .where_eq("active", 2)
        .group_by_raw("team, ?", [int(3)])
        .having("n", ">", 4)
        .expect("valid")
        .order_by_raw("field(status, ?)", [int(5)]);

    let compiled = sql(&q);
    let placeholders = compiled.matches('?').count();
    let bindings = binds(&q);
    assert_eq!(placeholders, bindings.len());
    // select, join, where (sub then basic), group, having, order
    assert_eq!(
        bindings,
        vec![int(10), text("main"), int(1), int(2), int(3), int(4), int(5)]
    );
}
