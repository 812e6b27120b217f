#![allow(dead_code)]

use quarry_core::{Builder, GenericGrammar, Grammar, Value};

pub fn sql(query: &Builder) -> String {
    GenericGrammar::new()
        .compile_select(query)
        .unwrap_or_else(|e| panic!("Failed to compile: {query:?}\nError: {e}"))
}

pub fn binds(query: &Builder) -> Vec<Value> {
    query.flat_bindings()
}

/// Asserts the compiled text and the flattened bindings together, as
/// the two must always move in lockstep.
pub fn assert_query(query: &Builder, expected_sql: &str, expected_binds: &[Value]) {
    assert_eq!(sql(query), expected_sql);
    assert_eq!(binds(query), expected_binds);
}

pub fn text(s: &str) -> Value {
    Value::Text(String::from(s))
}

pub fn int(n: i64) -> Value {
    Value::Int(n)
}
