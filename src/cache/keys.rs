//! Cache key construction.
//!
//! Keys are namespaced by collection (`"items"`, `"categories"`, ...) so a
//! write to one collection can drop every cached read for it with
//! [`TtlCache::invalidate_prefix`](crate::cache::TtlCache::invalidate_prefix)
//! and [`namespace_prefix`].

use std::fmt::Display;

use serde::Serialize;
use serde_json::{Map, Value};

/// Prefix shared by every key in `namespace`.
pub fn namespace_prefix(namespace: &str) -> String {
    format!("{namespace}:")
}

/// Key for a single record.
pub fn entity_key(namespace: &str, id: impl Display) -> String {
    format!("{namespace}:id:{id}")
}

/// Key for a query described by `params` (filters, pagination, sort, ...).
///
/// Object fields are sorted and `null` fields dropped before serializing, so
/// queries that differ only in field order or in absent optional filters map
/// to the same key. Returns `None` if `params` cannot be represented as JSON;
/// callers should skip the cache in that case.
pub fn query_key<P: Serialize + ?Sized>(namespace: &str, params: &P) -> Option<String> {
    match serde_json::to_value(params) {
        Ok(value) => Some(format!("{namespace}:q:{}", canonicalize(value))),
        Err(e) => {
            tracing::debug!(namespace, error = %e, "Query parameters not cacheable");
            None
        }
    }
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut fields: Vec<(String, Value)> = map
                .into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, canonicalize(v)))
                .collect();
            fields.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(fields.into_iter().collect::<Map<String, Value>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}
