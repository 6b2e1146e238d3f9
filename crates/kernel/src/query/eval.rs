//! In-process evaluation of plans against documents.
//!
//! JSON values follow the ordering Postgres uses for `jsonb`: values of
//! different types never compare equal, and a missing field sorts after
//! every present value.

use std::cmp::Ordering;

use serde_json::Value;

use super::types::{CompareOp, FieldRef, FilterValue, Predicate, SortDirection, SortKey};
use crate::store::Document;

/// Whether `doc` satisfies every predicate.
pub fn matches_all(predicates: &[Predicate], doc: &Document) -> bool {
    predicates.iter().all(|p| matches(p, doc))
}

/// Whether `doc` satisfies one predicate.
pub fn matches(predicate: &Predicate, doc: &Document) -> bool {
    let op = predicate.op;
    match (&predicate.target, &predicate.value) {
        (FieldRef::Id, FilterValue::Id(id)) => op.accepts(doc.id.cmp(id)),
        (FieldRef::Created, FilterValue::Timestamp(ts)) => op.accepts(doc.created.cmp(ts)),
        (FieldRef::Changed, FilterValue::Timestamp(ts)) => op.accepts(doc.changed.cmp(ts)),
        (FieldRef::IsActive, FilterValue::Flag(flag)) => op.accepts(doc.is_active.cmp(flag)),
        (FieldRef::Data(name), FilterValue::Json(expected)) => match doc.fields.get(name) {
            None => false,
            Some(Value::Array(items)) if op == CompareOp::Eq && !expected.is_array() => items
                .iter()
                .any(|item| same_kind_cmp(item, expected) == Some(Ordering::Equal)),
            Some(actual) => same_kind_cmp(actual, expected).is_some_and(|o| op.accepts(o)),
        },
        // Mismatched target/value pairs are never produced by the builder.
        _ => false,
    }
}

/// Compare two scalars of the same JSON type.
fn same_kind_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                return Some(x.cmp(&y));
            }
            x.as_f64()?.partial_cmp(&y.as_f64()?)
        }
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Rank of a JSON type in jsonb ordering.
fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::String(_) => 1,
        Value::Number(_) => 2,
        Value::Bool(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over optional JSON values, missing last.
fn json_order(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => same_kind_cmp(x, y)
            .unwrap_or_else(|| type_rank(x).cmp(&type_rank(y)).then_with(|| x.to_string().cmp(&y.to_string()))),
    }
}

/// Order two documents by `sorts`.
pub fn compare(sorts: &[SortKey], a: &Document, b: &Document) -> Ordering {
    for key in sorts {
        let ordering = match &key.target {
            FieldRef::Id => a.id.cmp(&b.id),
            FieldRef::Created => a.created.cmp(&b.created),
            FieldRef::Changed => a.changed.cmp(&b.changed),
            FieldRef::IsActive => a.is_active.cmp(&b.is_active),
            FieldRef::Data(name) => json_order(a.fields.get(name), b.fields.get(name)),
        };
        let ordering = match key.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
