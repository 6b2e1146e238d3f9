//! Untyped request parameter bag.
//!
//! Mirrors what a query-string decoder hands to a list handler: a flat map
//! of keys to strings, where bracketed keys (`rating[gt]=3`) nest one level.

use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};

/// Request parameters as a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamBag(Map<String, Value>);

impl ParamBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a URL query string. Repeated keys keep the last value.
    pub fn from_query_str(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut map = Map::new();

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match split_key(&key) {
                Some((base, segments)) => insert_path(&mut map, base, &segments, value.into_owned()),
                None => {
                    map.insert(key.into_owned(), Value::String(value.into_owned()));
                }
            }
        }

        Self(map)
    }

    /// Wrap an already-decoded JSON object.
    pub fn from_json(value: Value) -> AppResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(AppError::MalformedQuery(format!(
                "query parameters must be an object, got {other}"
            ))),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Scalar value for a key. Arrays yield their last element.
    pub fn get_str(&self, key: &str) -> Option<String> {
        scalar_text(self.0.get(key)?)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Render a scalar JSON value as the text a query string would carry.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => items.last().and_then(scalar_text),
        _ => None,
    }
}

/// Split `a[b][c]` into (`a`, [`b`, `c`]). Returns `None` for plain keys
/// and for unbalanced brackets, which are then kept verbatim.
fn split_key(key: &str) -> Option<(String, Vec<String>)> {
    let open = key.find('[')?;
    let base = &key[..open];
    if base.is_empty() {
        return None;
    }

    let mut rest = &key[open..];
    let mut segments = Vec::new();
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        segments.push(inner[..close].to_string());
        rest = &inner[close + 1..];
    }

    Some((base.to_string(), segments))
}

fn insert_path(map: &mut Map<String, Value>, key: String, segments: &[String], value: String) {
    match segments.split_first() {
        None => {
            map.insert(key, Value::String(value));
        }
        Some((head, tail)) => {
            let entry = map
                .entry(key)
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(inner) = entry {
                insert_path(inner, head.clone(), tail, value);
            }
        }
    }
}
