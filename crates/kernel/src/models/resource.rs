//! Input validation shared by every resource.
//!
//! A [`Validator`] copies only the keys it is asked to check from the
//! client body into a clean field map, so anything not named (derived
//! fields, base keys, unknown keys) never reaches storage.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Email shape check.
///
/// # Panics
///
/// Panics if the hard-coded regex literal is invalid (impossible in practice).
#[allow(clippy::expect_used)]
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .expect("valid regex literal")
});

/// Character bounds with their messages.
#[derive(Debug, Clone, Copy)]
pub struct Length {
    pub min: usize,
    pub max: usize,
    pub too_short: &'static str,
    pub too_long: &'static str,
}

impl Length {
    pub const fn new(
        min: usize,
        max: usize,
        too_short: &'static str,
        too_long: &'static str,
    ) -> Self {
        Self {
            min,
            max,
            too_short,
            too_long,
        }
    }
}

/// Whether missing required fields are violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Update,
}

/// Collects clean fields and violation messages.
pub struct Validator<'a> {
    input: &'a Map<String, Value>,
    mode: Mode,
    fields: Map<String, Value>,
    errors: Vec<String>,
}

impl<'a> Validator<'a> {
    pub fn new(input: &'a Map<String, Value>, mode: Mode) -> Self {
        Self {
            input,
            mode,
            fields: Map::new(),
            errors: Vec::new(),
        }
    }

    pub fn create(input: &'a Map<String, Value>) -> Self {
        Self::new(input, Mode::Create)
    }

    pub fn update(input: &'a Map<String, Value>) -> Self {
        Self::new(input, Mode::Update)
    }

    /// The raw value, treating `null` as absent. Records the required
    /// message when the key is missing on create (or nulled on update).
    fn present(&mut self, key: &str, required: Option<&'static str>) -> Option<&'a Value> {
        let input = self.input;
        match input.get(key) {
            Some(Value::Null) | None => {
                let nulled = input.contains_key(key);
                if let Some(message) = required
                    && (self.mode == Mode::Create || nulled)
                {
                    self.errors.push(message.to_string());
                }
                None
            }
            Some(value) => Some(value),
        }
    }

    fn fail(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Trimmed string, optionally bounded.
    pub fn text(
        &mut self,
        key: &str,
        required: Option<&'static str>,
        length: Option<Length>,
    ) -> &mut Self {
        let Some(value) = self.present(key, required) else {
            return self;
        };
        let Some(text) = value.as_str().map(str::trim) else {
            self.fail(format!("{key} must be a string"));
            return self;
        };
        if text.is_empty() {
            if let Some(message) = required {
                self.fail(message);
            }
            return self;
        }
        if let Some(length) = length {
            let chars = text.chars().count();
            if chars < length.min {
                self.fail(length.too_short);
                return self;
            }
            if chars > length.max {
                self.fail(length.too_long);
                return self;
            }
        }
        self.fields.insert(key.to_string(), Value::String(text.to_string()));
        self
    }

    /// Email address, stored lowercased.
    pub fn email(
        &mut self,
        key: &str,
        required: Option<&'static str>,
        invalid: &'static str,
    ) -> &mut Self {
        let Some(value) = self.present(key, required) else {
            return self;
        };
        match value.as_str().map(str::trim) {
            Some(text) if EMAIL.is_match(text) => {
                self.fields
                    .insert(key.to_string(), Value::String(text.to_lowercase()));
            }
            _ => self.fail(invalid),
        }
        self
    }

    /// Whole number within `[min.0, max.0]`. Numeric strings are accepted.
    pub fn integer(
        &mut self,
        key: &str,
        required: Option<&'static str>,
        min: (i64, &'static str),
        max: (i64, &'static str),
    ) -> &mut Self {
        let Some(value) = self.present(key, required) else {
            return self;
        };
        let parsed = match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        match parsed {
            None => self.fail(format!("{key} must be a whole number")),
            Some(n) if n < min.0 => self.fail(min.1),
            Some(n) if n > max.0 => self.fail(max.1),
            Some(n) => {
                self.fields.insert(key.to_string(), Value::from(n));
            }
        }
        self
    }

    /// Calendar date, stored as `YYYY-MM-DD`. RFC 3339 instants keep their
    /// date part.
    pub fn date(&mut self, key: &str, required: Option<&'static str>) -> &mut Self {
        let Some(value) = self.present(key, required) else {
            return self;
        };
        match value.as_str().map(str::trim).and_then(parse_date) {
            Some(date) => {
                self.fields
                    .insert(key.to_string(), Value::String(date.to_string()));
            }
            None => self.fail(format!("{key} must be a valid date (YYYY-MM-DD)")),
        }
        self
    }

    /// Reference to another record.
    pub fn reference(&mut self, key: &str, required: Option<&'static str>) -> &mut Self {
        let Some(value) = self.present(key, required) else {
            return self;
        };
        match value.as_str().and_then(|s| Uuid::parse_str(s.trim()).ok()) {
            Some(id) => {
                self.fields
                    .insert(key.to_string(), Value::String(id.to_string()));
            }
            None => self.fail(format!("{key} must be a valid id")),
        }
        self
    }

    /// Non-empty list of references. A single id is accepted as a list of one.
    pub fn references(&mut self, key: &str, required: Option<&'static str>) -> &mut Self {
        let Some(value) = self.present(key, required) else {
            return self;
        };
        let items: Vec<&Value> = match value {
            Value::Array(items) => items.iter().collect(),
            single => vec![single],
        };

        let mut ids: Vec<Value> = Vec::with_capacity(items.len());
        for item in items {
            let Some(id) = item.as_str().and_then(|s| Uuid::parse_str(s.trim()).ok()) else {
                self.fail(format!("{key} must contain valid ids"));
                return self;
            };
            let id = Value::String(id.to_string());
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        if ids.is_empty() {
            if let Some(message) = required {
                self.fail(message);
            }
            return self;
        }
        self.fields.insert(key.to_string(), Value::Array(ids));
        self
    }

    /// List of strings. A comma-separated string is split.
    pub fn string_list(&mut self, key: &str, required: Option<&'static str>) -> &mut Self {
        let Some(value) = self.present(key, required) else {
            return self;
        };
        let items: Option<Vec<String>> = match value {
            Value::Array(items) => items
                .iter()
                .map(|v| v.as_str().map(|s| s.trim().to_string()))
                .collect(),
            Value::String(s) => Some(s.split(',').map(|p| p.trim().to_string()).collect()),
            _ => None,
        };
        match items {
            Some(items) => {
                let items: Vec<Value> = items
                    .into_iter()
                    .filter(|s| !s.is_empty())
                    .map(Value::String)
                    .collect();
                if items.is_empty()
                    && let Some(message) = required
                {
                    self.fail(message);
                    return self;
                }
                self.fields.insert(key.to_string(), Value::Array(items));
            }
            None => self.fail(format!("{key} must be a list of strings")),
        }
        self
    }

    pub fn boolean(&mut self, key: &str) -> &mut Self {
        let Some(value) = self.present(key, None) else {
            return self;
        };
        match value {
            Value::Bool(b) => {
                self.fields.insert(key.to_string(), Value::Bool(*b));
            }
            _ => self.fail(format!("{key} must be true or false")),
        }
        self
    }

    /// One of a closed set of strings.
    pub fn one_of(&mut self, key: &str, allowed: &[&str], message: &'static str) -> &mut Self {
        let Some(value) = self.present(key, None) else {
            return self;
        };
        match value.as_str() {
            Some(s) if allowed.contains(&s) => {
                self.fields.insert(key.to_string(), Value::String(s.to_string()));
            }
            _ => self.fail(message),
        }
        self
    }

    /// Reject the body outright if any of `keys` is present.
    pub fn forbid(&mut self, keys: &[&str], message: &'static str) -> &mut Self {
        if keys.iter().any(|k| self.input.contains_key(*k)) {
            self.fail(message);
        }
        self
    }

    /// Fill `key` on create when the client left it out.
    pub fn default_value(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        if self.mode == Mode::Create && !self.fields.contains_key(key) {
            self.fields.insert(key.to_string(), value.into());
        }
        self
    }

    /// Clean fields, or every collected violation.
    pub fn finish(&mut self) -> AppResult<Map<String, Value>> {
        if self.errors.is_empty() {
            Ok(std::mem::take(&mut self.fields))
        } else {
            Err(AppError::ValidationFailed(std::mem::take(&mut self.errors)))
        }
    }
}

/// Borrow a request body as an object.
pub fn body_object(body: &Value) -> AppResult<&Map<String, Value>> {
    body.as_object()
        .ok_or_else(|| AppError::invalid("Request body must be a JSON object"))
}

/// Parse a path id.
pub fn parse_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::MalformedQuery(format!("Invalid id: {raw}")))
}

/// Lowercase, hyphen-separated form of a title.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive()))
}
