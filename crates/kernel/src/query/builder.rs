//! Turns an untrusted [`ParamBag`] into a [`QueryPlan`].
//!
//! Each transformation (`filter`, `sort`, `limit_fields`, `paginate`) writes
//! its own slot and reads only the parameter bag, so call order does not
//! affect the resulting plan. `build` fills any slot that was never set with
//! its default.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use serde_json::{Number, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use super::params::{ParamBag, scalar_text};
use super::types::{
    CollectionSchema, CompareOp, FieldKind, FieldRef, FilterValue, Pagination, Predicate,
    Projection, QueryPlan, SortDirection, SortKey,
};
use crate::config::QueryLimits;
use crate::error::{AppError, AppResult};

/// Parameters consumed by the builder itself rather than treated as filters.
pub const RESERVED_PARAMS: &[&str] = &["sort", "limit", "fields", "page"];

/// Regex for valid field identifiers.
///
/// # Panics
///
/// Panics if the hard-coded regex literal is invalid (impossible in practice).
#[allow(clippy::expect_used)]
static VALID_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("valid regex literal"));

/// Check that a name is safe to embed as a JSON key in generated SQL.
pub fn is_valid_identifier(name: &str) -> bool {
    VALID_IDENTIFIER.is_match(name)
}

/// Request-scoped query composer.
pub struct QueryBuilder<'a> {
    schema: &'a CollectionSchema,
    params: &'a ParamBag,
    limits: QueryLimits,
    base: Vec<Predicate>,
    filters: Option<Vec<Predicate>>,
    sorts: Option<Vec<SortKey>>,
    projection: Option<Projection>,
    pagination: Option<Pagination>,
}

impl<'a> QueryBuilder<'a> {
    /// Start an empty query over `schema`'s collection.
    pub fn new(schema: &'a CollectionSchema, params: &'a ParamBag, limits: QueryLimits) -> Self {
        Self {
            schema,
            params,
            limits,
            base: Vec::new(),
            filters: None,
            sorts: None,
            projection: None,
            pagination: None,
        }
    }

    /// Add a trusted predicate that always applies (e.g. the parent of a
    /// nested listing). Client filters are ANDed with it.
    pub fn with_base_filter(mut self, predicate: Predicate) -> Self {
        self.base.push(predicate);
        self
    }

    /// Translate every non-reserved parameter into a predicate.
    pub fn filter(mut self) -> AppResult<Self> {
        let mut predicates = Vec::new();

        for (key, value) in self.params.iter() {
            if RESERVED_PARAMS.contains(&key.as_str()) {
                continue;
            }
            let (target, kind) = self.resolve(key)?;

            match value {
                Value::Object(ops) => {
                    for (op_key, operand) in ops {
                        let Some(op) = CompareOp::from_key(op_key) else {
                            warn!(field = %key, operator = %op_key, "rejected filter operator");
                            return Err(AppError::MalformedQuery(format!(
                                "Unsupported operator '{op_key}' on field '{key}'"
                            )));
                        };
                        let text = scalar_text(operand).ok_or_else(|| {
                            AppError::MalformedQuery(format!(
                                "Filter on '{key}' is nested too deeply"
                            ))
                        })?;
                        predicates.push(build_predicate(key, &target, kind, op, &text)?);
                    }
                }
                other => {
                    let text = scalar_text(other).ok_or_else(|| {
                        AppError::MalformedQuery(format!("Invalid filter value for '{key}'"))
                    })?;
                    predicates.push(build_predicate(key, &target, kind, CompareOp::Eq, &text)?);
                }
            }
        }

        self.filters = Some(predicates);
        Ok(self)
    }

    /// Parse `sort=-a,b`. Absent or empty means newest first.
    pub fn sort(mut self) -> AppResult<Self> {
        let mut keys = Vec::new();

        if let Some(raw) = self.params.get_str("sort") {
            for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                let (direction, name) = match token.strip_prefix('-') {
                    Some(rest) => (SortDirection::Desc, rest),
                    None => (SortDirection::Asc, token.strip_prefix('+').unwrap_or(token)),
                };
                let (target, _) = self.resolve(name)?;
                keys.push(SortKey { target, direction });
            }
        }

        if keys.is_empty() {
            keys.push(SortKey::desc(FieldRef::Created));
        }

        self.sorts = Some(keys);
        Ok(self)
    }

    /// Parse `fields=a,b` into a projection.
    pub fn limit_fields(mut self) -> AppResult<Self> {
        let mut names = Vec::new();

        if let Some(raw) = self.params.get_str("fields") {
            for name in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                if !is_valid_identifier(name) {
                    return Err(AppError::MalformedQuery(format!(
                        "Invalid field name '{name}'"
                    )));
                }
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }

        self.projection = Some(if names.is_empty() {
            Projection::Default
        } else {
            Projection::Only(names)
        });
        Ok(self)
    }

    /// Parse `page` / `limit`, falling back to defaults and clamping the
    /// page size to the configured maximum.
    pub fn paginate(mut self) -> Self {
        let page = parse_positive(self.params.get_str("page")).unwrap_or(1);
        let limit = parse_positive(self.params.get_str("limit"))
            .unwrap_or(self.limits.default_limit)
            .min(self.limits.max_limit);

        self.pagination = Some(Pagination { page, limit });
        self
    }

    /// Finish the plan. Unset slots take their defaults.
    pub fn build(self) -> AppResult<QueryPlan> {
        let builder = if self.filters.is_none() { self.filter()? } else { self };
        let builder = if builder.sorts.is_none() { builder.sort()? } else { builder };
        let builder = if builder.projection.is_none() {
            builder.limit_fields()?
        } else {
            builder
        };
        let builder = if builder.pagination.is_none() {
            builder.paginate()
        } else {
            builder
        };

        let mut predicates = builder.base;
        predicates.extend(builder.filters.unwrap_or_default());

        let mut sorts = builder.sorts.unwrap_or_default();
        if !sorts.iter().any(|s| s.target == FieldRef::Id) {
            sorts.push(SortKey::asc(FieldRef::Id));
        }

        let plan = QueryPlan {
            collection: builder.schema.collection.to_string(),
            predicates,
            sorts,
            projection: builder.projection.unwrap_or_default(),
            pagination: builder.pagination,
        };

        debug!(collection = %plan.collection, predicates = plan.predicates.len(), "query plan built");
        Ok(plan)
    }

    /// Map a public field name onto a target and its kind.
    fn resolve(&self, name: &str) -> AppResult<(FieldRef, FieldKind)> {
        match name {
            "id" | "_id" => Ok((FieldRef::Id, FieldKind::Ref)),
            "createdAt" => Ok((FieldRef::Created, FieldKind::Timestamp)),
            "lastUpdatedAt" => Ok((FieldRef::Changed, FieldKind::Timestamp)),
            "isActive" => Ok((FieldRef::IsActive, FieldKind::Bool)),
            _ => {
                if !is_valid_identifier(name) {
                    return Err(AppError::MalformedQuery(format!(
                        "Invalid field name '{name}'"
                    )));
                }
                let spec = self.schema.field(name).ok_or_else(|| {
                    AppError::MalformedQuery(format!(
                        "Field '{name}' can not be used to query {}",
                        self.schema.plural
                    ))
                })?;
                Ok((FieldRef::Data(spec.name.to_string()), spec.kind))
            }
        }
    }
}

fn parse_positive(raw: Option<String>) -> Option<u64> {
    raw?.trim().parse::<u64>().ok().filter(|n| *n > 0)
}

fn build_predicate(
    key: &str,
    target: &FieldRef,
    kind: FieldKind,
    op: CompareOp,
    text: &str,
) -> AppResult<Predicate> {
    if op != CompareOp::Eq && !kind.is_ordered() {
        return Err(AppError::MalformedQuery(format!(
            "Operator '{}' is not supported on field '{key}'",
            op_name(op)
        )));
    }

    let invalid = || AppError::MalformedQuery(format!("Invalid {key}: {text}"));
    let text = text.trim();

    let value = match (target, kind) {
        (FieldRef::Id, _) => FilterValue::Id(Uuid::parse_str(text).map_err(|_| invalid())?),
        (FieldRef::IsActive, _) => FilterValue::Flag(parse_bool(text).ok_or_else(invalid)?),
        (FieldRef::Created | FieldRef::Changed, _) => {
            FilterValue::Timestamp(parse_timestamp(text).ok_or_else(invalid)?)
        }
        (FieldRef::Data(_), FieldKind::Text) => FilterValue::Json(Value::String(text.to_string())),
        (FieldRef::Data(_), FieldKind::Number) => {
            FilterValue::Json(Value::Number(parse_number(text).ok_or_else(invalid)?))
        }
        (FieldRef::Data(_), FieldKind::Bool) => {
            FilterValue::Json(Value::Bool(parse_bool(text).ok_or_else(invalid)?))
        }
        (FieldRef::Data(_), FieldKind::Ref) => {
            let id = Uuid::parse_str(text).map_err(|_| invalid())?;
            FilterValue::Json(Value::String(id.to_string()))
        }
        (FieldRef::Data(_), FieldKind::Date) => {
            let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| invalid())?;
            FilterValue::Json(Value::String(date.to_string()))
        }
        (FieldRef::Data(_), FieldKind::Timestamp) => {
            FilterValue::Json(Value::from(parse_timestamp(text).ok_or_else(invalid)?))
        }
    };

    Ok(Predicate {
        target: target.clone(),
        op,
        value,
    })
}

fn op_name(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "eq",
        CompareOp::Gt => "gt",
        CompareOp::Gte => "gte",
        CompareOp::Lt => "lt",
        CompareOp::Lte => "lte",
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn parse_number(text: &str) -> Option<Number> {
    if let Ok(i) = text.parse::<i64>() {
        return Some(Number::from(i));
    }
    text.parse::<f64>().ok().and_then(Number::from_f64)
}

/// Unix milliseconds, an RFC 3339 instant, or a `YYYY-MM-DD` date (midnight UTC).
fn parse_timestamp(text: &str) -> Option<i64> {
    if let Ok(ms) = text.parse::<i64>() {
        return Some(ms);
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc().timestamp_millis())
}
