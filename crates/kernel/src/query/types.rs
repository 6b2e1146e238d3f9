//! Query plan types.
//!
//! A [`QueryPlan`] is the composed, not-yet-executed description of a read:
//! - predicates over base columns or document fields
//! - sort keys in priority order
//! - a projection applied when records are rendered
//! - optional pagination (always present for client-built plans)

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Value type of a filterable document field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Free text, compared as strings.
    Text,
    /// Integer or decimal number.
    Number,
    /// `true` / `false`.
    Bool,
    /// Reference to another record by UUID.
    Ref,
    /// Calendar date stored as `YYYY-MM-DD`.
    Date,
    /// Unix-millisecond timestamp column.
    Timestamp,
}

impl FieldKind {
    /// Whether range comparisons are meaningful for this kind.
    pub fn is_ordered(self) -> bool {
        matches!(
            self,
            FieldKind::Text | FieldKind::Number | FieldKind::Date | FieldKind::Timestamp
        )
    }
}

/// One entry in a collection's filter/sort allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// Static description of a queryable collection.
#[derive(Debug, Clone, Copy)]
pub struct CollectionSchema {
    /// Storage collection name.
    pub collection: &'static str,

    /// Plural key used in response envelopes (`data.<plural>`).
    pub plural: &'static str,

    /// Singular key used in response envelopes (`data.<singular>`).
    pub singular: &'static str,

    /// Human label used in error messages.
    pub label: &'static str,

    /// Document fields clients may filter and sort on.
    pub fields: &'static [FieldSpec],
}

impl CollectionSchema {
    /// Look up an allow-listed document field.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// What a predicate or sort key addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRef {
    Id,
    Created,
    Changed,
    IsActive,
    /// A key inside the document's field map.
    Data(String),
}

impl FieldRef {
    /// Name as exposed in rendered documents.
    pub fn public_name(&self) -> &str {
        match self {
            FieldRef::Id => "id",
            FieldRef::Created => "createdAt",
            FieldRef::Changed => "lastUpdatedAt",
            FieldRef::IsActive => "isActive",
            FieldRef::Data(name) => name,
        }
    }
}

/// Approved comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    /// Parse a nested comparison key (`rating[gt]=3`). Only the bare
    /// four range keys are recognized.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "gt" => Some(CompareOp::Gt),
            "gte" => Some(CompareOp::Gte),
            "lt" => Some(CompareOp::Lt),
            "lte" => Some(CompareOp::Lte),
            _ => None,
        }
    }

    /// Test an ordering result against this operator.
    pub fn accepts(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};
        match self {
            CompareOp::Eq => ordering == Equal,
            CompareOp::Gt => ordering == Greater,
            CompareOp::Gte => ordering != Less,
            CompareOp::Lt => ordering == Less,
            CompareOp::Lte => ordering != Greater,
        }
    }
}

/// A typed comparison operand.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Scalar JSON value compared against a document field.
    Json(Value),
    /// Record identifier.
    Id(Uuid),
    /// Unix milliseconds.
    Timestamp(i64),
    /// Activation flag.
    Flag(bool),
}

/// A single filter condition. Conditions in a plan are ANDed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Predicate {
    pub target: FieldRef,
    pub op: CompareOp,
    pub value: FilterValue,
}

impl Predicate {
    /// Equality on a document field, for internal lookups.
    pub fn field_eq(name: &str, value: impl Into<Value>) -> Self {
        Self {
            target: FieldRef::Data(name.to_string()),
            op: CompareOp::Eq,
            value: FilterValue::Json(value.into()),
        }
    }

    /// Only active records.
    pub fn active() -> Self {
        Self {
            target: FieldRef::IsActive,
            op: CompareOp::Eq,
            value: FilterValue::Flag(true),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One sort key; keys apply in left-to-right priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortKey {
    pub target: FieldRef,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(target: FieldRef) -> Self {
        Self {
            target,
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(target: FieldRef) -> Self {
        Self {
            target,
            direction: SortDirection::Desc,
        }
    }
}

/// Field selection applied when documents are rendered.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    /// Everything except the internal `version` counter.
    #[default]
    Default,
    /// `id` plus the listed keys.
    Only(Vec<String>),
}

/// Offset pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// 1-based page number.
    pub page: u64,
    pub limit: u64,
}

impl Pagination {
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

/// Composed read over one collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPlan {
    pub collection: String,
    pub predicates: Vec<Predicate>,
    pub sorts: Vec<SortKey>,
    pub projection: Projection,
    pub pagination: Option<Pagination>,
}

impl QueryPlan {
    /// Unpaginated internal read of every record matching `predicates`,
    /// newest first.
    pub fn matching(collection: &str, predicates: Vec<Predicate>) -> Self {
        Self {
            collection: collection.to_string(),
            predicates,
            sorts: vec![SortKey::desc(FieldRef::Created), SortKey::asc(FieldRef::Id)],
            projection: Projection::Default,
            pagination: None,
        }
    }

    /// Cap an internal plan at `limit` records.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.pagination = Some(Pagination { page: 1, limit });
        self
    }
}
