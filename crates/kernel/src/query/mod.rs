//! Query composition.
//!
//! This module provides:
//! - ParamBag: untrusted request parameters
//! - QueryBuilder: filter/sort/field-select/paginate into a [`QueryPlan`]
//! - eval: in-process plan evaluation for the memory store
//! - sql: SeaQuery-based SQL generation for the Postgres store

mod builder;
pub mod eval;
mod params;
pub mod sql;
pub mod types;

pub use builder::{QueryBuilder, RESERVED_PARAMS, is_valid_identifier};
pub use params::ParamBag;
pub use types::{
    CollectionSchema, CompareOp, FieldKind, FieldRef, FieldSpec, FilterValue, Pagination,
    Predicate, Projection, QueryPlan, SortDirection, SortKey,
};
