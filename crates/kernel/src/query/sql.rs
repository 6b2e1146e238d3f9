//! Plan compilation to PostgreSQL using SeaQuery.
//!
//! Documents live in one `document` table with a JSONB `fields` column.
//! Field predicates compare `jsonb` values directly so no cast can fail:
//! - equality uses `@>`, which also covers membership in array fields
//! - ranges are guarded by `jsonb_typeof` so only same-typed values compare

use sea_query::extension::postgres::PgBinOper;
use sea_query::{
    Alias, BinOper, Expr, Func, Iden, Order, PostgresQueryBuilder, Query, SelectStatement,
    SimpleExpr,
};
use serde_json::Value;

use super::builder::is_valid_identifier;
use super::types::{CompareOp, FieldRef, FilterValue, Predicate, QueryPlan, SortDirection};

/// Identifiers for the document table.
#[derive(Iden, Clone, Copy)]
pub enum DocumentTable {
    #[iden = "document"]
    Table,
    Id,
    Collection,
    Fields,
    IsActive,
    Created,
    Changed,
    Version,
}

/// Column list shared by every statement that returns documents.
pub const DOCUMENT_COLUMNS: &str = "id, collection, fields, is_active, created, changed, version";

/// Build the SELECT for a plan.
pub fn select_sql(plan: &QueryPlan) -> String {
    let mut query = Query::select();
    query
        .columns([
            DocumentTable::Id,
            DocumentTable::Collection,
            DocumentTable::Fields,
            DocumentTable::IsActive,
            DocumentTable::Created,
            DocumentTable::Changed,
            DocumentTable::Version,
        ])
        .from(DocumentTable::Table);

    add_filters(&mut query, plan);
    add_sorts(&mut query, plan);

    if let Some(page) = plan.pagination {
        query.limit(page.limit);
        query.offset(page.offset());
    }

    query.to_string(PostgresQueryBuilder)
}

fn add_filters(query: &mut SelectStatement, plan: &QueryPlan) {
    query.and_where(Expr::col(DocumentTable::Collection).eq(plan.collection.as_str()));
    for predicate in &plan.predicates {
        query.and_where(predicate_expr(predicate));
    }
}

fn add_sorts(query: &mut SelectStatement, plan: &QueryPlan) {
    for sort in &plan.sorts {
        let order = match sort.direction {
            SortDirection::Asc => Order::Asc,
            SortDirection::Desc => Order::Desc,
        };
        match &sort.target {
            FieldRef::Id => {
                query.order_by(DocumentTable::Id, order);
            }
            FieldRef::Created => {
                query.order_by(DocumentTable::Created, order);
            }
            FieldRef::Changed => {
                query.order_by(DocumentTable::Changed, order);
            }
            FieldRef::IsActive => {
                query.order_by(DocumentTable::IsActive, order);
            }
            FieldRef::Data(name) if is_valid_identifier(name) => {
                query.order_by_expr(field_expr(name), order);
            }
            FieldRef::Data(name) => {
                tracing::warn!(field = %name, "skipping sort on invalid field name");
            }
        }
    }
}

/// Build a single WHERE condition.
fn predicate_expr(predicate: &Predicate) -> SimpleExpr {
    let op = bin_oper(predicate.op);
    match (&predicate.target, &predicate.value) {
        (FieldRef::Id, FilterValue::Id(id)) => {
            binary(Expr::col(DocumentTable::Id).into(), op, (*id).into())
        }
        (FieldRef::Created, FilterValue::Timestamp(ts)) => {
            binary(Expr::col(DocumentTable::Created).into(), op, (*ts).into())
        }
        (FieldRef::Changed, FilterValue::Timestamp(ts)) => {
            binary(Expr::col(DocumentTable::Changed).into(), op, (*ts).into())
        }
        (FieldRef::IsActive, FilterValue::Flag(flag)) => {
            binary(Expr::col(DocumentTable::IsActive).into(), op, (*flag).into())
        }
        (FieldRef::Data(name), FilterValue::Json(value)) if is_valid_identifier(name) => {
            json_predicate(name, predicate.op, value)
        }
        _ => {
            tracing::error!(?predicate, "unsupported predicate; restricting results");
            // Restrict rather than widen query results
            Expr::cust("FALSE")
        }
    }
}

fn json_predicate(name: &str, op: CompareOp, value: &Value) -> SimpleExpr {
    let operand = jsonb_literal(value);

    if op == CompareOp::Eq {
        return binary(
            field_expr(name),
            BinOper::PgOperator(PgBinOper::Contains),
            operand,
        );
    }

    let guard = Expr::cust(format!(
        "jsonb_typeof(\"fields\" -> '{name}') = '{}'",
        jsonb_type(value)
    ));
    binary(guard, BinOper::And, binary(field_expr(name), bin_oper(op), operand))
}

/// `("fields" -> '<name>')`. Callers validate `name` first.
fn field_expr(name: &str) -> SimpleExpr {
    Expr::cust(format!("(\"fields\" -> '{name}')"))
}

fn jsonb_literal(value: &Value) -> SimpleExpr {
    SimpleExpr::FunctionCall(Func::cast_as(value.to_string(), Alias::new("jsonb")))
}

fn jsonb_type(value: &Value) -> &'static str {
    match value {
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
        Value::Null => "null",
        Value::String(_) => "string",
    }
}

fn bin_oper(op: CompareOp) -> BinOper {
    match op {
        CompareOp::Eq => BinOper::Equal,
        CompareOp::Gt => BinOper::GreaterThan,
        CompareOp::Gte => BinOper::GreaterThanOrEqual,
        CompareOp::Lt => BinOper::SmallerThan,
        CompareOp::Lte => BinOper::SmallerThanOrEqual,
    }
}

fn binary(lhs: SimpleExpr, op: BinOper, rhs: SimpleExpr) -> SimpleExpr {
    SimpleExpr::Binary(Box::new(lhs), op, Box::new(rhs))
}
