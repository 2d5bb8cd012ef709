//! Expression builders: comparisons, boolean combinators, ordering and
//! aggregates.
//!
//! Right-hand values are bound as parameters. When the left-hand side is a
//! plain column, values are encoded with that column's codec.
//!
//! ```ignore
//! use sqlweave::expr::{and, eq, gt};
//!
//! let cond = and([eq(&users["name"], "ann"), gt(&users["age"], 18)]);
//! // ("users"."name" = $1 and "users"."age" > $2)
//! ```

use crate::column::{Column, ColumnType, Decoder};
use crate::sql::Sql;
use crate::value::Value;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Operand of an expression builder.
#[derive(Debug, Clone)]
pub enum Operand {
    Sql(Sql),
    Value(Value),
    Placeholder(String),
}

/// Conversion into an [`Operand`].
pub trait IntoOperand {
    fn into_operand(self) -> Operand;
}

impl IntoOperand for Operand {
    fn into_operand(self) -> Operand {
        self
    }
}

impl IntoOperand for Sql {
    fn into_operand(self) -> Operand {
        Operand::Sql(self)
    }
}

impl IntoOperand for &Sql {
    fn into_operand(self) -> Operand {
        Operand::Sql(self.clone())
    }
}

impl IntoOperand for Arc<Column> {
    fn into_operand(self) -> Operand {
        Operand::Sql(Sql::column(&self))
    }
}

impl IntoOperand for &Arc<Column> {
    fn into_operand(self) -> Operand {
        Operand::Sql(Sql::column(self))
    }
}

/// Deferred parameter created by [`sql_placeholder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder(pub String);

impl IntoOperand for Placeholder {
    fn into_operand(self) -> Operand {
        Operand::Placeholder(self.0)
    }
}

impl From<Placeholder> for Sql {
    fn from(placeholder: Placeholder) -> Self {
        Sql::placeholder(placeholder.0)
    }
}

macro_rules! impl_value_operand {
    ($($t:ty),* $(,)?) => {
        $(
            impl IntoOperand for $t {
                fn into_operand(self) -> Operand {
                    Operand::Value(Value::from(self))
                }
            }
        )*
    };
}

impl_value_operand!(
    Value,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    f32,
    f64,
    bool,
    &str,
    String,
    Vec<u8>,
    serde_json::Value,
    DateTime<Utc>,
    Uuid,
);

impl<T: Into<Value>> IntoOperand for Option<T> {
    fn into_operand(self) -> Operand {
        Operand::Value(Value::from(self))
    }
}

/// A named parameter whose value is supplied at execution time.
pub fn sql_placeholder(name: impl Into<String>) -> Placeholder {
    Placeholder(name.into())
}

/// Render an operand, binding values with `encoder`'s codec.
fn bind(operand: Operand, encoder: Option<&Arc<Column>>) -> Sql {
    match (operand, encoder) {
        (Operand::Sql(sql), _) => sql,
        (Operand::Value(value), Some(column)) => Sql::param_for(value, column),
        (Operand::Value(value), None) => Sql::param(value),
        (Operand::Placeholder(name), Some(column)) => Sql::placeholder_for(name, column),
        (Operand::Placeholder(name), None) => Sql::placeholder(name),
    }
}

/// An operand on its own, values bound without a codec.
pub(crate) fn operand_sql(operand: impl IntoOperand) -> Sql {
    bind(operand.into_operand(), None)
}

fn binary(left: impl IntoOperand, op: &str, right: impl IntoOperand) -> Sql {
    let left = bind(left.into_operand(), None);
    let encoder = left.as_column().cloned();
    let right = bind(right.into_operand(), encoder.as_ref());
    let mut sql = Sql::empty();
    sql.append(left).push_raw(op);
    sql.append(right);
    sql
}

pub fn eq(left: impl IntoOperand, right: impl IntoOperand) -> Sql {
    binary(left, " = ", right)
}

pub fn ne(left: impl IntoOperand, right: impl IntoOperand) -> Sql {
    binary(left, " <> ", right)
}

pub fn gt(left: impl IntoOperand, right: impl IntoOperand) -> Sql {
    binary(left, " > ", right)
}

pub fn gte(left: impl IntoOperand, right: impl IntoOperand) -> Sql {
    binary(left, " >= ", right)
}

pub fn lt(left: impl IntoOperand, right: impl IntoOperand) -> Sql {
    binary(left, " < ", right)
}

pub fn lte(left: impl IntoOperand, right: impl IntoOperand) -> Sql {
    binary(left, " <= ", right)
}

pub fn like(left: impl IntoOperand, pattern: impl IntoOperand) -> Sql {
    binary(left, " like ", pattern)
}

pub fn not_like(left: impl IntoOperand, pattern: impl IntoOperand) -> Sql {
    binary(left, " not like ", pattern)
}

/// Case-insensitive `like` (Postgres).
pub fn ilike(left: impl IntoOperand, pattern: impl IntoOperand) -> Sql {
    binary(left, " ilike ", pattern)
}

pub fn not_ilike(left: impl IntoOperand, pattern: impl IntoOperand) -> Sql {
    binary(left, " not ilike ", pattern)
}

pub fn is_null(operand: impl IntoOperand) -> Sql {
    let mut sql = bind(operand.into_operand(), None);
    sql.push_raw(" is null");
    sql
}

pub fn is_not_null(operand: impl IntoOperand) -> Sql {
    let mut sql = bind(operand.into_operand(), None);
    sql.push_raw(" is not null");
    sql
}

fn in_list<I>(left: impl IntoOperand, values: I, negate: bool) -> Sql
where
    I: IntoIterator,
    I::Item: IntoOperand,
{
    let left = bind(left.into_operand(), None);
    let encoder = left.as_column().cloned();
    let values: Vec<Sql> = values
        .into_iter()
        .map(|v| bind(v.into_operand(), encoder.as_ref()))
        .collect();

    // `x in ()` is not valid SQL; an empty list matches nothing.
    if values.is_empty() {
        return Sql::raw(if negate { "true" } else { "false" });
    }

    let mut sql = left;
    sql.push_raw(if negate { " not in (" } else { " in (" });
    sql.append(Sql::join(values, ", ")).push_raw(")");
    sql
}

pub fn in_array<I>(left: impl IntoOperand, values: I) -> Sql
where
    I: IntoIterator,
    I::Item: IntoOperand,
{
    in_list(left, values, false)
}

pub fn not_in_array<I>(left: impl IntoOperand, values: I) -> Sql
where
    I: IntoIterator,
    I::Item: IntoOperand,
{
    in_list(left, values, true)
}

fn range(
    operand: impl IntoOperand,
    min: impl IntoOperand,
    max: impl IntoOperand,
    negate: bool,
) -> Sql {
    let left = bind(operand.into_operand(), None);
    let encoder = left.as_column().cloned();
    let mut sql = left;
    sql.push_raw(if negate { " not between " } else { " between " });
    sql.append(bind(min.into_operand(), encoder.as_ref()))
        .push_raw(" and ");
    sql.append(bind(max.into_operand(), encoder.as_ref()));
    sql
}

pub fn between(operand: impl IntoOperand, min: impl IntoOperand, max: impl IntoOperand) -> Sql {
    range(operand, min, max, false)
}

pub fn not_between(
    operand: impl IntoOperand,
    min: impl IntoOperand,
    max: impl IntoOperand,
) -> Sql {
    range(operand, min, max, true)
}

/// `exists (<subquery>)`.
pub fn exists(subquery: Sql) -> Sql {
    let mut sql = Sql::raw("exists ");
    sql.append(subquery.parenthesized());
    sql
}

pub fn not_exists(subquery: Sql) -> Sql {
    let mut sql = Sql::raw("not exists ");
    sql.append(subquery.parenthesized());
    sql
}

fn combine<I>(conditions: I, op: &str) -> Sql
where
    I: IntoIterator,
    I::Item: Into<Option<Sql>>,
{
    let mut parts: Vec<Sql> = conditions
        .into_iter()
        .filter_map(|condition| -> Option<Sql> { condition.into() })
        .filter(|sql| !sql.is_empty())
        .collect();
    match parts.len() {
        0 => Sql::empty(),
        1 => parts.remove(0),
        _ => Sql::join(parts, op).parenthesized(),
    }
}

/// Conjunction; absent and empty conditions are skipped. Returns an empty
/// fragment when nothing remains, which `where_` treats as no clause.
pub fn and<I>(conditions: I) -> Sql
where
    I: IntoIterator,
    I::Item: Into<Option<Sql>>,
{
    combine(conditions, " and ")
}

pub fn or<I>(conditions: I) -> Sql
where
    I: IntoIterator,
    I::Item: Into<Option<Sql>>,
{
    combine(conditions, " or ")
}

pub fn not(condition: Sql) -> Sql {
    let mut sql = Sql::raw("not ");
    sql.append(condition);
    sql
}

pub fn asc(operand: impl IntoOperand) -> Sql {
    let mut sql = bind(operand.into_operand(), None);
    sql.push_raw(" asc");
    sql
}

pub fn desc(operand: impl IntoOperand) -> Sql {
    let mut sql = bind(operand.into_operand(), None);
    sql.push_raw(" desc");
    sql
}

fn aggregate(name: &str, operand: Sql, distinct: bool) -> Sql {
    let mut sql = Sql::raw(name);
    sql.push_raw(if distinct { "(distinct " } else { "(" });
    sql.append(operand).push_raw(")");
    sql
}

fn stringify(value: Value) -> crate::error::WeaveResult<Value> {
    Ok(match value {
        Value::Int(i) => Value::Text(i.to_string()),
        Value::Float(f) => Value::Text(f.to_string()),
        other => other,
    })
}

/// `count(*)`, or `count(<expr>)`; decodes to an integer.
pub fn count(operand: Option<Sql>) -> Sql {
    let sql = match operand {
        Some(operand) => aggregate("count", operand, false),
        None => Sql::raw("count(*)"),
    };
    sql.map_with(ColumnType::Integer)
}

pub fn count_distinct(operand: impl Into<Sql>) -> Sql {
    aggregate("count", operand.into(), true).map_with(ColumnType::Integer)
}

/// `avg(<expr>)`; decodes to text to keep decimal precision.
pub fn avg(operand: impl Into<Sql>) -> Sql {
    aggregate("avg", operand.into(), false).map_with(Decoder::func(stringify))
}

pub fn avg_distinct(operand: impl Into<Sql>) -> Sql {
    aggregate("avg", operand.into(), true).map_with(Decoder::func(stringify))
}

/// `sum(<expr>)`; decodes to text to keep decimal precision.
pub fn sum(operand: impl Into<Sql>) -> Sql {
    aggregate("sum", operand.into(), false).map_with(Decoder::func(stringify))
}

pub fn sum_distinct(operand: impl Into<Sql>) -> Sql {
    aggregate("sum", operand.into(), true).map_with(Decoder::func(stringify))
}

fn extremum(name: &str, operand: Sql) -> Sql {
    let decoder = operand.decoder().cloned();
    let sql = aggregate(name, operand, false);
    match decoder {
        Some(decoder) => sql.map_with(decoder),
        None => sql,
    }
}

/// `max(<expr>)`; decodes with the operand's codec.
pub fn max(operand: impl Into<Sql>) -> Sql {
    extremum("max", operand.into())
}

/// `min(<expr>)`; decodes with the operand's codec.
pub fn min(operand: impl Into<Sql>) -> Sql {
    extremum("min", operand.into())
}
