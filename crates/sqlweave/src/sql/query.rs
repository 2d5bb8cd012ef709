use super::builder::{Chunk, ParamValue, Sql};
use crate::column::Column;
use crate::dialect::Dialect;
use crate::error::{WeaveError, WeaveResult};
use crate::ident;
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// One entry of a rendered parameter list.
#[derive(Debug, Clone)]
pub enum QueryParam {
    /// Driver-ready value (already encoded).
    Value(Value),
    /// Deferred value, encoded with `encoder` once supplied.
    Placeholder {
        name: String,
        encoder: Option<Arc<Column>>,
    },
}

impl PartialEq for QueryParam {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (QueryParam::Value(a), QueryParam::Value(b)) => a == b,
            (QueryParam::Placeholder { name: a, .. }, QueryParam::Placeholder { name: b, .. }) => {
                a == b
            }
            _ => false,
        }
    }
}

/// Rendered SQL text and its ordered parameters.
///
/// Immutable once rendered, so one `Query` can be shared and executed many
/// times.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub sql: String,
    pub params: Vec<QueryParam>,
}

impl Query {
    pub fn has_placeholders(&self) -> bool {
        self.params
            .iter()
            .any(|p| matches!(p, QueryParam::Placeholder { .. }))
    }

    /// Resolve placeholders, producing the final parameter list.
    pub fn bind(&self, placeholders: &Placeholders) -> WeaveResult<BoundQuery> {
        let params = self
            .params
            .iter()
            .map(|param| match param {
                QueryParam::Value(value) => Ok(value.clone()),
                QueryParam::Placeholder { name, encoder } => {
                    let value = placeholders
                        .get(name)
                        .cloned()
                        .ok_or_else(|| WeaveError::MissingPlaceholder(name.clone()))?;
                    match encoder {
                        Some(column) => column.encode(value),
                        None => Ok(value),
                    }
                }
            })
            .collect::<WeaveResult<Vec<_>>>()?;

        Ok(BoundQuery {
            sql: self.sql.clone(),
            params,
        })
    }
}

/// SQL text plus driver values, ready for a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

impl BoundQuery {
    /// A statement without parameters.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }
}

/// Named values for [`Sql::placeholder`] parameters.
#[derive(Debug, Clone, Default)]
pub struct Placeholders(HashMap<String, Value>);

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParamMode {
    Bind,
    Inline,
}

pub(crate) fn render(sql: &Sql, dialect: &dyn Dialect, mode: ParamMode) -> WeaveResult<Query> {
    let mut out = String::new();
    let mut params = Vec::new();

    for chunk in sql.chunks() {
        match chunk {
            Chunk::Raw(text) => out.push_str(text),
            Chunk::Name(name) => {
                ident::validate(name)?;
                dialect.write_name(&mut out, name);
            }
            Chunk::Column(column) => {
                ident::validate(&column.table).map_err(|_| {
                    WeaveError::render(format!(
                        "column '{}' is not attached to a relation",
                        column.name
                    ))
                })?;
                ident::validate(&column.name)?;
                dialect.write_name(&mut out, &column.table);
                out.push('.');
                dialect.write_name(&mut out, &column.name);
            }
            Chunk::Param(param) => {
                let encoded = match &param.value {
                    ParamValue::Value(value) => {
                        let value = value.clone();
                        QueryParam::Value(match &param.encoder {
                            Some(column) => column.encode(value)?,
                            None => value,
                        })
                    }
                    ParamValue::Placeholder(name) => QueryParam::Placeholder {
                        name: name.clone(),
                        encoder: param.encoder.clone(),
                    },
                };
                match mode {
                    ParamMode::Bind => {
                        params.push(encoded);
                        dialect.write_param(&mut out, params.len());
                    }
                    ParamMode::Inline => match encoded {
                        QueryParam::Value(value) => write_literal(&mut out, dialect, &value)?,
                        QueryParam::Placeholder { name, .. } => {
                            return Err(WeaveError::render(format!(
                                "placeholder '{name}' cannot be inlined"
                            )));
                        }
                    },
                }
            }
        }
    }

    Ok(Query { sql: out, params })
}

fn write_literal(out: &mut String, dialect: &dyn Dialect, value: &Value) -> WeaveResult<()> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Int(v) => out.push_str(&v.to_string()),
        Value::Float(v) => out.push_str(&v.to_string()),
        Value::Text(v) => out.push_str(&dialect.escape_string(v)),
        Value::Json(v) => out.push_str(&dialect.escape_string(&v.to_string())),
        Value::Timestamp(v) => out.push_str(&dialect.escape_string(&v.to_rfc3339())),
        Value::Uuid(v) => out.push_str(&dialect.escape_string(&v.to_string())),
        Value::Bytes(_) => {
            return Err(WeaveError::render("binary values cannot be inlined"));
        }
    }
    Ok(())
}
