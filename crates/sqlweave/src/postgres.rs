//! `tokio-postgres` session adapter.

use crate::config::SessionConfig;
use crate::dialect::{Dialect, PgDialect};
use crate::error::{WeaveError, WeaveResult};
use crate::session::Session;
use crate::sql::BoundQuery;
use crate::value::Value;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::error::Error;
use std::fmt;
use std::future::Future;
use tokio_postgres::Client;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, IsNull, ToSql, Type};
use uuid::Uuid;

/// A [`Session`] over a connected `tokio_postgres::Client`.
///
/// # Example
///
/// ```ignore
/// use sqlweave::PgSession;
/// use tokio_postgres::NoTls;
///
/// let (client, connection) = tokio_postgres::connect("postgres://...", NoTls).await?;
/// tokio::spawn(async move { let _ = connection.await; });
/// let session = PgSession::new(client);
/// ```
pub struct PgSession {
    client: Client,
    dialect: PgDialect,
    config: SessionConfig,
}

impl PgSession {
    pub fn new(client: Client) -> Self {
        Self::with_config(client, SessionConfig::default())
    }

    pub fn with_config(client: Client, config: SessionConfig) -> Self {
        Self {
            client,
            dialect: PgDialect,
            config,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl fmt::Debug for PgSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgSession")
            .field("dialect", &self.dialect)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn driver_params(values: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    values.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

impl Session for PgSession {
    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn query_rows(
        &self,
        query: &BoundQuery,
    ) -> impl Future<Output = WeaveResult<Vec<Vec<Value>>>> + Send {
        async move {
            let params = driver_params(&query.params);
            let rows = self.client.query(query.sql.as_str(), &params).await?;
            rows.iter().map(row_values).collect()
        }
    }

    fn execute(&self, query: &BoundQuery) -> impl Future<Output = WeaveResult<u64>> + Send {
        async move {
            let params = driver_params(&query.params);
            Ok(self.client.execute(query.sql.as_str(), &params).await?)
        }
    }
}

// ─── Value -> driver ────────────────────────────────────────────────────────

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql(ty, out),
            Value::Int(v) => match *ty {
                Type::INT2 => i16::try_from(*v)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*v)?.to_sql(ty, out),
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::FLOAT8 => (*v as f64).to_sql(ty, out),
                Type::TEXT | Type::VARCHAR => v.to_string().to_sql(ty, out),
                Type::NUMERIC => Decimal::from(*v).to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Float(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Text(v) => v.to_sql(ty, out),
            Value::Bytes(v) => v.to_sql(ty, out),
            Value::Json(v) => v.to_sql(ty, out),
            Value::Timestamp(v) => match *ty {
                Type::TIMESTAMP => v.naive_utc().to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Uuid(v) => v.to_sql(ty, out),
        }
    }

    // Checked per variant by the wrapped types.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

// ─── driver -> Value ────────────────────────────────────────────────────────

fn get<'a, T: FromSql<'a>>(
    row: &'a Row,
    idx: usize,
    wrap: impl FnOnce(T) -> Value,
) -> WeaveResult<Value> {
    Ok(row.try_get::<_, Option<T>>(idx)?.map_or(Value::Null, wrap))
}

/// Convert one row to positional values, by column type.
pub(crate) fn row_values(row: &Row) -> WeaveResult<Vec<Value>> {
    let mut values = Vec::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        let value = match *column.type_() {
            Type::BOOL => get(row, idx, Value::Bool)?,
            Type::INT2 => get(row, idx, |v: i16| Value::Int(v.into()))?,
            Type::INT4 => get(row, idx, |v: i32| Value::Int(v.into()))?,
            Type::INT8 => get(row, idx, Value::Int)?,
            Type::OID => get(row, idx, |v: u32| Value::Int(v.into()))?,
            Type::FLOAT4 => get(row, idx, |v: f32| Value::Float(v.into()))?,
            Type::FLOAT8 => get(row, idx, Value::Float)?,
            Type::NUMERIC => get(row, idx, |v: Decimal| Value::Text(v.to_string()))?,
            Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
                get(row, idx, Value::Text)?
            }
            Type::BYTEA => get(row, idx, Value::Bytes)?,
            Type::JSON | Type::JSONB => get(row, idx, Value::Json)?,
            Type::TIMESTAMPTZ => get::<DateTime<Utc>>(row, idx, Value::Timestamp)?,
            Type::TIMESTAMP => {
                get(row, idx, |v: NaiveDateTime| Value::Timestamp(v.and_utc()))?
            }
            Type::DATE => get(row, idx, |v: NaiveDate| Value::Text(v.to_string()))?,
            Type::UUID => get::<Uuid>(row, idx, Value::Uuid)?,
            ref other => {
                return Err(WeaveError::decode(
                    column.name(),
                    format!("unsupported postgres type {other}"),
                ));
            }
        };
        values.push(value);
    }
    Ok(values)
}
