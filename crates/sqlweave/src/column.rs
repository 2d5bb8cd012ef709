//! Column descriptors and value codecs.
//!
//! A [`ColumnType`] converts between the driver representation of a value
//! (what comes back in a row, what gets bound as a parameter) and its logical
//! representation. Integer-stored booleans and timestamps, and text-stored
//! JSON, are the cases where the two differ.

use crate::error::{WeaveError, WeaveResult};
use crate::sql::Sql;
use crate::value::Value;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// A value conversion function.
pub type ValueFn = Arc<dyn Fn(Value) -> WeaveResult<Value> + Send + Sync>;

/// User-supplied codec for [`ColumnType::Custom`].
#[derive(Clone)]
pub struct CustomType {
    name: &'static str,
    decode: ValueFn,
    encode: ValueFn,
}

impl CustomType {
    pub fn new<D, E>(name: &'static str, decode: D, encode: E) -> Self
    where
        D: Fn(Value) -> WeaveResult<Value> + Send + Sync + 'static,
        E: Fn(Value) -> WeaveResult<Value> + Send + Sync + 'static,
    {
        Self {
            name,
            decode: Arc::new(decode),
            encode: Arc::new(encode),
        }
    }

    /// Decode-only codec; values are bound unchanged.
    pub fn decode_only(name: &'static str, decode: ValueFn) -> Self {
        Self {
            name,
            decode,
            encode: Arc::new(Ok),
        }
    }

    /// Codec that leaves values untouched in both directions.
    pub fn passthrough() -> Self {
        Self {
            name: "any",
            decode: Arc::new(Ok),
            encode: Arc::new(Ok),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for CustomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CustomType").field(&self.name).finish()
    }
}

/// Storage/codec kind of a column.
#[derive(Debug, Clone)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    /// Native boolean.
    Boolean,
    /// Boolean stored as `0`/`1`.
    BooleanInt,
    /// Native timestamp.
    Timestamp,
    /// Timestamp stored as integer milliseconds since the epoch.
    TimestampMillis,
    /// Timestamp stored as integer seconds since the epoch.
    TimestampSeconds,
    /// Native JSON.
    Json,
    /// JSON stored as text.
    JsonText,
    Blob,
    Uuid,
    Custom(CustomType),
}

impl ColumnType {
    /// Short name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Real => "real",
            ColumnType::Text => "text",
            ColumnType::Boolean => "boolean",
            ColumnType::BooleanInt => "boolean(int)",
            ColumnType::Timestamp => "timestamp",
            ColumnType::TimestampMillis => "timestamp(ms)",
            ColumnType::TimestampSeconds => "timestamp(s)",
            ColumnType::Json => "json",
            ColumnType::JsonText => "json(text)",
            ColumnType::Blob => "blob",
            ColumnType::Uuid => "uuid",
            ColumnType::Custom(custom) => custom.name(),
        }
    }

    /// Driver value -> logical value. `Null` always decodes to `Null`.
    pub fn decode(&self, column: &str, value: Value) -> WeaveResult<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let mismatch = |value: &Value| {
            WeaveError::decode(
                column,
                format!("cannot decode {} as {}", value.kind(), self.name()),
            )
        };

        match self {
            ColumnType::Integer => match value {
                Value::Int(_) => Ok(value),
                Value::Float(f) if f.fract() == 0.0 => Ok(Value::Int(f as i64)),
                Value::Text(ref s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|e| WeaveError::decode(column, e.to_string())),
                Value::Bool(b) => Ok(Value::Int(i64::from(b))),
                other => Err(mismatch(&other)),
            },
            ColumnType::Real => match value {
                Value::Float(_) => Ok(value),
                Value::Int(i) => Ok(Value::Float(i as f64)),
                Value::Text(ref s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|e| WeaveError::decode(column, e.to_string())),
                other => Err(mismatch(&other)),
            },
            ColumnType::Text => match value {
                Value::Text(_) => Ok(value),
                Value::Int(i) => Ok(Value::Text(i.to_string())),
                Value::Float(f) => Ok(Value::Text(f.to_string())),
                other => Err(mismatch(&other)),
            },
            ColumnType::Boolean | ColumnType::BooleanInt => match value {
                Value::Bool(_) => Ok(value),
                Value::Int(i) => Ok(Value::Bool(i != 0)),
                other => Err(mismatch(&other)),
            },
            ColumnType::Timestamp => match value {
                Value::Timestamp(_) => Ok(value),
                Value::Text(ref s) => parse_timestamp(s)
                    .map(Value::Timestamp)
                    .ok_or_else(|| WeaveError::decode(column, format!("invalid timestamp '{s}'"))),
                other => Err(mismatch(&other)),
            },
            ColumnType::TimestampMillis => match value {
                Value::Timestamp(_) => Ok(value),
                Value::Int(ms) => DateTime::from_timestamp_millis(ms)
                    .map(Value::Timestamp)
                    .ok_or_else(|| WeaveError::decode(column, format!("timestamp out of range: {ms}"))),
                other => Err(mismatch(&other)),
            },
            ColumnType::TimestampSeconds => match value {
                Value::Timestamp(_) => Ok(value),
                Value::Int(secs) => DateTime::from_timestamp(secs, 0)
                    .map(Value::Timestamp)
                    .ok_or_else(|| {
                        WeaveError::decode(column, format!("timestamp out of range: {secs}"))
                    }),
                other => Err(mismatch(&other)),
            },
            ColumnType::Json | ColumnType::JsonText => match value {
                Value::Json(_) => Ok(value),
                Value::Text(ref s) => serde_json::from_str(s)
                    .map(Value::Json)
                    .map_err(|e| WeaveError::decode(column, e.to_string())),
                other => Err(mismatch(&other)),
            },
            ColumnType::Blob => match value {
                Value::Bytes(_) => Ok(value),
                Value::Text(s) => Ok(Value::Bytes(s.into_bytes())),
                other => Err(mismatch(&other)),
            },
            ColumnType::Uuid => match value {
                Value::Uuid(_) => Ok(value),
                Value::Text(ref s) => uuid::Uuid::parse_str(s)
                    .map(Value::Uuid)
                    .map_err(|e| WeaveError::decode(column, e.to_string())),
                other => Err(mismatch(&other)),
            },
            ColumnType::Custom(custom) => (custom.decode)(value),
        }
    }

    /// Logical value -> driver value. `Null` always encodes to `Null`.
    pub fn encode(&self, column: &str, value: Value) -> WeaveResult<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let mismatch = |value: &Value| {
            WeaveError::encode(
                column,
                format!("cannot encode {} as {}", value.kind(), self.name()),
            )
        };

        match self {
            ColumnType::Integer => match value {
                Value::Int(_) => Ok(value),
                other => Err(mismatch(&other)),
            },
            ColumnType::Real => match value {
                Value::Float(_) => Ok(value),
                Value::Int(i) => Ok(Value::Float(i as f64)),
                other => Err(mismatch(&other)),
            },
            ColumnType::Text => match value {
                Value::Text(_) => Ok(value),
                other => Err(mismatch(&other)),
            },
            ColumnType::Boolean => match value {
                Value::Bool(_) => Ok(value),
                other => Err(mismatch(&other)),
            },
            ColumnType::BooleanInt => match value {
                Value::Bool(b) => Ok(Value::Int(i64::from(b))),
                Value::Int(0 | 1) => Ok(value),
                other => Err(mismatch(&other)),
            },
            ColumnType::Timestamp => match value {
                Value::Timestamp(_) => Ok(value),
                other => Err(mismatch(&other)),
            },
            ColumnType::TimestampMillis => match value {
                Value::Timestamp(ts) => Ok(Value::Int(ts.timestamp_millis())),
                Value::Int(_) => Ok(value),
                other => Err(mismatch(&other)),
            },
            ColumnType::TimestampSeconds => match value {
                Value::Timestamp(ts) => Ok(Value::Int(ts.timestamp())),
                Value::Int(_) => Ok(value),
                other => Err(mismatch(&other)),
            },
            ColumnType::Json => match value {
                Value::Json(_) => Ok(value),
                other => serde_json::to_value(&other)
                    .map(Value::Json)
                    .map_err(|e| WeaveError::encode(column, e.to_string())),
            },
            ColumnType::JsonText => match value {
                Value::Json(json) => Ok(Value::Text(json.to_string())),
                Value::Text(_) => Ok(value),
                other => Err(mismatch(&other)),
            },
            ColumnType::Blob => match value {
                Value::Bytes(_) => Ok(value),
                other => Err(mismatch(&other)),
            },
            ColumnType::Uuid => match value {
                Value::Uuid(_) => Ok(value),
                Value::Text(ref s) => uuid::Uuid::parse_str(s)
                    .map(Value::Uuid)
                    .map_err(|e| WeaveError::encode(column, e.to_string())),
                other => Err(mismatch(&other)),
            },
            ColumnType::Custom(custom) => (custom.encode)(value),
        }
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Default applied to a column missing from a multi-row insert.
#[derive(Debug, Clone)]
pub enum ColumnDefault {
    /// Logical value, encoded with the column codec.
    Value(Value),
    /// SQL expression inserted verbatim.
    Sql(Sql),
}

/// A table column.
#[derive(Debug, Clone)]
pub struct Column {
    /// Name of the relation the column is read through (table name or alias).
    pub table: String,
    pub name: String,
    pub column_type: ColumnType,
    pub not_null: bool,
    pub primary_key: bool,
    pub default: Option<ColumnDefault>,
}

impl Column {
    /// Create a column definition. The owning table is set when the column is
    /// added to a [`Table`](crate::Table).
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            table: String::new(),
            name: name.into(),
            column_type,
            not_null: false,
            primary_key: false,
            default: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Mark as primary key (implies `not null`).
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.not_null = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(ColumnDefault::Value(value.into()));
        self
    }

    pub fn default_sql(mut self, sql: Sql) -> Self {
        self.default = Some(ColumnDefault::Sql(sql));
        self
    }

    /// Same column read through another relation name.
    pub fn with_table(&self, table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..self.clone()
        }
    }

    /// `table.column` label used in error messages.
    pub fn label(&self) -> String {
        if self.table.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.table, self.name)
        }
    }

    pub fn decode(&self, value: Value) -> WeaveResult<Value> {
        self.column_type.decode(&self.label(), value)
    }

    pub fn encode(&self, value: Value) -> WeaveResult<Value> {
        self.column_type.encode(&self.label(), value)
    }
}

/// Result decoder attached to a [`Sql`] fragment used as a projection.
#[derive(Clone)]
pub enum Decoder {
    /// Decode like a column of the given type.
    Type(ColumnType),
    Func(ValueFn),
}

impl Decoder {
    pub fn func<F>(f: F) -> Self
    where
        F: Fn(Value) -> WeaveResult<Value> + Send + Sync + 'static,
    {
        Decoder::Func(Arc::new(f))
    }

    pub fn decode(&self, label: &str, value: Value) -> WeaveResult<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match self {
            Decoder::Type(column_type) => column_type.decode(label, value),
            Decoder::Func(f) => f(value),
        }
    }

    /// The equivalent column type, for re-exposing a fragment as a column.
    pub fn into_column_type(self) -> ColumnType {
        match self {
            Decoder::Type(column_type) => column_type,
            Decoder::Func(f) => ColumnType::Custom(CustomType::decode_only("mapped", f)),
        }
    }
}

impl fmt::Debug for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decoder::Type(column_type) => f.debug_tuple("Type").field(column_type).finish(),
            Decoder::Func(_) => f.write_str("Func(..)"),
        }
    }
}

impl From<ColumnType> for Decoder {
    fn from(column_type: ColumnType) -> Self {
        Decoder::Type(column_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_passes_through_every_codec() {
        for ty in [ColumnType::Integer, ColumnType::BooleanInt, ColumnType::JsonText] {
            assert_eq!(ty.decode("c", Value::Null).unwrap(), Value::Null);
            assert_eq!(ty.encode("c", Value::Null).unwrap(), Value::Null);
        }
    }

    #[test]
    fn boolean_int_round_trips_through_integers() {
        let ty = ColumnType::BooleanInt;
        assert_eq!(ty.encode("c", Value::Bool(true)).unwrap(), Value::Int(1));
        assert_eq!(ty.decode("c", Value::Int(0)).unwrap(), Value::Bool(false));
    }

    #[test]
    fn timestamp_millis_encodes_to_integer() {
        let ts = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let ty = ColumnType::TimestampMillis;
        assert_eq!(
            ty.encode("c", Value::Timestamp(ts)).unwrap(),
            Value::Int(1_700_000_000_123)
        );
        assert_eq!(
            ty.decode("c", Value::Int(1_700_000_000_123)).unwrap(),
            Value::Timestamp(ts)
        );
    }

    #[test]
    fn json_text_parses_on_decode() {
        let decoded = ColumnType::JsonText
            .decode("c", Value::Text(r#"{"a":1}"#.into()))
            .unwrap();
        assert_eq!(decoded, Value::Json(serde_json::json!({"a": 1})));

        let encoded = ColumnType::JsonText
            .encode("c", Value::Json(serde_json::json!([1, 2])))
            .unwrap();
        assert_eq!(encoded, Value::Text("[1,2]".into()));
    }

    #[test]
    fn integer_decodes_numeric_strings() {
        assert_eq!(
            ColumnType::Integer.decode("c", Value::Text("42".into())).unwrap(),
            Value::Int(42)
        );
    }

    #[test]
    fn encode_mismatch_names_column() {
        let col = Column::new("age", ColumnType::Integer).with_table("users");
        let err = col.encode(Value::Text("x".into())).unwrap_err();
        assert!(err.to_string().contains("users.age"));
    }

    #[test]
    fn text_timestamp_parses_sqlite_format() {
        let decoded = ColumnType::Timestamp
            .decode("c", Value::Text("2024-01-02 03:04:05".into()))
            .unwrap();
        let expected = NaiveDateTime::parse_from_str("2024-01-02 03:04:05", "%Y-%m-%d %H:%M:%S")
            .unwrap()
            .and_utc();
        assert_eq!(decoded, Value::Timestamp(expected));
    }

    #[test]
    fn custom_codec_is_applied() {
        let upper = CustomType::new(
            "upper",
            |v| Ok(Value::Text(v.as_str().unwrap_or_default().to_uppercase())),
            Ok,
        );
        let ty = ColumnType::Custom(upper);
        assert_eq!(
            ty.decode("c", Value::Text("abc".into())).unwrap(),
            Value::Text("ABC".into())
        );
    }
}
