//! Typed extraction from mapped records.

use crate::error::{WeaveError, WeaveResult};
use crate::mapper::{Mapped, Record};
use crate::value::Value;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Conversion from a single mapped [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> WeaveResult<Self>;
}

/// Conversion from a mapped [`Record`].
///
/// # Example
///
/// ```ignore
/// struct User { id: i64, name: String }
///
/// impl FromRecord for User {
///     fn from_record(record: &Record) -> WeaveResult<Self> {
///         Ok(Self {
///             id: record.try_get("id")?,
///             name: record.try_get("name")?,
///         })
///     }
/// }
/// ```
pub trait FromRecord: Sized {
    fn from_record(record: &Record) -> WeaveResult<Self>;
}

impl FromRecord for Record {
    fn from_record(record: &Record) -> WeaveResult<Self> {
        Ok(record.clone())
    }
}

impl FromRecord for serde_json::Value {
    fn from_record(record: &Record) -> WeaveResult<Self> {
        serde_json::to_value(record).map_err(|e| WeaveError::Other(e.to_string()))
    }
}

impl Record {
    /// Typed value at `key`.
    pub fn try_get<T: FromValue>(&self, key: &str) -> WeaveResult<T> {
        match self.get(key) {
            Some(Mapped::Value(value)) => {
                T::from_value(value).map_err(|e| WeaveError::decode(key, e.to_string()))
            }
            Some(Mapped::Record(_)) => Err(WeaveError::decode(
                key,
                "is a nested record; use try_get_record",
            )),
            None => Err(WeaveError::decode(key, "no such field in record")),
        }
    }

    /// Typed nested record at `key`; `None` when the group collapsed to null.
    pub fn try_get_record<T: FromRecord>(&self, key: &str) -> WeaveResult<Option<T>> {
        match self.get(key) {
            Some(Mapped::Record(Some(record))) => T::from_record(record).map(Some),
            Some(Mapped::Record(None)) => Ok(None),
            Some(Mapped::Value(_)) => Err(WeaveError::decode(key, "is a plain value")),
            None => Err(WeaveError::decode(key, "no such field in record")),
        }
    }
}

fn unexpected<T>(expected: &str, value: &Value) -> WeaveResult<T> {
    Err(WeaveError::Other(format!(
        "expected {expected}, found {}",
        value.kind()
    )))
}

impl FromValue for Value {
    fn from_value(value: &Value) -> WeaveResult<Self> {
        Ok(value.clone())
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> WeaveResult<Self> {
        match value {
            Value::Int(v) => Ok(*v),
            other => unexpected("int", other),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> WeaveResult<Self> {
        let v = i64::from_value(value)?;
        i32::try_from(v).map_err(|e| WeaveError::Other(e.to_string()))
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> WeaveResult<Self> {
        match value {
            Value::Float(v) => Ok(*v),
            Value::Int(v) => Ok(*v as f64),
            other => unexpected("float", other),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> WeaveResult<Self> {
        match value {
            Value::Bool(v) => Ok(*v),
            other => unexpected("bool", other),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> WeaveResult<Self> {
        match value {
            Value::Text(v) => Ok(v.clone()),
            other => unexpected("text", other),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> WeaveResult<Self> {
        match value {
            Value::Bytes(v) => Ok(v.clone()),
            other => unexpected("bytes", other),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: &Value) -> WeaveResult<Self> {
        match value {
            Value::Json(v) => Ok(v.clone()),
            other => unexpected("json", other),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> WeaveResult<Self> {
        match value {
            Value::Timestamp(v) => Ok(*v),
            other => unexpected("timestamp", other),
        }
    }
}

impl FromValue for Uuid {
    fn from_value(value: &Value) -> WeaveResult<Self> {
        match value {
            Value::Uuid(v) => Ok(*v),
            other => unexpected("uuid", other),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> WeaveResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{Column, ColumnType};
    use crate::mapper::map_row;
    use crate::table::Table;

    #[derive(Debug, PartialEq)]
    struct User {
        id: i64,
        name: Option<String>,
    }

    impl FromRecord for User {
        fn from_record(record: &Record) -> WeaveResult<Self> {
            Ok(Self {
                id: record.try_get("id")?,
                name: record.try_get("name")?,
            })
        }
    }

    fn record() -> Record {
        let users = Table::new("users")
            .column(Column::new("id", ColumnType::Integer))
            .column(Column::new("name", ColumnType::Text));
        map_row(&users.fields(), vec![Value::Int(7), Value::Null], None).unwrap()
    }

    #[test]
    fn typed_struct_extraction() {
        let user = User::from_record(&record()).unwrap();
        assert_eq!(user, User { id: 7, name: None });
    }

    #[test]
    fn wrong_type_names_field() {
        let err = record().try_get::<String>("id").unwrap_err();
        assert!(err.to_string().contains("id"));
    }

    #[test]
    fn missing_field() {
        assert!(record().try_get::<i64>("nope").is_err());
    }
}
