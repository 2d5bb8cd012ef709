//! Result row mapping.
//!
//! A raw row is a flat list of driver values aligned with the flattened
//! selection. [`map_row`] walks the selection, decodes each value with its
//! field's decoder and rebuilds the nested shape. A nested group whose values
//! are all null collapses to a single null when its relation is nullable
//! (an unmatched outer join).

use crate::error::{WeaveError, WeaveResult};
use crate::field::{Field, Fields, Selection};
use crate::nullability::NullabilityMap;
use crate::value::Value;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// A mapped result entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Mapped {
    Value(Value),
    /// Nested group; `None` when collapsed.
    Record(Option<Record>),
}

impl Mapped {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Mapped::Value(value) => Some(value),
            Mapped::Record(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Mapped::Value(Value::Null) | Mapped::Record(None))
    }
}

impl Serialize for Mapped {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Mapped::Value(value) => value.serialize(serializer),
            Mapped::Record(Some(record)) => record.serialize(serializer),
            Mapped::Record(None) => serializer.serialize_none(),
        }
    }
}

/// An ordered, possibly nested, result row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(Vec<(String, Mapped)>);

impl Record {
    pub fn get(&self, key: &str) -> Option<&Mapped> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, m)| m)
    }

    /// Plain value at `key`.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.get(key).and_then(Mapped::as_value)
    }

    /// Nested group at `key`: `Some(None)` when it collapsed to null.
    pub fn nested(&self, key: &str) -> Option<Option<&Record>> {
        match self.get(key)? {
            Mapped::Record(record) => Some(record.as_ref()),
            Mapped::Value(_) => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Mapped)> {
        self.0.iter().map(|(k, m)| (k.as_str(), m))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<(String, Mapped)> {
        self.0
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Summary of a mapped group, used to decide whether it collapses.
struct GroupInfo {
    all_null: bool,
    /// Common table of the group's columns; `Some("")` until one is seen,
    /// `None` once two tables disagree.
    table: Option<String>,
}

impl GroupInfo {
    fn new() -> Self {
        Self {
            all_null: true,
            table: Some(String::new()),
        }
    }

    fn observe(&mut self, field: &Field, value: &Value) {
        if !value.is_null() {
            self.all_null = false;
        }
        if let (Some(current), Some(table)) = (&self.table, field.table()) {
            if current.is_empty() {
                self.table = Some(table.to_string());
            } else if current != table {
                self.table = None;
            }
        }
    }

    fn merge(&mut self, other: &GroupInfo) {
        self.all_null &= other.all_null;
        match (&self.table, &other.table) {
            (_, None) => self.table = None,
            (Some(current), Some(table)) if current.is_empty() => {
                self.table = Some(table.clone());
            }
            (Some(current), Some(table)) if !table.is_empty() && current != table => {
                self.table = None;
            }
            _ => {}
        }
    }

    /// Relation whose nullability governs the group: the shared table of its
    /// columns, else the group key.
    fn relation<'a>(&'a self, key: &'a str) -> &'a str {
        match &self.table {
            Some(table) if !table.is_empty() => table,
            _ => key,
        }
    }
}

/// Map one raw row onto `fields`.
///
/// `row` must hold exactly one value per leaf of `fields`, in flattened order.
pub fn map_row(
    fields: &Fields,
    row: Vec<Value>,
    nullability: Option<&NullabilityMap>,
) -> WeaveResult<Record> {
    let expected = fields.leaf_count();
    if row.len() != expected {
        return Err(WeaveError::render(format!(
            "row has {} values but the selection has {expected} fields",
            row.len()
        )));
    }
    let mut cursor = row.into_iter();
    let (record, _) = map_group(fields, &mut cursor, nullability, &mut Vec::new())?;
    Ok(record)
}

fn map_group(
    fields: &Fields,
    cursor: &mut std::vec::IntoIter<Value>,
    nullability: Option<&NullabilityMap>,
    path: &mut Vec<String>,
) -> WeaveResult<(Record, GroupInfo)> {
    let mut out = Vec::with_capacity(fields.len());
    let mut info = GroupInfo::new();

    for (key, selection) in fields.iter() {
        path.push(key.to_string());
        let mapped = match selection {
            Selection::Field(field) => {
                let raw = cursor
                    .next()
                    .ok_or_else(|| WeaveError::render("row ended before the selection"))?;
                info.observe(field, &raw);
                let value = match field.decoder() {
                    Some(decoder) if !raw.is_null() => decoder.decode(&path.join("."), raw)?,
                    _ => raw,
                };
                Mapped::Value(value)
            }
            Selection::Nested(nested) => {
                let (record, group) = map_group(nested, cursor, nullability, path)?;
                info.merge(&group);
                let collapse = group.all_null
                    && nullability.is_some_and(|map| map.is_nullable(group.relation(key)));
                Mapped::Record(if collapse { None } else { Some(record) })
            }
        };
        path.pop();
        out.push((key.to_string(), mapped));
    }

    Ok((Record(out), info))
}
