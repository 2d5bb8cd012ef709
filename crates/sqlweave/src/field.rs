//! Projection fields.
//!
//! [`Fields`] is an ordered map from result keys to selections; nested groups
//! appear once a select joins another relation. The flattened
//! [`SelectedField`] list derived from it fixes both the projection order of
//! the SQL and the consumption order of the row mapper.

use crate::column::{Column, Decoder};
use crate::error::{WeaveError, WeaveResult};
use crate::sql::Sql;
use std::sync::Arc;

/// One projected expression.
#[derive(Debug, Clone)]
pub enum Field {
    Column(Arc<Column>),
    /// Computed expression without an output name.
    Sql(Sql),
    /// Computed expression rendered `<sql> as "alias"`.
    Aliased { sql: Sql, alias: String },
}

impl Field {
    /// Decoder applied to this field's result value, if any.
    pub fn decoder(&self) -> Option<Decoder> {
        match self {
            Field::Column(column) => Some(Decoder::Type(column.column_type.clone())),
            Field::Sql(sql) | Field::Aliased { sql, .. } => sql.decoder().cloned(),
        }
    }

    /// Table name of a column field.
    pub fn table(&self) -> Option<&str> {
        match self {
            Field::Column(column) => Some(&column.table),
            _ => None,
        }
    }
}

impl From<Arc<Column>> for Field {
    fn from(column: Arc<Column>) -> Self {
        Field::Column(column)
    }
}

impl From<&Arc<Column>> for Field {
    fn from(column: &Arc<Column>) -> Self {
        Field::Column(Arc::clone(column))
    }
}

impl From<Sql> for Field {
    fn from(sql: Sql) -> Self {
        match sql.as_column() {
            Some(column) => Field::Column(Arc::clone(column)),
            None => Field::Sql(sql),
        }
    }
}

impl Sql {
    /// Name this expression in a projection: `<sql> as "alias"`.
    pub fn as_alias(self, alias: impl Into<String>) -> Field {
        Field::Aliased {
            sql: self,
            alias: alias.into(),
        }
    }
}

/// A field or a nested group of fields.
#[derive(Debug, Clone)]
pub enum Selection {
    Field(Field),
    Nested(Fields),
}

impl<T: Into<Field>> From<T> for Selection {
    fn from(field: T) -> Self {
        Selection::Field(field.into())
    }
}

impl From<Fields> for Selection {
    fn from(fields: Fields) -> Self {
        Selection::Nested(fields)
    }
}

/// A flattened field: its key path and expression.
#[derive(Debug, Clone)]
pub struct SelectedField {
    pub path: Vec<String>,
    pub field: Field,
}

/// How [`Fields::resolve`] treats aliased computed fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    /// Reference aliased fields by their output name (`order by`, `group by`).
    PreferAlias,
    /// Inline the aliased expression (`where`, where output names are not in
    /// scope).
    PreferRawSql,
    /// Only plain columns may be referenced.
    Error,
}

/// Ordered mapping from result keys to selections.
#[derive(Debug, Clone, Default)]
pub struct Fields(Vec<(String, Selection)>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace `key`, keeping the original position on replace.
    pub fn with(mut self, key: impl Into<String>, selection: impl Into<Selection>) -> Self {
        self.insert(key, selection);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, selection: impl Into<Selection>) {
        let key = key.into();
        let selection = selection.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = selection,
            None => self.0.push((key, selection)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Selection> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, s)| s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Selection)> {
        self.0.iter().map(|(k, s)| (k.as_str(), s))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Depth-first flattening in key order.
    pub fn flatten(&self) -> Vec<SelectedField> {
        let mut out = Vec::new();
        flatten_into(self, &mut Vec::new(), &mut out);
        out
    }

    /// Number of leaf fields.
    pub fn leaf_count(&self) -> usize {
        self.0
            .iter()
            .map(|(_, selection)| match selection {
                Selection::Field(_) => 1,
                Selection::Nested(fields) => fields.leaf_count(),
            })
            .sum()
    }

    /// Resolve a dotted reference (`"name"` or `"users.id"`) to SQL.
    pub fn resolve(&self, path: &str, mode: ResolveMode) -> WeaveResult<Sql> {
        let mut fields = self;
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            let selection = fields.get(segment).ok_or_else(|| {
                WeaveError::config(format!("unknown field '{path}' in selection"))
            })?;
            match (selection, segments.peek()) {
                (Selection::Nested(nested), Some(_)) => fields = nested,
                (Selection::Nested(_), None) => {
                    return Err(WeaveError::config(format!(
                        "'{path}' refers to a group of fields, not a single field"
                    )));
                }
                (Selection::Field(_), Some(_)) => {
                    return Err(WeaveError::config(format!(
                        "'{path}' goes through a plain field '{segment}'"
                    )));
                }
                (Selection::Field(field), None) => return resolve_field(path, field, mode),
            }
        }
        Err(WeaveError::config("empty field reference"))
    }
}

fn resolve_field(path: &str, field: &Field, mode: ResolveMode) -> WeaveResult<Sql> {
    match (field, mode) {
        (Field::Column(column), _) => Ok(Sql::column(column)),
        (Field::Aliased { alias, .. }, ResolveMode::PreferAlias) => Ok(Sql::identifier(alias)),
        (Field::Aliased { sql, .. }, ResolveMode::PreferRawSql) => Ok(sql.clone()),
        (Field::Sql(sql), ResolveMode::PreferAlias | ResolveMode::PreferRawSql) => Ok(sql.clone()),
        (Field::Aliased { .. } | Field::Sql(_), ResolveMode::Error) => Err(WeaveError::config(
            format!("field '{path}' is a computed expression and cannot be referenced here"),
        )),
    }
}

fn flatten_into(fields: &Fields, prefix: &mut Vec<String>, out: &mut Vec<SelectedField>) {
    for (key, selection) in &fields.0 {
        prefix.push(key.clone());
        match selection {
            Selection::Field(field) => out.push(SelectedField {
                path: prefix.clone(),
                field: field.clone(),
            }),
            Selection::Nested(nested) => flatten_into(nested, prefix, out),
        }
        prefix.pop();
    }
}
