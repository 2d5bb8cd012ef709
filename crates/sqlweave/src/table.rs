//! Relations a statement can read from: tables, subqueries, views and raw
//! fragments.

use crate::column::{Column, ColumnType, CustomType};
use crate::dialect::Dialect;
use crate::error::{WeaveError, WeaveResult};
use crate::field::{Field, Fields, Selection};
use crate::sql::{Query, Sql};
use std::ops::Index;
use std::sync::Arc;

/// A table and its ordered columns.
///
/// # Example
///
/// ```ignore
/// use sqlweave::{Column, ColumnType, Table};
///
/// let users = Table::new("users")
///     .column(Column::new("id", ColumnType::Integer).primary_key())
///     .column(Column::new("name", ColumnType::Text).not_null());
///
/// let u = users.alias("u");
/// assert_eq!(u["id"].table, "u");
/// ```
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    schema: Option<String>,
    alias: Option<String>,
    columns: Vec<Arc<Column>>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            alias: None,
            columns: Vec::new(),
        }
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Add a column; it is attached to this table's reference name.
    pub fn column(mut self, column: Column) -> Self {
        let column = column.with_table(self.ref_name());
        self.columns.push(Arc::new(column));
        self
    }

    /// The same table under another name; every column is re-pointed at the
    /// alias.
    pub fn alias(&self, alias: impl Into<String>) -> Table {
        let alias = alias.into();
        Table {
            name: self.name.clone(),
            schema: self.schema.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| Arc::new(c.with_table(alias.clone())))
                .collect(),
            alias: Some(alias),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema_name(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn alias_name(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Name the table is referenced by in a statement (alias, else name).
    pub fn ref_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn columns(&self) -> &[Arc<Column>] {
        &self.columns
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Column>> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn try_column(&self, name: &str) -> WeaveResult<&Arc<Column>> {
        self.get(name).ok_or_else(|| {
            WeaveError::config(format!("unknown column '{name}' on table '{}'", self.name))
        })
    }

    /// Every column, keyed by column name, in declaration order.
    pub fn fields(&self) -> Fields {
        self.columns.iter().fold(Fields::new(), |fields, column| {
            fields.with(column.name.clone(), Arc::clone(column))
        })
    }

    /// `"schema"."name"`, without alias.
    pub(crate) fn qualified_name(&self) -> Sql {
        let mut sql = Sql::empty();
        if let Some(schema) = &self.schema {
            sql.push_name(schema.clone()).push_raw(".");
        }
        sql.push_name(self.name.clone());
        sql
    }
}

impl Index<&str> for Table {
    type Output = Arc<Column>;

    /// # Panics
    ///
    /// Panics if the table has no column `name`; use [`Table::get`] for a
    /// fallible lookup.
    fn index(&self, name: &str) -> &Self::Output {
        match self.get(name) {
            Some(column) => column,
            None => panic!("table '{}' has no column '{name}'", self.name),
        }
    }
}

/// How a subquery is referenced from an outer statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubqueryKind {
    /// `(<select>) as "alias"`.
    Inline,
    /// Common table expression, referenced by name.
    With,
    /// Recursive common table expression.
    Recursive,
}

/// A compiled select used as a relation.
#[derive(Debug, Clone)]
pub struct Subquery {
    alias: String,
    sql: Sql,
    fields: Fields,
    kind: SubqueryKind,
}

impl Subquery {
    /// Wrap a compiled select, re-pointing its fields at `alias`.
    pub fn new(
        alias: impl Into<String>,
        sql: Sql,
        fields: &Fields,
        kind: SubqueryKind,
    ) -> WeaveResult<Self> {
        let alias = alias.into();
        let fields = repoint_fields(fields, &alias, "subquery")?;
        Ok(Self {
            alias,
            sql,
            fields,
            kind,
        })
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn sql(&self) -> &Sql {
        &self.sql
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn kind(&self) -> SubqueryKind {
        self.kind
    }

    /// Resolve a field of this subquery (`sq.field("id")`).
    pub fn field(&self, name: &str) -> WeaveResult<Sql> {
        self.fields.resolve(name, crate::field::ResolveMode::PreferAlias)
    }

    /// The same definition, referenced by name from a `with` clause.
    pub fn into_cte(mut self) -> Self {
        if self.kind == SubqueryKind::Inline {
            self.kind = SubqueryKind::With;
        }
        self
    }
}

/// A named view over a select.
#[derive(Debug, Clone)]
pub struct View {
    name: String,
    schema: Option<String>,
    definition: Sql,
    fields: Fields,
}

impl View {
    pub fn new(name: impl Into<String>, definition: Sql, fields: &Fields) -> WeaveResult<Self> {
        let name = name.into();
        let fields = repoint_fields(fields, &name, "view")?;
        Ok(Self {
            name,
            schema: None,
            definition,
            fields,
        })
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn field(&self, name: &str) -> WeaveResult<Sql> {
        self.fields.resolve(name, crate::field::ResolveMode::PreferAlias)
    }

    /// `create view "name" as <select>`, with parameters inlined.
    pub fn create_sql(&self, dialect: &dyn Dialect) -> WeaveResult<Query> {
        let mut sql = Sql::raw("create view ");
        sql.append(self.qualified_name()).push_raw(" as ");
        sql.append(self.definition.clone());
        Ok(Query {
            sql: sql.to_inline_sql(dialect)?,
            params: Vec::new(),
        })
    }

    pub(crate) fn qualified_name(&self) -> Sql {
        let mut sql = Sql::empty();
        if let Some(schema) = &self.schema {
            sql.push_name(schema.clone()).push_raw(".");
        }
        sql.push_name(self.name.clone());
        sql
    }
}

/// The relation of a `from` or `join`.
#[derive(Debug, Clone)]
pub enum Source {
    Table(Table),
    Subquery(Arc<Subquery>),
    View(Arc<View>),
    /// Arbitrary SQL; contributes no fields.
    Raw { sql: Sql, alias: Option<String> },
}

impl Source {
    pub fn raw(sql: Sql) -> Self {
        Source::Raw { sql, alias: None }
    }

    pub fn raw_as(sql: Sql, alias: impl Into<String>) -> Self {
        Source::Raw {
            sql,
            alias: Some(alias.into()),
        }
    }

    /// Name the relation is referenced by, if it has one.
    pub fn alias(&self) -> Option<&str> {
        match self {
            Source::Table(table) => Some(table.ref_name()),
            Source::Subquery(sq) => Some(sq.alias()),
            Source::View(view) => Some(view.name()),
            Source::Raw { alias, .. } => alias.as_deref(),
        }
    }

    /// Fields contributed to a full selection.
    pub fn fields(&self) -> Option<Fields> {
        match self {
            Source::Table(table) => Some(table.fields()),
            Source::Subquery(sq) => Some(sq.fields().clone()),
            Source::View(view) => Some(view.fields().clone()),
            Source::Raw { .. } => None,
        }
    }

    /// Relation reference as it appears after `from`/`join`.
    pub(crate) fn to_sql(&self) -> Sql {
        match self {
            Source::Table(table) => {
                let mut sql = table.qualified_name();
                if let Some(alias) = table.alias_name() {
                    sql.push_raw(" as ").push_name(alias.to_string());
                }
                sql
            }
            Source::Subquery(sq) => match sq.kind() {
                SubqueryKind::Inline => {
                    let mut sql = sq.sql().clone().parenthesized();
                    sql.push_raw(" as ").push_name(sq.alias().to_string());
                    sql
                }
                SubqueryKind::With | SubqueryKind::Recursive => {
                    Sql::identifier(sq.alias().to_string())
                }
            },
            Source::View(view) => view.qualified_name(),
            Source::Raw { sql, alias } => {
                let mut out = sql.clone();
                if let Some(alias) = alias {
                    out.push_raw(" as ").push_name(alias.clone());
                }
                out
            }
        }
    }
}

impl From<Table> for Source {
    fn from(table: Table) -> Self {
        Source::Table(table)
    }
}

impl From<&Table> for Source {
    fn from(table: &Table) -> Self {
        Source::Table(table.clone())
    }
}

impl From<Subquery> for Source {
    fn from(sq: Subquery) -> Self {
        Source::Subquery(Arc::new(sq))
    }
}

impl From<&Subquery> for Source {
    fn from(sq: &Subquery) -> Self {
        Source::Subquery(Arc::new(sq.clone()))
    }
}

impl From<Arc<Subquery>> for Source {
    fn from(sq: Arc<Subquery>) -> Self {
        Source::Subquery(sq)
    }
}

impl From<View> for Source {
    fn from(view: View) -> Self {
        Source::View(Arc::new(view))
    }
}

impl From<&View> for Source {
    fn from(view: &View) -> Self {
        Source::View(Arc::new(view.clone()))
    }
}

/// Re-point a selection at the relation `alias`: columns keep their names,
/// aliased expressions become columns named after their alias.
pub(crate) fn repoint_fields(fields: &Fields, alias: &str, what: &str) -> WeaveResult<Fields> {
    let mut out = Fields::new();
    for (key, selection) in fields.iter() {
        let selection = match selection {
            Selection::Field(Field::Column(column)) => {
                Selection::Field(Field::Column(Arc::new(column.with_table(alias))))
            }
            Selection::Field(Field::Aliased { sql, alias: name }) => {
                let column_type = sql
                    .decoder()
                    .cloned()
                    .map(|decoder| decoder.into_column_type())
                    .unwrap_or_else(|| ColumnType::Custom(CustomType::passthrough()));
                let column = Column::new(name.clone(), column_type).with_table(alias);
                Selection::Field(Field::Column(Arc::new(column)))
            }
            Selection::Field(Field::Sql(_)) => {
                return Err(WeaveError::config(format!(
                    "field '{key}' of {what} '{alias}' is an expression without an alias; \
                     name it with Sql::as_alias"
                )));
            }
            Selection::Nested(nested) => Selection::Nested(repoint_fields(nested, alias, what)?),
        };
        out.insert(key, selection);
    }
    Ok(out)
}
