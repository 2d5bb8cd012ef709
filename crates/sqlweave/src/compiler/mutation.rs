use super::build_with;
use super::select::keyword_clause;
use super::selection::build_selection;
use crate::column::{Column, ColumnDefault};
use crate::dialect::{Dialect, UpsertStyle};
use crate::error::{WeaveError, WeaveResult};
use crate::field::Fields;
use crate::sql::Sql;
use crate::table::{Source, Subquery, Table};
use crate::value::Value;
use std::sync::Arc;

/// Value assigned to a column by an insert or update.
#[derive(Debug, Clone)]
pub enum InsertValue {
    /// Bound with the column codec.
    Value(Value),
    /// Inserted verbatim.
    Sql(Sql),
}

/// Ordered column name -> value assignments (one insert row, or an update's
/// `set`).
#[derive(Debug, Clone, Default)]
pub struct ValueMap(Vec<(String, InsertValue)>);

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a value; a repeated key replaces the earlier value in place.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column.into(), InsertValue::Value(value.into()));
        self
    }

    /// Assign an SQL expression.
    pub fn set_sql(mut self, column: impl Into<String>, sql: Sql) -> Self {
        self.insert(column.into(), InsertValue::Sql(sql));
        self
    }

    fn insert(&mut self, column: String, value: InsertValue) {
        match self.0.iter_mut().find(|(k, _)| *k == column) {
            Some((_, existing)) => *existing = value,
            None => self.0.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&InsertValue> {
        self.0.iter().find(|(k, _)| k == column).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &InsertValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reject keys that are not columns of `table`.
    pub fn check_columns(&self, table: &Table) -> WeaveResult<()> {
        for key in self.keys() {
            table.try_column(key)?;
        }
        Ok(())
    }
}

/// Conflict handling of an insert.
#[derive(Debug, Clone)]
pub enum OnConflict {
    /// `on conflict [(target)] do nothing`; `insert ignore` on MySQL.
    DoNothing { target: Vec<Arc<Column>> },
    /// `on conflict (target) do update set ... [where ...]`.
    DoUpdate {
        target: Vec<Arc<Column>>,
        set: ValueMap,
        where_: Option<Sql>,
    },
    /// `on duplicate key update ...` (MySQL).
    DuplicateKeyUpdate { set: ValueMap },
}

#[derive(Debug, Clone)]
pub struct InsertConfig {
    pub with: Vec<Arc<Subquery>>,
    pub table: Table,
    pub rows: Vec<ValueMap>,
    pub on_conflict: Option<OnConflict>,
    pub returning: Option<Fields>,
}

#[derive(Debug, Clone)]
pub struct UpdateConfig {
    pub with: Vec<Arc<Subquery>>,
    pub table: Table,
    pub set: ValueMap,
    pub where_: Option<Sql>,
    pub returning: Option<Fields>,
}

#[derive(Debug, Clone)]
pub struct DeleteConfig {
    pub with: Vec<Arc<Subquery>>,
    pub table: Table,
    pub where_: Option<Sql>,
    pub returning: Option<Fields>,
}

fn bind_value(value: &InsertValue, column: &Arc<Column>) -> Sql {
    match value {
        InsertValue::Value(value) => Sql::param_for(value.clone(), column),
        InsertValue::Sql(sql) => sql.clone(),
    }
}

fn default_value(column: &Arc<Column>) -> Sql {
    match &column.default {
        Some(ColumnDefault::Value(value)) => Sql::param_for(value.clone(), column),
        Some(ColumnDefault::Sql(sql)) => sql.clone(),
        None => Sql::raw("null"),
    }
}

/// `"col" = <value>, ...` in map order.
fn build_assignments(table: &Table, set: &ValueMap) -> WeaveResult<Sql> {
    let mut parts = Vec::with_capacity(set.len());
    for (key, value) in set.iter() {
        let column = table.try_column(key)?;
        let mut sql = Sql::identifier(column.name.clone());
        sql.push_raw(" = ");
        sql.append(bind_value(value, column));
        parts.push(sql);
    }
    Ok(Sql::join(parts, ", "))
}

fn build_returning(dialect: &dyn Dialect, returning: Option<&Fields>) -> WeaveResult<Option<Sql>> {
    let Some(fields) = returning else {
        return Ok(None);
    };
    if !dialect.supports_returning() {
        return Err(WeaveError::Unsupported {
            dialect: dialect.name(),
            feature: "returning",
        });
    }
    let mut sql = Sql::raw("returning ");
    sql.append(build_selection(&fields.flatten(), true));
    Ok(Some(sql))
}

fn prefixed(with: &[Arc<Subquery>], statement: Sql) -> Sql {
    match build_with(with) {
        Some(mut sql) => {
            sql.push_raw(" ");
            sql.append(statement);
            sql
        }
        None => statement,
    }
}

fn column_list(columns: &[Arc<Column>]) -> Sql {
    Sql::join(
        columns.iter().map(|c| Sql::identifier(c.name.clone())),
        ", ",
    )
}

/// Compile an `insert`.
///
/// A single row lists exactly its own keys. Several rows list every table
/// column in declaration order; a column a row omits takes its declared
/// default, else `null`.
pub fn build_insert(dialect: &dyn Dialect, config: &InsertConfig) -> WeaveResult<Sql> {
    let table = &config.table;
    if config.rows.is_empty() {
        return Err(WeaveError::config(format!(
            "insert into '{}' has no rows",
            table.name()
        )));
    }
    for row in &config.rows {
        row.check_columns(table)?;
    }

    let columns: Vec<Arc<Column>> = match config.rows.as_slice() {
        [row] => row
            .keys()
            .map(|key| table.try_column(key).cloned())
            .collect::<WeaveResult<_>>()?,
        _ => table.columns().to_vec(),
    };
    if columns.is_empty() {
        return Err(WeaveError::config(format!(
            "insert into '{}' sets no columns",
            table.name()
        )));
    }

    let tuples = config.rows.iter().map(|row| {
        let values = columns.iter().map(|column| match row.get(&column.name) {
            Some(value) => bind_value(value, column),
            None => default_value(column),
        });
        Sql::join(values, ", ").parenthesized()
    });

    let ignore = matches!(
        (&config.on_conflict, dialect.upsert_style()),
        (Some(OnConflict::DoNothing { .. }), UpsertStyle::OnDuplicateKey)
    );
    let mut sql = Sql::raw(if ignore {
        "insert ignore into "
    } else {
        "insert into "
    });
    sql.append(table.qualified_name()).push_raw(" ");
    sql.append(column_list(&columns).parenthesized())
        .push_raw(" values ");
    sql.append(Sql::join(tuples, ", "));

    if let Some(on_conflict) = &config.on_conflict {
        if let Some(clause) = build_on_conflict(dialect, table, on_conflict)? {
            sql.push_raw(" ");
            sql.append(clause);
        }
    }
    if let Some(returning) = build_returning(dialect, config.returning.as_ref())? {
        sql.push_raw(" ");
        sql.append(returning);
    }

    Ok(prefixed(&config.with, sql))
}

fn build_on_conflict(
    dialect: &dyn Dialect,
    table: &Table,
    on_conflict: &OnConflict,
) -> WeaveResult<Option<Sql>> {
    let unsupported = |feature| WeaveError::Unsupported {
        dialect: dialect.name(),
        feature,
    };

    match (on_conflict, dialect.upsert_style()) {
        (OnConflict::DoNothing { target }, UpsertStyle::OnConflict) => {
            let mut sql = Sql::raw("on conflict ");
            if !target.is_empty() {
                sql.append(column_list(target).parenthesized()).push_raw(" ");
            }
            sql.push_raw("do nothing");
            Ok(Some(sql))
        }
        // Rendered as `insert ignore`.
        (OnConflict::DoNothing { .. }, UpsertStyle::OnDuplicateKey) => Ok(None),
        (
            OnConflict::DoUpdate {
                target,
                set,
                where_,
            },
            UpsertStyle::OnConflict,
        ) => {
            if target.is_empty() {
                return Err(WeaveError::config(
                    "on conflict do update requires a conflict target",
                ));
            }
            if set.is_empty() {
                return Err(WeaveError::config("on conflict do update has no assignments"));
            }
            let mut sql = Sql::raw("on conflict ");
            sql.append(column_list(target).parenthesized())
                .push_raw(" do update set ");
            sql.append(build_assignments(table, set)?);
            if let Some(where_) = keyword_clause(" where ", where_.as_ref()) {
                sql.append(where_);
            }
            Ok(Some(sql))
        }
        (OnConflict::DuplicateKeyUpdate { set }, UpsertStyle::OnDuplicateKey) => {
            if set.is_empty() {
                return Err(WeaveError::config(
                    "on duplicate key update has no assignments",
                ));
            }
            let mut sql = Sql::raw("on duplicate key update ");
            sql.append(build_assignments(table, set)?);
            Ok(Some(sql))
        }
        (OnConflict::DoUpdate { .. }, UpsertStyle::OnDuplicateKey) => {
            Err(unsupported("on conflict do update"))
        }
        (OnConflict::DuplicateKeyUpdate { .. }, UpsertStyle::OnConflict) => {
            Err(unsupported("on duplicate key update"))
        }
    }
}

/// Compile an `update`; assignments keep the map's insertion order.
pub fn build_update(dialect: &dyn Dialect, config: &UpdateConfig) -> WeaveResult<Sql> {
    if config.set.is_empty() {
        return Err(WeaveError::config(format!(
            "update of '{}' has no set values",
            config.table.name()
        )));
    }

    let mut sql = Sql::raw("update ");
    sql.append(Source::from(&config.table).to_sql())
        .push_raw(" set ");
    sql.append(build_assignments(&config.table, &config.set)?);
    if let Some(where_) = keyword_clause(" where ", config.where_.as_ref()) {
        sql.append(where_);
    }
    if let Some(returning) = build_returning(dialect, config.returning.as_ref())? {
        sql.push_raw(" ");
        sql.append(returning);
    }

    Ok(prefixed(&config.with, sql))
}

/// Compile a `delete`.
pub fn build_delete(dialect: &dyn Dialect, config: &DeleteConfig) -> WeaveResult<Sql> {
    let mut sql = Sql::raw("delete from ");
    sql.append(Source::from(&config.table).to_sql());
    if let Some(where_) = keyword_clause(" where ", config.where_.as_ref()) {
        sql.append(where_);
    }
    if let Some(returning) = build_returning(dialect, config.returning.as_ref())? {
        sql.push_raw(" ");
        sql.append(returning);
    }

    Ok(prefixed(&config.with, sql))
}
