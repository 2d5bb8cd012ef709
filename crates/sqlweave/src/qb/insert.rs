//! INSERT builder.

use super::QueryBuilder;
use crate::column::Column;
use crate::compiler::{InsertConfig, OnConflict, ValueMap, build_insert};
use crate::dialect::Dialect;
use crate::error::{WeaveError, WeaveResult};
use crate::field::Fields;
use crate::session::PreparedQuery;
use crate::sql::{Query, Sql};
use crate::table::Table;
use std::sync::Arc;

/// INSERT query builder.
///
/// ```ignore
/// let query = qb
///     .insert(&users)
///     .value(ValueMap::new().set("id", 1).set("name", "ann"))
///     .on_conflict_do_update([users["id"].clone()], ValueMap::new().set("name", "ann"))
///     .returning_all()
///     .to_query()?;
/// ```
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    dialect: Arc<dyn Dialect>,
    config: InsertConfig,
    build_error: Option<String>,
}

impl InsertBuilder {
    pub(super) fn new(qb: &QueryBuilder, table: &Table) -> Self {
        Self {
            dialect: Arc::clone(&qb.dialect),
            config: InsertConfig {
                with: qb.with.clone(),
                table: table.clone(),
                rows: Vec::new(),
                on_conflict: None,
                returning: None,
            },
            build_error: None,
        }
    }

    fn fail(mut self, message: impl Into<String>) -> Self {
        if self.build_error.is_none() {
            self.build_error = Some(message.into());
        }
        self
    }

    /// Append rows.
    pub fn values(mut self, rows: impl IntoIterator<Item = ValueMap>) -> Self {
        self.config.rows.extend(rows);
        self
    }

    /// Append one row.
    pub fn value(mut self, row: ValueMap) -> Self {
        self.config.rows.push(row);
        self
    }

    fn on_conflict(mut self, on_conflict: OnConflict) -> Self {
        if self.config.on_conflict.is_some() {
            return self.fail("conflict handling is already set");
        }
        self.config.on_conflict = Some(on_conflict);
        self
    }

    /// `on conflict [(target)] do nothing`; `insert ignore` on MySQL.
    pub fn on_conflict_do_nothing(self, target: impl IntoIterator<Item = Arc<Column>>) -> Self {
        self.on_conflict(OnConflict::DoNothing {
            target: target.into_iter().collect(),
        })
    }

    /// `on conflict (target) do update set ...`.
    pub fn on_conflict_do_update(
        self,
        target: impl IntoIterator<Item = Arc<Column>>,
        set: ValueMap,
    ) -> Self {
        self.on_conflict(OnConflict::DoUpdate {
            target: target.into_iter().collect(),
            set,
            where_: None,
        })
    }

    /// Restrict the `do update` of [`on_conflict_do_update`](Self::on_conflict_do_update).
    pub fn on_conflict_where(mut self, condition: Sql) -> Self {
        match self.config.on_conflict.as_mut() {
            Some(OnConflict::DoUpdate {
                where_: slot @ None,
                ..
            }) => *slot = Some(condition),
            Some(OnConflict::DoUpdate { .. }) => {
                return self.fail("conflict where is already set");
            }
            _ => return self.fail("conflict where requires on_conflict_do_update"),
        }
        self
    }

    /// `on duplicate key update ...` (MySQL).
    pub fn on_duplicate_key_update(self, set: ValueMap) -> Self {
        self.on_conflict(OnConflict::DuplicateKeyUpdate { set })
    }

    pub fn returning(mut self, fields: Fields) -> Self {
        if self.config.returning.is_some() {
            return self.fail("returning is already set");
        }
        self.config.returning = Some(fields);
        self
    }

    /// `returning` every column of the table.
    pub fn returning_all(self) -> Self {
        let fields = self.config.table.fields();
        self.returning(fields)
    }

    pub fn to_sql(&self) -> WeaveResult<Sql> {
        if let Some(message) = &self.build_error {
            return Err(WeaveError::config(message.clone()));
        }
        build_insert(self.dialect.as_ref(), &self.config)
    }

    pub fn to_query(&self) -> WeaveResult<Query> {
        self.to_sql()?.to_query(self.dialect.as_ref())
    }

    pub fn prepare(&self) -> WeaveResult<PreparedQuery> {
        Ok(PreparedQuery::new(
            self.to_query()?,
            self.config.returning.clone(),
            None,
        ))
    }
}
