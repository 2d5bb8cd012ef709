//! UPDATE builder.

use super::QueryBuilder;
use crate::compiler::{UpdateConfig, ValueMap, build_update};
use crate::dialect::Dialect;
use crate::error::{WeaveError, WeaveResult};
use crate::field::Fields;
use crate::session::PreparedQuery;
use crate::sql::{Query, Sql};
use crate::table::Table;
use std::sync::Arc;

/// UPDATE query builder.
///
/// `set` validates its map immediately: an empty map or an unknown column is
/// an error at the call site rather than at compile time.
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    dialect: Arc<dyn Dialect>,
    config: UpdateConfig,
    build_error: Option<String>,
}

impl UpdateBuilder {
    pub(super) fn new(qb: &QueryBuilder, table: &Table) -> Self {
        Self {
            dialect: Arc::clone(&qb.dialect),
            config: UpdateConfig {
                with: qb.with.clone(),
                table: table.clone(),
                set: ValueMap::new(),
                where_: None,
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

    pub fn set(mut self, values: ValueMap) -> WeaveResult<Self> {
        if values.is_empty() {
            return Err(WeaveError::config(format!(
                "update of '{}' has no set values",
                self.config.table.name()
            )));
        }
        if !self.config.set.is_empty() {
            return Err(WeaveError::config("set values are already provided"));
        }
        values.check_columns(&self.config.table)?;
        self.config.set = values;
        Ok(self)
    }

    pub fn where_(mut self, condition: Sql) -> Self {
        if condition.is_empty() {
            return self;
        }
        if self.config.where_.is_some() {
            return self.fail("where clause is already set");
        }
        self.config.where_ = Some(condition);
        self
    }

    pub fn returning(mut self, fields: Fields) -> Self {
        if self.config.returning.is_some() {
            return self.fail("returning is already set");
        }
        self.config.returning = Some(fields);
        self
    }

    pub fn returning_all(self) -> Self {
        let fields = self.config.table.fields();
        self.returning(fields)
    }

    pub fn to_sql(&self) -> WeaveResult<Sql> {
        if let Some(message) = &self.build_error {
            return Err(WeaveError::config(message.clone()));
        }
        build_update(self.dialect.as_ref(), &self.config)
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
