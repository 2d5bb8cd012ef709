//! DELETE builder.

use super::QueryBuilder;
use crate::compiler::{DeleteConfig, build_delete};
use crate::dialect::Dialect;
use crate::error::{WeaveError, WeaveResult};
use crate::field::Fields;
use crate::session::PreparedQuery;
use crate::sql::{Query, Sql};
use crate::table::Table;
use std::sync::Arc;

/// DELETE query builder. Without `where_` every row is deleted.
#[derive(Debug, Clone)]
pub struct DeleteBuilder {
    dialect: Arc<dyn Dialect>,
    config: DeleteConfig,
    build_error: Option<String>,
}

impl DeleteBuilder {
    pub(super) fn new(qb: &QueryBuilder, table: &Table) -> Self {
        Self {
            dialect: Arc::clone(&qb.dialect),
            config: DeleteConfig {
                with: qb.with.clone(),
                table: table.clone(),
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
        build_delete(self.dialect.as_ref(), &self.config)
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
