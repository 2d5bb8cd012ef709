//! Query builders.
//!
//! Every builder method takes `self` and returns it, so a configuration is
//! owned by exactly one chain at a time. Problems found while chaining (a
//! clause set twice, a bad reference inside a resolver closure) are recorded
//! and reported by `to_sql()` / `to_query()` / `prepare()`; problems that
//! change the result shape (duplicate join alias, empty update `set`) are
//! returned immediately.
//!
//! # Usage
//!
//! ```ignore
//! use sqlweave::expr::{eq, gt};
//! use sqlweave::{PgDialect, QueryBuilder};
//!
//! let qb = QueryBuilder::new(PgDialect);
//!
//! // select "users"."id", ..., "pets"."id", ... from "users" left join "pets" on ...
//! let query = qb
//!     .select()
//!     .from(&users)
//!     .left_join(&pets, eq(&pets["owner_id"], &users["id"]))?
//!     .where_(gt(&users["age"], 18))
//!     .limit(10)
//!     .to_query()?;
//! ```

mod compound;
mod cte;
mod delete;
mod insert;
mod select;
mod update;

pub use compound::{CompoundSelect, SetMember};
pub use cte::RecursiveCte;
pub use delete::DeleteBuilder;
pub use insert::InsertBuilder;
pub use select::SelectBuilder;
pub use update::UpdateBuilder;

use crate::compiler::Distinct;
use crate::dialect::Dialect;
use crate::error::WeaveResult;
use crate::field::{Fields, ResolveMode};
use crate::sql::Sql;
use crate::table::{Subquery, Table};
use std::sync::Arc;

/// Entry point for building statements against one dialect.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    dialect: Arc<dyn Dialect>,
    with: Vec<Arc<Subquery>>,
}

impl QueryBuilder {
    pub fn new(dialect: impl Dialect + 'static) -> Self {
        Self {
            dialect: Arc::new(dialect),
            with: Vec::new(),
        }
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// Prefix statements built from here with `with "a" as (...), ...`.
    pub fn with(mut self, ctes: impl IntoIterator<Item = Subquery>) -> Self {
        self.with
            .extend(ctes.into_iter().map(|cte| Arc::new(cte.into_cte())));
        self
    }

    /// Define a common table expression, referenced by `alias`.
    pub fn cte(&self, alias: impl Into<String>, query: SelectBuilder) -> WeaveResult<Subquery> {
        Ok(query.as_subquery(alias)?.into_cte())
    }

    /// Select every field of the `from` relation (and of joined relations,
    /// nested under their aliases).
    pub fn select(&self) -> SelectBuilder {
        SelectBuilder::new(self, None, Distinct::None)
    }

    /// Select exactly `fields`; joins never reshape a partial selection.
    pub fn select_fields(&self, fields: Fields) -> SelectBuilder {
        SelectBuilder::new(self, Some(fields), Distinct::None)
    }

    pub fn select_distinct(&self) -> SelectBuilder {
        SelectBuilder::new(self, None, Distinct::All)
    }

    pub fn select_distinct_fields(&self, fields: Fields) -> SelectBuilder {
        SelectBuilder::new(self, Some(fields), Distinct::All)
    }

    /// `select distinct on (...)` (Postgres).
    pub fn select_distinct_on(
        &self,
        on: impl IntoIterator<Item = Sql>,
        fields: Option<Fields>,
    ) -> SelectBuilder {
        SelectBuilder::new(self, fields, Distinct::On(on.into_iter().collect()))
    }

    pub fn insert(&self, table: &Table) -> InsertBuilder {
        InsertBuilder::new(self, table)
    }

    pub fn update(&self, table: &Table) -> UpdateBuilder {
        UpdateBuilder::new(self, table)
    }

    pub fn delete(&self, table: &Table) -> DeleteBuilder {
        DeleteBuilder::new(self, table)
    }
}

/// Field lookup handed to `where_with` / `order_by_with` closures.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    fields: &'a Fields,
    mode: ResolveMode,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(fields: &'a Fields, mode: ResolveMode) -> Self {
        Self { fields, mode }
    }

    /// Resolve a dotted field path of the current selection.
    pub fn field(&self, path: &str) -> WeaveResult<Sql> {
        self.fields.resolve(path, self.mode)
    }

    pub fn fields(&self) -> &'a Fields {
        self.fields
    }
}
