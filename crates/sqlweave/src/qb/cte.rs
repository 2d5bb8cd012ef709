//! Recursive common table expressions.
//!
//! # Example
//! ```ignore
//! let base = qb
//!     .select_fields(Fields::new().with("id", &nodes["id"]).with("parent_id", &nodes["parent_id"]))
//!     .from(&nodes)
//!     .where_(is_null(&nodes["parent_id"]));
//! let tree = RecursiveCte::new("tree", base)?;
//! let this = tree.self_ref();
//!
//! let step = qb
//!     .select_fields(Fields::new().with("id", &nodes["id"]).with("parent_id", &nodes["parent_id"]))
//!     .from(&nodes)
//!     .inner_join(this.clone(), eq(&nodes["parent_id"], this.field("id")?))?;
//!
//! let tree = tree.union_all(step)?;
//! // with recursive "tree" as (... union all ...) select "id", "parent_id" from "tree"
//! let query = qb.with([tree.clone()]).select().from(tree).to_query()?;
//! ```

use super::select::SelectBuilder;
use crate::compiler::{OperandKind, SetOperand, SetOperator, build_set_operation};
use crate::error::{WeaveError, WeaveResult};
use crate::sql::Sql;
use crate::table::{Subquery, SubqueryKind};
use std::sync::Arc;

/// A recursive CTE under construction: the non-recursive base member plus a
/// reference to the CTE itself for use in the recursive member.
#[derive(Debug, Clone)]
pub struct RecursiveCte {
    name: String,
    base: SelectBuilder,
    this: Arc<Subquery>,
}

impl RecursiveCte {
    pub fn new(name: impl Into<String>, base: SelectBuilder) -> WeaveResult<Self> {
        let name = name.into();
        let this = Subquery::new(
            name.clone(),
            Sql::empty(),
            base.fields(),
            SubqueryKind::Recursive,
        )?;
        Ok(Self {
            name,
            base,
            this: Arc::new(this),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The CTE as a relation, for the recursive member's `from` or `join`.
    /// Its fields mirror the base member's.
    pub fn self_ref(&self) -> Arc<Subquery> {
        Arc::clone(&self.this)
    }

    pub fn union(self, recursive: SelectBuilder) -> WeaveResult<Subquery> {
        self.finish(recursive, false)
    }

    pub fn union_all(self, recursive: SelectBuilder) -> WeaveResult<Subquery> {
        self.finish(recursive, true)
    }

    fn finish(self, recursive: SelectBuilder, all: bool) -> WeaveResult<Subquery> {
        let config = recursive.config();
        let references_self = config
            .from
            .iter()
            .chain(config.joins.iter().map(|join| &join.source))
            .any(|source| source.alias() == Some(self.name.as_str()));
        if !references_self {
            return Err(WeaveError::config(format!(
                "recursive member of '{}' does not reference '{}'",
                self.name, self.name
            )));
        }

        let expected = self.base.fields().leaf_count();
        let found = recursive.fields().leaf_count();
        if expected != found {
            return Err(WeaveError::config(format!(
                "recursive member of '{}' selects {found} fields, base member selects {expected}",
                self.name
            )));
        }

        let dialect = Arc::clone(self.base.dialect());
        let sql = build_set_operation(
            dialect.as_ref(),
            SetOperand {
                sql: self.base.to_sql()?,
                kind: OperandKind::Plain,
            },
            SetOperator::Union,
            all,
            SetOperand {
                sql: recursive.to_sql()?,
                kind: OperandKind::Plain,
            },
            &[],
            None,
            None,
        )?;
        Subquery::new(self.name, sql, self.base.fields(), SubqueryKind::Recursive)
    }
}
