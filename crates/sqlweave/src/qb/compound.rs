//! Set operations over selects.

use super::Resolver;
use super::select::SelectBuilder;
use crate::compiler::{OperandKind, SetOperand, SetOperator, build_set_operation};
use crate::dialect::Dialect;
use crate::error::{WeaveError, WeaveResult};
use crate::expr::{IntoOperand, operand_sql};
use crate::field::{Fields, ResolveMode};
use crate::nullability::NullabilityMap;
use crate::session::PreparedQuery;
use crate::sql::{Query, Sql};
use crate::table::{Subquery, SubqueryKind};
use std::sync::Arc;

/// One side of a set operation.
#[derive(Debug, Clone)]
pub enum SetMember {
    Select(SelectBuilder),
    Compound(Box<CompoundSelect>),
}

impl SetMember {
    fn fields(&self) -> &Fields {
        match self {
            SetMember::Select(select) => select.fields(),
            SetMember::Compound(compound) => compound.fields(),
        }
    }

    fn nullability(&self) -> &NullabilityMap {
        match self {
            SetMember::Select(select) => select.nullability(),
            SetMember::Compound(compound) => compound.nullability(),
        }
    }

    fn dialect(&self) -> &Arc<dyn Dialect> {
        match self {
            SetMember::Select(select) => select.dialect(),
            SetMember::Compound(compound) => &compound.dialect,
        }
    }

    fn operand(&self) -> WeaveResult<SetOperand> {
        Ok(match self {
            SetMember::Select(select) => SetOperand {
                sql: select.to_sql()?,
                kind: if select.config().is_limited() {
                    OperandKind::Limited
                } else {
                    OperandKind::Plain
                },
            },
            SetMember::Compound(compound) => SetOperand {
                sql: compound.to_sql()?,
                kind: OperandKind::Compound {
                    limited: compound.is_limited(),
                },
            },
        })
    }
}

impl From<SelectBuilder> for SetMember {
    fn from(select: SelectBuilder) -> Self {
        SetMember::Select(select)
    }
}

impl From<CompoundSelect> for SetMember {
    fn from(compound: CompoundSelect) -> Self {
        SetMember::Compound(Box::new(compound))
    }
}

/// `<left> union|intersect|except [all] <right>`, with one trailing
/// `order by` / `limit` / `offset` for the whole operation.
///
/// The result shape is the left member's.
#[derive(Debug, Clone)]
pub struct CompoundSelect {
    dialect: Arc<dyn Dialect>,
    left: Box<SetMember>,
    operator: SetOperator,
    all: bool,
    right: Box<SetMember>,
    order_by: Vec<Sql>,
    limit: Option<Sql>,
    offset: Option<Sql>,
    build_error: Option<String>,
}

fn paths(fields: &Fields) -> Vec<Vec<String>> {
    fields.flatten().into_iter().map(|f| f.path).collect()
}

impl CompoundSelect {
    pub(super) fn new(left: SetMember, operator: SetOperator, all: bool, right: SetMember) -> Self {
        let build_error = (paths(left.fields()) != paths(right.fields())).then(|| {
            format!(
                "{} members must select the same fields in the same order",
                operator.as_sql()
            )
        });
        Self {
            dialect: Arc::clone(left.dialect()),
            left: Box::new(left),
            operator,
            all,
            right: Box::new(right),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            build_error,
        }
    }

    fn fail(mut self, message: impl Into<String>) -> Self {
        if self.build_error.is_none() {
            self.build_error = Some(message.into());
        }
        self
    }

    fn chain(self, operator: SetOperator, all: bool, other: SetMember) -> CompoundSelect {
        CompoundSelect::new(SetMember::from(self), operator, all, other)
    }

    pub fn union(self, other: impl Into<SetMember>) -> CompoundSelect {
        self.chain(SetOperator::Union, false, other.into())
    }

    pub fn union_all(self, other: impl Into<SetMember>) -> CompoundSelect {
        self.chain(SetOperator::Union, true, other.into())
    }

    pub fn intersect(self, other: impl Into<SetMember>) -> CompoundSelect {
        self.chain(SetOperator::Intersect, false, other.into())
    }

    pub fn intersect_all(self, other: impl Into<SetMember>) -> CompoundSelect {
        self.chain(SetOperator::Intersect, true, other.into())
    }

    pub fn except(self, other: impl Into<SetMember>) -> CompoundSelect {
        self.chain(SetOperator::Except, false, other.into())
    }

    pub fn except_all(self, other: impl Into<SetMember>) -> CompoundSelect {
        self.chain(SetOperator::Except, true, other.into())
    }

    /// Trailing `order by`; column references render unqualified.
    pub fn order_by(mut self, exprs: impl IntoIterator<Item = Sql>) -> Self {
        if !self.order_by.is_empty() {
            return self.fail("order by clause is already set");
        }
        self.order_by = exprs.into_iter().collect();
        self
    }

    pub fn order_by_with<F>(self, build: F) -> Self
    where
        F: FnOnce(&Resolver<'_>) -> WeaveResult<Vec<Sql>>,
    {
        let resolver = Resolver::new(self.left.fields(), ResolveMode::PreferAlias);
        match build(&resolver) {
            Ok(exprs) => self.order_by(exprs),
            Err(e) => self.fail(e.to_string()),
        }
    }

    pub fn limit(mut self, limit: impl IntoOperand) -> Self {
        if self.limit.is_some() {
            return self.fail("limit is already set");
        }
        self.limit = Some(operand_sql(limit));
        self
    }

    pub fn offset(mut self, offset: impl IntoOperand) -> Self {
        if self.offset.is_some() {
            return self.fail("offset is already set");
        }
        self.offset = Some(operand_sql(offset));
        self
    }

    pub fn fields(&self) -> &Fields {
        self.left.fields()
    }

    pub fn nullability(&self) -> &NullabilityMap {
        self.left.nullability()
    }

    fn is_limited(&self) -> bool {
        !self.order_by.is_empty() || self.limit.is_some() || self.offset.is_some()
    }

    pub fn to_sql(&self) -> WeaveResult<Sql> {
        if let Some(message) = &self.build_error {
            return Err(WeaveError::config(message.clone()));
        }
        build_set_operation(
            self.dialect.as_ref(),
            self.left.operand()?,
            self.operator,
            self.all,
            self.right.operand()?,
            &self.order_by,
            self.limit.as_ref(),
            self.offset.as_ref(),
        )
    }

    pub fn to_query(&self) -> WeaveResult<Query> {
        self.to_sql()?.to_query(self.dialect.as_ref())
    }

    pub fn prepare(&self) -> WeaveResult<PreparedQuery> {
        Ok(PreparedQuery::new(
            self.to_query()?,
            Some(self.fields().clone()),
            Some(self.nullability().clone()),
        ))
    }

    pub fn as_subquery(&self, alias: impl Into<String>) -> WeaveResult<Subquery> {
        Subquery::new(alias, self.to_sql()?, self.fields(), SubqueryKind::Inline)
    }
}
