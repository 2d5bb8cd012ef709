//! SELECT builder.

use super::compound::{CompoundSelect, SetMember};
use super::{QueryBuilder, Resolver};
use crate::compiler::{Distinct, Join, SelectConfig, SetOperator, build_select};
use crate::dialect::{Dialect, LockConfig, LockStrength, LockingClause};
use crate::error::{WeaveError, WeaveResult};
use crate::expr::{IntoOperand, operand_sql};
use crate::field::{Fields, ResolveMode};
use crate::nullability::{JoinType, NullabilityMap};
use crate::session::PreparedQuery;
use crate::sql::{Query, Sql};
use crate::table::{Source, Subquery, SubqueryKind};
use std::sync::{Arc, OnceLock};

/// SELECT query builder.
///
/// Without explicit fields, the selection follows the relations: the `from`
/// relation's fields flat, and after the first join every relation's fields
/// nested under its alias. Joins also maintain the nullability map used to
/// collapse unmatched outer-joined groups to null when mapping rows.
///
/// The compiled statement is cached on the builder; every method that
/// changes the configuration drops the cache.
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    dialect: Arc<dyn Dialect>,
    config: SelectConfig,
    nullability: NullabilityMap,
    partial: bool,
    build_error: Option<String>,
    compiled: OnceLock<Sql>,
}

impl SelectBuilder {
    pub(super) fn new(qb: &QueryBuilder, fields: Option<Fields>, distinct: Distinct) -> Self {
        let partial = fields.is_some();
        Self {
            dialect: Arc::clone(&qb.dialect),
            config: SelectConfig {
                with: qb.with.clone(),
                distinct,
                fields: fields.unwrap_or_default(),
                ..SelectConfig::default()
            },
            nullability: NullabilityMap::default(),
            partial,
            build_error: None,
            compiled: OnceLock::new(),
        }
    }

    fn invalidate(&mut self) {
        self.compiled.take();
    }

    fn fail(mut self, message: impl Into<String>) -> Self {
        if self.build_error.is_none() {
            self.build_error = Some(message.into());
        }
        self
    }

    fn check(&self) -> WeaveResult<()> {
        match &self.build_error {
            Some(message) => Err(WeaveError::config(message.clone())),
            None => Ok(()),
        }
    }

    // ==================== Relations ====================

    pub fn from(mut self, source: impl Into<Source>) -> Self {
        self.invalidate();
        if self.config.from.is_some() {
            return self.fail("from clause is already set");
        }
        let source = source.into();
        if !self.partial {
            match source.fields() {
                Some(fields) => self.config.fields = fields,
                None => {
                    return self.fail(
                        "a raw from source has no fields; select explicit fields with select_fields",
                    );
                }
            }
        }
        self.nullability = source
            .alias()
            .map(NullabilityMap::new)
            .unwrap_or_default();
        self.config.from = Some(source);
        self
    }

    fn join(
        mut self,
        source: Source,
        join_type: JoinType,
        on: Sql,
        lateral: bool,
    ) -> WeaveResult<Self> {
        self.invalidate();
        let Some(from) = &self.config.from else {
            return Err(WeaveError::config("join requires a from clause"));
        };
        let alias = source.alias().map(str::to_string);
        if let Some(alias) = &alias {
            if self.nullability.contains(alias) {
                return Err(WeaveError::config(format!(
                    "alias '{alias}' is already used in this query"
                )));
            }
        }

        if !self.partial {
            // First join: the flat base selection moves under the base alias.
            if self.config.joins.is_empty() {
                if let Some(base) = from.alias() {
                    let base = base.to_string();
                    let flat = std::mem::take(&mut self.config.fields);
                    self.config.fields = Fields::new().with(base, flat);
                }
            }
            if let (Some(alias), Some(fields)) = (&alias, source.fields()) {
                self.config.fields.insert(alias.clone(), fields);
            }
        }
        if let Some(alias) = alias {
            self.nullability.apply_join(alias, join_type);
        }

        self.config.joins.push(Join {
            source,
            join_type,
            on: (!on.is_empty()).then_some(on),
            lateral,
        });
        Ok(self)
    }

    pub fn inner_join(self, source: impl Into<Source>, on: Sql) -> WeaveResult<Self> {
        self.join(source.into(), JoinType::Inner, on, false)
    }

    pub fn left_join(self, source: impl Into<Source>, on: Sql) -> WeaveResult<Self> {
        self.join(source.into(), JoinType::Left, on, false)
    }

    pub fn right_join(self, source: impl Into<Source>, on: Sql) -> WeaveResult<Self> {
        self.join(source.into(), JoinType::Right, on, false)
    }

    pub fn full_join(self, source: impl Into<Source>, on: Sql) -> WeaveResult<Self> {
        self.join(source.into(), JoinType::Full, on, false)
    }

    pub fn inner_join_lateral(self, source: impl Into<Source>, on: Sql) -> WeaveResult<Self> {
        self.join(source.into(), JoinType::Inner, on, true)
    }

    pub fn left_join_lateral(self, source: impl Into<Source>, on: Sql) -> WeaveResult<Self> {
        self.join(source.into(), JoinType::Left, on, true)
    }

    // ==================== Filtering & grouping ====================

    /// Set the `where` condition; an empty condition leaves it unset.
    pub fn where_(mut self, condition: Sql) -> Self {
        self.invalidate();
        if condition.is_empty() {
            return self;
        }
        if self.config.where_.is_some() {
            return self.fail("where clause is already set");
        }
        self.config.where_ = Some(condition);
        self
    }

    /// Build the `where` condition from the current selection. Aliased
    /// fields resolve to their expressions, since output names are not in
    /// scope in `where`.
    pub fn where_with<F>(self, build: F) -> Self
    where
        F: FnOnce(&Resolver<'_>) -> WeaveResult<Sql>,
    {
        let resolver = Resolver::new(&self.config.fields, ResolveMode::PreferRawSql);
        match build(&resolver) {
            Ok(condition) => self.where_(condition),
            Err(e) => self.fail(e.to_string()),
        }
    }

    pub fn group_by(mut self, exprs: impl IntoIterator<Item = Sql>) -> Self {
        self.invalidate();
        if !self.config.group_by.is_empty() {
            return self.fail("group by clause is already set");
        }
        self.config.group_by = exprs.into_iter().collect();
        self
    }

    pub fn having(mut self, condition: Sql) -> Self {
        self.invalidate();
        if condition.is_empty() {
            return self;
        }
        if self.config.having.is_some() {
            return self.fail("having clause is already set");
        }
        self.config.having = Some(condition);
        self
    }

    // ==================== Ordering & pagination ====================

    pub fn order_by(mut self, exprs: impl IntoIterator<Item = Sql>) -> Self {
        self.invalidate();
        if !self.config.order_by.is_empty() {
            return self.fail("order by clause is already set");
        }
        self.config.order_by = exprs.into_iter().collect();
        self
    }

    /// Build `order by` from the current selection; aliased fields resolve to
    /// their output names.
    pub fn order_by_with<F>(self, build: F) -> Self
    where
        F: FnOnce(&Resolver<'_>) -> WeaveResult<Vec<Sql>>,
    {
        let resolver = Resolver::new(&self.config.fields, ResolveMode::PreferAlias);
        match build(&resolver) {
            Ok(exprs) => self.order_by(exprs),
            Err(e) => self.fail(e.to_string()),
        }
    }

    /// `limit`; a value or a [`Placeholder`](crate::expr::Placeholder).
    pub fn limit(mut self, limit: impl IntoOperand) -> Self {
        self.invalidate();
        if self.config.limit.is_some() {
            return self.fail("limit is already set");
        }
        self.config.limit = Some(operand_sql(limit));
        self
    }

    pub fn offset(mut self, offset: impl IntoOperand) -> Self {
        self.invalidate();
        if self.config.offset.is_some() {
            return self.fail("offset is already set");
        }
        self.config.offset = Some(operand_sql(offset));
        self
    }

    // ==================== Locking ====================

    pub fn for_update(self) -> Self {
        self.lock(LockStrength::Update, LockConfig::new())
    }

    pub fn lock(mut self, strength: LockStrength, config: LockConfig) -> Self {
        self.invalidate();
        if self.config.locking.is_some() {
            return self.fail("locking clause is already set");
        }
        self.config.locking = Some(LockingClause { strength, config });
        self
    }

    // ==================== Set operations ====================

    fn set_operation(self, operator: SetOperator, all: bool, other: SetMember) -> CompoundSelect {
        CompoundSelect::new(SetMember::Select(self), operator, all, other)
    }

    pub fn union(self, other: impl Into<SetMember>) -> CompoundSelect {
        self.set_operation(SetOperator::Union, false, other.into())
    }

    pub fn union_all(self, other: impl Into<SetMember>) -> CompoundSelect {
        self.set_operation(SetOperator::Union, true, other.into())
    }

    pub fn intersect(self, other: impl Into<SetMember>) -> CompoundSelect {
        self.set_operation(SetOperator::Intersect, false, other.into())
    }

    pub fn intersect_all(self, other: impl Into<SetMember>) -> CompoundSelect {
        self.set_operation(SetOperator::Intersect, true, other.into())
    }

    pub fn except(self, other: impl Into<SetMember>) -> CompoundSelect {
        self.set_operation(SetOperator::Except, false, other.into())
    }

    pub fn except_all(self, other: impl Into<SetMember>) -> CompoundSelect {
        self.set_operation(SetOperator::Except, true, other.into())
    }

    // ==================== Accessors ====================

    /// Current selection shape.
    pub fn fields(&self) -> &Fields {
        &self.config.fields
    }

    pub fn nullability(&self) -> &NullabilityMap {
        &self.nullability
    }

    pub fn is_partial(&self) -> bool {
        self.partial
    }

    pub(crate) fn config(&self) -> &SelectConfig {
        &self.config
    }

    pub(crate) fn dialect(&self) -> &Arc<dyn Dialect> {
        &self.dialect
    }

    // ==================== Build ====================

    pub fn to_sql(&self) -> WeaveResult<Sql> {
        self.check()?;
        if let Some(sql) = self.compiled.get() {
            return Ok(sql.clone());
        }
        let sql = build_select(self.dialect.as_ref(), &self.config)?;
        Ok(self.compiled.get_or_init(|| sql).clone())
    }

    pub fn to_query(&self) -> WeaveResult<Query> {
        self.to_sql()?.to_query(self.dialect.as_ref())
    }

    /// Compile once, for repeated execution.
    pub fn prepare(&self) -> WeaveResult<PreparedQuery> {
        Ok(PreparedQuery::new(
            self.to_query()?,
            Some(self.config.fields.clone()),
            Some(self.nullability.clone()),
        ))
    }

    /// Use this select as a relation: `(<select>) as "alias"`.
    pub fn as_subquery(&self, alias: impl Into<String>) -> WeaveResult<Subquery> {
        Subquery::new(alias, self.to_sql()?, &self.config.fields, SubqueryKind::Inline)
    }
}
