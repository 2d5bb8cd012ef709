use super::build_with;
use super::selection::build_selection;
use crate::dialect::{Clause, Dialect, LockingClause};
use crate::error::{WeaveError, WeaveResult};
use crate::field::Fields;
use crate::nullability::JoinType;
use crate::sql::Sql;
use crate::table::{Source, Subquery};
use std::sync::Arc;

/// `distinct` flavor of a select.
#[derive(Debug, Clone, Default)]
pub enum Distinct {
    #[default]
    None,
    All,
    /// `distinct on (...)` (Postgres).
    On(Vec<Sql>),
}

/// One joined relation.
#[derive(Debug, Clone)]
pub struct Join {
    pub source: Source,
    pub join_type: JoinType,
    pub on: Option<Sql>,
    pub lateral: bool,
}

/// Everything a `select` statement is compiled from.
#[derive(Debug, Clone, Default)]
pub struct SelectConfig {
    pub with: Vec<Arc<Subquery>>,
    pub distinct: Distinct,
    pub fields: Fields,
    pub from: Option<Source>,
    pub joins: Vec<Join>,
    pub where_: Option<Sql>,
    pub group_by: Vec<Sql>,
    pub having: Option<Sql>,
    pub order_by: Vec<Sql>,
    pub limit: Option<Sql>,
    pub offset: Option<Sql>,
    pub locking: Option<LockingClause>,
}

impl SelectConfig {
    /// Whether `order by`, `limit` or `offset` is set.
    pub fn is_limited(&self) -> bool {
        !self.order_by.is_empty() || self.limit.is_some() || self.offset.is_some()
    }
}

/// Compile a `select`, emitting clauses in the dialect's clause order.
pub fn build_select(dialect: &dyn Dialect, config: &SelectConfig) -> WeaveResult<Sql> {
    let single_relation = config.joins.is_empty();
    let mut parts = Vec::new();

    for clause in dialect.clause_order() {
        let part = match clause {
            Clause::With => build_with(&config.with),
            Clause::Select => Some(select_clause(dialect, config, single_relation)?),
            Clause::From => {
                let from = config
                    .from
                    .as_ref()
                    .ok_or_else(|| WeaveError::config("select has no from clause"))?;
                let mut sql = Sql::raw("from ");
                sql.append(from.to_sql());
                Some(sql)
            }
            Clause::Joins => joins_clause(dialect, &config.joins)?,
            Clause::Where => keyword_clause("where ", config.where_.as_ref()),
            Clause::GroupBy => list_clause("group by ", &config.group_by),
            Clause::Having => keyword_clause("having ", config.having.as_ref()),
            Clause::OrderBy => list_clause("order by ", &config.order_by),
            Clause::Limit => keyword_clause("limit ", config.limit.as_ref()),
            Clause::Offset => keyword_clause("offset ", config.offset.as_ref()),
            Clause::Locking => match &config.locking {
                Some(lock) => Some(dialect.build_locking_clause(lock)?),
                None => None,
            },
        };
        if let Some(part) = part {
            parts.push(part);
        }
    }

    Ok(Sql::join(parts, " "))
}

fn select_clause(
    dialect: &dyn Dialect,
    config: &SelectConfig,
    single_relation: bool,
) -> WeaveResult<Sql> {
    let fields = config.fields.flatten();
    if fields.is_empty() {
        return Err(WeaveError::config("select has no fields"));
    }

    let mut sql = Sql::raw("select ");
    match &config.distinct {
        Distinct::None => {}
        Distinct::All => {
            sql.push_raw("distinct ");
        }
        Distinct::On(on) => {
            if !dialect.supports_distinct_on() {
                return Err(WeaveError::Unsupported {
                    dialect: dialect.name(),
                    feature: "distinct on",
                });
            }
            sql.push_raw("distinct on (");
            sql.append(Sql::join(on.iter().cloned(), ", "))
                .push_raw(") ");
        }
    }
    sql.append(build_selection(&fields, single_relation));
    Ok(sql)
}

fn joins_clause(dialect: &dyn Dialect, joins: &[Join]) -> WeaveResult<Option<Sql>> {
    if joins.is_empty() {
        return Ok(None);
    }
    let mut parts = Vec::with_capacity(joins.len());
    for join in joins {
        if join.join_type == JoinType::Full && !dialect.supports_full_join() {
            return Err(WeaveError::Unsupported {
                dialect: dialect.name(),
                feature: "full join",
            });
        }
        let mut sql = Sql::raw(join.join_type.as_sql());
        sql.push_raw(if join.lateral { " join lateral " } else { " join " });
        sql.append(join.source.to_sql());
        if let Some(on) = &join.on {
            sql.push_raw(" on ");
            sql.append(on.clone());
        }
        parts.push(sql);
    }
    Ok(Some(Sql::join(parts, " ")))
}

pub(crate) fn keyword_clause(keyword: &str, body: Option<&Sql>) -> Option<Sql> {
    let body = body.filter(|sql| !sql.is_empty())?;
    let mut sql = Sql::raw(keyword);
    sql.append(body.clone());
    Some(sql)
}

pub(crate) fn list_clause(keyword: &str, items: &[Sql]) -> Option<Sql> {
    if items.is_empty() {
        return None;
    }
    let mut sql = Sql::raw(keyword);
    sql.append(Sql::join(items.iter().cloned(), ", "));
    Some(sql)
}
