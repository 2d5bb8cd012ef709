use super::select::{keyword_clause, list_clause};
use crate::dialect::Dialect;
use crate::error::{WeaveError, WeaveResult};
use crate::sql::Sql;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    Intersect,
    Except,
}

impl SetOperator {
    pub fn as_sql(self) -> &'static str {
        match self {
            SetOperator::Union => "union",
            SetOperator::Intersect => "intersect",
            SetOperator::Except => "except",
        }
    }
}

/// Shape of a compiled set-operation member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// A select without `order by`/`limit`/`offset`.
    Plain,
    /// A select carrying its own `order by`/`limit`/`offset`.
    Limited,
    /// Another set operation; `limited` if it has a trailing clause.
    Compound { limited: bool },
}

/// A compiled member of a set operation.
#[derive(Debug, Clone)]
pub struct SetOperand {
    pub sql: Sql,
    pub kind: OperandKind,
}

fn operand_sql(dialect: &dyn Dialect, operand: SetOperand, is_left: bool) -> WeaveResult<Sql> {
    let parenthesize = match operand.kind {
        OperandKind::Plain => false,
        _ if dialect.supports_parenthesized_set_operands() => true,
        // Compound selects associate to the left, so an unlimited chain on the
        // left needs no grouping.
        OperandKind::Compound { limited: false } if is_left => false,
        _ => {
            return Err(WeaveError::Unsupported {
                dialect: dialect.name(),
                feature: "grouped or limited set-operation members",
            });
        }
    };
    Ok(if parenthesize {
        operand.sql.parenthesized()
    } else {
        operand.sql
    })
}

/// Compile `<left> <op> [all] <right> [order by ...] [limit ...] [offset ...]`.
///
/// Nested set operations are parenthesized; the trailing clauses are emitted
/// once, for the whole operation. Column references in the trailing
/// `order by` are unqualified since only output names are in scope there.
#[allow(clippy::too_many_arguments)]
pub fn build_set_operation(
    dialect: &dyn Dialect,
    left: SetOperand,
    operator: SetOperator,
    all: bool,
    right: SetOperand,
    order_by: &[Sql],
    limit: Option<&Sql>,
    offset: Option<&Sql>,
) -> WeaveResult<Sql> {
    if all && operator != SetOperator::Union && !dialect.supports_intersect_except_all() {
        return Err(WeaveError::Unsupported {
            dialect: dialect.name(),
            feature: "intersect all / except all",
        });
    }

    let mut sql = operand_sql(dialect, left, true)?;
    sql.push_raw(" ");
    sql.push_raw(operator.as_sql());
    sql.push_raw(if all { " all " } else { " " });
    sql.append(operand_sql(dialect, right, false)?);

    let order_by: Vec<Sql> = order_by.iter().map(Sql::unqualified).collect();
    let trailing = [
        list_clause("order by ", &order_by),
        keyword_clause("limit ", limit),
        keyword_clause("offset ", offset),
    ];
    for clause in trailing.into_iter().flatten() {
        sql.push_raw(" ");
        sql.append(clause);
    }
    Ok(sql)
}
