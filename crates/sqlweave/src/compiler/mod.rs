//! Statement compilation: query configurations to [`Sql`](crate::Sql).
//!
//! The functions here are pure. They read a configuration and produce one
//! flat chunk list; rendering to text happens later against a dialect.

mod mutation;
mod select;
mod selection;
mod set_ops;

pub use mutation::{
    DeleteConfig, InsertConfig, InsertValue, OnConflict, UpdateConfig, ValueMap, build_delete,
    build_insert, build_update,
};
pub use select::{Distinct, Join, SelectConfig, build_select};
pub use selection::build_selection;
pub use set_ops::{OperandKind, SetOperand, SetOperator, build_set_operation};

use crate::sql::Sql;
use crate::table::{Subquery, SubqueryKind};
use std::sync::Arc;

/// `with [recursive] "a" as (...), "b" as (...)`, or nothing.
pub(crate) fn build_with(ctes: &[Arc<Subquery>]) -> Option<Sql> {
    if ctes.is_empty() {
        return None;
    }
    let recursive = ctes.iter().any(|cte| cte.kind() == SubqueryKind::Recursive);
    let mut sql = Sql::raw(if recursive { "with recursive " } else { "with " });
    sql.append(Sql::join(
        ctes.iter().map(|cte| {
            let mut def = Sql::identifier(cte.alias().to_string());
            def.push_raw(" as ");
            def.append(cte.sql().clone().parenthesized());
            def
        }),
        ", ",
    ));
    Some(sql)
}
