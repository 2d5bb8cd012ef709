use crate::field::{Field, SelectedField};
use crate::sql::Sql;

/// Projection list for `select` / `returning`.
///
/// With a single relation in scope, columns render as bare names and column
/// references inside computed fields are unqualified too; otherwise columns
/// keep their `"table"."column"` form. Fields are joined with `, ` in order.
pub fn build_selection(fields: &[SelectedField], single_relation: bool) -> Sql {
    Sql::join(
        fields.iter().map(|selected| match &selected.field {
            Field::Column(column) => {
                if single_relation {
                    Sql::identifier(column.name.clone())
                } else {
                    Sql::column(column)
                }
            }
            Field::Sql(sql) => scoped(sql, single_relation),
            Field::Aliased { sql, alias } => {
                let mut out = scoped(sql, single_relation);
                out.push_raw(" as ").push_name(alias.clone());
                out
            }
        }),
        ", ",
    )
}

fn scoped(sql: &Sql, single_relation: bool) -> Sql {
    if single_relation {
        sql.unqualified()
    } else {
        sql.clone()
    }
}
