use super::{Dialect, LockingClause};
use crate::error::{WeaveError, WeaveResult};
use crate::sql::Sql;

/// SQLite: `"ident"` quoting and `?` placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_char(&self) -> char {
        '"'
    }

    fn write_param(&self, out: &mut String, _index: usize) {
        out.push('?');
    }

    fn build_locking_clause(&self, _lock: &LockingClause) -> WeaveResult<Sql> {
        Err(WeaveError::Unsupported {
            dialect: "sqlite",
            feature: "row locking clauses",
        })
    }

    // Compound selects are left-associative and take no parentheses.
    fn supports_parenthesized_set_operands(&self) -> bool {
        false
    }

    fn supports_intersect_except_all(&self) -> bool {
        false
    }

    fn serial_primary_key(&self) -> &'static str {
        "integer primary key autoincrement"
    }
}
