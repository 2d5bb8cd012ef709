use super::{Dialect, LockingClause, standard_locking_clause};
use crate::error::WeaveResult;
use crate::sql::Sql;

/// PostgreSQL: `"ident"` quoting and `$n` placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgDialect;

impl Dialect for PgDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_char(&self) -> char {
        '"'
    }

    fn write_param(&self, out: &mut String, index: usize) {
        out.push('$');
        out.push_str(&index.to_string());
    }

    fn build_locking_clause(&self, lock: &LockingClause) -> WeaveResult<Sql> {
        Ok(standard_locking_clause(lock))
    }

    fn supports_distinct_on(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{LockConfig, LockStrength};

    #[test]
    fn locking_with_of_and_skip_locked() {
        let lock = LockingClause {
            strength: LockStrength::NoKeyUpdate,
            config: LockConfig::new().of("users").skip_locked(),
        };
        let query = PgDialect
            .build_locking_clause(&lock)
            .unwrap()
            .to_query(&PgDialect)
            .unwrap();
        assert_eq!(query.sql, r#"for no key update of "users" skip locked"#);
    }
}
