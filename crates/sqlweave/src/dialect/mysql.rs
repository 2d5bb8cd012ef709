use super::{Dialect, LockStrength, LockingClause, UpsertStyle, standard_locking_clause};
use crate::error::{WeaveError, WeaveResult};
use crate::sql::Sql;

/// MySQL: `` `ident` `` quoting and `?` placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_char(&self) -> char {
        '`'
    }

    fn write_param(&self, out: &mut String, _index: usize) {
        out.push('?');
    }

    fn escape_string(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len() + 2);
        out.push('\'');
        for ch in value.chars() {
            match ch {
                '\'' => out.push_str("''"),
                '\\' => out.push_str("\\\\"),
                _ => out.push(ch),
            }
        }
        out.push('\'');
        out
    }

    fn build_locking_clause(&self, lock: &LockingClause) -> WeaveResult<Sql> {
        match lock.strength {
            LockStrength::Update | LockStrength::Share => Ok(standard_locking_clause(lock)),
            LockStrength::NoKeyUpdate | LockStrength::KeyShare => Err(WeaveError::Unsupported {
                dialect: "mysql",
                feature: "key-level lock strengths",
            }),
        }
    }

    fn supports_returning(&self) -> bool {
        false
    }

    fn supports_full_join(&self) -> bool {
        false
    }

    fn upsert_style(&self) -> UpsertStyle {
        UpsertStyle::OnDuplicateKey
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_backslashes_in_strings() {
        assert_eq!(MySqlDialect.escape_string(r"a\'b"), r"'a\\''b'");
    }

    #[test]
    fn rejects_key_share() {
        let lock = LockingClause {
            strength: LockStrength::KeyShare,
            config: Default::default(),
        };
        assert!(MySqlDialect.build_locking_clause(&lock).is_err());
    }
}
