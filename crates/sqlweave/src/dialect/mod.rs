//! SQL dialects: identifier quoting, placeholder syntax and clause layout.

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlDialect;
pub use postgres::PgDialect;
pub use sqlite::SqliteDialect;

use crate::error::WeaveResult;
use crate::ident;
use crate::sql::Sql;
use std::fmt;

/// A clause of a `select` statement, in the order a dialect renders them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clause {
    With,
    Select,
    From,
    Joins,
    Where,
    GroupBy,
    Having,
    OrderBy,
    Limit,
    Offset,
    Locking,
}

/// Clause order shared by every built-in dialect.
pub const DEFAULT_CLAUSE_ORDER: &[Clause] = &[
    Clause::With,
    Clause::Select,
    Clause::From,
    Clause::Joins,
    Clause::Where,
    Clause::GroupBy,
    Clause::Having,
    Clause::OrderBy,
    Clause::Limit,
    Clause::Offset,
    Clause::Locking,
];

/// Row lock strength for `for <strength>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStrength {
    Update,
    NoKeyUpdate,
    Share,
    KeyShare,
}

impl LockStrength {
    pub fn as_sql(self) -> &'static str {
        match self {
            LockStrength::Update => "update",
            LockStrength::NoKeyUpdate => "no key update",
            LockStrength::Share => "share",
            LockStrength::KeyShare => "key share",
        }
    }
}

/// Behaviour when a row is already locked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LockWait {
    #[default]
    Wait,
    NoWait,
    SkipLocked,
}

/// Options of a locking clause.
#[derive(Debug, Clone, Default)]
pub struct LockConfig {
    /// Relation names for `of ...`.
    pub of: Vec<String>,
    pub wait: LockWait,
}

impl LockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(mut self, relation: impl Into<String>) -> Self {
        self.of.push(relation.into());
        self
    }

    pub fn no_wait(mut self) -> Self {
        self.wait = LockWait::NoWait;
        self
    }

    pub fn skip_locked(mut self) -> Self {
        self.wait = LockWait::SkipLocked;
        self
    }
}

#[derive(Debug, Clone)]
pub struct LockingClause {
    pub strength: LockStrength,
    pub config: LockConfig,
}

/// How a dialect spells upserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertStyle {
    /// `on conflict (...) do nothing | do update set ...`
    OnConflict,
    /// `insert ignore` / `on duplicate key update ...`
    OnDuplicateKey,
}

/// A concrete SQL flavor.
///
/// Built-in dialects are [`PgDialect`], [`SqliteDialect`] and [`MySqlDialect`].
/// A new dialect supplies its quote character and placeholder syntax; clause
/// order and locking syntax have defaults that may be overridden.
pub trait Dialect: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Identifier quote character.
    fn quote_char(&self) -> char;

    /// Append the placeholder for the 1-based parameter `index`.
    fn write_param(&self, out: &mut String, index: usize);

    fn write_name(&self, out: &mut String, name: &str) {
        ident::write_quoted(out, name, self.quote_char());
    }

    fn escape_name(&self, name: &str) -> String {
        let mut out = String::new();
        self.write_name(&mut out, name);
        out
    }

    fn escape_param(&self, index: usize) -> String {
        let mut out = String::new();
        self.write_param(&mut out, index);
        out
    }

    fn escape_string(&self, value: &str) -> String {
        let mut out = String::new();
        ident::write_string_literal(&mut out, value);
        out
    }

    fn clause_order(&self) -> &'static [Clause] {
        DEFAULT_CLAUSE_ORDER
    }

    /// Render `for <strength> [of ...] [nowait | skip locked]`.
    fn build_locking_clause(&self, lock: &LockingClause) -> WeaveResult<Sql>;

    fn supports_returning(&self) -> bool {
        true
    }

    fn supports_full_join(&self) -> bool {
        true
    }

    fn supports_distinct_on(&self) -> bool {
        false
    }

    /// Whether `(select ...) union (select ...)` is accepted.
    fn supports_parenthesized_set_operands(&self) -> bool {
        true
    }

    /// Whether `intersect all` / `except all` are accepted.
    fn supports_intersect_except_all(&self) -> bool {
        true
    }

    fn upsert_style(&self) -> UpsertStyle {
        UpsertStyle::OnConflict
    }

    /// Column definition of an auto-incrementing integer primary key.
    fn serial_primary_key(&self) -> &'static str {
        "serial primary key"
    }
}

/// Shared `for ...` rendering for dialects with Postgres-like syntax.
pub(crate) fn standard_locking_clause(lock: &LockingClause) -> Sql {
    let mut sql = Sql::raw("for ");
    sql.push_raw(lock.strength.as_sql());
    if !lock.config.of.is_empty() {
        sql.push_raw(" of ");
        sql.append(Sql::join(
            lock.config.of.iter().map(|name| Sql::identifier(name.clone())),
            ", ",
        ));
    }
    match lock.config.wait {
        LockWait::Wait => {}
        LockWait::NoWait => {
            sql.push_raw(" nowait");
        }
        LockWait::SkipLocked => {
            sql.push_raw(" skip locked");
        }
    }
    sql
}
