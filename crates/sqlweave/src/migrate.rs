//! Migration bookkeeping.
//!
//! Applied migrations are recorded in `__drizzle_migrations(id, hash,
//! created_at)`. [`migrate`] applies, in one transaction, every migration
//! whose `folder_millis` is newer than the last recorded `created_at`.
//!
//! # Example
//!
//! ```ignore
//! use sqlweave::migrate::{MigrationMeta, migrate};
//!
//! let init = MigrationMeta::from_sql(
//!     include_str!("../migrations/0000_init.sql"),
//!     "9f2c...",
//!     1_700_000_000_000,
//! );
//! let applied = migrate(&session, &[init]).await?;
//! ```

use crate::column::{Column, ColumnType};
use crate::compiler::{InsertConfig, SelectConfig, ValueMap, build_insert, build_select};
use crate::error::{WeaveError, WeaveResult};
use crate::expr::desc;
use crate::session::Session;
use crate::sql::{BoundQuery, Placeholders, Sql};
use crate::table::{Source, Table};
use crate::transaction::transaction;
use crate::value::Value;

pub const MIGRATIONS_TABLE: &str = "__drizzle_migrations";

/// Separator between statements of one migration file.
pub const STATEMENT_BREAKPOINT: &str = "--> statement-breakpoint";

/// One migration: its statements, content hash and creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationMeta {
    pub sql: Vec<String>,
    pub hash: String,
    /// Creation time in milliseconds since the epoch; orders migrations.
    pub folder_millis: i64,
}

impl MigrationMeta {
    /// Split a migration file on [`STATEMENT_BREAKPOINT`], dropping empty
    /// statements.
    pub fn from_sql(text: &str, hash: impl Into<String>, folder_millis: i64) -> Self {
        Self {
            sql: text
                .split(STATEMENT_BREAKPOINT)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            hash: hash.into(),
            folder_millis,
        }
    }
}

/// The bookkeeping table.
pub fn migrations_table() -> Table {
    Table::new(MIGRATIONS_TABLE)
        .column(Column::new("id", ColumnType::Integer).primary_key())
        .column(Column::new("hash", ColumnType::Text).not_null())
        .column(Column::new("created_at", ColumnType::Integer))
}

fn create_table_sql(session: &impl Session) -> String {
    let dialect = session.dialect();
    format!(
        "create table if not exists {} (id {}, hash text not null, created_at numeric)",
        dialect.escape_name(MIGRATIONS_TABLE),
        dialect.serial_primary_key(),
    )
}

/// `created_at` is stored as `numeric`, which drivers return as an integer,
/// a float or decimal text.
fn parse_millis(value: &Value) -> WeaveResult<i64> {
    match value {
        Value::Int(v) => Ok(*v),
        Value::Float(v) => Ok(*v as i64),
        Value::Text(v) => v
            .split('.')
            .next()
            .unwrap_or_default()
            .parse()
            .map_err(|e| WeaveError::decode("created_at", format!("{e}"))),
        other => Err(WeaveError::decode(
            "created_at",
            format!("expected a number, found {}", other.kind()),
        )),
    }
}

async fn last_applied(session: &impl Session, table: &Table) -> WeaveResult<Option<i64>> {
    let config = SelectConfig {
        fields: table.fields(),
        from: Some(Source::from(table)),
        order_by: vec![desc(&table["created_at"])],
        limit: Some(Sql::param(1)),
        ..SelectConfig::default()
    };
    let query = build_select(session.dialect(), &config)?
        .to_query(session.dialect())?
        .bind(&Placeholders::new())?;
    let rows = session.query_rows(&query).await?;
    match rows.first().and_then(|row| row.get(2)) {
        Some(Value::Null) | None => Ok(None),
        Some(value) => parse_millis(value).map(Some),
    }
}

/// Apply pending migrations and record them; returns how many ran.
///
/// A failing statement rolls back every migration of this run.
pub async fn migrate<S: Session>(session: &S, migrations: &[MigrationMeta]) -> WeaveResult<usize> {
    let table = migrations_table();
    session
        .execute(&BoundQuery::raw(create_table_sql(session)))
        .await?;

    let last = last_applied(session, &table).await?;
    let pending: Vec<&MigrationMeta> = migrations
        .iter()
        .filter(|m| last.is_none_or(|last| last < m.folder_millis))
        .collect();
    if pending.is_empty() {
        tracing::info!(target: "sqlweave.migrate", "no pending migrations");
        return Ok(0);
    }

    let table = &table;
    let count = pending.len();
    transaction(session, |tx| async move {
        for migration in pending {
            tracing::info!(
                target: "sqlweave.migrate",
                hash = %migration.hash,
                created_at = migration.folder_millis,
                statements = migration.sql.len(),
                "applying migration"
            );
            for statement in &migration.sql {
                tx.execute(&BoundQuery::raw(statement.as_str())).await?;
            }
            let record = InsertConfig {
                with: Vec::new(),
                table: table.clone(),
                rows: vec![
                    ValueMap::new()
                        .set("hash", migration.hash.as_str())
                        .set("created_at", migration.folder_millis),
                ],
                on_conflict: None,
                returning: None,
            };
            let query = build_insert(tx.dialect(), &record)?
                .to_query(tx.dialect())?
                .bind(&Placeholders::new())?;
            tx.execute(&query).await?;
        }
        Ok(())
    })
    .await?;

    tracing::info!(target: "sqlweave.migrate", applied = count, "migrations applied");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_breakpoints() {
        let meta = MigrationMeta::from_sql(
            "create table a (id int);\n--> statement-breakpoint\ncreate table b (id int);\n",
            "h1",
            1,
        );
        assert_eq!(
            meta.sql,
            vec!["create table a (id int);", "create table b (id int);"]
        );
    }

    #[test]
    fn empty_statements_are_dropped() {
        let meta = MigrationMeta::from_sql("--> statement-breakpoint\n  \n", "h", 1);
        assert!(meta.sql.is_empty());
    }

    #[test]
    fn parses_numeric_forms() {
        assert_eq!(parse_millis(&Value::Int(5)).unwrap(), 5);
        assert_eq!(parse_millis(&Value::Text("1700000000000".into())).unwrap(), 1_700_000_000_000);
        assert_eq!(parse_millis(&Value::Text("12.000".into())).unwrap(), 12);
        assert!(parse_millis(&Value::Bool(true)).is_err());
    }

    #[test]
    fn bookkeeping_table_shape() {
        let table = migrations_table();
        let names: Vec<_> = table.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["id", "hash", "created_at"]);
    }
}
