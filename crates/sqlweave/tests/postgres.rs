//! Live Postgres round trips. Skipped unless `DATABASE_URL` is set.

use sqlweave::expr::{asc, eq};
use sqlweave::migrate::{MigrationMeta, migrate};
use sqlweave::{
    Column, ColumnType, PgDialect, PgSession, Placeholders, QueryBuilder, Session, Table, Value,
    ValueMap, WeaveResult, transaction,
};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_postgres::NoTls;

async fn try_connect(test: &str) -> WeaveResult<Option<PgSession>> {
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(v) => v,
        Err(_) => {
            eprintln!("DATABASE_URL is not set; skipping {test}");
            return Ok(None);
        }
    };
    let (client, connection) = tokio_postgres::connect(&database_url, NoTls).await?;
    tokio::spawn(async move {
        let _ = connection.await;
    });
    Ok(Some(PgSession::new(client)))
}

fn unique(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before UNIX_EPOCH")
        .as_nanos();
    format!("{prefix}_{}_{nanos}", std::process::id())
}

#[tokio::test]
async fn insert_join_and_map() -> WeaveResult<()> {
    let Some(session) = try_connect("insert_join_and_map").await? else {
        return Ok(());
    };
    let owners_name = unique("sqlweave_owners");
    let pets_name = unique("sqlweave_pets");

    session
        .client()
        .batch_execute(&format!(
            "create temp table {owners_name} (id bigint primary key, name text not null, active integer not null);
             create temp table {pets_name} (id bigint primary key, owner_id bigint);"
        ))
        .await?;

    let owners = Table::new(owners_name.as_str())
        .column(Column::new("id", ColumnType::Integer).primary_key())
        .column(Column::new("name", ColumnType::Text).not_null())
        .column(Column::new("active", ColumnType::BooleanInt).not_null());
    let pets = Table::new(pets_name.as_str())
        .column(Column::new("id", ColumnType::Integer).primary_key())
        .column(Column::new("owner_id", ColumnType::Integer));
    let qb = QueryBuilder::new(PgDialect);

    let inserted = qb
        .insert(&owners)
        .values([
            ValueMap::new().set("id", 1).set("name", "ann").set("active", true),
            ValueMap::new().set("id", 2).set("name", "bob").set("active", false),
        ])
        .returning_all()
        .prepare()?
        .all(&session, &Placeholders::new())
        .await?;
    assert_eq!(inserted.len(), 2);
    assert_eq!(inserted[0].value("active"), Some(&Value::Bool(true)));

    qb.insert(&pets)
        .value(ValueMap::new().set("id", 10).set("owner_id", 1))
        .prepare()?
        .run(&session, &Placeholders::new())
        .await?;

    let rows = qb
        .select()
        .from(&owners)
        .left_join(&pets, eq(&pets["owner_id"], &owners["id"]))?
        .order_by([asc(&owners["id"])])
        .prepare()?
        .all(&session, &Placeholders::new())
        .await?;

    assert_eq!(rows.len(), 2);
    assert!(rows[0].nested(&pets_name).is_some_and(|p| p.is_some()));
    assert_eq!(rows[1].nested(&pets_name), Some(None));
    Ok(())
}

#[tokio::test]
async fn rollback_discards_writes() -> WeaveResult<()> {
    let Some(session) = try_connect("rollback_discards_writes").await? else {
        return Ok(());
    };
    let name = unique("sqlweave_tx");
    session
        .client()
        .batch_execute(&format!("create temp table {name} (id bigint primary key)"))
        .await?;

    let table = Table::new(name.as_str()).column(Column::new("id", ColumnType::Integer));
    let qb = QueryBuilder::new(PgDialect);
    let insert = qb.insert(&table).value(ValueMap::new().set("id", 1)).prepare()?;

    let result: WeaveResult<()> = transaction(&session, |tx| async move {
        insert.run(&tx, &Placeholders::new()).await?;
        tx.rollback()
    })
    .await;
    assert!(result.unwrap_err().is_rollback());

    let rows = qb
        .select()
        .from(&table)
        .prepare()?
        .values(&session, &Placeholders::new())
        .await?;
    assert!(rows.is_empty());
    Ok(())
}

#[tokio::test]
async fn migrations_apply_once() -> WeaveResult<()> {
    let Some(session) = try_connect("migrations_apply_once").await? else {
        return Ok(());
    };
    let name = unique("sqlweave_migrated");
    let millis = i64::try_from(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock before UNIX_EPOCH")
            .as_millis(),
    )
    .expect("millis fit in i64");
    let plan = [MigrationMeta::from_sql(
        &format!("create table {name} (id bigint primary key)"),
        name.clone(),
        millis,
    )];

    assert_eq!(migrate(&session, &plan).await?, 1);
    assert_eq!(migrate(&session, &plan).await?, 0);

    session
        .client()
        .batch_execute(&format!("drop table {name}"))
        .await?;
    assert_eq!(session.dialect().name(), "postgres");
    Ok(())
}
