//! Row mapping through prepared queries.

mod common;

use common::RecordingSession;
use serde_json::json;
use sqlweave::expr::{eq, sql_placeholder};
use sqlweave::{
    Column, ColumnType, FromRecord, PgDialect, Placeholders, QueryBuilder, QueryLogger, Record,
    SessionConfig, Table, Value, ValueMap, WeaveResult,
};
use std::sync::{Arc, Mutex};

fn users() -> Table {
    Table::new("users")
        .column(Column::new("id", ColumnType::Integer).primary_key())
        .column(Column::new("name", ColumnType::Text).not_null())
        .column(Column::new("verified", ColumnType::BooleanInt))
}

fn pets() -> Table {
    Table::new("pets")
        .column(Column::new("id", ColumnType::Integer).primary_key())
        .column(Column::new("owner_id", ColumnType::Integer))
}

#[derive(Debug, PartialEq)]
struct Pet {
    id: i64,
    owner_id: Option<i64>,
}

impl FromRecord for Pet {
    fn from_record(record: &Record) -> WeaveResult<Self> {
        Ok(Self {
            id: record.try_get("id")?,
            owner_id: record.try_get("owner_id")?,
        })
    }
}

#[derive(Debug, PartialEq)]
struct UserWithPet {
    name: String,
    verified: bool,
    pet: Option<Pet>,
}

impl FromRecord for UserWithPet {
    fn from_record(record: &Record) -> WeaveResult<Self> {
        let user: Record = record
            .try_get_record("users")?
            .ok_or_else(|| sqlweave::WeaveError::decode("users", "missing"))?;
        Ok(Self {
            name: user.try_get("name")?,
            verified: user.try_get("verified")?,
            pet: record.try_get_record("pets")?,
        })
    }
}

#[tokio::test]
async fn unmatched_left_join_collapses_to_null() -> WeaveResult<()> {
    let (users, pets) = (users(), pets());
    let prepared = QueryBuilder::new(PgDialect)
        .select()
        .from(&users)
        .left_join(&pets, eq(&pets["owner_id"], &users["id"]))?
        .prepare()?;

    let session = RecordingSession::new();
    session.push_rows(vec![
        vec![
            Value::Int(1),
            Value::Text("ann".into()),
            Value::Int(1),
            Value::Int(10),
            Value::Int(1),
        ],
        vec![
            Value::Int(2),
            Value::Text("bob".into()),
            Value::Int(0),
            Value::Null,
            Value::Null,
        ],
    ]);

    let rows = prepared.all(&session, &Placeholders::new()).await?;
    let as_json: Vec<_> = rows
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<_, _>>()
        .map_err(|e| sqlweave::WeaveError::Other(e.to_string()))?;
    assert_eq!(
        as_json,
        [
            json!({
                "users": { "id": 1, "name": "ann", "verified": true },
                "pets": { "id": 10, "owner_id": 1 }
            }),
            json!({
                "users": { "id": 2, "name": "bob", "verified": false },
                "pets": null
            }),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn inner_join_never_collapses() -> WeaveResult<()> {
    let (users, pets) = (users(), pets());
    let prepared = QueryBuilder::new(PgDialect)
        .select()
        .from(&users)
        .inner_join(&pets, eq(&pets["owner_id"], &users["id"]))?
        .prepare()?;

    let session = RecordingSession::new();
    session.push_rows(vec![vec![
        Value::Int(1),
        Value::Text("ann".into()),
        Value::Null,
        Value::Null,
        Value::Null,
    ]]);

    let row = prepared.one(&session, &Placeholders::new()).await?;
    let pets = row.nested("pets").expect("pets key");
    assert!(pets.is_some());
    Ok(())
}

#[tokio::test]
async fn typed_rows_through_from_record() -> WeaveResult<()> {
    let (users, pets) = (users(), pets());
    let prepared = QueryBuilder::new(PgDialect)
        .select()
        .from(&users)
        .left_join(&pets, eq(&pets["owner_id"], &users["id"]))?
        .where_(eq(&users["name"], sql_placeholder("name")))
        .prepare()?;

    let session = RecordingSession::new();
    session.push_rows(vec![vec![
        Value::Int(2),
        Value::Text("bob".into()),
        Value::Int(1),
        Value::Null,
        Value::Null,
    ]]);

    let rows: Vec<UserWithPet> = prepared
        .all_as(&session, &Placeholders::new().set("name", "bob"))
        .await?;
    assert_eq!(
        rows,
        [UserWithPet {
            name: "bob".into(),
            verified: true,
            pet: None,
        }]
    );
    assert_eq!(session.statements()[0].params, [Value::Text("bob".into())]);
    Ok(())
}

#[tokio::test]
async fn one_without_rows_is_not_found() -> WeaveResult<()> {
    let users = users();
    let prepared = QueryBuilder::new(PgDialect).select().from(&users).prepare()?;
    let session = RecordingSession::new();

    assert!(prepared.get(&session, &Placeholders::new()).await?.is_none());
    let err = prepared.one(&session, &Placeholders::new()).await.unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test]
async fn values_skip_mapping() -> WeaveResult<()> {
    let users = users();
    let prepared = QueryBuilder::new(PgDialect).select().from(&users).prepare()?;
    let session = RecordingSession::new();
    session.push_rows(vec![vec![Value::Int(1), Value::Text("ann".into()), Value::Int(1)]]);

    let rows = prepared.values(&session, &Placeholders::new()).await?;
    assert_eq!(rows, [vec![Value::Int(1), Value::Text("ann".into()), Value::Int(1)]]);
    Ok(())
}

#[tokio::test]
async fn mismatched_row_width_is_an_error() -> WeaveResult<()> {
    let users = users();
    let prepared = QueryBuilder::new(PgDialect).select().from(&users).prepare()?;
    let session = RecordingSession::new();
    session.push_rows(vec![vec![Value::Int(1)]]);

    assert!(prepared.all(&session, &Placeholders::new()).await.is_err());
    Ok(())
}

#[tokio::test]
async fn statements_without_returning_cannot_map() -> WeaveResult<()> {
    let users = users();
    let prepared = QueryBuilder::new(PgDialect)
        .insert(&users)
        .values(vec![ValueMap::new().set("name", "ann").set("verified", true)])
        .prepare()?;
    let session = RecordingSession::new();

    assert_eq!(prepared.run(&session, &Placeholders::new()).await?, 1);
    assert_eq!(
        session.statements()[0].params,
        [Value::Text("ann".into()), Value::Int(1)]
    );
    assert!(prepared.all(&session, &Placeholders::new()).await.is_err());
    Ok(())
}

#[derive(Debug, Default)]
struct CapturingLogger {
    seen: Arc<Mutex<Vec<(String, Vec<Value>)>>>,
}

impl QueryLogger for CapturingLogger {
    fn log_query(&self, sql: &str, params: &[Value]) {
        self.seen
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
    }
}

#[tokio::test]
async fn logger_sees_params_only_when_enabled() -> WeaveResult<()> {
    let users = users();
    let prepared = QueryBuilder::new(PgDialect)
        .select()
        .from(&users)
        .where_(eq(&users["id"], 7))
        .prepare()?;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let quiet = RecordingSession::new().with_config(SessionConfig::new().with_logger(
        CapturingLogger {
            seen: Arc::clone(&seen),
        },
    ));
    prepared.all(&quiet, &Placeholders::new()).await?;

    let verbose = RecordingSession::new().with_config(
        SessionConfig::new()
            .with_logger(CapturingLogger {
                seen: Arc::clone(&seen),
            })
            .log_params(true),
    );
    prepared.all(&verbose, &Placeholders::new()).await?;

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(
        seen[0].0,
        r#"select "id", "name", "verified" from "users" where "users"."id" = $1"#
    );
    assert!(seen[0].1.is_empty());
    assert_eq!(seen[1].1, [Value::Int(7)]);
    Ok(())
}
