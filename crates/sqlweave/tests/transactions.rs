//! Transaction and savepoint control flow against a recording session.

mod common;

use common::RecordingSession;
use futures_util::FutureExt;
use sqlweave::{BoundQuery, Session, SessionConfig, WeaveError, WeaveResult, transaction};
use std::panic::AssertUnwindSafe;

async fn insert<S: Session>(session: &S, what: &str) -> WeaveResult<u64> {
    session
        .execute(&BoundQuery::raw(format!("insert {what}")))
        .await
}

#[tokio::test]
async fn commit_on_success() -> WeaveResult<()> {
    let session = RecordingSession::new();

    let value = transaction(&session, |tx| async move {
        insert(&tx, "a").await?;
        Ok(7)
    })
    .await?;

    assert_eq!(value, 7);
    assert_eq!(session.sql_log(), ["begin", "insert a", "commit"]);
    Ok(())
}

#[tokio::test]
async fn rollback_on_error_returns_original_error() {
    let session = RecordingSession::new();
    session.fail_on("insert b");

    let result: WeaveResult<()> = transaction(&session, |tx| async move {
        insert(&tx, "a").await?;
        insert(&tx, "b").await?;
        insert(&tx, "c").await?;
        Ok(())
    })
    .await;

    match result {
        Err(WeaveError::Other(message)) => assert!(message.contains("insert b")),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(
        session.sql_log(),
        ["begin", "insert a", "insert b", "rollback"]
    );
}

#[tokio::test]
async fn explicit_rollback() {
    let session = RecordingSession::new();

    let result: WeaveResult<()> = transaction(&session, |tx| async move {
        insert(&tx, "a").await?;
        tx.rollback()
    })
    .await;

    assert!(result.unwrap_err().is_rollback());
    assert_eq!(session.sql_log(), ["begin", "insert a", "rollback"]);
}

#[tokio::test]
async fn nested_scopes_use_numbered_savepoints() -> WeaveResult<()> {
    let session = RecordingSession::new();

    transaction(&session, |tx| async move {
        tx.nested(|sp| async move {
            assert_eq!(sp.depth(), 1);
            insert(&sp, "a").await?;
            sp.nested(|inner| async move {
                assert_eq!(inner.depth(), 2);
                insert(&inner, "b").await
            })
            .await?;
            Ok(())
        })
        .await
    })
    .await?;

    assert_eq!(
        session.sql_log(),
        [
            "begin",
            "savepoint sp1",
            "insert a",
            "savepoint sp2",
            "insert b",
            "release savepoint sp2",
            "release savepoint sp1",
            "commit",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn failed_savepoint_rolls_back_only_its_scope() -> WeaveResult<()> {
    let session = RecordingSession::new();
    session.fail_on("insert bad");

    transaction(&session, |tx| async move {
        insert(&tx, "a").await?;
        let nested = tx
            .nested(|sp| async move { insert(&sp, "bad").await })
            .await;
        assert!(nested.is_err());
        insert(&tx, "c").await?;
        Ok(())
    })
    .await?;

    assert_eq!(
        session.sql_log(),
        [
            "begin",
            "insert a",
            "savepoint sp1",
            "insert bad",
            "rollback to savepoint sp1",
            "insert c",
            "commit",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn failed_release_rolls_back_to_savepoint() -> WeaveResult<()> {
    let session = RecordingSession::new();
    session.fail_on("release savepoint");

    transaction(&session, |tx| async move {
        let nested = tx
            .nested(|sp| async move { insert(&sp, "a").await })
            .await;
        assert!(nested.is_err());
        Ok(())
    })
    .await?;

    assert_eq!(
        session.sql_log(),
        [
            "begin",
            "savepoint sp1",
            "insert a",
            "release savepoint sp1",
            "rollback to savepoint sp1",
            "commit",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn failed_commit_rolls_back() {
    let session = RecordingSession::new();
    session.fail_on("commit");

    let result: WeaveResult<()> = transaction(&session, |tx| async move {
        insert(&tx, "a").await?;
        Ok(())
    })
    .await;

    match result {
        Err(WeaveError::Other(message)) => assert!(message.contains("commit")),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(session.sql_log(), ["begin", "insert a", "commit", "rollback"]);
}

#[tokio::test]
async fn savepoint_prefix_comes_from_config() -> WeaveResult<()> {
    let session =
        RecordingSession::new().with_config(SessionConfig::new().savepoint_prefix("level_"));

    transaction(&session, |tx| async move {
        tx.nested(|_| async move { Ok(()) }).await
    })
    .await?;

    assert_eq!(
        session.sql_log(),
        [
            "begin",
            "savepoint level_1",
            "release savepoint level_1",
            "commit"
        ]
    );
    Ok(())
}

#[tokio::test]
async fn panic_rolls_back_then_resumes() {
    let session = RecordingSession::new();

    let outcome = AssertUnwindSafe(transaction(&session, |tx| async move {
        insert(&tx, "a").await?;
        if tx.depth() == 0 {
            panic!("boom");
        }
        Ok(())
    }))
    .catch_unwind()
    .await;

    assert!(outcome.is_err());
    assert_eq!(session.sql_log(), ["begin", "insert a", "rollback"]);
}

#[tokio::test]
async fn failed_rollback_keeps_original_error() {
    let session = RecordingSession::new();
    session.fail_on("insert");
    session.fail_on("rollback");

    let result: WeaveResult<()> = transaction(&session, |tx| async move {
        insert(&tx, "a").await?;
        Ok(())
    })
    .await;

    match result {
        Err(WeaveError::Other(message)) => assert!(message.contains("insert")),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(session.sql_log(), ["begin", "insert a", "rollback"]);
}

#[tokio::test]
async fn failed_begin_skips_body() {
    let session = RecordingSession::new();
    session.fail_on("begin");

    let result: WeaveResult<()> = transaction(&session, |tx| async move {
        insert(&tx, "a").await?;
        Ok(())
    })
    .await;

    assert!(result.is_err());
    assert_eq!(session.sql_log(), ["begin"]);
}

#[tokio::test]
async fn macros_expand_to_scopes() -> WeaveResult<()> {
    let session = RecordingSession::new();

    let count = sqlweave::transaction!(&session, tx, {
        let first = insert(&tx, "a").await?;
        let second: WeaveResult<u64> = sqlweave::savepoint!(tx, inner, {
            insert(&inner, "b").await
        });
        Ok(first + second?)
    })?;

    assert_eq!(count, 2);
    assert_eq!(
        session.sql_log(),
        [
            "begin",
            "insert a",
            "savepoint sp1",
            "insert b",
            "release savepoint sp1",
            "commit"
        ]
    );
    Ok(())
}
