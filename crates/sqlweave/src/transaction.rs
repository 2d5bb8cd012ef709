//! Transactions and nested savepoints.
//!
//! [`transaction`] wraps a closure in `begin` / `commit`, rolling back when the
//! closure returns an error or panics. Inside it, [`Transaction::nested`] opens
//! a savepoint named `<prefix><depth>` and releases it on success or rolls
//! back to it on failure. Either way the original error reaches the caller; a
//! failing rollback is only logged.
//!
//! # Example
//!
//! ```ignore
//! use sqlweave::{Placeholders, WeaveResult};
//!
//! # async fn demo(session: &sqlweave::PgSession, insert: sqlweave::PreparedQuery) -> WeaveResult<()> {
//! sqlweave::transaction!(session, tx, {
//!     insert.run(&tx, &Placeholders::new()).await?;
//!
//!     // A failure here rolls back to the savepoint only.
//!     let nested: WeaveResult<()> = sqlweave::savepoint!(tx, inner, {
//!         insert.run(&inner, &Placeholders::new()).await?;
//!         Ok(())
//!     });
//!     if let Err(e) = nested {
//!         tracing::warn!("nested insert failed: {e}");
//!     }
//!     Ok(())
//! })
//! # }
//! ```

use crate::config::SessionConfig;
use crate::dialect::Dialect;
use crate::error::{WeaveError, WeaveResult};
use crate::session::Session;
use crate::sql::BoundQuery;
use crate::value::Value;
use futures_util::FutureExt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, resume_unwind};

/// Runs the given block inside a transaction.
///
/// The block must evaluate to `sqlweave::WeaveResult<T>`. It is moved into an
/// `async move` block, so captured values are moved as well.
#[macro_export]
macro_rules! transaction {
    ($session:expr, $tx:ident, $body:block) => {
        $crate::transaction($session, |$tx| async move $body).await
    };
}

/// Runs the given block inside a savepoint of an existing transaction.
///
/// The block must evaluate to `sqlweave::WeaveResult<T>`.
#[macro_export]
macro_rules! savepoint {
    ($tx:expr, $inner:ident, $body:block) => {
        ($tx).nested(|$inner| async move $body).await
    };
}

/// A transaction scope on a [`Session`].
///
/// Depth 0 is the outermost transaction; each [`nested`](Self::nested) call
/// runs one level deeper.
#[derive(Debug)]
pub struct Transaction<'a, S> {
    session: &'a S,
    depth: u32,
}

impl<S> Clone for Transaction<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Transaction<'_, S> {}

impl<'a, S: Session> Transaction<'a, S> {
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Abort the surrounding scope.
    ///
    /// Returning this error from the closure rolls the scope back; the error
    /// itself is then returned to the caller as [`WeaveError::Rollback`].
    pub fn rollback<T>(&self) -> WeaveResult<T> {
        Err(WeaveError::Rollback)
    }

    /// Run `f` inside `savepoint <prefix><depth + 1>`.
    pub async fn nested<F, Fut, T>(&self, f: F) -> WeaveResult<T>
    where
        F: FnOnce(Transaction<'a, S>) -> Fut,
        Fut: Future<Output = WeaveResult<T>>,
    {
        let depth = self.depth + 1;
        let name = self.session.config().savepoint_name(depth);
        let inner = Transaction {
            session: self.session,
            depth,
        };
        run_scope(
            self.session,
            f(inner),
            format!("savepoint {name}"),
            format!("release savepoint {name}"),
            format!("rollback to savepoint {name}"),
        )
        .await
    }
}

impl<S: Session> Session for Transaction<'_, S> {
    fn dialect(&self) -> &dyn Dialect {
        self.session.dialect()
    }

    fn config(&self) -> &SessionConfig {
        self.session.config()
    }

    fn query_rows(
        &self,
        query: &BoundQuery,
    ) -> impl Future<Output = WeaveResult<Vec<Vec<Value>>>> + Send {
        self.session.query_rows(query)
    }

    fn execute(&self, query: &BoundQuery) -> impl Future<Output = WeaveResult<u64>> + Send {
        self.session.execute(query)
    }
}

/// Run `f` inside `begin` / `commit`.
///
/// An error returned by `f` triggers `rollback` and is then returned
/// unchanged. A panic inside `f` also triggers `rollback` before it resumes.
pub async fn transaction<'a, S, F, Fut, T>(session: &'a S, f: F) -> WeaveResult<T>
where
    S: Session,
    F: FnOnce(Transaction<'a, S>) -> Fut,
    Fut: Future<Output = WeaveResult<T>>,
{
    let tx = Transaction { session, depth: 0 };
    run_scope(
        session,
        f(tx),
        "begin".to_string(),
        "commit".to_string(),
        "rollback".to_string(),
    )
    .await
}

async fn control<S: Session>(session: &S, statement: &str) -> WeaveResult<()> {
    tracing::debug!(target: "sqlweave.tx", statement);
    session.execute(&BoundQuery::raw(statement)).await?;
    Ok(())
}

async fn rollback_quietly<S: Session>(session: &S, statement: &str) {
    if let Err(error) = control(session, statement).await {
        tracing::warn!(
            target: "sqlweave.tx",
            statement,
            error = %error,
            "rollback failed"
        );
    }
}

async fn run_scope<S, Fut, T>(
    session: &S,
    body: Fut,
    open: String,
    commit: String,
    rollback: String,
) -> WeaveResult<T>
where
    S: Session,
    Fut: Future<Output = WeaveResult<T>>,
{
    control(session, &open).await?;

    match AssertUnwindSafe(body).catch_unwind().await {
        Ok(Ok(value)) => match control(session, &commit).await {
            Ok(()) => Ok(value),
            Err(error) => {
                rollback_quietly(session, &rollback).await;
                Err(error)
            }
        },
        Ok(Err(error)) => {
            rollback_quietly(session, &rollback).await;
            Err(error)
        }
        Err(panic) => {
            rollback_quietly(session, &rollback).await;
            resume_unwind(panic)
        }
    }
}
