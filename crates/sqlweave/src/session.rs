//! Execution boundary.
//!
//! A [`Session`] runs already-rendered statements and returns raw rows; it
//! never sees the chunk IR. [`PreparedQuery`] pairs a rendered statement with
//! the selection and nullability map needed to map its rows.

use crate::config::SessionConfig;
use crate::dialect::Dialect;
use crate::error::{WeaveError, WeaveResult};
use crate::field::Fields;
use crate::mapper::{Record, map_row};
use crate::nullability::NullabilityMap;
use crate::row::FromRecord;
use crate::sql::{BoundQuery, Placeholders, Query};
use crate::value::Value;
use std::future::Future;

/// A driver connection (or transaction) that executes bound statements.
pub trait Session: Send + Sync {
    fn dialect(&self) -> &dyn Dialect;

    fn config(&self) -> &SessionConfig;

    /// Run a statement and return its rows as positional values.
    fn query_rows(
        &self,
        query: &BoundQuery,
    ) -> impl Future<Output = WeaveResult<Vec<Vec<Value>>>> + Send;

    /// Run a statement and return the number of affected rows.
    fn execute(&self, query: &BoundQuery) -> impl Future<Output = WeaveResult<u64>> + Send;
}

/// A compiled statement ready to run any number of times.
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    query: Query,
    fields: Option<Fields>,
    nullability: Option<NullabilityMap>,
}

impl PreparedQuery {
    pub fn new(query: Query, fields: Option<Fields>, nullability: Option<NullabilityMap>) -> Self {
        Self {
            query,
            fields,
            nullability,
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn fields(&self) -> Option<&Fields> {
        self.fields.as_ref()
    }

    pub fn nullability(&self) -> Option<&NullabilityMap> {
        self.nullability.as_ref()
    }

    fn bind<S: Session>(&self, session: &S, placeholders: &Placeholders) -> WeaveResult<BoundQuery> {
        let bound = self.query.bind(placeholders)?;
        tracing::debug!(
            target: "sqlweave.sql",
            sql = %bound.sql,
            param_count = bound.params.len(),
        );
        let config = session.config();
        let params: &[Value] = if config.logs_params() {
            &bound.params
        } else {
            &[]
        };
        config.logger().log_query(&bound.sql, params);
        Ok(bound)
    }

    fn map_rows(&self, rows: Vec<Vec<Value>>) -> WeaveResult<Vec<Record>> {
        let fields = self.fields.as_ref().ok_or_else(|| {
            WeaveError::config("statement has no selection to map rows onto")
        })?;
        rows.into_iter()
            .map(|row| map_row(fields, row, self.nullability.as_ref()))
            .collect()
    }

    /// All rows, mapped.
    pub async fn all<S: Session>(
        &self,
        session: &S,
        placeholders: &Placeholders,
    ) -> WeaveResult<Vec<Record>> {
        let bound = self.bind(session, placeholders)?;
        let rows = session.query_rows(&bound).await?;
        self.map_rows(rows)
    }

    /// All rows, converted with [`FromRecord`].
    pub async fn all_as<T: FromRecord, S: Session>(
        &self,
        session: &S,
        placeholders: &Placeholders,
    ) -> WeaveResult<Vec<T>> {
        self.all(session, placeholders)
            .await?
            .iter()
            .map(T::from_record)
            .collect()
    }

    /// First row, mapped; `None` when there are no rows.
    pub async fn get<S: Session>(
        &self,
        session: &S,
        placeholders: &Placeholders,
    ) -> WeaveResult<Option<Record>> {
        let bound = self.bind(session, placeholders)?;
        let rows = session.query_rows(&bound).await?;
        Ok(self.map_rows(rows)?.into_iter().next())
    }

    /// First row, or [`WeaveError::NotFound`].
    pub async fn one<S: Session>(
        &self,
        session: &S,
        placeholders: &Placeholders,
    ) -> WeaveResult<Record> {
        self.get(session, placeholders)
            .await?
            .ok_or_else(|| WeaveError::not_found("query returned no rows"))
    }

    /// Raw positional rows, without mapping.
    pub async fn values<S: Session>(
        &self,
        session: &S,
        placeholders: &Placeholders,
    ) -> WeaveResult<Vec<Vec<Value>>> {
        let bound = self.bind(session, placeholders)?;
        session.query_rows(&bound).await
    }

    /// Execute, returning the affected row count.
    pub async fn run<S: Session>(
        &self,
        session: &S,
        placeholders: &Placeholders,
    ) -> WeaveResult<u64> {
        let bound = self.bind(session, placeholders)?;
        session.execute(&bound).await
    }
}
