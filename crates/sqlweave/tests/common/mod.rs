//! In-memory session for async tests.

#![allow(dead_code)]

use sqlweave::{
    BoundQuery, Dialect, PgDialect, Session, SessionConfig, Value, WeaveError, WeaveResult,
};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Records every statement it is asked to run, answers queries from a queue
/// of scripted result sets and fails statements that start with a configured
/// prefix.
#[derive(Debug)]
pub struct RecordingSession {
    dialect: Box<dyn Dialect>,
    config: SessionConfig,
    statements: Mutex<Vec<BoundQuery>>,
    results: Mutex<VecDeque<Vec<Vec<Value>>>>,
    failing: Mutex<Vec<String>>,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::with_dialect(PgDialect)
    }

    pub fn with_dialect(dialect: impl Dialect + 'static) -> Self {
        Self {
            dialect: Box::new(dialect),
            config: SessionConfig::new(),
            statements: Mutex::new(Vec::new()),
            results: Mutex::new(VecDeque::new()),
            failing: Mutex::new(Vec::new()),
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Queue the rows returned by the next `query_rows` call.
    pub fn push_rows(&self, rows: Vec<Vec<Value>>) {
        self.results.lock().unwrap().push_back(rows);
    }

    /// Fail every statement starting with `prefix`.
    pub fn fail_on(&self, prefix: &str) {
        self.failing.lock().unwrap().push(prefix.to_string());
    }

    pub fn sql_log(&self) -> Vec<String> {
        self.statements
            .lock()
            .unwrap()
            .iter()
            .map(|q| q.sql.clone())
            .collect()
    }

    pub fn statements(&self) -> Vec<BoundQuery> {
        self.statements.lock().unwrap().clone()
    }

    fn record(&self, query: &BoundQuery) -> WeaveResult<()> {
        self.statements.lock().unwrap().push(query.clone());
        let failing = self.failing.lock().unwrap();
        match failing.iter().find(|p| query.sql.starts_with(p.as_str())) {
            Some(prefix) => Err(WeaveError::Other(format!("scripted failure: {prefix}"))),
            None => Ok(()),
        }
    }
}

impl Session for RecordingSession {
    fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    fn config(&self) -> &SessionConfig {
        &self.config
    }

    async fn query_rows(&self, query: &BoundQuery) -> WeaveResult<Vec<Vec<Value>>> {
        self.record(query)?;
        Ok(self.results.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn execute(&self, query: &BoundQuery) -> WeaveResult<u64> {
        self.record(query)?;
        Ok(1)
    }
}
