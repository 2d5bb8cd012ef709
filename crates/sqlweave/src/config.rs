//! Session configuration.

use crate::logger::{NoopLogger, QueryLogger};
use std::sync::Arc;

/// Settings shared by a session and the transactions opened on it.
///
/// # Example
///
/// ```ignore
/// use sqlweave::{SessionConfig, TracingLogger};
///
/// let config = SessionConfig::new()
///     .with_logger(TracingLogger::new())
///     .log_params(true);
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    logger: Arc<dyn QueryLogger>,
    log_params: bool,
    savepoint_prefix: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            logger: Arc::new(NoopLogger),
            log_params: false,
            savepoint_prefix: "sp".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_logger(mut self, logger: impl QueryLogger + 'static) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    /// Pass bound parameter values to the logger.
    pub fn log_params(mut self, enabled: bool) -> Self {
        self.log_params = enabled;
        self
    }

    /// Prefix of savepoint names; nested transaction `n` uses `<prefix><n>`.
    pub fn savepoint_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.savepoint_prefix = prefix.into();
        self
    }

    pub fn logger(&self) -> &dyn QueryLogger {
        self.logger.as_ref()
    }

    pub fn logs_params(&self) -> bool {
        self.log_params
    }

    pub fn savepoint_name(&self, depth: u32) -> String {
        format!("{}{depth}", self.savepoint_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::new();
        assert!(!config.logs_params());
        assert_eq!(config.savepoint_name(1), "sp1");
    }

    #[test]
    fn custom_prefix() {
        let config = SessionConfig::new().savepoint_prefix("nested_");
        assert_eq!(config.savepoint_name(3), "nested_3");
    }
}
