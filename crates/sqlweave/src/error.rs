//! Error types for sqlweave

use thiserror::Error;

/// Result type alias for sqlweave operations
pub type WeaveResult<T> = Result<T, WeaveError>;

/// Error types for statement compilation, result mapping and execution
#[derive(Debug, Error)]
pub enum WeaveError {
    /// Invalid query configuration, detected while the query is being built
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal invariant violation while rendering a chunk tree
    #[error("Render error: {0}")]
    Render(String),

    /// Value could not be converted to its driver representation
    #[error("Encode error on column '{column}': {message}")]
    Encode { column: String, message: String },

    /// Driver value could not be converted to its logical representation
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// A named placeholder had no value at execution time
    #[error("No value for placeholder '{0}'")]
    MissingPlaceholder(String),

    /// The dialect cannot express the requested construct
    #[error("{dialect} does not support {feature}")]
    Unsupported {
        dialect: &'static str,
        feature: &'static str,
    },

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transaction rolled back on request
    #[error("Rollback")]
    Rollback,

    /// Driver-level failure
    #[error("Driver error: {0}")]
    Driver(#[from] tokio_postgres::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl WeaveError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a render (invariant violation) error
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render(message.into())
    }

    /// Create an encode error for a specific column
    pub fn encode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Encode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Check if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is an explicit rollback
    pub fn is_rollback(&self) -> bool {
        matches!(self, Self::Rollback)
    }

    /// Check if this is a driver error
    pub fn is_driver(&self) -> bool {
        matches!(self, Self::Driver(_))
    }
}
