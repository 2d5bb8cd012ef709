//! Convenient imports for typical `sqlweave` usage.
//!
//! ```ignore
//! use sqlweave::prelude::*;
//! ```

pub use crate::expr::{
    and, asc, count, desc, eq, gt, gte, in_array, is_not_null, is_null, lt, lte, ne, not, or,
    sql_placeholder,
};
pub use crate::{
    Column, ColumnType, Fields, FromRecord, FromValue, PgDialect, Placeholders, PreparedQuery,
    QueryBuilder, Record, Session, SessionConfig, Sql, Table, ValueMap, Value, WeaveError,
    WeaveResult, transaction,
};
