//! # sqlweave
//!
//! A dialect-aware SQL statement compiler with nullability-tracked result
//! mapping.
//!
//! ## Features
//!
//! - **Chunk IR**: statements are ordered trees of raw text, identifiers,
//!   columns and parameters, rendered once per dialect
//! - **Dialects**: Postgres, SQLite and MySQL quoting, placeholders, clause
//!   order and locking syntax
//! - **Nested results**: joined relations come back as nested records, and a
//!   left-joined relation with no match is `null` rather than an object of
//!   nulls
//! - **Owned builders**: every builder call consumes and returns the builder
//! - **Transactions**: `begin`/`commit`/`rollback` with savepoints for nesting
//!
//! ## Query Builder (qb)
//!
//! ```ignore
//! use sqlweave::prelude::*;
//!
//! let users = Table::new("users")
//!     .column(Column::new("id", ColumnType::Integer).primary_key())
//!     .column(Column::new("name", ColumnType::Text).not_null());
//! let pets = Table::new("pets")
//!     .column(Column::new("id", ColumnType::Integer).primary_key())
//!     .column(Column::new("owner_id", ColumnType::Integer));
//!
//! let qb = QueryBuilder::new(PgDialect);
//! let prepared = qb
//!     .select()
//!     .from(&users)
//!     .left_join(&pets, eq(&pets["owner_id"], &users["id"]))?
//!     .prepare()?;
//!
//! // [{ "users": { "id": 1, "name": "alice" }, "pets": null }, ...]
//! let records = prepared.all(&session, &Placeholders::new()).await?;
//! ```

pub mod column;
pub mod compiler;
pub mod config;
pub mod dialect;
pub mod error;
pub mod expr;
pub mod field;
pub mod ident;
pub mod logger;
pub mod mapper;
pub mod migrate;
pub mod nullability;
pub mod postgres;
pub mod prelude;
pub mod qb;
pub mod row;
pub mod session;
pub mod sql;
pub mod table;
pub mod transaction;
pub mod value;

pub use column::{Column, ColumnDefault, ColumnType, CustomType, Decoder};
pub use config::SessionConfig;
pub use dialect::{
    Dialect, LockConfig, LockStrength, LockingClause, MySqlDialect, PgDialect, SqliteDialect,
};
pub use error::{WeaveError, WeaveResult};
pub use field::{Field, Fields, ResolveMode, Selection};
pub use logger::{NoopLogger, QueryLogger, TracingLogger};
pub use mapper::{Mapped, Record, map_row};
pub use migrate::{MigrationMeta, migrate};
pub use nullability::{JoinType, Nullability, NullabilityMap};
pub use postgres::PgSession;
pub use row::{FromRecord, FromValue};
pub use session::{PreparedQuery, Session};
pub use sql::{BoundQuery, Placeholders, Query, QueryParam, Sql};
pub use table::{Source, Subquery, SubqueryKind, Table, View};
pub use transaction::{Transaction, transaction};
pub use value::Value;

pub use compiler::{OnConflict, ValueMap};
pub use qb::{
    CompoundSelect, DeleteBuilder, InsertBuilder, QueryBuilder, RecursiveCte, Resolver,
    SelectBuilder, UpdateBuilder,
};
