//! SQL chunk IR.
//!
//! Every statement, expression and projection compiles down to a [`Sql`]: a
//! flat list of [`Chunk`]s (literal text, identifiers, column references and
//! bound parameters) plus an optional result decoder. Rendering a `Sql` with a
//! [`Dialect`](crate::Dialect) produces a [`Query`]: SQL text and the ordered
//! parameter list.
//!
//! # Example
//!
//! ```ignore
//! use sqlweave::{PgDialect, Sql};
//!
//! let mut q = Sql::raw("select * from ");
//! q.push_name("users").push_raw(" where id = ").push_param(1_i64);
//!
//! let query = q.to_query(&PgDialect)?;
//! assert_eq!(query.sql, r#"select * from "users" where id = $1"#);
//! ```

mod builder;
mod query;


pub use builder::{Chunk, Param, ParamValue, Sql};
pub use query::{BoundQuery, Placeholders, Query, QueryParam};
