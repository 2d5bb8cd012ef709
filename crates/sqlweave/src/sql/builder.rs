use crate::column::{Column, Decoder};
use crate::dialect::Dialect;
use crate::error::WeaveResult;
use crate::value::Value;
use std::sync::Arc;

use super::query::{ParamMode, Query, render};

/// Value bound at render time.
#[derive(Debug, Clone)]
pub enum ParamValue {
    Value(Value),
    /// Filled from [`Placeholders`](super::Placeholders) at execution time.
    Placeholder(String),
}

/// A bound parameter, optionally encoded with the codec of the column it is
/// compared against or assigned to.
#[derive(Debug, Clone)]
pub struct Param {
    pub value: ParamValue,
    pub encoder: Option<Arc<Column>>,
}

/// One fragment of a [`Sql`].
#[derive(Debug, Clone)]
pub enum Chunk {
    /// Literal SQL text, emitted verbatim.
    Raw(String),
    /// Identifier, quoted by the dialect.
    Name(String),
    /// Column reference, rendered `"table"."column"`.
    Column(Arc<Column>),
    Param(Param),
}

/// An ordered SQL fragment list with an optional result decoder.
///
/// Appending one `Sql` to another splices its chunks in place, so a `Sql` never
/// contains nested fragment lists.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct Sql {
    chunks: Vec<Chunk>,
    decoder: Option<Decoder>,
}

impl Sql {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Literal SQL text.
    pub fn raw(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut sql = Self::empty();
        if !text.is_empty() {
            sql.chunks.push(Chunk::Raw(text));
        }
        sql
    }

    /// A quoted identifier.
    pub fn identifier(name: impl Into<String>) -> Self {
        Self {
            chunks: vec![Chunk::Name(name.into())],
            decoder: None,
        }
    }

    /// A column reference; decodes with the column codec when projected.
    pub fn column(column: &Arc<Column>) -> Self {
        Self {
            chunks: vec![Chunk::Column(Arc::clone(column))],
            decoder: Some(Decoder::Type(column.column_type.clone())),
        }
    }

    /// A bound parameter.
    pub fn param(value: impl Into<Value>) -> Self {
        let mut sql = Self::empty();
        sql.push_param(value);
        sql
    }

    /// A bound parameter encoded with `column`'s codec.
    pub fn param_for(value: impl Into<Value>, column: &Arc<Column>) -> Self {
        Self {
            chunks: vec![Chunk::Param(Param {
                value: ParamValue::Value(value.into()),
                encoder: Some(Arc::clone(column)),
            })],
            decoder: None,
        }
    }

    /// A named placeholder filled at execution time.
    pub fn placeholder(name: impl Into<String>) -> Self {
        Self {
            chunks: vec![Chunk::Param(Param {
                value: ParamValue::Placeholder(name.into()),
                encoder: None,
            })],
            decoder: None,
        }
    }

    /// A named placeholder encoded with `column`'s codec once supplied.
    pub fn placeholder_for(name: impl Into<String>, column: &Arc<Column>) -> Self {
        Self {
            chunks: vec![Chunk::Param(Param {
                value: ParamValue::Placeholder(name.into()),
                encoder: Some(Arc::clone(column)),
            })],
            decoder: None,
        }
    }

    /// Append literal text, merging with a trailing literal.
    pub fn push_raw(&mut self, text: &str) -> &mut Self {
        if text.is_empty() {
            return self;
        }
        match self.chunks.last_mut() {
            Some(Chunk::Raw(last)) => last.push_str(text),
            _ => self.chunks.push(Chunk::Raw(text.to_string())),
        }
        self
    }

    pub fn push_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.chunks.push(Chunk::Name(name.into()));
        self
    }

    pub fn push_column(&mut self, column: &Arc<Column>) -> &mut Self {
        self.chunks.push(Chunk::Column(Arc::clone(column)));
        self
    }

    pub fn push_param(&mut self, value: impl Into<Value>) -> &mut Self {
        self.chunks.push(Chunk::Param(Param {
            value: ParamValue::Value(value.into()),
            encoder: None,
        }));
        self
    }

    /// Splice `other`'s chunks onto the end. `other`'s decoder is dropped.
    pub fn append(&mut self, other: Sql) -> &mut Self {
        for chunk in other.chunks {
            match chunk {
                Chunk::Raw(text) => {
                    self.push_raw(&text);
                }
                chunk => self.chunks.push(chunk),
            }
        }
        self
    }

    /// Join fragments with `separator`.
    pub fn join(parts: impl IntoIterator<Item = Sql>, separator: &str) -> Sql {
        let mut out = Sql::empty();
        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 {
                out.push_raw(separator);
            }
            out.append(part);
        }
        out
    }

    /// Concatenate fragments with no separator.
    pub fn concat(parts: impl IntoIterator<Item = Sql>) -> Sql {
        Self::join(parts, "")
    }

    /// `(<self>)`, keeping the decoder.
    pub fn parenthesized(self) -> Sql {
        let decoder = self.decoder.clone();
        let mut out = Sql::raw("(");
        out.append(self);
        out.push_raw(")");
        out.decoder = decoder;
        out
    }

    /// Attach the decoder applied to this fragment's result column.
    pub fn map_with(mut self, decoder: impl Into<Decoder>) -> Self {
        self.decoder = Some(decoder.into());
        self
    }

    pub fn decoder(&self) -> Option<&Decoder> {
        self.decoder.as_ref()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The column if this fragment is exactly one column reference.
    pub fn as_column(&self) -> Option<&Arc<Column>> {
        match self.chunks.as_slice() {
            [Chunk::Column(column)] => Some(column),
            _ => None,
        }
    }

    /// Copy with every column reference replaced by its bare name.
    pub fn unqualified(&self) -> Sql {
        Sql {
            chunks: self
                .chunks
                .iter()
                .map(|chunk| match chunk {
                    Chunk::Column(column) => Chunk::Name(column.name.clone()),
                    other => other.clone(),
                })
                .collect(),
            decoder: self.decoder.clone(),
        }
    }

    /// Render with numbered/positional placeholders.
    pub fn to_query(&self, dialect: &dyn Dialect) -> WeaveResult<Query> {
        render(self, dialect, ParamMode::Bind)
    }

    /// Render with every parameter inlined as a literal (view definitions,
    /// logging).
    pub fn to_inline_sql(&self, dialect: &dyn Dialect) -> WeaveResult<String> {
        render(self, dialect, ParamMode::Inline).map(|query| query.sql)
    }
}

impl From<&Arc<Column>> for Sql {
    fn from(column: &Arc<Column>) -> Self {
        Sql::column(column)
    }
}

impl From<Arc<Column>> for Sql {
    fn from(column: Arc<Column>) -> Self {
        Sql::column(&column)
    }
}
