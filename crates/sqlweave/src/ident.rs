//! SQL identifier validation and quoting.
//!
//! Identifiers (schema/table/column/alias names) are never bound as parameters,
//! so they are validated when a descriptor is created and quoted by the active
//! dialect when rendered:
//!
//! - names must be non-empty and must not contain NUL
//! - the dialect's quote character inside a name is escaped by doubling it
//!
//! # Example
//! ```ignore
//! use sqlweave::ident::write_quoted;
//!
//! let mut out = String::new();
//! write_quoted(&mut out, r#"has"quote"#, '"');
//! assert_eq!(out, r#""has""quote""#);
//! ```

use crate::error::{WeaveError, WeaveResult};

/// Check that `name` can be used as an identifier.
pub fn validate(name: &str) -> WeaveResult<()> {
    if name.is_empty() {
        return Err(WeaveError::config("Identifier cannot be empty"));
    }
    if name.contains('\0') {
        return Err(WeaveError::config(format!(
            "Identifier '{}' cannot contain NUL character",
            name.replace('\0', "\\0")
        )));
    }
    Ok(())
}

/// Append `name` surrounded by `quote`, doubling any embedded quote.
pub fn write_quoted(out: &mut String, name: &str, quote: char) {
    out.reserve(name.len() + 2);
    out.push(quote);
    for ch in name.chars() {
        if ch == quote {
            out.push(quote);
        }
        out.push(ch);
    }
    out.push(quote);
}

/// Append `value` as a single-quoted string literal (`'` doubled).
pub fn write_string_literal(out: &mut String, value: &str) {
    out.reserve(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            out.push('\'');
        }
        out.push(ch);
    }
    out.push('\'');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quoted(name: &str, quote: char) -> String {
        let mut out = String::new();
        write_quoted(&mut out, name, quote);
        out
    }

    #[test]
    fn quotes_simple() {
        assert_eq!(quoted("users", '"'), r#""users""#);
        assert_eq!(quoted("users", '`'), "`users`");
    }

    #[test]
    fn doubles_embedded_quote() {
        assert_eq!(quoted(r#"has"quote"#, '"'), r#""has""quote""#);
        assert_eq!(quoted("back`tick", '`'), "`back``tick`");
    }

    #[test]
    fn other_quote_chars_pass_through() {
        assert_eq!(quoted("it`s", '"'), "\"it`s\"");
    }

    #[test]
    fn string_literal_escapes() {
        let mut out = String::new();
        write_string_literal(&mut out, "O'Brien");
        assert_eq!(out, "'O''Brien'");
    }

    #[test]
    fn rejects_empty() {
        assert!(validate("").is_err());
    }

    #[test]
    fn rejects_nul() {
        assert!(validate("a\0b").is_err());
    }

    #[test]
    fn accepts_anything_else() {
        assert!(validate("CamelCase Table").is_ok());
        assert!(validate("schema.with.dots").is_ok());
    }
}
