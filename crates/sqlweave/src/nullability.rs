//! Per-relation nullability of a select's result.
//!
//! The map starts with the `from` relation marked not-null; every join
//! updates it:
//!
//! | join  | effect                                             |
//! |-------|----------------------------------------------------|
//! | inner | new alias not-null                                 |
//! | left  | new alias nullable                                 |
//! | right | every existing alias nullable, new alias not-null  |
//! | full  | every existing alias nullable, new alias nullable  |
//!
//! Only the row mapper reads the map; it never affects SQL text.

use std::collections::BTreeMap;

/// Join kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinType {
    pub fn as_sql(self) -> &'static str {
        match self {
            JoinType::Inner => "inner",
            JoinType::Left => "left",
            JoinType::Right => "right",
            JoinType::Full => "full",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nullability {
    NotNull,
    Nullable,
}

/// Relation alias -> nullability.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NullabilityMap(BTreeMap<String, Nullability>);

impl NullabilityMap {
    /// Map for a statement reading from `base`.
    pub fn new(base: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(base.into(), Nullability::NotNull);
        Self(map)
    }

    /// Apply the join rule for a newly joined `alias`.
    pub fn apply_join(&mut self, alias: impl Into<String>, join_type: JoinType) {
        let alias = alias.into();
        match join_type {
            JoinType::Inner => {
                self.0.insert(alias, Nullability::NotNull);
            }
            JoinType::Left => {
                self.0.insert(alias, Nullability::Nullable);
            }
            JoinType::Right => {
                self.mark_all_nullable();
                self.0.insert(alias, Nullability::NotNull);
            }
            JoinType::Full => {
                self.mark_all_nullable();
                self.0.insert(alias, Nullability::Nullable);
            }
        }
    }

    fn mark_all_nullable(&mut self) {
        for value in self.0.values_mut() {
            *value = Nullability::Nullable;
        }
    }

    pub fn get(&self, alias: &str) -> Option<Nullability> {
        self.0.get(alias).copied()
    }

    /// Unknown aliases are treated as not-null.
    pub fn is_nullable(&self, alias: &str) -> bool {
        self.get(alias) == Some(Nullability::Nullable)
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.0.contains_key(alias)
    }

    /// Number of relations in the statement.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
