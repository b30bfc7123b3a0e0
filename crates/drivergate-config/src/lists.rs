//! Comma-delimited package lists.
//!
//! Allowlists, denylists, and the opt-in/opt-out lists all share one
//! representation: an ordered sequence of package names split on `,` with no
//! trimming. Membership is an exact string match.

use std::fmt;

use serde::Serialize;

/// Token that marks an allowlist as covering every package.
pub const WILDCARD_ALL: &str = "*";

/// Delimiter between entries of a list-valued setting.
pub const LIST_DELIMITER: char = ',';

/// Ordered list of package names parsed from a delimited setting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListPolicy {
    entries: Vec<String>,
}

impl ListPolicy {
    /// Parses a raw setting value. Absent and empty values yield an empty list.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(value) if !value.is_empty() => Self {
                entries: value.split(LIST_DELIMITER).map(str::to_owned).collect(),
            },
            _ => Self::default(),
        }
    }

    /// Builds a list from already-split entries.
    #[must_use]
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `true` when `name` appears anywhere in the list.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry == name)
    }

    /// Returns the position of the first entry equal to `name`.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry == name)
    }

    /// Returns `true` when the first entry is [`WILDCARD_ALL`].
    ///
    /// A wildcard in any other position is an ordinary entry that matches no
    /// package.
    #[must_use]
    pub fn is_wildcard_all(&self) -> bool {
        self.index_of(WILDCARD_ALL) == Some(0)
    }

    /// Returns the entry at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    /// Returns the number of entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the list has no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the entries in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

impl fmt::Display for ListPolicy {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.entries.join(","))
    }
}
