//! RFC 4515 search filters.
//!
//! Filters are built as a small expression tree and rendered to the string form only when a
//! request goes on the wire, so every embedded value passes through [`escape_filter_value`].

use std::fmt;

use crate::entry::DirectoryEntry;

/// Search filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// All sub-filters must match.
    And(Vec<Filter>),
    /// At least one sub-filter must match.
    Or(Vec<Filter>),
    /// Negation.
    Not(Box<Filter>),
    /// Exact value match (`(attr=value)`).
    Equal {
        /// Attribute name.
        attribute: String,
        /// Raw, unescaped value.
        value: String,
    },
    /// Attribute presence (`(attr=*)`).
    Present(String),
    /// Pre-rendered filter string, passed through untouched.
    Raw(String),
}

impl Filter {
    /// Equality clause for an unescaped value.
    #[must_use]
    pub fn equal(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equal {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Presence clause.
    #[must_use]
    pub fn present(attribute: impl Into<String>) -> Self {
        Self::Present(attribute.into())
    }

    /// OR of one equality clause per value.
    #[must_use]
    pub fn any_of<I, V>(attribute: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self::Or(
            values
                .into_iter()
                .map(|value| Self::equal(attribute, value))
                .collect(),
        )
    }

    /// Evaluates the filter against an entry on the client side.
    ///
    /// Attribute names and values compare ignoring ASCII case, matching the default
    /// `caseIgnoreMatch` rule most directories use. `dn` and `distinguishedName` compare against
    /// the entry DN when the entry does not carry the attribute. [`Filter::Raw`] never matches.
    #[must_use]
    pub fn matches(&self, entry: &DirectoryEntry) -> bool {
        match self {
            Self::And(filters) => filters.iter().all(|f| f.matches(entry)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(entry)),
            Self::Not(filter) => !filter.matches(entry),
            Self::Equal { attribute, value } => match entry.values(attribute) {
                Some(values) => values.iter().any(|v| v.eq_ignore_ascii_case(value)),
                None => entry
                    .identifying_value(attribute)
                    .is_some_and(|v| v.eq_ignore_ascii_case(value)),
            },
            Self::Present(attribute) => {
                attribute.eq_ignore_ascii_case("objectClass")
                    || entry.identifying_value(attribute).is_some()
            }
            Self::Raw(_) => false,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And(filters) => write_set(f, '&', filters),
            Self::Or(filters) => write_set(f, '|', filters),
            Self::Not(filter) => write!(f, "(!{filter})"),
            Self::Equal { attribute, value } => {
                write!(f, "({attribute}={})", escape_filter_value(value))
            }
            Self::Present(attribute) => write!(f, "({attribute}=*)"),
            Self::Raw(raw) => f.write_str(raw),
        }
    }
}

fn write_set(f: &mut fmt::Formatter<'_>, op: char, filters: &[Filter]) -> fmt::Result {
    // A single-element set renders as the element itself.
    if let [only] = filters {
        return write!(f, "{only}");
    }
    write!(f, "({op}")?;
    for filter in filters {
        write!(f, "{filter}")?;
    }
    f.write_str(")")
}

/// Escapes a value for literal inclusion in a filter clause.
#[must_use]
pub fn escape_filter_value(value: &str) -> String {
    value
        .chars()
        .flat_map(|ch| match ch {
            '*' => "\\2a".chars().collect::<Vec<_>>(),
            '(' => "\\28".chars().collect(),
            ')' => "\\29".chars().collect(),
            '\\' => "\\5c".chars().collect(),
            '\0' => "\\00".chars().collect(),
            _ => vec![ch],
        })
        .collect::<String>()
}
