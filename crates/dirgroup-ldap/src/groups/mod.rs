//! Group-membership resolution.
//!
//! - [`attribute`] reads groups from an attribute on the user entry (`memberOf` style) and can
//!   follow the same attribute on the group entries it finds.
//! - [`entry`] tests candidate group entries that list their members and can walk child groups.
//! - [`aggregate`] combines both into one set per user.
//!
//! Failed sub-searches never abort a resolution; they are logged and contribute nothing.

pub mod aggregate;
pub mod attribute;
pub mod entry;

use std::collections::HashSet;

pub use aggregate::GroupAggregator;
pub use attribute::{resolve_groups_by_attribute, AttributeGroupResolver};
pub use entry::{resolve_groups_by_entry, EntryGroupResolver};

/// Ordered set of group identifiers.
///
/// Identifiers compare by exact string equality and keep the order they were first seen in.
#[derive(Debug, Clone, Default)]
pub struct GroupSet {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl GroupSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an identifier, returning true if it was not present.
    pub fn insert(&mut self, group: impl Into<String>) -> bool {
        let group = group.into();
        if self.seen.contains(&group) {
            return false;
        }
        self.seen.insert(group.clone());
        self.order.push(group);
        true
    }

    /// Returns true if the identifier is present.
    #[must_use]
    pub fn contains(&self, group: &str) -> bool {
        self.seen.contains(group)
    }

    /// Number of identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates identifiers in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.iter().map(String::as_str)
    }

    /// Consumes the set, returning identifiers in discovery order.
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.order
    }
}

/// Set equality; discovery order is ignored.
impl PartialEq for GroupSet {
    fn eq(&self, other: &Self) -> bool {
        self.seen == other.seen
    }
}

impl Eq for GroupSet {}

impl<S: Into<String>> Extend<S> for GroupSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for group in iter {
            self.insert(group);
        }
    }
}

impl<S: Into<String>> FromIterator<S> for GroupSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl IntoIterator for GroupSet {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.into_iter()
    }
}
