//! Combining the configured strategies into one group set per user.

use dirgroup_core::{Error, GroupMapping};
use tracing::{debug, instrument};

use super::{AttributeGroupResolver, EntryGroupResolver, GroupSet};
use crate::client::DirectorySearch;
use crate::entry::DirectoryEntry;
use crate::user::EntryLookup;
use crate::Result;

/// Resolves a user's groups with every strategy configured in a [`GroupMapping`].
///
/// Attribute-derived groups come first, followed by entry-derived groups not already present.
/// Identifiers are compared by exact string equality.
pub struct GroupAggregator<'a, S: ?Sized> {
    directory: &'a S,
    mapping: &'a GroupMapping,
}

impl<'a, S> GroupAggregator<'a, S>
where
    S: DirectorySearch + ?Sized,
{
    /// Creates an aggregator.
    #[must_use]
    pub fn new(directory: &'a S, mapping: &'a GroupMapping) -> Self {
        Self { directory, mapping }
    }

    /// Resolves the groups of an already-fetched user entry.
    #[instrument(skip_all, fields(dn = user.dn()))]
    pub async fn groups_for_entry(&self, user: &DirectoryEntry) -> GroupSet {
        let mut groups = GroupSet::new();

        if let Some(config) = &self.mapping.by_attribute {
            let found = AttributeGroupResolver::new(self.directory, config)
                .resolve(user)
                .await;
            debug!(count = found.len(), "attribute-derived groups");
            groups.extend(found);
        }

        if let Some(source) = &self.mapping.by_entry {
            let found = EntryGroupResolver::new(self.directory, &source.resolution)
                .resolve(&source.candidate_groups, user)
                .await;
            debug!(count = found.len(), "entry-derived groups");
            groups.extend(found);
        }

        groups
    }

    /// Looks up the user by login and resolves their groups.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the lookup has no unique match, or the lookup's own
    /// error when the directory could not be searched.
    pub async fn groups_for_user<L>(&self, lookup: &L, name: &str) -> Result<GroupSet>
    where
        L: EntryLookup + ?Sized,
    {
        let user = lookup
            .lookup(name)
            .await?
            .ok_or_else(|| Error::NotFound(format!("no directory entry for user {name}")))?;
        Ok(self.groups_for_entry(&user).await)
    }
}
