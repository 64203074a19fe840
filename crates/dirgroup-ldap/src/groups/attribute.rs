//! Groups derived from an attribute on the user entry.

use dirgroup_core::GroupResolutionConfig;
use tracing::{debug, warn};

use super::GroupSet;
use crate::client::{DirectorySearch, SearchRequest};
use crate::entry::DirectoryEntry;
use crate::filter::Filter;

/// Reads group identifiers from `source_attribute`, optionally following it through group
/// entries level by level.
pub struct AttributeGroupResolver<'a, S: ?Sized> {
    directory: &'a S,
    config: &'a GroupResolutionConfig,
}

impl<'a, S> AttributeGroupResolver<'a, S>
where
    S: DirectorySearch + ?Sized,
{
    /// Creates a resolver.
    #[must_use]
    pub fn new(directory: &'a S, config: &'a GroupResolutionConfig) -> Self {
        Self { directory, config }
    }

    /// Resolves the user's groups.
    ///
    /// Level 0 is the attribute on the user entry. With nesting enabled every further level is
    /// the same attribute on the group entries of the previous level, until a level adds nothing
    /// new or `max_depth` levels have been expanded.
    pub async fn resolve(&self, user: &DirectoryEntry) -> GroupSet {
        let attribute = self.config.source_attribute.as_str();
        let mut groups = GroupSet::new();
        let Some(values) = user.values(attribute) else {
            return groups;
        };

        let mut level: Vec<String> = values
            .iter()
            .filter(|value| groups.insert(value.as_str()))
            .cloned()
            .collect();
        if !self.config.nested {
            return groups;
        }

        let base_dns = self.directory.base_dns();
        let mut depth = 0;
        while !level.is_empty() && depth < self.config.max_depth {
            let filter = self.level_filter(&level);
            let mut next = Vec::new();
            for base_dn in &base_dns {
                let request = SearchRequest::new(base_dn.as_str(), filter.clone())
                    .with_attributes([attribute]);
                let result = match self.directory.search(&request).await {
                    Ok(result) => result,
                    Err(err) => {
                        warn!(
                            base_dn = %base_dn,
                            depth,
                            error = %err,
                            "nested group expansion failed; skipping branch"
                        );
                        continue;
                    }
                };
                for entry in &result.entries {
                    let Some(parents) = entry.values(attribute) else {
                        continue;
                    };
                    next.extend(
                        parents
                            .iter()
                            .filter(|parent| groups.insert(parent.as_str()))
                            .cloned(),
                    );
                }
            }
            depth += 1;
            debug!(depth, discovered = next.len(), "expanded nested attribute groups");
            level = next;
        }

        groups
    }

    fn level_filter(&self, level: &[String]) -> Filter {
        Filter::And(vec![
            Filter::equal("objectClass", self.config.group_object_class.as_str()),
            Filter::present(self.config.source_attribute.as_str()),
            Filter::any_of(&self.config.group_id_attribute, level.iter().cloned()),
        ])
    }
}

/// Resolves groups listed in an attribute of `user`; see [`AttributeGroupResolver`].
pub async fn resolve_groups_by_attribute<S>(
    directory: &S,
    user: &DirectoryEntry,
    config: &GroupResolutionConfig,
) -> GroupSet
where
    S: DirectorySearch + ?Sized,
{
    AttributeGroupResolver::new(directory, config)
        .resolve(user)
        .await
}
