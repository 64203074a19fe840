//! Configuration describing how group memberships are derived.
//!
//! Two structurally different models are supported and can be combined:
//!
//! - groups listed in an attribute on the user entry (`memberOf` style), see
//!   [`GroupMapping::by_attribute`];
//! - group entries that list their members (`member` / `uniqueMember` style), see
//!   [`GroupMapping::by_entry`].

use crate::Error;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Default maximum nesting depth followed when expanding nested groups.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Upper bound accepted for [`GroupResolutionConfig::max_depth`].
pub const MAX_DEPTH_LIMIT: usize = 50;

/// Settings for one group resolution strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct GroupResolutionConfig {
    /// Attribute holding group references.
    ///
    /// For attribute-derived resolution this lives on the user entry (e.g. `memberOf`); for
    /// entry-derived resolution it lives on the group entry (e.g. `uniqueMember`).
    #[validate(length(min = 1))]
    pub source_attribute: String,

    /// Attribute on the user entry whose value is listed in group member attributes.
    ///
    /// Only used for entry-derived resolution. `dn` selects the entry DN.
    #[validate(length(min = 1))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_attribute: Option<String>,

    /// Whether nested groups are expanded.
    #[serde(default)]
    pub nested: bool,

    /// Maximum number of nesting levels followed.
    #[validate(range(max = MAX_DEPTH_LIMIT))]
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Object class restricting nested attribute-derived lookups to group entries.
    #[validate(length(min = 1))]
    #[serde(default = "default_group_object_class")]
    pub group_object_class: String,

    /// Attribute compared against group identifiers in equality clauses.
    #[validate(length(min = 1))]
    #[serde(default = "default_group_id_attribute")]
    pub group_id_attribute: String,
}

const fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_group_object_class() -> String {
    "groupOfNames".to_string()
}

fn default_group_id_attribute() -> String {
    "distinguishedName".to_string()
}

impl GroupResolutionConfig {
    /// Create a configuration reading groups from `source_attribute`.
    #[must_use]
    pub fn new(source_attribute: impl Into<String>) -> Self {
        Self {
            source_attribute: source_attribute.into(),
            user_attribute: None,
            nested: false,
            max_depth: DEFAULT_MAX_DEPTH,
            group_object_class: default_group_object_class(),
            group_id_attribute: default_group_id_attribute(),
        }
    }

    /// Set the user attribute matched against group member values.
    #[must_use]
    pub fn with_user_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.user_attribute = Some(attribute.into());
        self
    }

    /// Enable or disable nested group expansion.
    #[must_use]
    pub const fn with_nested(mut self, nested: bool) -> Self {
        self.nested = nested;
        self
    }

    /// Set the maximum nesting depth.
    #[must_use]
    pub const fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the group object class used by nested attribute-derived lookups.
    #[must_use]
    pub fn with_group_object_class(mut self, object_class: impl Into<String>) -> Self {
        self.group_object_class = object_class.into();
        self
    }

    /// Set the attribute compared against group identifiers.
    #[must_use]
    pub fn with_group_id_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.group_id_attribute = attribute.into();
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] when a field is empty or out of range.
    pub fn check(&self) -> Result<(), Error> {
        self.validate()?;
        Ok(())
    }
}

/// Entry-derived strategy: candidate groups plus how to test membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct EntryGroupSource {
    /// Distinguished names of the groups to test.
    #[validate(length(min = 1))]
    pub candidate_groups: Vec<String>,

    /// Membership settings (`source_attribute` is the member attribute on groups).
    #[validate(nested)]
    pub resolution: GroupResolutionConfig,
}

impl EntryGroupSource {
    /// Create a new entry-derived source.
    #[must_use]
    pub fn new(candidate_groups: Vec<String>, resolution: GroupResolutionConfig) -> Self {
        Self {
            candidate_groups,
            resolution,
        }
    }
}

/// Which strategies contribute to a user's group set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct GroupMapping {
    /// Attribute-derived strategy.
    #[validate(nested)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_attribute: Option<GroupResolutionConfig>,

    /// Entry-derived strategy.
    #[validate(nested)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_entry: Option<EntryGroupSource>,
}

impl GroupMapping {
    /// Use the attribute-derived strategy.
    #[must_use]
    pub fn with_attribute(mut self, config: GroupResolutionConfig) -> Self {
        self.by_attribute = Some(config);
        self
    }

    /// Use the entry-derived strategy.
    #[must_use]
    pub fn with_entries(mut self, source: EntryGroupSource) -> Self {
        self.by_entry = Some(source);
        self
    }

    /// Returns true when no strategy is configured.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.by_attribute.is_none() && self.by_entry.is_none()
    }

    /// Validate the mapping and every configured strategy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] when no strategy is configured, when the entry-derived
    /// strategy lacks a user attribute, or [`Error::ValidationError`] for invalid fields.
    pub fn check(&self) -> Result<(), Error> {
        if self.is_empty() {
            return Err(Error::ConfigError(
                "group mapping must configure at least one strategy".to_string(),
            ));
        }
        if let Some(source) = &self.by_entry {
            if source.resolution.user_attribute.is_none() {
                return Err(Error::ConfigError(
                    "entry-derived groups require `user_attribute`".to_string(),
                ));
            }
        }
        self.validate()?;
        Ok(())
    }
}
