//! LDAP group-membership resolution.
//!
//! This crate searches one or more base DNs of an LDAP directory and derives the groups a user
//! belongs to. Two models are supported:
//!
//! - groups listed in an attribute on the user entry ([`resolve_groups_by_attribute`]),
//!   optionally expanded through the same attribute on group entries;
//! - group entries listing their members ([`resolve_groups_by_entry`]), optionally walking
//!   child groups with cycle protection and a depth bound.
//!
//! [`GroupAggregator`] combines whichever strategies a [`GroupMapping`] configures. All searches
//! go through the [`DirectorySearch`] trait; [`DirectoryClient`] implements it over `ldap3`.

#![deny(missing_docs)]

mod client;
mod config;
mod diagnostics;
mod entry;
mod filter;
pub mod groups;
mod user;

pub use client::{
    DirectoryClient, DirectorySearch, LdapConnector, LdapSession, RealLdapConnector, SearchRequest,
    SearchResponse, SearchResult, SearchScope,
};
pub use config::{DirectoryConfig, DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_OPERATION_TIMEOUT_SECS};
pub use diagnostics::{DiagnosticSink, SearchDiagnostic, TracingSink};
pub use dirgroup_core::{
    BindCredentials, EntryGroupSource, Error, GroupMapping, GroupResolutionConfig,
    DEFAULT_MAX_DEPTH,
};
pub use entry::{Attribute, DirectoryEntry};
pub use filter::{escape_filter_value, Filter};
pub use groups::{
    resolve_groups_by_attribute, resolve_groups_by_entry, AttributeGroupResolver,
    EntryGroupResolver, GroupAggregator, GroupSet,
};
pub use user::{EntryLookup, IdentityTransform, MailSource, NameTransform, UserLookup};

/// Convenient result alias that reuses the core error type.
pub type Result<T> = dirgroup_core::Result<T>;
