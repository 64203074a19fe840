//! Groups derived from group entries that list their members.

use std::collections::HashMap;

use dirgroup_core::GroupResolutionConfig;
use tracing::{debug, warn};

use super::GroupSet;
use crate::client::{DirectorySearch, SearchRequest};
use crate::entry::DirectoryEntry;
use crate::filter::Filter;

/// Per-call traversal state, shared across every base DN of one resolution.
///
/// `visited` maps each looked-up DN to its member list; `None` records a DN that is not a group
/// entry or whose lookup failed. It only grows, so a DN is looked up at most once per call. Keys
/// are compared case-insensitively.
#[derive(Debug, Default)]
struct ResolutionState {
    visited: HashMap<String, Option<Vec<String>>>,
}

impl ResolutionState {
    fn record(&mut self, dn: &str, members: Option<&[String]>) {
        let slot = self.visited.entry(dn.to_lowercase()).or_insert(None);
        if slot.is_none() {
            *slot = members.map(<[String]>::to_vec);
        }
    }

    fn is_visited(&self, dn: &str) -> bool {
        self.visited.contains_key(&dn.to_lowercase())
    }

    fn members(&self, dn: &str) -> Option<&[String]> {
        self.visited
            .get(&dn.to_lowercase())
            .and_then(Option::as_deref)
    }
}

/// Group awaiting expansion; `depth` is its distance below the candidate.
struct Frame {
    dn: String,
    depth: usize,
}

/// Tests candidate groups for membership of one user.
pub struct EntryGroupResolver<'a, S: ?Sized> {
    directory: &'a S,
    config: &'a GroupResolutionConfig,
}

impl<'a, S> EntryGroupResolver<'a, S>
where
    S: DirectorySearch + ?Sized,
{
    /// Creates a resolver; `source_attribute` is the member attribute on group entries.
    #[must_use]
    pub fn new(directory: &'a S, config: &'a GroupResolutionConfig) -> Self {
        Self { directory, config }
    }

    /// Returns the DNs of the candidate groups the user belongs to.
    ///
    /// The user is identified by the first value of `user_attribute` on `user`, compared
    /// literally against member values.
    pub async fn resolve(&self, candidates: &[String], user: &DirectoryEntry) -> Vec<String> {
        if candidates.is_empty() {
            return Vec::new();
        }
        let Some(user_attribute) = self.config.user_attribute.as_deref() else {
            warn!("entry-derived groups need a user attribute; skipping");
            return Vec::new();
        };
        let Some(user_value) = user.identifying_value(user_attribute) else {
            debug!(dn = user.dn(), user_attribute, "user entry has no identifying value");
            return Vec::new();
        };

        let groups = if self.config.nested {
            self.resolve_nested(candidates, user_value).await
        } else {
            self.resolve_direct(candidates, user_value).await
        };
        groups.into_vec()
    }

    /// One search per base DN; the server applies the membership test.
    async fn resolve_direct(&self, candidates: &[String], user_value: &str) -> GroupSet {
        let filter = Filter::And(vec![
            self.candidate_filter(candidates.iter().cloned()),
            Filter::equal(self.config.source_attribute.as_str(), user_value),
        ]);

        let mut groups = GroupSet::new();
        for base_dn in self.directory.base_dns() {
            let request = SearchRequest::new(base_dn.as_str(), filter.clone())
                .with_attributes(self.attributes());
            match self.directory.search(&request).await {
                Ok(result) => groups.extend(result.entries.iter().map(DirectoryEntry::dn)),
                Err(err) => {
                    warn!(base_dn = %base_dn, error = %err, "group membership search failed");
                }
            }
        }
        groups
    }

    async fn resolve_nested(&self, candidates: &[String], user_value: &str) -> GroupSet {
        let filter = self.candidate_filter(candidates.iter().cloned());
        let mut state = ResolutionState::default();
        let mut groups = GroupSet::new();

        for base_dn in self.directory.base_dns() {
            let request = SearchRequest::new(base_dn.as_str(), filter.clone())
                .with_attributes(self.attributes());
            let entries = match self.directory.search(&request).await {
                Ok(result) => result.entries,
                Err(err) => {
                    warn!(base_dn = %base_dn, error = %err, "candidate group search failed");
                    continue;
                }
            };
            for entry in &entries {
                state.record(entry.dn(), self.members(entry));
            }

            for entry in &entries {
                let dn = entry.dn();
                if groups.contains(dn) {
                    continue;
                }
                let Some(members) = self.members(entry) else {
                    continue;
                };
                if members.iter().any(|member| member == user_value)
                    || self
                        .member_via_children(&base_dn, dn, user_value, &mut state)
                        .await
                {
                    groups.insert(dn);
                }
            }
        }
        groups
    }

    /// Depth-first walk below one candidate group using an explicit stack.
    ///
    /// Expanding a group fetches all of its not-yet-visited members in one search and tests each
    /// child's member list. The first child listing the user confirms the candidate and ends the
    /// walk. Groups more than `max_depth` hops below the candidate are never tested.
    async fn member_via_children(
        &self,
        base_dn: &str,
        candidate: &str,
        user_value: &str,
        state: &mut ResolutionState,
    ) -> bool {
        // Shallowest depth each group was reached at below this candidate.
        let mut reached: HashMap<String, usize> = HashMap::from([(candidate.to_lowercase(), 0)]);
        let mut stack = vec![Frame {
            dn: candidate.to_string(),
            depth: 0,
        }];

        while let Some(frame) = stack.pop() {
            let depth = frame.depth + 1;
            if depth > self.config.max_depth {
                continue;
            }
            let Some(children) = state.members(&frame.dn).map(<[String]>::to_vec) else {
                continue;
            };
            self.fetch_unvisited(base_dn, &children, depth, state).await;

            let mut next = Vec::new();
            for child in children {
                let Some(child_members) = state.members(&child) else {
                    continue;
                };
                if child_members.iter().any(|member| member == user_value) {
                    debug!(candidate, group = %child, depth, "membership found in child group");
                    return true;
                }
                let shallower = reached
                    .get(&child.to_lowercase())
                    .map_or(true, |&seen| depth < seen);
                if shallower {
                    reached.insert(child.to_lowercase(), depth);
                    next.push(Frame { dn: child, depth });
                }
            }
            // Reversed so the first child is expanded first.
            stack.extend(next.into_iter().rev());
        }
        false
    }

    /// Looks up the DNs that have not been visited yet in one search.
    async fn fetch_unvisited(
        &self,
        base_dn: &str,
        dns: &[String],
        depth: usize,
        state: &mut ResolutionState,
    ) {
        let pending: Vec<String> = dns
            .iter()
            .filter(|dn| !state.is_visited(dn))
            .cloned()
            .collect();
        if pending.is_empty() {
            return;
        }

        let request = SearchRequest::new(base_dn, self.candidate_filter(pending.iter().cloned()))
            .with_attributes(["dn", self.config.source_attribute.as_str()]);
        match self.directory.search(&request).await {
            Ok(result) => {
                for entry in &result.entries {
                    state.record(entry.dn(), self.members(entry));
                }
            }
            Err(err) => {
                warn!(
                    base_dn,
                    depth,
                    error = %err,
                    "child group search failed; skipping branch"
                );
            }
        }
        for dn in &pending {
            state.record(dn, None);
        }
    }

    fn candidate_filter<I>(&self, dns: I) -> Filter
    where
        I: IntoIterator<Item = String>,
    {
        Filter::any_of(&self.config.group_id_attribute, dns)
    }

    fn attributes(&self) -> Vec<&str> {
        let mut attributes = vec!["dn", self.config.source_attribute.as_str()];
        if let Some(user_attribute) = self.config.user_attribute.as_deref() {
            if !attributes
                .iter()
                .any(|name| name.eq_ignore_ascii_case(user_attribute))
            {
                attributes.push(user_attribute);
            }
        }
        attributes.push("objectClass");
        attributes
    }

    fn members<'e>(&self, entry: &'e DirectoryEntry) -> Option<&'e [String]> {
        entry
            .values(&self.config.source_attribute)
            .filter(|members| !members.is_empty())
    }
}

/// Resolves which of `candidates` contain the user; see [`EntryGroupResolver`].
pub async fn resolve_groups_by_entry<S>(
    directory: &S,
    candidates: &[String],
    config: &GroupResolutionConfig,
    user: &DirectoryEntry,
) -> Vec<String>
where
    S: DirectorySearch + ?Sized,
{
    EntryGroupResolver::new(directory, config)
        .resolve(candidates, user)
        .await
}
