//! In-memory directory shared by the integration tests.
//!
//! Entries are matched with [`Filter::matches`], so the resolvers run against the same filters
//! they would send to a server. Every request is logged for assertions on query counts.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dirgroup_ldap::{
    DirectoryEntry, DirectorySearch, Error, Filter, LdapConnector, LdapSession, Result,
    SearchRequest, SearchResponse, SearchResult, SearchScope,
};
use serde::Deserialize;

/// Result code returned for bases configured to fail.
pub const RC_UNAVAILABLE: u32 = 52;
/// Result code returned when a size limit cuts a search short.
pub const RC_SIZE_LIMIT_EXCEEDED: u32 = 4;

#[derive(Debug, Deserialize)]
struct FixtureEntry {
    dn: String,
    #[serde(default)]
    attributes: HashMap<String, Vec<String>>,
}

/// Directory contents plus the searches issued against them.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    base_dns: Vec<String>,
    entries: Vec<DirectoryEntry>,
    failing_bases: Vec<String>,
    requests: Mutex<Vec<SearchRequest>>,
}

impl MemoryDirectory {
    /// Empty directory searched under the given bases.
    pub fn new<I, S>(base_dns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            base_dns: base_dns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Loads entries from `tests/fixtures/<name>`.
    pub fn from_fixture<I, S>(name: &str, base_dns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path).unwrap_or_else(|e| {
            panic!("Failed to read fixture at {}: {}", path.display(), e)
        });
        let entries: Vec<FixtureEntry> = serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("Failed to parse fixture {}: {}", path.display(), e));

        entries
            .into_iter()
            .fold(Self::new(base_dns), |directory, entry| {
                directory.with_entry(DirectoryEntry::from((entry.dn, entry.attributes)))
            })
    }

    /// Adds an entry.
    pub fn with_entry(mut self, entry: DirectoryEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Adds a group entry listing `members` under `attribute`.
    pub fn with_group<I, S>(self, dn: &str, attribute: &str, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_entry(
            DirectoryEntry::new(dn)
                .with_attribute("objectClass", ["top", "groupOfNames"])
                .with_attribute(attribute, members),
        )
    }

    /// Makes every search under `base_dn` fail.
    pub fn with_failing_base(mut self, base_dn: impl Into<String>) -> Self {
        self.failing_bases.push(base_dn.into());
        self
    }

    /// All searches issued so far.
    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of searches issued so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// How often each value was asked for in an equality clause on `attribute`.
    pub fn queried_values(&self, attribute: &str) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for request in self.requests() {
            let mut values = Vec::new();
            equality_values(&request.filter, attribute, &mut values);
            for value in values {
                *counts.entry(value.to_lowercase()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Entries in scope of the request that match its filter, projected to the requested
    /// attributes.
    pub fn evaluate(&self, request: &SearchRequest) -> Vec<DirectoryEntry> {
        self.entries
            .iter()
            .filter(|entry| in_scope(entry.dn(), &request.base_dn, request.scope))
            .filter(|entry| request.filter.matches(entry))
            .map(|entry| project(entry, &request.attributes))
            .collect()
    }

    fn fails(&self, base_dn: &str) -> bool {
        self.failing_bases
            .iter()
            .any(|failing| failing.eq_ignore_ascii_case(base_dn))
    }
}

#[async_trait]
impl DirectorySearch for MemoryDirectory {
    fn base_dns(&self) -> Vec<String> {
        self.base_dns.clone()
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResult> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fails(&request.base_dn) {
            return Err(Error::Search {
                base_dn: request.base_dn.clone(),
                code: RC_UNAVAILABLE,
                message: "server unavailable".to_string(),
            });
        }
        Ok(SearchResult::complete(self.evaluate(request)))
    }
}

/// Connector handing out sessions over a shared [`MemoryDirectory`].
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    directory: Arc<MemoryDirectory>,
    connects: Arc<AtomicUsize>,
}

impl MemoryConnector {
    pub fn new(directory: Arc<MemoryDirectory>) -> Self {
        Self {
            directory,
            connects: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of sessions opened.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LdapConnector for MemoryConnector {
    async fn connect(&self) -> Result<Box<dyn LdapSession>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            directory: self.directory.clone(),
        }))
    }
}

struct MemorySession {
    directory: Arc<MemoryDirectory>,
}

#[async_trait]
impl LdapSession for MemorySession {
    async fn simple_bind(&mut self, _dn: &str, _password: &str) -> Result<()> {
        Ok(())
    }

    async fn search(&mut self, request: &SearchRequest) -> Result<SearchResponse> {
        self.directory.requests.lock().unwrap().push(request.clone());
        let mut entries = self.directory.evaluate(request);
        let limit = request
            .size_limit
            .and_then(|limit| usize::try_from(limit).ok())
            .filter(|&limit| limit > 0);
        match limit {
            Some(limit) if entries.len() > limit => {
                entries.truncate(limit);
                Ok(SearchResponse {
                    entries,
                    result_code: RC_SIZE_LIMIT_EXCEEDED,
                    message: "size limit exceeded".to_string(),
                })
            }
            _ => Ok(SearchResponse {
                entries,
                result_code: 0,
                message: String::new(),
            }),
        }
    }

    async fn unbind(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Get the path to the test fixtures directory.
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn in_scope(dn: &str, base_dn: &str, scope: SearchScope) -> bool {
    let dn = dn.to_lowercase();
    let base = base_dn.to_lowercase();
    if dn == base {
        return scope != SearchScope::OneLevel;
    }
    let Some(relative) = dn.strip_suffix(&format!(",{base}")) else {
        return false;
    };
    match scope {
        SearchScope::Base => false,
        SearchScope::OneLevel => !relative.contains(','),
        SearchScope::Subtree => true,
    }
}

fn project(entry: &DirectoryEntry, attributes: &[String]) -> DirectoryEntry {
    if attributes.is_empty() {
        return entry.clone();
    }
    entry
        .attributes()
        .iter()
        .filter(|attr| {
            attributes
                .iter()
                .any(|wanted| wanted.eq_ignore_ascii_case(&attr.name))
        })
        .fold(DirectoryEntry::new(entry.dn()), |projected, attr| {
            projected.with_attribute(attr.name.clone(), attr.values.iter().cloned())
        })
}

fn equality_values(filter: &Filter, attribute: &str, out: &mut Vec<String>) {
    match filter {
        Filter::And(filters) | Filter::Or(filters) => {
            for filter in filters {
                equality_values(filter, attribute, out);
            }
        }
        Filter::Not(filter) => equality_values(filter, attribute, out),
        Filter::Equal { attribute: name, value } if name.eq_ignore_ascii_case(attribute) => {
            out.push(value.clone());
        }
        Filter::Equal { .. } | Filter::Present(_) | Filter::Raw(_) => {}
    }
}
