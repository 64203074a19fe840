//! User entry lookup and helpers.

use async_trait::async_trait;
use dirgroup_core::Error;
use tracing::{debug, warn};

use crate::client::{DirectorySearch, SearchRequest};
use crate::config::DirectoryConfig;
use crate::entry::DirectoryEntry;
use crate::filter::Filter;
use crate::Result;

/// Resolves a login to the user's own directory entry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntryLookup: Send + Sync {
    /// Returns the entry for `name`, or `None` if the directory has no unique match.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory could not be searched at all.
    async fn lookup(&self, name: &str) -> Result<Option<DirectoryEntry>>;
}

/// Maps an application login to the name stored in the directory.
pub trait NameTransform: Send + Sync {
    /// Returns the directory name, or `None` to skip the lookup.
    fn transform(&self, name: &str) -> Option<String>;
}

/// Uses the login unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityTransform;

impl NameTransform for IdentityTransform {
    fn transform(&self, name: &str) -> Option<String> {
        Some(name.to_string())
    }
}

impl<F> NameTransform for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn transform(&self, name: &str) -> Option<String> {
        self(name)
    }
}

/// Where a user's email address comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MailSource {
    /// No email address is derived.
    #[default]
    None,
    /// First value of the attribute.
    Attribute(String),
    /// Template with `[attribute]` tokens, e.g. `[uid]@example.com`.
    Template(String),
}

impl MailSource {
    /// Picks the source from a directory configuration; the attribute wins over the template.
    #[must_use]
    pub fn from_config(config: &DirectoryConfig) -> Self {
        match (config.mail_attribute(), config.mail_template()) {
            (Some(attribute), _) => Self::Attribute(attribute.to_string()),
            (None, Some(template)) => Self::Template(template.to_string()),
            (None, None) => Self::None,
        }
    }

    /// Derives the email address for an entry.
    #[must_use]
    pub fn derive(&self, entry: &DirectoryEntry) -> Option<String> {
        match self {
            Self::None => None,
            Self::Attribute(attribute) => entry.first(attribute).map(str::to_string),
            Self::Template(template) => render_template(template, entry),
        }
    }
}

/// Replaces `[attribute]` tokens with the entry's first value; `None` if a token is unresolved.
fn render_template(template: &str, entry: &DirectoryEntry) -> Option<String> {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('[') {
        let end = rest[start..].find(']')? + start;
        rendered.push_str(&rest[..start]);
        rendered.push_str(entry.identifying_value(&rest[start + 1..end])?);
        rest = &rest[end + 1..];
    }
    rendered.push_str(rest);
    Some(rendered)
}

/// Looks up user entries by login attribute across all base DNs.
pub struct UserLookup<'a, S: ?Sized> {
    directory: &'a S,
    user_attribute: String,
    transform: Box<dyn NameTransform + 'a>,
    accept_missing_attribute: bool,
}

impl<'a, S> UserLookup<'a, S>
where
    S: DirectorySearch + ?Sized,
{
    /// Creates a lookup matching `user_attribute`.
    #[must_use]
    pub fn new(directory: &'a S, user_attribute: impl Into<String>) -> Self {
        Self {
            directory,
            user_attribute: user_attribute.into(),
            transform: Box::new(IdentityTransform),
            accept_missing_attribute: false,
        }
    }

    /// Creates a lookup from the directory configuration.
    ///
    /// Anonymous-bind configurations accept entries that do not expose the login attribute,
    /// since anonymous reads are often restricted to the DN.
    #[must_use]
    pub fn from_config(directory: &'a S, config: &DirectoryConfig) -> Self {
        Self::new(directory, config.user_attribute())
            .with_missing_attribute_accepted(config.credentials().is_anonymous())
    }

    /// Installs a name transformation hook.
    #[must_use]
    pub fn with_name_transform(mut self, transform: impl NameTransform + 'a) -> Self {
        self.transform = Box::new(transform);
        self
    }

    /// Accept a unique match even when the login attribute is not returned.
    #[must_use]
    pub const fn with_missing_attribute_accepted(mut self, accept: bool) -> Self {
        self.accept_missing_attribute = accept;
        self
    }

    fn accepts(&self, entry: &DirectoryEntry, login: &str) -> bool {
        let wanted = login.to_lowercase();
        match entry.values(&self.user_attribute) {
            // Servers tolerate surrounding spaces in values; the login must match exactly.
            Some(values) => values
                .iter()
                .any(|value| value.trim().to_lowercase() == wanted),
            None => self.accept_missing_attribute,
        }
    }
}

#[async_trait]
impl<'a, S> EntryLookup for UserLookup<'a, S>
where
    S: DirectorySearch + ?Sized,
{
    async fn lookup(&self, name: &str) -> Result<Option<DirectoryEntry>> {
        let Some(login) = self.transform.transform(name).filter(|l| !l.is_empty()) else {
            debug!(name, "name transform produced no directory login");
            return Ok(None);
        };

        let mut last_error: Option<Error> = None;
        let mut searched = false;
        for base_dn in self.directory.base_dns() {
            let request = SearchRequest::new(
                base_dn.clone(),
                Filter::equal(self.user_attribute.as_str(), login.as_str()),
            );
            let result = match self.directory.search(&request).await {
                Ok(result) => result,
                Err(err) => {
                    warn!(base_dn = %base_dn, login = %login, error = %err, "user search failed");
                    last_error = Some(err);
                    continue;
                }
            };
            searched = true;

            match result.entries.as_slice() {
                [] => continue,
                [entry] if self.accepts(entry, &login) => return Ok(Some(entry.clone())),
                [entry] => {
                    debug!(dn = entry.dn(), login = %login, "user attribute does not match login");
                }
                many => {
                    warn!(
                        base_dn = %base_dn,
                        count = many.len(),
                        login = %login,
                        "login matches more than one entry"
                    );
                }
            }
        }

        match last_error {
            Some(err) if !searched => Err(err),
            _ => Ok(None),
        }
    }
}
