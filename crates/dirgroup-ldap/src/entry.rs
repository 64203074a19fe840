//! Directory entries returned by searches.

use std::collections::HashMap;

/// Pseudo attribute names that resolve to the entry DN when not returned as attributes.
const DN_ATTRIBUTES: &[&str] = &["dn", "distinguishedName"];

/// A single attribute and its values, in server order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name as returned by the server.
    pub name: String,
    /// Attribute values.
    pub values: Vec<String>,
}

/// Directory entry with case-insensitive attribute lookup.
///
/// Servers do not agree on attribute name casing (`memberOf` vs `memberof`), so every lookup
/// compares names ignoring ASCII case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    dn: String,
    attributes: Vec<Attribute>,
}

impl DirectoryEntry {
    /// Creates an entry without attributes.
    #[must_use]
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: Vec::new(),
        }
    }

    /// Adds values for an attribute, merging with an existing attribute of the same name.
    #[must_use]
    pub fn with_attribute<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let name = name.into();
        let values = values.into_iter().map(Into::into);
        match self
            .attributes
            .iter_mut()
            .find(|attr| attr.name.eq_ignore_ascii_case(&name))
        {
            Some(existing) => existing.values.extend(values),
            None => self.attributes.push(Attribute {
                name,
                values: values.collect(),
            }),
        }
        self
    }

    /// Distinguished name of the entry.
    #[must_use]
    pub fn dn(&self) -> &str {
        &self.dn
    }

    /// All attributes in order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Returns all values for the attribute.
    #[must_use]
    pub fn values(&self, attribute: &str) -> Option<&[String]> {
        self.attributes
            .iter()
            .find(|attr| attr.name.eq_ignore_ascii_case(attribute))
            .map(|attr| attr.values.as_slice())
    }

    /// Returns the first value of the attribute if present.
    #[must_use]
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.values(attribute)
            .and_then(|values| values.first().map(String::as_str))
    }

    /// Returns true if the attribute is present with at least one value.
    #[must_use]
    pub fn has(&self, attribute: &str) -> bool {
        self.values(attribute).is_some_and(|values| !values.is_empty())
    }

    /// First value of `attribute`, falling back to the DN for `dn` / `distinguishedName`.
    #[must_use]
    pub fn identifying_value(&self, attribute: &str) -> Option<&str> {
        self.first(attribute).or_else(|| {
            DN_ATTRIBUTES
                .iter()
                .any(|name| name.eq_ignore_ascii_case(attribute))
                .then_some(self.dn.as_str())
        })
    }
}

impl From<ldap3::SearchEntry> for DirectoryEntry {
    fn from(entry: ldap3::SearchEntry) -> Self {
        Self::from((entry.dn, entry.attrs))
    }
}

impl From<(String, HashMap<String, Vec<String>>)> for DirectoryEntry {
    fn from((dn, attrs): (String, HashMap<String, Vec<String>>)) -> Self {
        // Attribute maps are unordered; sort by name for a stable layout.
        let mut names: Vec<_> = attrs.into_iter().collect();
        names.sort_by(|a, b| a.0.cmp(&b.0));
        names
            .into_iter()
            .fold(Self::new(dn), |acc, (name, values)| acc.with_attribute(name, values))
    }
}
