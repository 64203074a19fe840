//! Bind credentials for directory servers.

use secrecy::{ExposeSecret, SecretString};

/// Credentials used for the service bind.
///
/// An absent bind DN means an anonymous bind. The password never appears in `Debug` output.
#[derive(Debug, Default)]
pub struct BindCredentials {
    bind_dn: Option<String>,
    password: Option<SecretString>,
}

impl BindCredentials {
    /// Create credentials for a simple bind as `bind_dn`.
    #[must_use]
    pub fn new(bind_dn: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            bind_dn: Some(bind_dn.into()),
            password: Some(SecretString::from(password.into())),
        }
    }

    /// Create credentials for an anonymous bind.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Returns true for anonymous binds.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        self.bind_dn.is_none()
    }

    /// Get the bind DN (empty for anonymous binds).
    #[must_use]
    pub fn bind_dn(&self) -> &str {
        self.bind_dn.as_deref().unwrap_or_default()
    }

    /// Get the bind password (empty for anonymous binds).
    #[must_use]
    pub fn bind_password(&self) -> &str {
        self.password
            .as_ref()
            .map(|password| password.expose_secret())
            .unwrap_or_default()
    }
}
