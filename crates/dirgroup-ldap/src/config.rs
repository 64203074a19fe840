//! Configuration types for directory server access.

use crate::Result;
use dirgroup_core::{BindCredentials, Error};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Default connection timeout (seconds).
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 10;
/// Default operation timeout (seconds).
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 10;

/// Configuration for one directory server.
#[derive(Debug)]
pub struct DirectoryConfig {
    url: String,
    credentials: BindCredentials,
    base_dns: Vec<String>,
    user_attribute: String,
    mail_attribute: Option<String>,
    mail_template: Option<String>,
    start_tls: bool,
    tls_verify: bool,
    tls_ca_cert: Option<PathBuf>,
    connection_timeout_secs: u64,
    operation_timeout_secs: u64,
    verbose_diagnostics: bool,
}

impl DirectoryConfig {
    /// Creates a new directory configuration searching the given base DNs.
    ///
    /// Empty base DNs are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or no usable base DN remains.
    pub fn new<I, S>(
        url: impl Into<String>,
        credentials: BindCredentials,
        base_dns: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let url_string = url.into();
        let parsed = Url::parse(&url_string)?;
        if !matches!(parsed.scheme(), "ldap" | "ldaps" | "ldapi") {
            return Err(Error::ConfigError(format!(
                "unsupported directory URL scheme `{}`",
                parsed.scheme()
            )));
        }

        let base_dns: Vec<String> = base_dns
            .into_iter()
            .map(Into::into)
            .map(|dn| dn.trim().to_string())
            .filter(|dn| !dn.is_empty())
            .collect();
        if base_dns.is_empty() {
            return Err(Error::ConfigError(
                "at least one base DN is required".to_string(),
            ));
        }

        Ok(Self {
            url: url_string,
            credentials,
            base_dns,
            user_attribute: "uid".to_string(),
            mail_attribute: None,
            mail_template: None,
            start_tls: false,
            tls_verify: true,
            tls_ca_cert: None,
            connection_timeout_secs: DEFAULT_CONNECTION_TIMEOUT_SECS,
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
            verbose_diagnostics: false,
        })
    }

    /// Returns the directory URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the bind credentials.
    #[must_use]
    pub const fn credentials(&self) -> &BindCredentials {
        &self.credentials
    }

    /// Returns the configured base DNs in search order.
    #[must_use]
    pub fn base_dns(&self) -> &[String] {
        &self.base_dns
    }

    /// Attribute holding the login name on user entries.
    #[must_use]
    pub fn user_attribute(&self) -> &str {
        &self.user_attribute
    }

    /// Attribute holding the email address on user entries.
    #[must_use]
    pub fn mail_attribute(&self) -> Option<&str> {
        self.mail_attribute.as_deref()
    }

    /// Template deriving an email address from `[attribute]` tokens.
    #[must_use]
    pub fn mail_template(&self) -> Option<&str> {
        self.mail_template.as_deref()
    }

    /// Returns whether StartTLS is negotiated on plain connections.
    #[must_use]
    pub const fn start_tls(&self) -> bool {
        self.start_tls
    }

    /// Returns whether TLS certificate verification is enabled.
    #[must_use]
    pub const fn tls_verify(&self) -> bool {
        self.tls_verify
    }

    /// Optional custom CA certificate path.
    #[must_use]
    pub fn tls_ca_cert(&self) -> Option<&PathBuf> {
        self.tls_ca_cert.as_ref()
    }

    /// Returns the connection timeout duration.
    #[must_use]
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Returns the operation timeout duration.
    #[must_use]
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    /// Returns whether each search is recorded to the diagnostic sink.
    #[must_use]
    pub const fn verbose_diagnostics(&self) -> bool {
        self.verbose_diagnostics
    }

    /// Overrides the login attribute used by user lookups.
    #[must_use]
    pub fn with_user_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.user_attribute = attribute.into();
        self
    }

    /// Sets the attribute read as the user's email address.
    #[must_use]
    pub fn with_mail_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.mail_attribute = Some(attribute.into());
        self
    }

    /// Sets the email template, e.g. `[uid]@example.com`.
    ///
    /// Only consulted when no mail attribute is configured.
    #[must_use]
    pub fn with_mail_template(mut self, template: impl Into<String>) -> Self {
        self.mail_template = Some(template.into());
        self
    }

    /// Enables or disables StartTLS.
    #[must_use]
    pub const fn with_start_tls(mut self, start_tls: bool) -> Self {
        self.start_tls = start_tls;
        self
    }

    /// Enables or disables TLS certificate verification.
    #[must_use]
    pub const fn with_tls_verification(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Sets the custom CA certificate path for TLS verification.
    #[must_use]
    pub fn with_tls_ca_cert(mut self, path: PathBuf) -> Self {
        self.tls_ca_cert = Some(path);
        self
    }

    /// Overrides the connection timeout in seconds.
    #[must_use]
    pub const fn with_connection_timeout_secs(mut self, seconds: u64) -> Self {
        self.connection_timeout_secs = seconds;
        self
    }

    /// Overrides the operation timeout in seconds.
    #[must_use]
    pub const fn with_operation_timeout_secs(mut self, seconds: u64) -> Self {
        self.operation_timeout_secs = seconds;
        self
    }

    /// Enables or disables search diagnostics.
    #[must_use]
    pub const fn with_verbose_diagnostics(mut self, verbose: bool) -> Self {
        self.verbose_diagnostics = verbose;
        self
    }
}
