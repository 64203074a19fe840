//! LDAP search client implementation.

use crate::{
    config::DirectoryConfig,
    diagnostics::{DiagnosticSink, SearchDiagnostic, TracingSink},
    entry::DirectoryEntry,
    filter::Filter,
    Result,
};
use async_trait::async_trait;
use dirgroup_core::Error;
use ldap3::{LdapConnAsync, LdapConnSettings, Scope, SearchEntry, SearchOptions};
use native_tls::{Certificate, TlsConnector};
use serde::Serialize;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

const RC_SUCCESS: u32 = 0;
const RC_PROTOCOL_ERROR: u32 = 2;
const RC_SIZE_LIMIT_EXCEEDED: u32 = 4;
const RC_UNAVAILABLE_CRITICAL_EXTENSION: u32 = 12;
const RC_UNWILLING_TO_PERFORM: u32 = 53;
/// Client-side filter parse failure, reported with the C API `LDAP_FILTER_ERROR` code.
const RC_FILTER_ERROR: u32 = 87;

/// Represents the search scope for LDAP queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
    /// Base object only.
    Base,
    /// One level below the base.
    OneLevel,
    /// Entire subtree.
    Subtree,
}

impl From<SearchScope> for Scope {
    fn from(scope: SearchScope) -> Self {
        match scope {
            SearchScope::Base => Scope::Base,
            SearchScope::OneLevel => Scope::OneLevel,
            SearchScope::Subtree => Scope::Subtree,
        }
    }
}

/// A single scoped search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Search base.
    pub base_dn: String,
    /// Search filter.
    pub filter: Filter,
    /// Requested attributes; empty requests all user attributes.
    pub attributes: Vec<String>,
    /// Search scope.
    pub scope: SearchScope,
    /// Maximum number of entries the server should return.
    pub size_limit: Option<i32>,
    /// Server-side time limit.
    pub time_limit: Option<Duration>,
}

impl SearchRequest {
    /// Creates a subtree search without limits requesting all attributes.
    #[must_use]
    pub fn new(base_dn: impl Into<String>, filter: Filter) -> Self {
        Self {
            base_dn: base_dn.into(),
            filter,
            attributes: Vec::new(),
            scope: SearchScope::Subtree,
            size_limit: None,
            time_limit: None,
        }
    }

    /// Sets the requested attributes.
    #[must_use]
    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the search scope.
    #[must_use]
    pub const fn with_scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }

    /// Sets the size limit.
    ///
    /// A request carrying a positive size limit treats "size limit exceeded" as a truncated
    /// success. Zero means no limit, as on the wire; negative values are rejected by the client.
    #[must_use]
    pub const fn with_size_limit(mut self, limit: i32) -> Self {
        self.size_limit = Some(limit);
        self
    }

    /// Sets the server-side time limit.
    ///
    /// The server counts whole seconds, so any fraction is rounded up.
    #[must_use]
    pub const fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// The size limit the caller asked the server to enforce, if any.
    #[must_use]
    pub fn caller_size_limit(&self) -> Option<i32> {
        self.size_limit.filter(|limit| *limit > 0)
    }
}

/// Converts a time limit to the whole seconds sent to the server.
///
/// Zero would read as "unlimited", so sub-second limits round up to one second.
pub(crate) fn time_limit_secs(limit: Duration) -> i32 {
    let secs = limit
        .as_secs()
        .saturating_add(u64::from(limit.subsec_nanos() > 0));
    i32::try_from(secs).unwrap_or(i32::MAX)
}

/// Successful search outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResult {
    /// Returned entries in server order.
    pub entries: Vec<DirectoryEntry>,
    /// True when the server stopped at the caller supplied size limit.
    pub truncated: bool,
}

impl SearchResult {
    /// Complete result.
    #[must_use]
    pub fn complete(entries: Vec<DirectoryEntry>) -> Self {
        Self {
            entries,
            truncated: false,
        }
    }

    /// Returns true if no entries were returned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Unclassified response of a session search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResponse {
    /// Entries received before the final result message.
    pub entries: Vec<DirectoryEntry>,
    /// LDAP result code.
    pub result_code: u32,
    /// Diagnostic text from the server.
    pub message: String,
}

/// Search operations against the configured base DNs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectorySearch: Send + Sync {
    /// Base DNs searched by multi-base operations, in order.
    fn base_dns(&self) -> Vec<String>;

    /// Issues exactly one search.
    ///
    /// # Errors
    ///
    /// Returns the classified failure; no entries are returned alongside an error.
    async fn search(&self, request: &SearchRequest) -> Result<SearchResult>;
}

/// A connected LDAP session.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LdapSession: Send {
    /// Simple bind; empty DN and password bind anonymously.
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()>;
    /// Runs one search and returns the raw response.
    async fn search(&mut self, request: &SearchRequest) -> Result<SearchResponse>;
    /// Ends the session.
    async fn unbind(&mut self) -> Result<()>;
}

/// Establishes transport to the directory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LdapConnector: Send + Sync {
    /// Opens a new, unbound session.
    async fn connect(&self) -> Result<Box<dyn LdapSession>>;
}

/// Directory search client with a lazily bound, shared session.
///
/// The session is guarded by an async mutex, so concurrent callers serialize their use of the
/// bind context instead of interleaving requests on one connection.
pub struct DirectoryClient {
    config: Arc<DirectoryConfig>,
    connector: Box<dyn LdapConnector>,
    session: Mutex<Option<Box<dyn LdapSession>>>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl DirectoryClient {
    /// Creates a client that uses the real LDAP connector.
    #[must_use]
    pub fn new(config: DirectoryConfig) -> Self {
        let config = Arc::new(config);
        let connector: Box<dyn LdapConnector> = Box::new(RealLdapConnector::new(config.clone()));
        Self {
            config,
            connector,
            session: Mutex::new(None),
            diagnostics: Arc::new(TracingSink),
        }
    }

    /// Creates a client with a custom transport.
    #[must_use]
    pub fn with_connector(config: DirectoryConfig, connector: Box<dyn LdapConnector>) -> Self {
        Self {
            config: Arc::new(config),
            connector,
            session: Mutex::new(None),
            diagnostics: Arc::new(TracingSink),
        }
    }

    /// Replaces the diagnostic sink used when verbose diagnostics are enabled.
    #[must_use]
    pub fn with_diagnostic_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// Unbinds and drops the cached session, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the unbind request fails; the session is dropped regardless.
    pub async fn disconnect(&self) -> Result<()> {
        let session = self.session.lock().await.take();
        if let Some(mut session) = session {
            self.execute_with_timeout(session.unbind()).await?;
            info!(url = %self.config.url(), "disconnected from directory");
        }
        Ok(())
    }

    async fn connect_and_bind(&self) -> Result<Box<dyn LdapSession>> {
        let mut session = self.connector.connect().await?;
        let credentials = self.config.credentials();
        self.execute_with_timeout(
            session.simple_bind(credentials.bind_dn(), credentials.bind_password()),
        )
        .await?;
        info!(
            url = %self.config.url(),
            anonymous = credentials.is_anonymous(),
            "bound to directory"
        );
        Ok(session)
    }

    async fn execute_with_timeout<F, T>(&self, fut: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        timeout(self.config.operation_timeout(), fut)
            .await
            .map_err(|_| Error::Timeout("directory operation timed out".to_string()))?
    }
}

#[async_trait]
impl DirectorySearch for DirectoryClient {
    fn base_dns(&self) -> Vec<String> {
        self.config.base_dns().to_vec()
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResult> {
        if request.base_dn.trim().is_empty() {
            return Err(Error::Protocol(
                "search base DN must not be empty".to_string(),
            ));
        }
        if let Some(limit) = request.size_limit.filter(|limit| *limit < 0) {
            return Err(Error::InvalidRequest(format!(
                "search size limit must not be negative, got {limit}"
            )));
        }

        if self.config.verbose_diagnostics() {
            self.diagnostics.record(&SearchDiagnostic::from(request));
        }

        let mut guard = self.session.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect_and_bind().await?);
        }
        let session = guard
            .as_mut()
            .ok_or_else(|| Error::Connect("directory session unavailable".to_string()))?;

        let response = match self.execute_with_timeout(session.search(request)).await {
            Ok(response) => response,
            Err(err) => {
                if err.is_connection_failure() {
                    *guard = None;
                }
                warn!(
                    base_dn = %request.base_dn,
                    filter = %request.filter,
                    attributes = ?request.attributes,
                    error = %err,
                    "directory search failed"
                );
                return Err(err);
            }
        };
        drop(guard);

        classify_response(request, response)
    }
}

fn classify_response(request: &SearchRequest, response: SearchResponse) -> Result<SearchResult> {
    match response.result_code {
        RC_SUCCESS => Ok(SearchResult::complete(response.entries)),
        // Partial results are expected once the caller set a limit.
        RC_SIZE_LIMIT_EXCEEDED if request.caller_size_limit().is_some() => {
            debug!(
                base_dn = %request.base_dn,
                returned = response.entries.len(),
                "search truncated at size limit"
            );
            Ok(SearchResult {
                entries: response.entries,
                truncated: true,
            })
        }
        RC_PROTOCOL_ERROR | RC_UNAVAILABLE_CRITICAL_EXTENSION | RC_UNWILLING_TO_PERFORM => {
            Err(Error::Protocol(format!(
                "search under `{}` rejected (result code {}): {}",
                request.base_dn, response.result_code, response.message
            )))
        }
        code => {
            warn!(
                base_dn = %request.base_dn,
                filter = %request.filter,
                code,
                message = %response.message,
                "directory search returned an error"
            );
            Err(Error::Search {
                base_dn: request.base_dn.clone(),
                code,
                message: response.message,
            })
        }
    }
}

/// Real LDAP connector backed by `ldap3`.
pub struct RealLdapConnector {
    config: Arc<DirectoryConfig>,
}

impl RealLdapConnector {
    /// Creates a new connector instance.
    #[must_use]
    pub fn new(config: Arc<DirectoryConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl LdapConnector for RealLdapConnector {
    async fn connect(&self) -> Result<Box<dyn LdapSession>> {
        let settings = build_ldap_settings(&self.config)?;
        let (conn, ldap) = LdapConnAsync::with_settings(settings, self.config.url())
            .await
            .map_err(|err| {
                Error::Connect(format!("failed to connect to {}: {err}", self.config.url()))
            })?;
        ldap3::drive!(conn);
        debug!(url = %self.config.url(), "directory connection established");
        Ok(Box::new(RealLdapSession {
            inner: ldap,
            operation_timeout: self.config.operation_timeout(),
        }))
    }
}

struct RealLdapSession {
    inner: ldap3::Ldap,
    operation_timeout: Duration,
}

#[async_trait]
impl LdapSession for RealLdapSession {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()> {
        let result = timeout(self.operation_timeout, self.inner.simple_bind(dn, password))
            .await
            .map_err(|_| Error::Timeout("directory bind timed out".to_string()))?
            .map_err(|err| Error::Connect(err.to_string()))?;
        check_bind(dn, &result)
    }

    async fn search(&mut self, request: &SearchRequest) -> Result<SearchResponse> {
        let mut options = SearchOptions::new();
        if let Some(limit) = request.caller_size_limit() {
            options = options.sizelimit(limit);
        }
        if let Some(limit) = request.time_limit {
            options = options.timelimit(time_limit_secs(limit));
        }
        let filter = request.filter.to_string();

        let ldap3::SearchResult(entries, status) = timeout(
            self.operation_timeout,
            self.inner.with_search_options(options).search(
                &request.base_dn,
                request.scope.into(),
                &filter,
                request.attributes.clone(),
            ),
        )
        .await
        .map_err(|_| Error::Timeout("directory search timed out".to_string()))?
        .map_err(|err| map_search_error(&request.base_dn, err))?;

        Ok(SearchResponse {
            entries: entries
                .into_iter()
                .map(SearchEntry::construct)
                .map(DirectoryEntry::from)
                .collect(),
            result_code: status.rc,
            message: status.text,
        })
    }

    async fn unbind(&mut self) -> Result<()> {
        timeout(self.operation_timeout, self.inner.unbind())
            .await
            .map_err(|_| Error::Timeout("directory unbind timed out".to_string()))?
            .map_err(|err| Error::Connect(err.to_string()))?;
        Ok(())
    }
}

fn build_ldap_settings(config: &DirectoryConfig) -> Result<LdapConnSettings> {
    let mut settings = LdapConnSettings::new()
        .set_conn_timeout(config.connection_timeout())
        .set_starttls(config.start_tls());

    if !config.tls_verify() {
        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|err| {
                Error::ConfigError(format!("failed to construct TLS connector: {err}"))
            })?;
        settings = settings.set_connector(connector).set_no_tls_verify(true);
    } else if let Some(cert_path) = config.tls_ca_cert() {
        let pem = fs::read(cert_path).map_err(|err| {
            Error::ConfigError(format!(
                "failed to read directory CA certificate {}: {err}",
                cert_path.display()
            ))
        })?;
        let certificate = Certificate::from_pem(&pem).map_err(|err| {
            Error::ConfigError(format!("invalid directory CA certificate: {err}"))
        })?;
        let connector = TlsConnector::builder()
            .add_root_certificate(certificate)
            .build()
            .map_err(|err| {
                Error::ConfigError(format!("failed to load directory CA certificate: {err}"))
            })?;
        settings = settings.set_connector(connector);
    }

    Ok(settings)
}

fn check_bind(dn: &str, result: &ldap3::LdapResult) -> Result<()> {
    if result.rc == RC_SUCCESS {
        return Ok(());
    }
    Err(Error::Bind {
        dn: dn.to_string(),
        message: format!("{} (result code {})", result.text, result.rc),
    })
}

fn map_search_error(base_dn: &str, err: ldap3::LdapError) -> Error {
    match err {
        ldap3::LdapError::FilterParsing => Error::Search {
            base_dn: base_dn.to_string(),
            code: RC_FILTER_ERROR,
            message: "malformed search filter".to_string(),
        },
        ldap3::LdapError::LdapResult { result } => Error::Search {
            base_dn: base_dn.to_string(),
            code: result.rc,
            message: result.text,
        },
        other => Error::Connect(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirgroup_core::BindCredentials;
    use std::sync::Mutex as StdMutex;

    fn sample_config() -> DirectoryConfig {
        DirectoryConfig::new(
            "ldap://ldap.example.com",
            BindCredentials::new("cn=admin,dc=example,dc=com", "secret"),
            ["dc=example,dc=com"],
        )
        .unwrap()
    }

    fn sample_request() -> SearchRequest {
        SearchRequest::new("dc=example,dc=com", Filter::equal("uid", "jdoe"))
            .with_attributes(["uid", "memberOf"])
    }

    fn sample_entries(count: usize) -> Vec<DirectoryEntry> {
        (0..count)
            .map(|i| {
                DirectoryEntry::new(format!("uid=user{i},dc=example,dc=com"))
                    .with_attribute("uid", [format!("user{i}")])
            })
            .collect()
    }

    fn session_returning(result_code: u32, entries: usize) -> MockLdapSession {
        let mut session = MockLdapSession::new();
        session.expect_simple_bind().times(1).returning(|_, _| Ok(()));
        session.expect_search().returning(move |_| {
            Ok(SearchResponse {
                entries: sample_entries(entries),
                result_code,
                message: String::new(),
            })
        });
        session
    }

    fn client_with(session: MockLdapSession) -> DirectoryClient {
        let mut connector = MockLdapConnector::new();
        connector
            .expect_connect()
            .times(1)
            .return_once(move || Ok(Box::new(session)));
        DirectoryClient::with_connector(sample_config(), Box::new(connector))
    }

    #[derive(Default)]
    struct RecordingSink {
        records: StdMutex<Vec<SearchDiagnostic>>,
    }

    impl DiagnosticSink for RecordingSink {
        fn record(&self, diagnostic: &SearchDiagnostic) {
            self.records.lock().unwrap().push(diagnostic.clone());
        }
    }

    #[tokio::test]
    async fn connects_lazily_and_binds_once() {
        let mut session = MockLdapSession::new();
        session
            .expect_simple_bind()
            .withf(|dn, password| dn == "cn=admin,dc=example,dc=com" && password == "secret")
            .times(1)
            .returning(|_, _| Ok(()));
        session.expect_search().times(2).returning(|_| {
            Ok(SearchResponse {
                entries: sample_entries(1),
                ..SearchResponse::default()
            })
        });
        let client = client_with(session);

        let first = client.search(&sample_request()).await.unwrap();
        let second = client.search(&sample_request()).await.unwrap();
        assert_eq!(first.entries.len(), 1);
        assert_eq!(first, second);
        assert!(!first.truncated);
    }

    #[tokio::test]
    async fn size_limit_with_caller_limit_is_truncation() {
        let client = client_with(session_returning(RC_SIZE_LIMIT_EXCEEDED, 2));
        let request = sample_request().with_size_limit(2);

        let result = client.search(&request).await.unwrap();
        assert!(result.truncated);
        assert_eq!(result.entries.len(), 2);
    }

    #[tokio::test]
    async fn size_limit_without_caller_limit_fails() {
        let client = client_with(session_returning(RC_SIZE_LIMIT_EXCEEDED, 2));

        let result = client.search(&sample_request()).await;
        assert!(matches!(
            result,
            Err(Error::Search {
                code: RC_SIZE_LIMIT_EXCEEDED,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn zero_size_limit_is_not_a_caller_limit() {
        let client = client_with(session_returning(RC_SIZE_LIMIT_EXCEEDED, 2));
        let request = sample_request().with_size_limit(0);
        assert_eq!(request.caller_size_limit(), None);

        let result = client.search(&request).await;
        assert!(matches!(
            result,
            Err(Error::Search {
                code: RC_SIZE_LIMIT_EXCEEDED,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn negative_size_limit_is_rejected_before_connecting() {
        let mut connector = MockLdapConnector::new();
        connector.expect_connect().times(0);
        let client = DirectoryClient::with_connector(sample_config(), Box::new(connector));

        let result = client.search(&sample_request().with_size_limit(-1)).await;
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn time_limits_round_up_to_whole_seconds() {
        assert_eq!(time_limit_secs(Duration::from_millis(1)), 1);
        assert_eq!(time_limit_secs(Duration::from_millis(500)), 1);
        assert_eq!(time_limit_secs(Duration::from_secs(3)), 3);
        assert_eq!(time_limit_secs(Duration::from_millis(3_001)), 4);
        assert_eq!(time_limit_secs(Duration::ZERO), 0);
        assert_eq!(time_limit_secs(Duration::from_secs(u64::MAX)), i32::MAX);
    }

    #[tokio::test]
    async fn protocol_errors_are_classified() {
        let client = client_with(session_returning(RC_PROTOCOL_ERROR, 0));
        let result = client.search(&sample_request()).await;
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn server_failures_carry_no_entries() {
        let client = client_with(session_returning(32, 3));
        let result = client.search(&sample_request()).await;
        assert!(matches!(
            result,
            Err(Error::Search { code: 32, ref base_dn, .. }) if base_dn == "dc=example,dc=com"
        ));
    }

    #[tokio::test]
    async fn empty_base_dn_is_rejected_before_connecting() {
        let mut connector = MockLdapConnector::new();
        connector.expect_connect().times(0);
        let client = DirectoryClient::with_connector(sample_config(), Box::new(connector));

        let request = SearchRequest::new("  ", Filter::present("objectClass"));
        let result = client.search(&request).await;
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn bind_failure_is_not_cached() {
        let mut connector = MockLdapConnector::new();
        connector.expect_connect().times(2).returning(|| {
            let mut session = MockLdapSession::new();
            session.expect_simple_bind().returning(|dn, _| {
                Err(Error::Bind {
                    dn: dn.to_string(),
                    message: "invalid credentials".to_string(),
                })
            });
            Ok(Box::new(session))
        });
        let client = DirectoryClient::with_connector(sample_config(), Box::new(connector));

        for _ in 0..2 {
            let result = client.search(&sample_request()).await;
            assert!(matches!(result, Err(Error::Bind { .. })));
        }
    }

    #[tokio::test]
    async fn transport_failure_drops_session() {
        let mut broken = MockLdapSession::new();
        broken.expect_simple_bind().returning(|_, _| Ok(()));
        broken
            .expect_search()
            .times(1)
            .returning(|_| Err(Error::Connect("connection reset".to_string())));
        let healthy = session_returning(RC_SUCCESS, 1);

        let mut connector = MockLdapConnector::new();
        let mut sequence = mockall::Sequence::new();
        connector
            .expect_connect()
            .times(1)
            .in_sequence(&mut sequence)
            .return_once(move || Ok(Box::new(broken)));
        connector
            .expect_connect()
            .times(1)
            .in_sequence(&mut sequence)
            .return_once(move || Ok(Box::new(healthy)));
        let client = DirectoryClient::with_connector(sample_config(), Box::new(connector));

        assert!(matches!(
            client.search(&sample_request()).await,
            Err(Error::Connect(_))
        ));
        assert_eq!(client.search(&sample_request()).await.unwrap().entries.len(), 1);
    }

    #[tokio::test]
    async fn disconnect_unbinds_cached_session() {
        let mut session = session_returning(RC_SUCCESS, 0);
        session.expect_unbind().times(1).returning(|| Ok(()));
        let client = client_with(session);

        client.search(&sample_request()).await.unwrap();
        client.disconnect().await.unwrap();
        // Nothing cached any more; a second disconnect is a no-op.
        client.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn verbose_diagnostics_record_each_search() {
        let sink = Arc::new(RecordingSink::default());
        let mut connector = MockLdapConnector::new();
        connector
            .expect_connect()
            .return_once(move || Ok(Box::new(session_returning(RC_SUCCESS, 0))));
        let client = DirectoryClient::with_connector(
            sample_config().with_verbose_diagnostics(true),
            Box::new(connector),
        )
        .with_diagnostic_sink(sink.clone());

        let request = sample_request()
            .with_scope(SearchScope::OneLevel)
            .with_size_limit(10)
            .with_time_limit(Duration::from_secs(5));
        client.search(&request).await.unwrap();

        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].filter, "(uid=jdoe)");
        assert_eq!(records[0].size_limit, Some(10));
        assert_eq!(records[0].time_limit, Some(Duration::from_secs(5)));
        assert_eq!(records[0].scope, SearchScope::OneLevel);
    }

    #[tokio::test]
    async fn session_receives_scope_and_limits() {
        let mut session = MockLdapSession::new();
        session.expect_simple_bind().returning(|_, _| Ok(()));
        session
            .expect_search()
            .withf(|request| {
                request.scope == SearchScope::Base
                    && request.time_limit == Some(Duration::from_millis(250))
                    && request.caller_size_limit() == Some(1)
            })
            .times(1)
            .returning(|_| Ok(SearchResponse::default()));
        let client = client_with(session);

        let request = sample_request()
            .with_scope(SearchScope::Base)
            .with_size_limit(1)
            .with_time_limit(Duration::from_millis(250));
        assert!(client.search(&request).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn diagnostics_disabled_by_default() {
        let sink = Arc::new(RecordingSink::default());
        let client =
            client_with(session_returning(RC_SUCCESS, 0)).with_diagnostic_sink(sink.clone());

        client.search(&sample_request()).await.unwrap();
        assert!(sink.records.lock().unwrap().is_empty());
    }

    #[test]
    fn bind_result_classification() {
        let rejected = ldap3::LdapResult {
            rc: 49,
            matched: String::new(),
            text: "invalid credentials".to_string(),
            refs: Vec::new(),
            ctrls: Vec::new(),
        };
        let err = check_bind("cn=svc,dc=example,dc=com", &rejected).unwrap_err();
        assert!(matches!(err, Error::Bind { ref dn, .. } if dn == "cn=svc,dc=example,dc=com"));

        let accepted = ldap3::LdapResult { rc: 0, ..rejected };
        assert!(check_bind("cn=svc,dc=example,dc=com", &accepted).is_ok());
    }

    #[test]
    fn filter_parse_failures_surface_as_search_errors() {
        let err = map_search_error("dc=example,dc=com", ldap3::LdapError::FilterParsing);
        assert!(matches!(
            err,
            Error::Search {
                code: RC_FILTER_ERROR,
                ..
            }
        ));
    }
}
