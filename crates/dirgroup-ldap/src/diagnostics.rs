//! Structured search diagnostics.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::client::{SearchRequest, SearchScope};

/// Description of a search about to be issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchDiagnostic {
    /// Search base.
    pub base_dn: String,
    /// Rendered filter string.
    pub filter: String,
    /// Requested attributes (empty means all).
    pub attributes: Vec<String>,
    /// Search scope.
    pub scope: SearchScope,
    /// Caller supplied size limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_limit: Option<i32>,
    /// Caller supplied server-side time limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<Duration>,
}

impl From<&SearchRequest> for SearchDiagnostic {
    fn from(request: &SearchRequest) -> Self {
        Self {
            base_dn: request.base_dn.clone(),
            filter: request.filter.to_string(),
            attributes: request.attributes.clone(),
            scope: request.scope,
            size_limit: request.size_limit,
            time_limit: request.time_limit,
        }
    }
}

/// Receiver for search diagnostics.
///
/// Implementations must not block; a sink cannot fail or delay the search it describes.
pub trait DiagnosticSink: Send + Sync {
    /// Record one search.
    fn record(&self, diagnostic: &SearchDiagnostic);
}

/// Sink writing diagnostics as `tracing` debug events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, diagnostic: &SearchDiagnostic) {
        debug!(
            target: "dirgroup::search",
            base_dn = %diagnostic.base_dn,
            filter = %diagnostic.filter,
            attributes = ?diagnostic.attributes,
            scope = ?diagnostic.scope,
            size_limit = ?diagnostic.size_limit,
            time_limit = ?diagnostic.time_limit,
            "directory search"
        );
    }
}
