//! Correlation IDs for request and event-stream logs.

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Header a caller may use to supply its own request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Time-ordered (UUID v7) id attached to every proxied request and every
/// event stream connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Reuse the caller's `x-request-id` when it is a UUID, else mint one.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(Self)
            .unwrap_or_default()
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
