//! Beacon API error types.
//!
//! Every failure that reaches a client is rendered as the Beacon API default
//! error body `{"message": "...", "code": <http status>}`, optionally with a
//! list of indexed failures for batch submission endpoints.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One rejected item of a batch submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedFailure {
    pub index: u64,
    pub message: String,
}

/// Client-facing error with an HTTP status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status code
    pub code: u16,
    /// Error message
    pub message: String,
    /// Per-item failures (batch endpoints only)
    pub failures: Option<Vec<IndexedFailure>>,
}

impl ApiError {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            failures: None,
        }
    }

    /// 500 with a plain message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }

    /// 500 prefixed with what the gateway was doing, like `"could not decode body: ..."`.
    pub fn internal_with_context(context: &str, err: impl fmt::Display) -> Self {
        Self::new(500, format!("{}: {}", context, err))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Overlay fields from a custom error document sent by the upstream in
    /// the metadata namespace. Fields absent from the document are kept.
    pub fn merge_custom(&mut self, custom: &str) -> Result<(), serde_json::Error> {
        #[derive(Deserialize)]
        struct CustomError {
            message: Option<String>,
            failures: Option<Vec<IndexedFailure>>,
        }

        let custom: CustomError = serde_json::from_str(custom)?;
        if let Some(message) = custom.message {
            self.message = message;
        }
        if custom.failures.is_some() {
            self.failures = custom.failures;
        }
        Ok(())
    }

    /// Serialised body.
    pub fn to_json_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_else(|_| {
            format!(r#"{{"message":"internal error","code":{}}}"#, self.code).into_bytes()
        })
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl Serialize for ApiError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let len = if self.failures.is_some() { 3 } else { 2 };
        let mut state = serializer.serialize_struct("ApiError", len)?;
        state.serialize_field("message", &self.message)?;
        state.serialize_field("code", &self.code)?;
        if let Some(ref failures) = self.failures {
            state.serialize_field("failures", failures)?;
        }
        state.end()
    }
}

impl<'de> Deserialize<'de> for ApiError {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // The upstream puts its own (non-HTTP) code in `code`; callers
        // overwrite it with the response status.
        #[derive(Deserialize)]
        struct ErrorHelper {
            #[serde(default)]
            code: Option<serde_json::Value>,
            #[serde(default)]
            message: String,
            #[serde(default)]
            failures: Option<Vec<IndexedFailure>>,
        }

        let helper = ErrorHelper::deserialize(deserializer)?;
        let code = helper
            .code
            .and_then(|c| c.as_u64())
            .and_then(|c| u16::try_from(c).ok())
            .unwrap_or(500);
        Ok(ApiError {
            code,
            message: helper.message,
            failures: helper.failures,
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = self.to_json_bytes();
        let len = body.len();
        let mut response = (self.status(), body).into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(crate::domain::negotiation::JSON_MEDIA_TYPE),
        );
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
        response
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::internal_with_context("could not process JSON", e)
    }
}

/// Result type for gateway handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Service-level errors (start-up and wiring, never sent to clients)
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// Upstream client could not be built
    #[error("upstream client error: {0}")]
    Upstream(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_error_body() {
        let err = ApiError::not_found("state root not found in the last 8192 state roots");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], 404);
        assert_eq!(
            json["message"],
            "state root not found in the last 8192 state roots"
        );
        assert!(json.get("failures").is_none());
    }

    #[test]
    fn test_failures_serialised() {
        let mut err = ApiError::bad_request("some attestations failed");
        err.failures = Some(vec![IndexedFailure {
            index: 2,
            message: "bad signature".into(),
        }]);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["failures"][0]["index"], 2);
    }

    #[test]
    fn test_merge_custom_error() {
        let mut err = ApiError::new(400, "rpc error");
        err.merge_custom(r#"{"message":"one or more failed","failures":[{"index":0,"message":"x"}]}"#)
            .unwrap();
        assert_eq!(err.code, 400);
        assert_eq!(err.message, "one or more failed");
        assert_eq!(err.failures.as_ref().map(Vec::len), Some(1));

        assert!(err.merge_custom("not json").is_err());
    }

    #[test]
    fn test_deserialize_upstream_error() {
        let err: ApiError =
            serde_json::from_str(r#"{"error":"x","code":5,"message":"not found"}"#).unwrap();
        assert_eq!(err.message, "not found");
        assert_eq!(err.code, 5);
    }

    #[test]
    fn test_into_response_headers() {
        let resp = ApiError::internal("boom").into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");
        let expected = br#"{"message":"boom","code":500}"#.len();
        assert_eq!(
            resp.headers()[header::CONTENT_LENGTH],
            expected.to_string().as_str()
        );
    }

    #[test]
    fn test_invalid_status_falls_back_to_500() {
        assert_eq!(ApiError::new(5, "x").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
