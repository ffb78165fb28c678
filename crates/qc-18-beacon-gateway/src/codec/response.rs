//! Writing upstream responses back to clients.
//!
//! The internal gateway reports the real HTTP status in a metadata header
//! and prefixes all of its own headers with `Grpc-Metadata-`. None of those
//! reach the client.

use super::envelope::EnvelopeError;
use crate::domain::negotiation::{JSON_MEDIA_TYPE, OCTET_STREAM_MEDIA_TYPE, VERSION_HEADER};
use axum::body::Body;
use axum::http::header::{
    CONNECTION, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use bytes::Bytes;

/// Reserved header namespace of the internal gateway.
pub const METADATA_PREFIX: &str = "Grpc-Metadata-";
/// Metadata field carrying the intended HTTP status.
pub const HTTP_CODE_METADATA: &str = "Grpc-Metadata-X-Http-Code";
/// Metadata field carrying a JSON error document.
pub const CUSTOM_ERROR_METADATA: &str = "Grpc-Metadata-Custom-Error";

pub fn is_metadata_header(name: &HeaderName) -> bool {
    name.as_str()
        .get(..METADATA_PREFIX.len())
        .is_some_and(|p| p.eq_ignore_ascii_case(METADATA_PREFIX))
}

/// Headers the gateway recomputes itself.
fn is_recomputed(name: &HeaderName) -> bool {
    name == CONTENT_LENGTH || name == CONTENT_TYPE || name == TRANSFER_ENCODING || name == CONNECTION
}

/// Status smuggled in the metadata namespace, if any.
pub fn status_from_metadata(headers: &HeaderMap) -> Result<Option<StatusCode>, EnvelopeError> {
    let Some(value) = headers.get(HTTP_CODE_METADATA) else {
        return Ok(None);
    };
    let raw = value
        .to_str()
        .map_err(|e| EnvelopeError::InvalidStatusCode(e.to_string()))?;
    let code = raw
        .trim()
        .parse::<u16>()
        .map_err(|e| EnvelopeError::InvalidStatusCode(format!("'{}': {}", raw, e)))?;
    StatusCode::from_u16(code)
        .map(Some)
        .map_err(|e| EnvelopeError::InvalidStatusCode(format!("'{}': {}", raw, e)))
}

/// Upstream headers minus the metadata namespace and recomputed headers.
pub fn forwardable_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        if is_metadata_header(name) || is_recomputed(name) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

/// Outgoing status: the metadata status when present, else the nominal one.
pub fn effective_status(
    nominal: StatusCode,
    upstream: &HeaderMap,
) -> Result<StatusCode, EnvelopeError> {
    Ok(status_from_metadata(upstream)?.unwrap_or(nominal))
}

fn build(
    status: StatusCode,
    mut headers: HeaderMap,
    content_type: &'static str,
    body: Bytes,
) -> Response {
    headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// SSZ download response.
///
/// Sets exact `Content-Length`, octet-stream `Content-Type`, an attachment
/// disposition named `file_name` and, when `version` is given, the
/// lower-cased version header.
pub fn write_ssz_response(
    nominal: StatusCode,
    upstream_headers: &HeaderMap,
    raw: Bytes,
    version: Option<&str>,
    file_name: &str,
) -> Result<Response, EnvelopeError> {
    let status = effective_status(nominal, upstream_headers)?;
    let mut headers = forwardable_headers(upstream_headers);

    let disposition = HeaderValue::from_str(&format!("attachment; filename={}", file_name))
        .map_err(|e| EnvelopeError::Encode(e.to_string()))?;
    headers.insert(CONTENT_DISPOSITION, disposition);
    if let Some(version) = version {
        let version = HeaderValue::from_str(&version.to_ascii_lowercase())
            .map_err(|e| EnvelopeError::Encode(e.to_string()))?;
        headers.insert(VERSION_HEADER, version);
    }

    Ok(build(status, headers, OCTET_STREAM_MEDIA_TYPE, raw))
}

/// JSON response after the hook pipeline ran.
pub fn write_json_response(
    nominal: StatusCode,
    upstream_headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, EnvelopeError> {
    let status = effective_status(nominal, upstream_headers)?;
    Ok(build(
        status,
        forwardable_headers(upstream_headers),
        JSON_MEDIA_TYPE,
        body,
    ))
}

/// Status-only response (POST endpoints without a response body).
pub fn write_empty_response(
    nominal: StatusCode,
    upstream_headers: &HeaderMap,
) -> Result<Response, EnvelopeError> {
    let status = effective_status(nominal, upstream_headers)?;
    let mut headers = forwardable_headers(upstream_headers);
    headers.insert(CONTENT_LENGTH, HeaderValue::from(0));

    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}
