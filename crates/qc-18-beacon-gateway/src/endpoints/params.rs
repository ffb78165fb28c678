//! Path and query parameter rewriting for the internal gateway.
//!
//! The internal gateway expects byte parameters base64url-encoded. Clients
//! send them as `0x` hex, so hex values are decoded and re-encoded; keywords
//! and numbers are forwarded untouched.

use crate::domain::error::ApiError;
use crate::domain::types::{decode_hex, is_hex};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use std::borrow::Cow;

fn reencode<'a>(value: &'a str, what: &str) -> Result<Cow<'a, str>, ApiError> {
    if !is_hex(value) {
        return Ok(Cow::Borrowed(value));
    }
    let raw = decode_hex(value)
        .map_err(|e| ApiError::internal_with_context(&format!("could not process {} parameter", what), e))?;
    Ok(Cow::Owned(URL_SAFE.encode(raw)))
}

/// Value of the `:name` segment of `template` in `path`.
pub fn path_param<'a>(template: &str, path: &'a str, name: &str) -> Option<&'a str> {
    template
        .split('/')
        .zip(path.split('/'))
        .find(|(t, _)| t.strip_prefix(':') == Some(name))
        .map(|(_, v)| v)
}

/// Rewrite the parameterised segments of `path`.
pub fn encode_path_params(template: &str, path: &str) -> Result<String, ApiError> {
    let mut segments = Vec::new();
    let mut templates = template.split('/');
    for segment in path.split('/') {
        match templates.next() {
            Some(t) if t.starts_with(':') => segments.push(reencode(segment, "URL")?),
            _ => segments.push(Cow::Borrowed(segment)),
        }
    }
    Ok(segments.join("/"))
}

/// Rewrite every query value, keeping key order and repeated keys.
pub fn encode_query(query: &str) -> Result<String, ApiError> {
    let mut out = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        out.append_pair(&key, &reencode(&value, "query")?);
    }
    Ok(out.finish())
}
