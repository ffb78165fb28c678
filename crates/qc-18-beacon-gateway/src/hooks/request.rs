//! Request hooks that reshape bodies or headers before forwarding.

use super::wrap::wrap_array;
use super::{RequestHook, RunDefault};
use crate::codec::response::METADATA_PREFIX;
use crate::domain::error::ApiError;
use crate::domain::negotiation::VERSION_HEADER;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

/// `POST /eth/v1/beacon/blocks` and `/eth/v1/beacon/blinded_blocks`.
///
/// Picks the fork from the `Eth-Consensus-Version` header when present, from
/// the block's slot otherwise, and rewraps `{message, signature}` under the
/// fork's `<fork>_block` field.
pub fn publish_block() -> RequestHook {
    RequestHook::new("publish_block", |ctx, req| {
        let tag = match req.headers.get(VERSION_HEADER) {
            Some(value) => Some(
                value
                    .to_str()
                    .map_err(|e| ApiError::bad_request(format!("invalid {} header: {}", VERSION_HEADER, e)))?
                    .to_string(),
            ),
            None => None,
        };
        let (version, body) = ctx
            .dispatcher
            .prepare_published_block(tag.as_deref(), &req.body)?;
        debug!(version = %version, "Prepared published block");
        req.body = body;
        Ok(RunDefault::YES)
    })
}

/// Move `Eth-Consensus-Version` into the metadata namespace so the internal
/// gateway hands it to the handler.
pub fn relocate_version_header() -> RequestHook {
    RequestHook::new("relocate_version_header", |_, req| {
        relocate_version(&mut req.headers)?;
        Ok(RunDefault::YES)
    })
}

/// Header relocation shared with the binary upload path.
pub fn relocate_version(headers: &mut HeaderMap) -> Result<(), ApiError> {
    let values: Vec<HeaderValue> = headers.get_all(VERSION_HEADER).iter().cloned().collect();
    if values.is_empty() {
        return Ok(());
    }
    headers.remove(VERSION_HEADER);
    let name = HeaderName::from_bytes(format!("{}{}", METADATA_PREFIX, VERSION_HEADER).as_bytes())
        .map_err(|e| ApiError::internal_with_context("could not build metadata header", e))?;
    for value in values {
        headers.append(name.clone(), value);
    }
    Ok(())
}

/// Array wrapper plus header relocation, for batch endpoints that also take
/// a fork tag.
pub fn wrap_and_relocate(name: &'static str, field: &'static str) -> Vec<RequestHook> {
    vec![wrap_array(name, field), relocate_version_header()]
}
