//! Collapse fork-tagged unions from the internal gateway into flat responses.
//!
//! The internal gateway answers with
//! `{"version": "...", "data": {"<fork>_block": {...}, ...}, ...}`; clients
//! get `{"version": "...", "data": <the block>, ...}`. Any other top-level
//! field (`execution_optimistic`, `finalized`) is carried over untouched.

use super::VersionError;
use crate::domain::version::ForkVersion;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Discriminated union as sent by the internal gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionedContainer {
    pub version: String,
    pub data: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Flat response for one fork.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollapsedResponse<T> {
    pub version: ForkVersion,
    pub data: T,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Signed block in the client-facing shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignedBlock {
    pub message: Value,
    pub signature: Value,
}

/// What kind of payload the union wraps; decides field names and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Payload {
    Block,
    State,
}

impl Payload {
    fn field(self, version: ForkVersion) -> &'static str {
        match self {
            Payload::Block => version.block_field(),
            Payload::State => version.state_field(),
        }
    }

    fn unsupported(self, tag: &str) -> VersionError {
        match self {
            Payload::Block => VersionError::UnsupportedBlockVersion(tag.to_string()),
            Payload::State => VersionError::UnsupportedStateVersion(tag.to_string()),
        }
    }
}

impl VersionedContainer {
    pub fn from_json(body: &[u8]) -> Result<Self, VersionError> {
        serde_json::from_slice(body).map_err(|e| VersionError::Malformed(e.to_string()))
    }

    /// Match the tag and pull out the one populated variant.
    fn take_variant(&mut self, payload: Payload) -> Result<(ForkVersion, Value), VersionError> {
        let version = match self.version.parse::<ForkVersion>() {
            Ok(v) => v,
            Err(_) => return Err(payload.unsupported(&self.version)),
        };
        let field = payload.field(version);

        if let Some(other) = ForkVersion::ALL
            .iter()
            .filter(|v| **v != version)
            .map(|v| payload.field(*v))
            .find(|f| self.data.get(*f).is_some_and(|v| !v.is_null()))
        {
            return Err(VersionError::VariantMismatch {
                version: self.version.clone(),
                field: other.to_string(),
            });
        }

        match self.data.remove(field) {
            Some(value) if !value.is_null() => Ok((version, value)),
            _ => Err(VersionError::MissingVariant {
                version: self.version.clone(),
                field: field.to_string(),
            }),
        }
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, VersionError> {
    serde_json::to_vec(value).map_err(|e| VersionError::Encode(e.to_string()))
}

/// `GET /eth/v2/beacon/blocks/{block_id}`.
pub fn collapse_block(body: &[u8]) -> Result<Vec<u8>, VersionError> {
    let mut container = VersionedContainer::from_json(body)?;
    let (version, message) = container.take_variant(Payload::Block)?;
    let signature = container.data.remove("signature").unwrap_or(Value::Null);
    encode(&CollapsedResponse {
        version,
        data: SignedBlock { message, signature },
        extra: container.extra,
    })
}

/// `GET /eth/v2/debug/beacon/states/{state_id}`.
pub fn collapse_state(body: &[u8]) -> Result<Vec<u8>, VersionError> {
    let mut container = VersionedContainer::from_json(body)?;
    let (version, state) = container.take_variant(Payload::State)?;
    encode(&CollapsedResponse {
        version,
        data: state,
        extra: container.extra,
    })
}

/// `GET /eth/v2/validator/blocks/{slot}`.
pub fn collapse_produced_block(body: &[u8]) -> Result<Vec<u8>, VersionError> {
    let mut container = VersionedContainer::from_json(body)?;
    let (version, block) = container.take_variant(Payload::Block)?;
    encode(&CollapsedResponse {
        version,
        data: block,
        extra: container.extra,
    })
}

/// `GET /eth/v1/validator/blinded_blocks/{slot}`. Same union layout as a
/// produced block; the body carries an execution payload header instead of
/// the payload.
pub fn collapse_produced_blinded_block(body: &[u8]) -> Result<Vec<u8>, VersionError> {
    collapse_produced_block(body)
}
