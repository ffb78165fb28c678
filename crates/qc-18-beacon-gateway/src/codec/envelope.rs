//! Base64 SSZ envelope carried inside the internal gateway's JSON.

use crate::domain::version::ForkVersion;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Errors turning envelopes and metadata headers into client responses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    #[error("could not unmarshal response into envelope: {0}")]
    Malformed(String),
    #[error("could not decode response body into base64: {0}")]
    InvalidBase64(String),
    #[error("could not parse status code: {0}")]
    InvalidStatusCode(String),
    #[error("could not prepare POST data: {0}")]
    Encode(String),
}

/// `{"version": "...", "data": "<base64>"}`. The legacy single-version form
/// omits `version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SszEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub data: String,
}

impl SszEnvelope {
    pub fn encode(version: Option<ForkVersion>, raw: &[u8]) -> Self {
        Self {
            version: version.map(|v| v.as_str().to_string()),
            data: STANDARD.encode(raw),
        }
    }

    /// Parse an envelope from an upstream response body.
    pub fn from_json(body: &[u8]) -> Result<Self, EnvelopeError> {
        serde_json::from_slice(body).map_err(|e| EnvelopeError::Malformed(e.to_string()))
    }

    /// Lower-cased version tag (phase0 for the legacy form) and the raw SSZ.
    pub fn decode(&self) -> Result<(String, Vec<u8>), EnvelopeError> {
        let raw = STANDARD
            .decode(self.data.as_bytes())
            .map_err(|e| EnvelopeError::InvalidBase64(e.to_string()))?;
        let version = self
            .version
            .as_deref()
            .unwrap_or(ForkVersion::Phase0.as_str())
            .to_ascii_lowercase();
        Ok((version, raw))
    }
}

/// Wrap a posted SSZ body as `{"data":"<base64>"}` for the internal gateway.
pub fn encode_ssz_request(raw: &[u8]) -> Result<Bytes, EnvelopeError> {
    serde_json::to_vec(&SszEnvelope::encode(None, raw))
        .map(Bytes::from)
        .map_err(|e| EnvelopeError::Encode(e.to_string()))
}
