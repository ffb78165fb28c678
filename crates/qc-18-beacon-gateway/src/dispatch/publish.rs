//! Publish-block version detection and field remapping.
//!
//! Clients post `{"message": {...}, "signature": "..."}`; the internal
//! gateway wants the block under a fork-specific field name.

use super::VersionError;
use crate::domain::fork_schedule::ForkSchedule;
use crate::domain::types::Slot;
use crate::domain::version::ForkVersion;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Just enough of a signed block to read its slot.
#[derive(Debug, Default, Deserialize)]
struct SlotProbe {
    #[serde(default)]
    message: ProbeMessage,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeMessage {
    #[serde(default)]
    slot: String,
}

/// Read `message.slot` without committing to a full block schema.
pub fn probe_slot(body: &[u8]) -> Result<Slot, VersionError> {
    let probe: SlotProbe =
        serde_json::from_slice(body).map_err(|e| VersionError::SlotNotReadable(e.to_string()))?;
    probe
        .message
        .slot
        .parse::<Slot>()
        .map_err(|e| VersionError::SlotNotUnsigned(format!("'{}': {}", probe.message.slot, e)))
}

/// Fork of a posted block, from its slot.
pub fn detect_block_version(
    schedule: &ForkSchedule,
    body: &[u8],
) -> Result<ForkVersion, VersionError> {
    Ok(schedule.version_for_slot(probe_slot(body)?))
}

/// Signed block as posted by clients. The block body is carried opaquely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedBlockContainer {
    pub message: Value,
    #[serde(default)]
    pub signature: Value,
}

/// Signed block in the internal gateway's publish shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PublishBlockRequest {
    Phase0 { phase0_block: Value, signature: Value },
    Altair { altair_block: Value, signature: Value },
    Bellatrix { bellatrix_block: Value, signature: Value },
    Capella { capella_block: Value, signature: Value },
    Deneb { deneb_block: Value, signature: Value },
}

impl PublishBlockRequest {
    pub fn new(version: ForkVersion, block: SignedBlockContainer) -> Self {
        let SignedBlockContainer { message, signature } = block;
        match version {
            ForkVersion::Phase0 => Self::Phase0 {
                phase0_block: message,
                signature,
            },
            ForkVersion::Altair => Self::Altair {
                altair_block: message,
                signature,
            },
            ForkVersion::Bellatrix => Self::Bellatrix {
                bellatrix_block: message,
                signature,
            },
            ForkVersion::Capella => Self::Capella {
                capella_block: message,
                signature,
            },
            ForkVersion::Deneb => Self::Deneb {
                deneb_block: message,
                signature,
            },
        }
    }

    /// Remap using a version tag supplied by the client.
    pub fn from_tag(tag: &str, block: SignedBlockContainer) -> Result<Self, VersionError> {
        let version = tag
            .parse::<ForkVersion>()
            .map_err(|_| VersionError::UnsupportedBlockType(tag.to_string()))?;
        Ok(Self::new(version, block))
    }

    pub fn version(&self) -> ForkVersion {
        match self {
            Self::Phase0 { .. } => ForkVersion::Phase0,
            Self::Altair { .. } => ForkVersion::Altair,
            Self::Bellatrix { .. } => ForkVersion::Bellatrix,
            Self::Capella { .. } => ForkVersion::Capella,
            Self::Deneb { .. } => ForkVersion::Deneb,
        }
    }
}

/// Rewrite a posted block body for the internal gateway.
///
/// An explicit `version_tag` (from the version header) wins over detection
/// by slot.
pub fn prepare_published_block(
    schedule: &ForkSchedule,
    version_tag: Option<&str>,
    body: &[u8],
) -> Result<(ForkVersion, Bytes), VersionError> {
    let request = match version_tag {
        Some(tag) => PublishBlockRequest::from_tag(tag, parse_container(body)?)?,
        None => {
            let version = detect_block_version(schedule, body)?;
            PublishBlockRequest::new(version, parse_container(body)?)
        }
    };
    let encoded =
        serde_json::to_vec(&request).map_err(|e| VersionError::Encode(e.to_string()))?;
    Ok((request.version(), Bytes::from(encoded)))
}

fn parse_container(body: &[u8]) -> Result<SignedBlockContainer, VersionError> {
    serde_json::from_slice(body).map_err(|e| VersionError::Malformed(e.to_string()))
}
