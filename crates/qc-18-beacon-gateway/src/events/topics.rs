//! Event topics and their payload schemas.
//!
//! Payloads arrive from the internal gateway with byte fields in base64 and
//! leave with the same fields as `0x` hex. Numeric fields are decimal
//! strings on both sides.

use super::RelayError;
use crate::domain::types::HexBytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Topics the relay knows how to translate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Head,
    Block,
    Attestation,
    VoluntaryExit,
    FinalizedCheckpoint,
    ChainReorg,
    ContributionAndProof,
    BlsToExecutionChange,
    PayloadAttributes,
    Error,
}

impl Topic {
    pub const ALL: [Topic; 10] = [
        Topic::Head,
        Topic::Block,
        Topic::Attestation,
        Topic::VoluntaryExit,
        Topic::FinalizedCheckpoint,
        Topic::ChainReorg,
        Topic::ContributionAndProof,
        Topic::BlsToExecutionChange,
        Topic::PayloadAttributes,
        Topic::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Head => "head",
            Topic::Block => "block",
            Topic::Attestation => "attestation",
            Topic::VoluntaryExit => "voluntary_exit",
            Topic::FinalizedCheckpoint => "finalized_checkpoint",
            Topic::ChainReorg => "chain_reorg",
            Topic::ContributionAndProof => "contribution_and_proof",
            Topic::BlsToExecutionChange => "bls_to_execution_change",
            Topic::PayloadAttributes => "payload_attributes",
            Topic::Error => "error",
        }
    }

    /// Re-encode a raw upstream payload into the client-facing JSON.
    pub fn translate(&self, data: &[u8]) -> Result<Vec<u8>, RelayError> {
        match self {
            Topic::Head => reencode::<HeadEvent>(data),
            Topic::Block => reencode::<BlockEvent>(data),
            Topic::Attestation => encode(&unwrap_attestation(data)?),
            Topic::VoluntaryExit => reencode::<SignedVoluntaryExit>(data),
            Topic::FinalizedCheckpoint => reencode::<FinalizedCheckpointEvent>(data),
            Topic::ChainReorg => reencode::<ChainReorgEvent>(data),
            Topic::ContributionAndProof => reencode::<SignedContributionAndProof>(data),
            Topic::BlsToExecutionChange => reencode::<SignedBlsToExecutionChange>(data),
            Topic::PayloadAttributes => match peek_payload_version(data)?.as_str() {
                "bellatrix" => reencode::<PayloadAttributesEvent<PayloadAttributesV1>>(data),
                "capella" => reencode::<PayloadAttributesEvent<PayloadAttributesV2>>(data),
                _ => Err(RelayError::PayloadVersionUnsupported),
            },
            Topic::Error => reencode::<ErrorEvent>(data),
        }
    }
}

impl FromStr for Topic {
    type Err = RelayError;

    /// Upstream tags carry incidental whitespace; it is ignored.
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let trimmed = tag.trim();
        Topic::ALL
            .into_iter()
            .find(|t| t.as_str() == trimmed)
            .ok_or_else(|| RelayError::UnsupportedTopic(trimmed.to_string()))
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, RelayError> {
    serde_json::from_slice(data).map_err(|e| RelayError::Decode(e.to_string()))
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, RelayError> {
    serde_json::to_vec(value).map_err(|e| RelayError::Encode(e.to_string()))
}

fn reencode<T: DeserializeOwned + Serialize>(data: &[u8]) -> Result<Vec<u8>, RelayError> {
    encode(&decode::<T>(data)?)
}

/// Aggregated attestations arrive as `{"aggregate": {...}}`, unaggregated
/// ones as the bare attestation.
fn unwrap_attestation(data: &[u8]) -> Result<Attestation, RelayError> {
    #[derive(Deserialize)]
    struct Aggregated {
        #[serde(default)]
        aggregate: Option<Attestation>,
    }

    match decode::<Aggregated>(data)?.aggregate {
        Some(attestation) => Ok(attestation),
        None => decode::<Attestation>(data),
    }
}

fn peek_payload_version(data: &[u8]) -> Result<String, RelayError> {
    #[derive(Deserialize)]
    struct VersionOnly {
        #[serde(default)]
        version: String,
    }

    Ok(decode::<VersionOnly>(data)?.version)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadEvent {
    pub slot: String,
    pub block: HexBytes,
    pub state: HexBytes,
    pub epoch_transition: bool,
    pub previous_duty_dependent_root: HexBytes,
    pub current_duty_dependent_root: HexBytes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockEvent {
    pub slot: String,
    pub block: HexBytes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinalizedCheckpointEvent {
    pub block: HexBytes,
    pub state: HexBytes,
    pub epoch: String,
}

/// Chain reorganisation. The JSON keys are published exactly as the
/// internal gateway names them, where `old_head_state` carries the new head
/// block and `new_head_block` the old head state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainReorgEvent {
    pub slot: String,
    pub depth: String,
    pub old_head_block: HexBytes,
    #[serde(rename = "old_head_state")]
    pub new_head_block: HexBytes,
    #[serde(rename = "new_head_block")]
    pub old_head_state: HexBytes,
    pub new_head_state: HexBytes,
    pub epoch: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Checkpoint {
    pub epoch: String,
    pub root: HexBytes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttestationData {
    pub slot: String,
    pub index: String,
    pub beacon_block_root: HexBytes,
    pub source: Checkpoint,
    pub target: Checkpoint,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attestation {
    pub aggregation_bits: HexBytes,
    pub data: AttestationData,
    pub signature: HexBytes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoluntaryExit {
    pub epoch: String,
    pub validator_index: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignedVoluntaryExit {
    pub message: VoluntaryExit,
    pub signature: HexBytes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncCommitteeContribution {
    pub slot: String,
    pub beacon_block_root: HexBytes,
    pub subcommittee_index: String,
    pub aggregation_bits: HexBytes,
    pub signature: HexBytes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContributionAndProof {
    pub aggregator_index: String,
    pub contribution: SyncCommitteeContribution,
    pub selection_proof: HexBytes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignedContributionAndProof {
    pub message: ContributionAndProof,
    pub signature: HexBytes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlsToExecutionChange {
    pub validator_index: String,
    pub from_bls_pubkey: HexBytes,
    pub to_execution_address: HexBytes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignedBlsToExecutionChange {
    pub message: BlsToExecutionChange,
    pub signature: HexBytes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayloadAttributesV1 {
    pub timestamp: String,
    pub prev_randao: HexBytes,
    pub suggested_fee_recipient: HexBytes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Withdrawal {
    pub index: String,
    pub validator_index: String,
    pub address: HexBytes,
    pub amount: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayloadAttributesV2 {
    pub timestamp: String,
    pub prev_randao: HexBytes,
    pub suggested_fee_recipient: HexBytes,
    pub withdrawals: Vec<Withdrawal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadAttributesData<A> {
    pub proposer_index: String,
    pub proposal_slot: String,
    pub parent_block_number: String,
    pub parent_block_root: HexBytes,
    pub parent_block_hash: HexBytes,
    pub payload_attributes: A,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadAttributesEvent<A> {
    pub version: String,
    pub data: PayloadAttributesData<A>,
}

/// Error reported in-band by the upstream feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorEvent {
    pub status_code: u16,
    pub message: String,
}
