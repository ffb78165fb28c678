//! Binary (SSZ) envelope codec and response writers.

pub mod envelope;
pub mod response;

pub use envelope::{encode_ssz_request, EnvelopeError, SszEnvelope};
pub use response::{
    effective_status, forwardable_headers, is_metadata_header, status_from_metadata,
    write_empty_response, write_json_response, write_ssz_response, CUSTOM_ERROR_METADATA,
    HTTP_CODE_METADATA, METADATA_PREFIX,
};

/// File name offered for a state download.
pub const BEACON_STATE_FILE: &str = "beacon_state.ssz";
/// File name offered for a block download.
pub const BEACON_BLOCK_FILE: &str = "beacon_block.ssz";
/// File name offered for a produced block.
pub const PRODUCE_BLOCK_FILE: &str = "produce_beacon_block.ssz";
/// File name offered for a produced blinded block.
pub const PRODUCE_BLINDED_BLOCK_FILE: &str = "produce_blinded_beacon_block.ssz";
