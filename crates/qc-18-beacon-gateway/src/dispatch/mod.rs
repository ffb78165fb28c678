//! Multi-fork schema dispatch.
//!
//! Inbound, a posted block is matched to a fork by its slot (or an explicit
//! tag) and rewrapped under the fork's field name. Outbound, a fork-tagged
//! union is collapsed into the flat shape of its fork.

pub mod collapse;
pub mod publish;

pub use collapse::{
    collapse_block, collapse_produced_blinded_block, collapse_produced_block, collapse_state,
    CollapsedResponse, SignedBlock, VersionedContainer,
};
pub use publish::{
    detect_block_version, prepare_published_block, probe_slot, PublishBlockRequest,
    SignedBlockContainer,
};

use crate::domain::fork_schedule::ForkSchedule;
use crate::domain::types::Slot;
use crate::domain::version::ForkVersion;
use bytes::Bytes;
use std::sync::Arc;

/// Version selection and reshaping failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    #[error("unsupported block version '{0}'")]
    UnsupportedBlockVersion(String),
    #[error("unsupported state version '{0}'")]
    UnsupportedStateVersion(String),
    #[error("unsupported block type '{0}'")]
    UnsupportedBlockType(String),
    #[error("response for version '{version}' is missing field '{field}'")]
    MissingVariant { version: String, field: String },
    #[error("response for version '{version}' carries field '{field}' of another version")]
    VariantMismatch { version: String, field: String },
    #[error("could not read slot from body: {0}")]
    SlotNotReadable(String),
    #[error("slot is not an unsigned integer: {0}")]
    SlotNotUnsigned(String),
    #[error("could not unmarshal body: {0}")]
    Malformed(String),
    #[error("could not marshal response: {0}")]
    Encode(String),
}

/// Fork schedule plus the dispatch operations that need it.
#[derive(Debug, Clone)]
pub struct VersionDispatcher {
    schedule: Arc<ForkSchedule>,
}

impl VersionDispatcher {
    pub fn new(schedule: Arc<ForkSchedule>) -> Self {
        Self { schedule }
    }

    pub fn schedule(&self) -> &ForkSchedule {
        &self.schedule
    }

    pub fn version_for_slot(&self, slot: Slot) -> ForkVersion {
        self.schedule.version_for_slot(slot)
    }

    pub fn detect_block_version(&self, body: &[u8]) -> Result<ForkVersion, VersionError> {
        detect_block_version(&self.schedule, body)
    }

    pub fn prepare_published_block(
        &self,
        version_tag: Option<&str>,
        body: &[u8],
    ) -> Result<(ForkVersion, Bytes), VersionError> {
        prepare_published_block(&self.schedule, version_tag, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatcher_uses_shared_schedule() {
        let schedule = Arc::new(
            ForkSchedule::new(4, vec![(0, ForkVersion::Phase0), (2, ForkVersion::Altair)]).unwrap(),
        );
        let dispatcher = VersionDispatcher::new(Arc::clone(&schedule));
        assert_eq!(dispatcher.version_for_slot(7), ForkVersion::Phase0);
        assert_eq!(dispatcher.version_for_slot(8), ForkVersion::Altair);
        assert_eq!(
            dispatcher
                .detect_block_version(br#"{"message":{"slot":"8"}}"#)
                .unwrap(),
            ForkVersion::Altair
        );
        assert_eq!(Arc::strong_count(&schedule), 2);
    }
}
