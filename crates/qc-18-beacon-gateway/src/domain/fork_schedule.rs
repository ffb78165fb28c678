//! Epoch-to-fork mapping.
//!
//! Built once at start-up from configuration and shared as
//! `Arc<ForkSchedule>`. Never mutated afterwards.

use super::types::{Epoch, Slot, FAR_FUTURE_EPOCH};
use super::version::ForkVersion;

/// Invalid schedule definition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForkScheduleError {
    #[error("slots_per_epoch cannot be 0")]
    ZeroSlotsPerEpoch,
    #[error("fork schedule must start with phase0 at epoch 0")]
    MissingGenesisFork,
    #[error("fork {later} at epoch {later_epoch} activates before {earlier} at epoch {earlier_epoch}")]
    NotMonotonic {
        earlier: ForkVersion,
        earlier_epoch: Epoch,
        later: ForkVersion,
        later_epoch: Epoch,
    },
}

/// Ordered fork boundaries plus the slot/epoch conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkSchedule {
    slots_per_epoch: u64,
    boundaries: Vec<(Epoch, ForkVersion)>,
}

impl ForkSchedule {
    /// Build a schedule. Boundaries must be listed in fork order with
    /// non-decreasing epochs, starting with phase0 at epoch 0. Forks at
    /// [`FAR_FUTURE_EPOCH`] are dropped.
    pub fn new(
        slots_per_epoch: u64,
        boundaries: Vec<(Epoch, ForkVersion)>,
    ) -> Result<Self, ForkScheduleError> {
        if slots_per_epoch == 0 {
            return Err(ForkScheduleError::ZeroSlotsPerEpoch);
        }
        if boundaries.first() != Some(&(0, ForkVersion::Phase0)) {
            return Err(ForkScheduleError::MissingGenesisFork);
        }
        for pair in boundaries.windows(2) {
            let (earlier_epoch, earlier) = pair[0];
            let (later_epoch, later) = pair[1];
            if later_epoch < earlier_epoch || later <= earlier {
                return Err(ForkScheduleError::NotMonotonic {
                    earlier,
                    earlier_epoch,
                    later,
                    later_epoch,
                });
            }
        }

        let boundaries = boundaries
            .into_iter()
            .filter(|(epoch, _)| *epoch != FAR_FUTURE_EPOCH)
            .collect();

        Ok(Self {
            slots_per_epoch,
            boundaries,
        })
    }

    /// Mainnet activation epochs.
    pub fn mainnet() -> Self {
        Self {
            slots_per_epoch: 32,
            boundaries: vec![
                (0, ForkVersion::Phase0),
                (74_240, ForkVersion::Altair),
                (144_896, ForkVersion::Bellatrix),
                (194_048, ForkVersion::Capella),
                (269_568, ForkVersion::Deneb),
            ],
        }
    }

    pub fn slots_per_epoch(&self) -> u64 {
        self.slots_per_epoch
    }

    /// Scheduled boundaries, ascending.
    pub fn boundaries(&self) -> &[(Epoch, ForkVersion)] {
        &self.boundaries
    }

    pub fn epoch_of(&self, slot: Slot) -> Epoch {
        slot / self.slots_per_epoch
    }

    /// Fork active at `epoch`: the last boundary whose epoch is not after it.
    pub fn version_for_epoch(&self, epoch: Epoch) -> ForkVersion {
        self.boundaries
            .iter()
            .take_while(|(boundary, _)| *boundary <= epoch)
            .last()
            .map(|(_, version)| *version)
            .unwrap_or(ForkVersion::Phase0)
    }

    /// Fork active at `slot`.
    pub fn version_for_slot(&self, slot: Slot) -> ForkVersion {
        self.version_for_epoch(self.epoch_of(slot))
    }

    /// Activation epoch of `version`, if scheduled.
    pub fn activation_epoch(&self, version: ForkVersion) -> Option<Epoch> {
        self.boundaries
            .iter()
            .find(|(_, v)| *v == version)
            .map(|(epoch, _)| *epoch)
    }
}

impl Default for ForkSchedule {
    fn default() -> Self {
        Self::mainnet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn schedule() -> ForkSchedule {
        ForkSchedule::new(
            32,
            vec![
                (0, ForkVersion::Phase0),
                (10, ForkVersion::Altair),
                (20, ForkVersion::Bellatrix),
                (30, ForkVersion::Capella),
                (FAR_FUTURE_EPOCH, ForkVersion::Deneb),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_version_for_slot() {
        let s = schedule();
        assert_eq!(s.version_for_slot(0), ForkVersion::Phase0);
        assert_eq!(s.version_for_slot(10 * 32 - 1), ForkVersion::Phase0);
        assert_eq!(s.version_for_slot(10 * 32), ForkVersion::Altair);
        assert_eq!(s.version_for_slot(25 * 32), ForkVersion::Bellatrix);
        assert_eq!(s.version_for_slot(u64::MAX), ForkVersion::Capella);
    }

    #[test]
    fn test_unscheduled_fork_dropped() {
        let s = schedule();
        assert_eq!(s.boundaries().len(), 4);
        assert_eq!(s.activation_epoch(ForkVersion::Deneb), None);
        assert_eq!(s.activation_epoch(ForkVersion::Capella), Some(30));
    }

    #[test]
    fn test_same_epoch_forks_pick_latest() {
        let s = ForkSchedule::new(
            8,
            vec![
                (0, ForkVersion::Phase0),
                (0, ForkVersion::Altair),
                (0, ForkVersion::Bellatrix),
            ],
        )
        .unwrap();
        assert_eq!(s.version_for_slot(0), ForkVersion::Bellatrix);
    }

    #[test]
    fn test_rejects_bad_schedules() {
        assert_eq!(
            ForkSchedule::new(0, vec![(0, ForkVersion::Phase0)]),
            Err(ForkScheduleError::ZeroSlotsPerEpoch)
        );
        assert_eq!(
            ForkSchedule::new(32, vec![(5, ForkVersion::Phase0)]),
            Err(ForkScheduleError::MissingGenesisFork)
        );
        assert!(matches!(
            ForkSchedule::new(
                32,
                vec![
                    (0, ForkVersion::Phase0),
                    (20, ForkVersion::Altair),
                    (10, ForkVersion::Bellatrix)
                ]
            ),
            Err(ForkScheduleError::NotMonotonic { .. })
        ));
    }

    #[test]
    fn test_mainnet_capella_boundary() {
        let s = ForkSchedule::mainnet();
        assert_eq!(s.version_for_slot(194_048 * 32 - 1), ForkVersion::Bellatrix);
        assert_eq!(s.version_for_slot(194_048 * 32), ForkVersion::Capella);
    }

    proptest! {
        #[test]
        fn prop_latest_boundary_not_after_epoch(
            mut gaps in proptest::collection::vec(0u64..1000, 4),
            spe in 1u64..64,
            slot in 0u64..10_000_000,
        ) {
            gaps.sort();
            let boundaries: Vec<_> = std::iter::once((0, ForkVersion::Phase0))
                .chain(gaps.iter().copied().zip(ForkVersion::ALL[1..].iter().copied()))
                .collect();
            let s = ForkSchedule::new(spe, boundaries.clone()).unwrap();
            let epoch = slot / spe;
            let expected = boundaries
                .iter()
                .filter(|(e, _)| *e <= epoch)
                .map(|(_, v)| *v)
                .max()
                .unwrap();
            prop_assert_eq!(s.version_for_slot(slot), expected);
        }

        #[test]
        fn prop_boundary_slot_selects_new_fork(epoch in 1u64..100_000, spe in 1u64..64) {
            let s = ForkSchedule::new(spe, vec![(0, ForkVersion::Phase0), (epoch, ForkVersion::Altair)]).unwrap();
            prop_assert_eq!(s.version_for_slot(epoch * spe), ForkVersion::Altair);
            prop_assert_eq!(s.version_for_slot(epoch * spe - 1), ForkVersion::Phase0);
        }
    }
}
