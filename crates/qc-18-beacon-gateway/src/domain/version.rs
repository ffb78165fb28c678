//! Fork (schema generation) tags.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named generation of the consensus data schemas.
///
/// The order of variants is the order in which the forks activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForkVersion {
    Phase0,
    Altair,
    Bellatrix,
    Capella,
    Deneb,
}

impl ForkVersion {
    /// Every known fork, oldest first.
    pub const ALL: [ForkVersion; 5] = [
        ForkVersion::Phase0,
        ForkVersion::Altair,
        ForkVersion::Bellatrix,
        ForkVersion::Capella,
        ForkVersion::Deneb,
    ];

    /// Lowercase tag as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ForkVersion::Phase0 => "phase0",
            ForkVersion::Altair => "altair",
            ForkVersion::Bellatrix => "bellatrix",
            ForkVersion::Capella => "capella",
            ForkVersion::Deneb => "deneb",
        }
    }

    /// Name of the field wrapping a block of this fork in the internal protocol.
    pub fn block_field(&self) -> &'static str {
        match self {
            ForkVersion::Phase0 => "phase0_block",
            ForkVersion::Altair => "altair_block",
            ForkVersion::Bellatrix => "bellatrix_block",
            ForkVersion::Capella => "capella_block",
            ForkVersion::Deneb => "deneb_block",
        }
    }

    /// Name of the field wrapping a state of this fork in the internal protocol.
    pub fn state_field(&self) -> &'static str {
        match self {
            ForkVersion::Phase0 => "phase0_state",
            ForkVersion::Altair => "altair_state",
            ForkVersion::Bellatrix => "bellatrix_state",
            ForkVersion::Capella => "capella_state",
            ForkVersion::Deneb => "deneb_state",
        }
    }
}

impl fmt::Display for ForkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag not in the known set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown fork version '{0}'")]
pub struct UnknownForkVersion(pub String);

impl FromStr for ForkVersion {
    type Err = UnknownForkVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ForkVersion::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownForkVersion(s.to_string()))
    }
}
