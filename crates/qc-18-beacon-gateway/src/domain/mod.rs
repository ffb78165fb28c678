//! Domain types for the Beacon API gateway.
//!
//! Configuration, errors, fork bookkeeping and content negotiation. Nothing
//! in here performs I/O except [`GatewayConfig::load`].

pub mod config;
pub mod correlation;
pub mod error;
pub mod fork_schedule;
pub mod negotiation;
pub mod types;
pub mod version;

// Re-exports for convenience
pub use config::{ChainConfig, ConfigError, CorsConfig, GatewayConfig, UpstreamConfig};
pub use correlation::CorrelationId;
pub use error::{ApiError, ApiResult, GatewayError, IndexedFailure};
pub use fork_schedule::{ForkSchedule, ForkScheduleError};
pub use negotiation::{
    preferred_media_type, ssz_posted, ssz_requested, MediaType, JSON_MEDIA_TYPE,
    OCTET_STREAM_MEDIA_TYPE, VERSION_HEADER,
};
pub use types::{Epoch, HexBytes, Root, Slot, FAR_FUTURE_EPOCH};
pub use version::{ForkVersion, UnknownForkVersion};
