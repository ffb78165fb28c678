//! Event stream relay.
//!
//! One upstream subscription per client connection; every upstream message
//! is translated by topic and written to the client as
//! `event: <topic>\ndata: <json>\n\n`, flushed before the next one is read.

pub mod relay;
pub mod sink;
pub mod topics;

pub use relay::{format_frame, EventRelay, RelayOutcome};
pub use sink::{ChannelSink, EventSink};
pub use topics::Topic;

use crate::ports::UpstreamError;

/// Errors that end an event stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("Event type '{0}' not supported")]
    UnsupportedTopic(String),
    #[error("payload version unsupported")]
    PayloadVersionUnsupported,
    #[error("could not decode event data: {0}")]
    Decode(String),
    #[error("could not encode event data: {0}")]
    Encode(String),
    #[error("Flush not supported in {0}")]
    FlushUnsupported(&'static str),
    #[error("could not write event: {0}")]
    Write(String),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}
