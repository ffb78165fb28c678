//! Adapters for the Beacon API gateway.
//!
//! Infrastructure implementations of the outbound ports plus the error
//! conversions that decide HTTP status codes.

pub mod error_conversions;
pub mod http_upstream;
pub mod sse_subscriber;

pub use http_upstream::HttpUpstreamClient;
pub use sse_subscriber::{HttpEventSubscriber, SseFrameParser, INTERNAL_EVENTS_PATH};
