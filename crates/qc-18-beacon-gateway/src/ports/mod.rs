//! Port definitions (hexagonal boundaries).

pub mod outbound;

pub use outbound::{
    ChainStateProvider, EventSubscriber, EventSubscription, ProviderError, RawEvent,
    StateSnapshot, UpstreamClient, UpstreamError, UpstreamRequest, UpstreamResponse,
};
