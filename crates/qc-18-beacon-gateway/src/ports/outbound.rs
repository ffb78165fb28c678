//! Outbound ports for the Beacon API gateway.
//!
//! The gateway talks to three collaborators: the internal RPC gateway
//! (request forwarding), its event feed, and, for locally answered state
//! queries, a chain state provider.

use crate::domain::types::{Root, Slot};
use crate::domain::version::ForkVersion;
use async_trait::async_trait;
use axum::http::{HeaderMap, Method, StatusCode};
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Request as it will be sent to the internal gateway.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    /// Path plus optional `?query`, relative to the upstream base URL.
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Fully buffered upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Transport failure talking to the upstream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    #[error("could not proxy request: {0}")]
    Request(String),
    #[error("could not read response body: {0}")]
    Body(String),
    #[error("could not subscribe to event feed: {0}")]
    Subscribe(String),
}

/// Forwards requests to the internal RPC gateway.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn forward(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError>;
}

/// One message from the upstream event feed, exactly as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Topic tag, possibly with trailing whitespace.
    pub event: String,
    pub data: Bytes,
}

/// A live upstream event subscription.
///
/// The producer side stops when [`EventSubscription::unsubscribe`] is called
/// or the subscription is dropped.
pub struct EventSubscription {
    events: mpsc::Receiver<Result<RawEvent, UpstreamError>>,
    teardown: Option<oneshot::Sender<()>>,
}

impl EventSubscription {
    /// Build a subscription plus the handles the producer keeps.
    pub fn channel(
        capacity: usize,
    ) -> (
        Self,
        mpsc::Sender<Result<RawEvent, UpstreamError>>,
        oneshot::Receiver<()>,
    ) {
        let (tx, rx) = mpsc::channel(capacity);
        let (teardown_tx, teardown_rx) = oneshot::channel();
        (
            Self {
                events: rx,
                teardown: Some(teardown_tx),
            },
            tx,
            teardown_rx,
        )
    }

    /// Next message; `None` once the upstream feed ended.
    pub async fn next(&mut self) -> Option<Result<RawEvent, UpstreamError>> {
        self.events.recv().await
    }

    /// Tear the subscription down. Idempotent.
    pub fn unsubscribe(&mut self) {
        if let Some(tx) = self.teardown.take() {
            let _ = tx.send(());
        }
        self.events.close();
    }

    pub fn is_active(&self) -> bool {
        self.teardown.is_some()
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Opens subscriptions to the upstream event feed.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// `query` is the client's raw query string (`topics=head&topics=block`).
    async fn subscribe(&self, query: &str) -> Result<EventSubscription, UpstreamError>;
}

/// Failure reported by the chain state store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ProviderError(pub String);

/// A point-in-time beacon state, as much of it as the resolver needs.
pub trait StateSnapshot: Send + Sync {
    fn slot(&self) -> Slot;
    fn state_root(&self) -> Root;
    fn fork_version(&self) -> ForkVersion;
    /// Ring buffer of the most recent state roots, indexed by `slot % len`.
    fn state_roots(&self) -> &[Root];
    /// Ring buffer of the most recent block roots, same indexing.
    fn block_roots(&self) -> &[Root];
}

/// Read-only access to stored states.
#[async_trait]
pub trait ChainStateProvider: Send + Sync {
    async fn head_state(&self) -> Result<Arc<dyn StateSnapshot>, ProviderError>;
    async fn genesis_state(&self) -> Result<Arc<dyn StateSnapshot>, ProviderError>;
    async fn finalized_state(&self) -> Result<Arc<dyn StateSnapshot>, ProviderError>;
    async fn justified_state(&self) -> Result<Arc<dyn StateSnapshot>, ProviderError>;
    async fn state_by_block_root(&self, root: Root)
        -> Result<Arc<dyn StateSnapshot>, ProviderError>;
    /// State at `slot` on the canonical chain, replayed if not stored.
    async fn state_at_slot(&self, slot: Slot) -> Result<Arc<dyn StateSnapshot>, ProviderError>;
}
