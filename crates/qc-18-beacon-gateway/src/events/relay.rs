//! The per-connection relay loop.

use super::sink::EventSink;
use super::topics::Topic;
use super::RelayError;
use crate::domain::correlation::CorrelationId;
use crate::middleware::metrics::GatewayMetrics;
use crate::ports::EventSubscription;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How a relay ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The client went away.
    Cancelled,
    /// The upstream feed ended.
    UpstreamClosed,
}

/// `event: <topic>\ndata: <json>\n\n`
pub fn format_frame(topic: &str, data: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(topic.len() + data.len() + 16);
    frame.extend_from_slice(b"event: ");
    frame.extend_from_slice(topic.as_bytes());
    frame.extend_from_slice(b"\ndata: ");
    frame.extend_from_slice(data);
    frame.extend_from_slice(b"\n\n");
    frame
}

/// Relays one client's subscription.
#[derive(Debug, Clone)]
pub struct EventRelay {
    connection_id: CorrelationId,
    metrics: Arc<GatewayMetrics>,
}

impl EventRelay {
    pub fn new(connection_id: CorrelationId, metrics: Arc<GatewayMetrics>) -> Self {
        Self {
            connection_id,
            metrics,
        }
    }

    pub fn connection_id(&self) -> CorrelationId {
        self.connection_id
    }

    /// Relay until the client cancels, the upstream ends, or an error.
    ///
    /// The subscription is torn down on every exit path.
    pub async fn run<S, C>(
        &self,
        mut subscription: EventSubscription,
        sink: &mut S,
        cancel: C,
    ) -> Result<RelayOutcome, RelayError>
    where
        S: EventSink + ?Sized,
        C: Future<Output = ()>,
    {
        self.metrics.record_stream_open();
        info!(connection_id = %self.connection_id, "Event stream opened");

        let result = self.relay(&mut subscription, sink, cancel).await;

        subscription.unsubscribe();
        self.metrics.record_stream_close();
        match &result {
            Ok(outcome) => {
                info!(connection_id = %self.connection_id, outcome = ?outcome, "Event stream closed")
            }
            Err(e) => {
                self.metrics.record_stream_error();
                warn!(connection_id = %self.connection_id, error = %e, "Event stream failed");
            }
        }
        result
    }

    async fn relay<S, C>(
        &self,
        subscription: &mut EventSubscription,
        sink: &mut S,
        cancel: C,
    ) -> Result<RelayOutcome, RelayError>
    where
        S: EventSink + ?Sized,
        C: Future<Output = ()>,
    {
        tokio::pin!(cancel);
        loop {
            let message = tokio::select! {
                biased;
                _ = &mut cancel => return Ok(RelayOutcome::Cancelled),
                message = subscription.next() => message,
            };

            let raw = match message {
                Some(Ok(raw)) => raw,
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(RelayOutcome::UpstreamClosed),
            };

            let topic: Topic = raw.event.parse()?;
            let data = topic.translate(&raw.data)?;
            sink.write(&format_frame(topic.as_str(), &data)).await?;
            sink.flush().await?;

            self.metrics.record_event();
            debug!(connection_id = %self.connection_id, topic = %topic, "Relayed event");
        }
    }
}
