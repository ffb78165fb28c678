//! Client-side transport for relayed events.

use super::RelayError;
use async_trait::async_trait;
use axum::body::Body;
use bytes::{Bytes, BytesMut};
use std::convert::Infallible;
use tokio::sync::mpsc;

/// Where the relay writes event frames.
///
/// `write` may buffer; `flush` must hand everything written so far to the
/// client. A transport that cannot flush keeps the default `flush`, which
/// fails the stream.
#[async_trait]
pub trait EventSink: Send {
    async fn write(&mut self, chunk: &[u8]) -> Result<(), RelayError>;

    async fn flush(&mut self) -> Result<(), RelayError> {
        Err(RelayError::FlushUnsupported(std::any::type_name::<Self>()))
    }
}

/// Sink feeding a streaming HTTP response body.
///
/// Writes accumulate locally and are sent as one body chunk on flush.
#[derive(Debug)]
pub struct ChannelSink {
    pending: BytesMut,
    tx: mpsc::Sender<Bytes>,
}

impl ChannelSink {
    /// A sink plus the body that streams whatever the sink flushes.
    pub fn new(capacity: usize) -> (Self, Body) {
        let (tx, rx) = mpsc::channel::<Bytes>(capacity);
        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|chunk| (Ok::<_, Infallible>(chunk), rx))
        });
        (
            Self {
                pending: BytesMut::new(),
                tx,
            },
            Body::from_stream(stream),
        )
    }

    /// Resolves once the client side of the body is gone.
    pub fn closed(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let tx = self.tx.clone();
        async move { tx.closed().await }
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn write(&mut self, chunk: &[u8]) -> Result<(), RelayError> {
        if self.tx.is_closed() {
            return Err(RelayError::Write("client disconnected".to_string()));
        }
        self.pending.extend_from_slice(chunk);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), RelayError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let chunk = self.pending.split().freeze();
        self.tx
            .send(chunk)
            .await
            .map_err(|_| RelayError::Write("client disconnected".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoFlush;

    #[async_trait]
    impl EventSink for NoFlush {
        async fn write(&mut self, _chunk: &[u8]) -> Result<(), RelayError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_default_flush_is_unsupported() {
        let err = NoFlush.flush().await.unwrap_err();
        assert!(matches!(err, RelayError::FlushUnsupported(_)));
        assert!(err.to_string().starts_with("Flush not supported in"));
        assert!(err.to_string().contains("NoFlush"));
    }

    #[tokio::test]
    async fn test_channel_sink_streams_on_flush() {
        let (mut sink, body) = ChannelSink::new(4);
        sink.write(b"event: head\n").await.unwrap();
        sink.write(b"data: {}\n\n").await.unwrap();
        sink.flush().await.unwrap();
        drop(sink);

        let collected = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(&collected[..], b"event: head\ndata: {}\n\n");
    }

    #[tokio::test]
    async fn test_closed_resolves_when_body_dropped() {
        let (mut sink, body) = ChannelSink::new(1);
        let closed = sink.closed();
        drop(body);
        closed.await;
        assert!(sink.write(b"x").await.is_err());
    }
}
