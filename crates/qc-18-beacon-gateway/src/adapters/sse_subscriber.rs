//! Server-sent-events client for the internal gateway's event feed.

use crate::ports::{EventSubscriber, EventSubscription, RawEvent, UpstreamError};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Path of the event feed on the internal gateway.
pub const INTERNAL_EVENTS_PATH: &str = "/internal/eth/v1/events";

/// Disables the internal gateway's per-call deadline for the stream.
const GRPC_TIMEOUT_HEADER: &str = "Grpc-Timeout";

/// Messages buffered between the feed reader and the relay.
const SUBSCRIPTION_CAPACITY: usize = 64;

/// Incremental SSE frame parser.
///
/// Accepts arbitrary byte chunks; a frame is complete at a blank line.
/// Multiple `data:` lines are joined with `\n`. Comment lines and unknown
/// fields are ignored.
#[derive(Debug, Default)]
pub struct SseFrameParser {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<u8>,
    has_data: bool,
}

impl SseFrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<RawEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            if line.is_empty() {
                if let Some(frame) = self.finish_frame() {
                    frames.push(frame);
                }
                continue;
            }

            let (field, value) = match line.iter().position(|b| *b == b':') {
                Some(0) => continue,
                Some(i) => {
                    let value = &line[i + 1..];
                    (&line[..i], value.strip_prefix(b" ").unwrap_or(value))
                }
                None => (&line[..], &[][..]),
            };

            match field {
                b"event" => self.event = Some(String::from_utf8_lossy(value).into_owned()),
                b"data" => {
                    if self.has_data {
                        self.data.push(b'\n');
                    }
                    self.data.extend_from_slice(value);
                    self.has_data = true;
                }
                _ => {}
            }
        }
        frames
    }

    fn finish_frame(&mut self) -> Option<RawEvent> {
        let event = self.event.take();
        if !self.has_data {
            return None;
        }
        self.has_data = false;
        Some(RawEvent {
            event: event.unwrap_or_else(|| "message".to_string()),
            data: Bytes::from(std::mem::take(&mut self.data)),
        })
    }
}

/// Opens one upstream SSE connection per client subscription.
#[derive(Debug, Clone)]
pub struct HttpEventSubscriber {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEventSubscriber {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn feed_url(&self, query: &str) -> String {
        if query.is_empty() {
            format!("{}{}", self.base_url, INTERNAL_EVENTS_PATH)
        } else {
            format!("{}{}?{}", self.base_url, INTERNAL_EVENTS_PATH, query)
        }
    }
}

#[async_trait]
impl EventSubscriber for HttpEventSubscriber {
    async fn subscribe(&self, query: &str) -> Result<EventSubscription, UpstreamError> {
        let url = self.feed_url(query);
        let response = self
            .client
            .get(&url)
            .header(GRPC_TIMEOUT_HEADER, "0S")
            .send()
            .await
            .map_err(|e| UpstreamError::Subscribe(e.to_string()))?;

        if !response.status().is_success() {
            return Err(UpstreamError::Subscribe(format!(
                "event feed answered {}",
                response.status()
            )));
        }

        debug!(url = %url, "Subscribed to upstream event feed");
        let (subscription, tx, teardown) = EventSubscription::channel(SUBSCRIPTION_CAPACITY);
        tokio::spawn(pump(response, tx, teardown));
        Ok(subscription)
    }
}

/// Read the feed until it ends, the consumer goes away, or teardown fires.
async fn pump(
    response: reqwest::Response,
    tx: mpsc::Sender<Result<RawEvent, UpstreamError>>,
    mut teardown: oneshot::Receiver<()>,
) {
    let mut stream = response.bytes_stream();
    let mut parser = SseFrameParser::new();

    loop {
        let chunk = tokio::select! {
            _ = &mut teardown => {
                debug!("Event feed torn down");
                return;
            }
            chunk = stream.next() => chunk,
        };

        match chunk {
            Some(Ok(bytes)) => {
                for frame in parser.push(&bytes) {
                    if tx.send(Ok(frame)).await.is_err() {
                        return;
                    }
                }
            }
            Some(Err(e)) => {
                warn!(error = %e, "Event feed read failed");
                let _ = tx.send(Err(UpstreamError::Body(e.to_string()))).await;
                return;
            }
            None => {
                debug!("Event feed ended");
                return;
            }
        }
    }
}
