//! End-to-end tests through the public router with in-memory collaborators.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use qc_18_beacon_gateway::ports::{
    EventSubscription, ProviderError, RawEvent, StateSnapshot, UpstreamError, UpstreamRequest,
    UpstreamResponse,
};
use qc_18_beacon_gateway::{
    BeaconGatewayService, ChainStateProvider, EventSubscriber, ForkVersion, GatewayConfig, Root,
    Slot, UpstreamClient,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeUpstream {
    responses: Mutex<VecDeque<UpstreamResponse>>,
    seen: Mutex<Vec<UpstreamRequest>>,
}

impl FakeUpstream {
    fn reply(&self, status: StatusCode, body: impl Into<Bytes>) {
        self.responses.lock().unwrap().push_back(UpstreamResponse {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        });
    }

    fn last_request(&self) -> UpstreamRequest {
        self.seen.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl UpstreamClient for FakeUpstream {
    async fn forward(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        self.seen.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| UpstreamError::Request("no scripted response".into()))
    }
}

/// Emits a fixed batch of events, then ends the feed.
#[derive(Default)]
struct FakeEvents {
    events: Vec<RawEvent>,
    queries: Mutex<Vec<String>>,
}

#[async_trait]
impl EventSubscriber for FakeEvents {
    async fn subscribe(&self, query: &str) -> Result<EventSubscription, UpstreamError> {
        self.queries.lock().unwrap().push(query.to_string());
        let (subscription, tx, _teardown) = EventSubscription::channel(self.events.len() + 1);
        for event in &self.events {
            tx.send(Ok(event.clone()))
                .await
                .map_err(|e| UpstreamError::Subscribe(e.to_string()))?;
        }
        Ok(subscription)
    }
}

const WINDOW: usize = 8;

struct FakeState {
    slot: Slot,
    root: Root,
    state_roots: Vec<Root>,
    block_roots: Vec<Root>,
}

impl StateSnapshot for FakeState {
    fn slot(&self) -> Slot {
        self.slot
    }
    fn state_root(&self) -> Root {
        self.root
    }
    fn fork_version(&self) -> ForkVersion {
        ForkVersion::Phase0
    }
    fn state_roots(&self) -> &[Root] {
        &self.state_roots
    }
    fn block_roots(&self) -> &[Root] {
        &self.block_roots
    }
}

fn state_root_at(slot: Slot) -> Root {
    [slot as u8 + 1; 32]
}

fn fake_state(slot: Slot) -> Arc<dyn StateSnapshot> {
    let mut state_roots = vec![[0u8; 32]; WINDOW];
    let mut block_roots = vec![[0u8; 32]; WINDOW];
    for s in slot.saturating_sub(WINDOW as u64)..slot {
        state_roots[s as usize % WINDOW] = state_root_at(s);
        block_roots[s as usize % WINDOW] = [s as u8 + 101; 32];
    }
    Arc::new(FakeState {
        slot,
        root: state_root_at(slot),
        state_roots,
        block_roots,
    })
}

struct FakeProvider {
    head: Slot,
}

#[async_trait]
impl ChainStateProvider for FakeProvider {
    async fn head_state(&self) -> Result<Arc<dyn StateSnapshot>, ProviderError> {
        Ok(fake_state(self.head))
    }
    async fn genesis_state(&self) -> Result<Arc<dyn StateSnapshot>, ProviderError> {
        Ok(fake_state(0))
    }
    async fn finalized_state(&self) -> Result<Arc<dyn StateSnapshot>, ProviderError> {
        Ok(fake_state(self.head.saturating_sub(2)))
    }
    async fn justified_state(&self) -> Result<Arc<dyn StateSnapshot>, ProviderError> {
        Ok(fake_state(self.head.saturating_sub(1)))
    }
    async fn state_by_block_root(
        &self,
        root: Root,
    ) -> Result<Arc<dyn StateSnapshot>, ProviderError> {
        Ok(fake_state(root[0].saturating_sub(101) as Slot))
    }
    async fn state_at_slot(&self, slot: Slot) -> Result<Arc<dyn StateSnapshot>, ProviderError> {
        Ok(fake_state(slot))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    service: BeaconGatewayService,
    upstream: Arc<FakeUpstream>,
    events: Arc<FakeEvents>,
}

fn harness_with(events: Vec<RawEvent>, provider: Option<Arc<dyn ChainStateProvider>>) -> Harness {
    let upstream = Arc::new(FakeUpstream::default());
    let events = Arc::new(FakeEvents {
        events,
        ..Default::default()
    });
    let mut config = GatewayConfig::default();
    config.chain.slots_per_historical_root = WINDOW as u64;
    let service = BeaconGatewayService::new(
        config,
        upstream.clone(),
        events.clone(),
        provider,
    )
    .unwrap();
    Harness {
        service,
        upstream,
        events,
    }
}

fn harness() -> Harness {
    harness_with(Vec::new(), None)
}

impl Harness {
    async fn send(&self, request: Request<Body>) -> Response {
        self.service.router().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str) -> Response {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }
}

async fn body_bytes(response: Response) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_hex_path_param_reencoded_for_upstream() {
    let h = harness();
    h.upstream.reply(StatusCode::OK, r#"{"data":{"root":"0x01"}}"#);

    let response = h.get("/eth/v1/beacon/headers/0xab").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        h.upstream.last_request().path_and_query,
        "/eth/v1/beacon/headers/qw=="
    );
    assert_eq!(body_json(response).await["data"]["root"], "0x01");
}

#[tokio::test]
async fn test_ssz_block_download() {
    let h = harness();
    h.upstream
        .reply(StatusCode::OK, r#"{"version":"CAPELLA","data":"Zm9v"}"#);

    let response = h
        .send(
            Request::builder()
                .uri("/eth/v2/beacon/blocks/head")
                .header(header::ACCEPT, "application/octet-stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        h.upstream.last_request().path_and_query,
        "/internal/eth/v2/beacon/blocks/head/ssz"
    );
    let headers = response.headers().clone();
    assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
    assert_eq!(headers["eth-consensus-version"], "capella");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=beacon_block.ssz"
    );
    assert_eq!(body_bytes(response).await.as_ref(), b"foo");
    assert_eq!(h.service.metrics().to_json()["ssz"]["responses"], 1);
}

#[tokio::test]
async fn test_upstream_error_passed_through() {
    let h = harness();
    h.upstream.reply(
        StatusCode::NOT_FOUND,
        r#"{"code":404,"message":"block not found"}"#,
    );

    let response = h.get("/eth/v1/beacon/headers/head").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["code"], 404);
    assert_eq!(body["message"], "block not found");
}

#[tokio::test]
async fn test_publish_block_remapped_by_slot() {
    let h = harness();
    h.upstream.reply(StatusCode::OK, Bytes::new());

    let block = json!({"message": {"slot": "1", "body": {}}, "signature": "0x01"});
    let response = h
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/eth/v1/beacon/blocks")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(block.to_string()))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_bytes(response).await.is_empty());

    let forwarded = h.upstream.last_request();
    assert_eq!(forwarded.path_and_query, "/eth/v1/beacon/blocks");
    let body: Value = serde_json::from_slice(&forwarded.body).unwrap();
    assert_eq!(body["phase0_block"]["slot"], "1");
    assert_eq!(body["signature"], "0x01");
}

#[tokio::test]
async fn test_pool_attestations_filtered_by_slot() {
    let h = harness();
    h.upstream.reply(
        StatusCode::OK,
        json!({"data": [
            {"data": {"slot": "1", "index": "0"}},
            {"data": {"slot": "2", "index": "0"}},
        ]})
        .to_string(),
    );

    let response = h.get("/eth/v1/beacon/pool/attestations?slot=2").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        h.upstream.last_request().path_and_query,
        "/eth/v1/beacon/pool/attestations?slot=2"
    );
    let body = body_json(response).await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["data"]["slot"], "2");
}

#[tokio::test]
async fn test_state_root_answered_locally() {
    let h = harness_with(Vec::new(), Some(Arc::new(FakeProvider { head: 10 })));

    let response = h.get("/eth/v1/beacon/states/head/root").await;

    assert_eq!(response.status(), StatusCode::OK);
    let expected = format!("0x{}", hex::encode(state_root_at(10)));
    assert_eq!(body_json(response).await["data"]["root"], expected);
    assert!(h.upstream.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_state_root_by_known_root() {
    let h = harness_with(Vec::new(), Some(Arc::new(FakeProvider { head: 10 })));
    let root = format!("0x{}", hex::encode(state_root_at(7)));

    let response = h
        .get(&format!("/eth/v1/beacon/states/{}/root", root))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["root"], root);
}

#[tokio::test]
async fn test_state_root_errors() {
    let h = harness_with(Vec::new(), Some(Arc::new(FakeProvider { head: 10 })));

    let future = h.get("/eth/v1/beacon/states/11/root").await;
    assert_eq!(future.status(), StatusCode::BAD_REQUEST);

    let unknown = format!("0x{}", "ee".repeat(32));
    let missing = h
        .get(&format!("/eth/v1/beacon/states/{}/root", unknown))
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let invalid = h.get("/eth/v1/beacon/states/tip/root").await;
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_event_stream_relays_frames() {
    let head = RawEvent {
        event: "head ".into(),
        data: Bytes::from_static(br#"{"slot":"5","block":"qw==","state":"zQ=="}"#),
    };
    let h = harness_with(vec![head], None);

    let response = h.get("/eth/v1/events?topics=head").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
    let text = String::from_utf8(body_bytes(response).await.to_vec()).unwrap();
    assert!(text.starts_with("event: head\ndata: "));
    assert!(text.contains(r#""block":"0xab""#));
    assert!(text.contains(r#""state":"0xcd""#));
    assert!(text.ends_with("\n\n"));
    assert_eq!(h.events.queries.lock().unwrap()[0], "topics=head");
}

#[tokio::test]
async fn test_event_stream_unknown_topic_reported_in_band() {
    let bogus = RawEvent {
        event: "bogus".into(),
        data: Bytes::from_static(b"{}"),
    };
    let h = harness_with(vec![bogus], None);

    let response = h.get("/eth/v1/events?topics=head").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["code"], 500);
    assert!(body["message"].as_str().unwrap().contains("bogus"));
}

#[tokio::test]
async fn test_unknown_endpoint() {
    let h = harness();
    let response = h.get("/eth/v1/nonexistent").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], 404);
}

async fn ssz_download(h: &Harness, uri: &str) -> Response {
    h.send(
        Request::builder()
            .uri(uri)
            .header(header::ACCEPT, "application/octet-stream")
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

#[tokio::test]
async fn test_v1_ssz_block_defaults_to_phase0_version() {
    let h = harness();
    h.upstream.reply(StatusCode::OK, r#"{"data":"Zm9v"}"#);

    let response = ssz_download(&h, "/eth/v1/beacon/blocks/head").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["eth-consensus-version"], "phase0");
    assert_eq!(body_bytes(response).await.as_ref(), b"foo");
}

#[tokio::test]
async fn test_ssz_downloads_for_debug_state_and_blinded_block() {
    for (uri, upstream_path, file_name) in [
        (
            "/eth/v1/debug/beacon/states/head",
            "/internal/eth/v1/debug/beacon/states/head/ssz",
            "beacon_state.ssz",
        ),
        (
            "/eth/v1/beacon/blinded_blocks/head",
            "/internal/eth/v1/beacon/blinded_blocks/head/ssz",
            "beacon_block.ssz",
        ),
    ] {
        let h = harness();
        h.upstream
            .reply(StatusCode::OK, r#"{"version":"BELLATRIX","data":"Zm9v"}"#);

        let response = ssz_download(&h, uri).await;

        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        assert_eq!(h.upstream.last_request().path_and_query, upstream_path);
        let headers = response.headers().clone();
        assert_eq!(headers["eth-consensus-version"], "bellatrix");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            format!("attachment; filename={}", file_name).as_str()
        );
        assert_eq!(body_bytes(response).await.as_ref(), b"foo");
    }
}

#[tokio::test]
async fn test_json_accept_keeps_blinded_block_on_json_path() {
    let h = harness();
    h.upstream
        .reply(StatusCode::OK, r#"{"data":{"message":{"slot":"1"}}}"#);

    let response = h
        .send(
            Request::builder()
                .uri("/eth/v1/beacon/blinded_blocks/head")
                .header(header::ACCEPT, "application/json")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        h.upstream.last_request().path_and_query,
        "/eth/v1/beacon/blinded_blocks/head"
    );
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
}

#[tokio::test]
async fn test_ssz_block_upload() {
    let h = harness();
    h.upstream.reply(StatusCode::OK, Bytes::new());

    let response = h
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/eth/v2/beacon/blocks")
                .header(header::CONTENT_TYPE, "application/octet-stream")
                .header("Eth-Consensus-Version", "capella")
                .body(Body::from("foo"))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_bytes(response).await.is_empty());

    let forwarded = h.upstream.last_request();
    assert_eq!(forwarded.method, Method::POST);
    assert_eq!(forwarded.path_and_query, "/internal/eth/v2/beacon/blocks/ssz");
    let body: Value = serde_json::from_slice(&forwarded.body).unwrap();
    assert_eq!(body, json!({"data": "Zm9v"}));
    assert_eq!(forwarded.headers[header::CONTENT_TYPE], "application/json");
    assert_eq!(
        forwarded.headers["Grpc-Metadata-Eth-Consensus-Version"],
        "capella"
    );
    assert!(forwarded.headers.get("Eth-Consensus-Version").is_none());
    assert_eq!(h.service.metrics().to_json()["ssz"]["posts"], 1);
}
