//! Request pipeline for proxied Beacon API endpoints.
//!
//! ```text
//! custom handler? ──yes──► SSZ GET / SSZ POST / events / state root
//!       │no
//!       ▼
//! request hooks ─► forward ─► upstream error? ──yes──► passthrough
//!                                   │no
//!                                   ▼
//!                            response hooks ─► write
//! ```
//!
//! The first error ends the request; nothing is written before it.

use crate::codec::{
    encode_ssz_request, forwardable_headers, write_empty_response, write_json_response,
    write_ssz_response, SszEnvelope, CUSTOM_ERROR_METADATA,
};
use crate::dispatch::VersionDispatcher;
use crate::domain::correlation::CorrelationId;
use crate::domain::error::{ApiError, ApiResult};
use crate::domain::negotiation::{ssz_posted, ssz_requested, JSON_MEDIA_TYPE};
use crate::endpoints::{
    encode_path_params, encode_query, path_param, CustomHandler, Endpoint, EndpointRegistry,
};
use crate::events::{ChannelSink, EventRelay, EventSink};
use crate::hooks::{relocate_version, run_request_hooks, run_response_hooks, HookContext, HookRequest};
use crate::middleware::metrics::{GatewayMetrics, RequestTimer};
use crate::ports::{EventSubscriber, UpstreamClient, UpstreamRequest, UpstreamResponse};
use crate::state::StateResolver;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::request::Parts;
use axum::http::{HeaderValue, Method, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::MethodRouter;
use axum::{Json, Router};
use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use std::sync::Arc;
use tracing::{debug, warn};

/// Frames buffered per event stream before the relay waits on the client.
const EVENT_STREAM_BUFFER: usize = 16;

/// Shared state of every proxied route.
#[derive(Clone)]
pub struct GatewayState {
    pub upstream: Arc<dyn UpstreamClient>,
    pub events: Arc<dyn EventSubscriber>,
    /// Present when a local state store is wired in.
    pub resolver: Option<StateResolver>,
    pub dispatcher: VersionDispatcher,
    pub metrics: Arc<GatewayMetrics>,
    pub max_body_size: usize,
}

/// Router serving every endpoint of `registry`.
pub fn api_router(registry: &EndpointRegistry, state: GatewayState) -> Router {
    let mut router: Router<GatewayState> = Router::new();
    for (path, endpoints) in registry.by_path() {
        let mut methods: MethodRouter<GatewayState> = MethodRouter::new();
        for endpoint in endpoints {
            let method = endpoint.method.clone();
            let handler = move |State(state): State<GatewayState>, request: Request| {
                handle(state, endpoint, request)
            };
            methods = if method == Method::POST {
                methods.post(handler)
            } else {
                methods.get(handler)
            };
        }
        router = router.route(path, methods);
    }
    router
        .fallback(|| async { ApiError::not_found("endpoint not found") })
        .with_state(state)
}

/// Run one request through `endpoint`'s pipeline.
pub async fn handle(state: GatewayState, endpoint: Arc<Endpoint>, request: Request) -> Response {
    let correlation_id = CorrelationId::from_headers(request.headers());
    let timer = RequestTimer::new(Arc::clone(&state.metrics));
    debug!(
        correlation_id = %correlation_id,
        method = %request.method(),
        endpoint = endpoint.path,
        "Handling request"
    );

    let response = match process(&state, &endpoint, request, correlation_id).await {
        Ok(response) => response,
        Err(err) => {
            warn!(
                correlation_id = %correlation_id,
                endpoint = endpoint.path,
                code = err.code,
                error = %err.message,
                "Request failed"
            );
            render_error(&endpoint, err, None)
        }
    };

    timer.finish(response.status().is_success());
    response
}

async fn process(
    state: &GatewayState,
    endpoint: &Endpoint,
    request: Request,
    correlation_id: CorrelationId,
) -> ApiResult<Response> {
    let (parts, body) = request.into_parts();

    let custom = endpoint.custom_handlers.iter().copied().find(|h| match h {
        CustomHandler::SszGet { .. } => ssz_requested(&parts.headers),
        CustomHandler::SszPost => ssz_posted(&parts.headers),
        CustomHandler::Events => true,
        CustomHandler::StateRoot => state.resolver.is_some(),
    });

    match custom {
        Some(CustomHandler::SszGet { file_name }) => {
            ssz_get(state, endpoint, &parts, file_name).await
        }
        Some(CustomHandler::SszPost) => {
            let body = read_body(body, state.max_body_size).await?;
            ssz_post(state, endpoint, &parts, body).await
        }
        Some(CustomHandler::Events) => stream_events(state, &parts, correlation_id).await,
        Some(CustomHandler::StateRoot) => state_root(state, endpoint, &parts).await,
        None => {
            let body = read_body(body, state.max_body_size).await?;
            default_pipeline(state, endpoint, &parts, body).await
        }
    }
}

/// Buffer the request body. Only an oversized body is a 413.
async fn read_body(body: Body, limit: usize) -> ApiResult<Bytes> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(ApiError::new(
            413,
            format!("request body exceeds {} bytes", limit),
        )),
        Err(e) => Err(ApiError::bad_request(format!(
            "could not read request body: {}",
            e
        ))),
    }
}

/// Path and query as the internal gateway expects them.
fn upstream_target(endpoint: &Endpoint, uri: &Uri, binary: bool) -> ApiResult<String> {
    let mut path = encode_path_params(endpoint.path, uri.path())?;
    if binary {
        path = format!("/internal{}/ssz", path);
    }
    match uri.query() {
        Some(query) if !query.is_empty() => Ok(format!("{}?{}", path, encode_query(query)?)),
        _ => Ok(path),
    }
}

async fn default_pipeline(
    state: &GatewayState,
    endpoint: &Endpoint,
    parts: &Parts,
    body: Bytes,
) -> ApiResult<Response> {
    let ctx = HookContext {
        dispatcher: &state.dispatcher,
        query: parts.uri.query(),
    };
    let mut outbound = HookRequest {
        headers: parts.headers.clone(),
        body,
    };
    run_request_hooks(&endpoint.request_hooks, &ctx, &mut outbound)?;

    let upstream = state
        .upstream
        .forward(UpstreamRequest {
            method: parts.method.clone(),
            path_and_query: upstream_target(endpoint, &parts.uri, false)?,
            headers: outbound.headers,
            body: outbound.body,
        })
        .await?;

    if let Some(response) = upstream_error(endpoint, &upstream) {
        return Ok(response);
    }

    if parts.method == Method::POST && upstream.body.is_empty() {
        return Ok(write_empty_response(upstream.status, &upstream.headers)?);
    }

    let mut body = upstream.body.clone();
    run_response_hooks(&endpoint.response_hooks, &ctx, &mut body)?;
    Ok(write_json_response(upstream.status, &upstream.headers, body)?)
}

async fn ssz_get(
    state: &GatewayState,
    endpoint: &Endpoint,
    parts: &Parts,
    file_name: &'static str,
) -> ApiResult<Response> {
    let upstream = state
        .upstream
        .forward(UpstreamRequest {
            method: Method::GET,
            path_and_query: upstream_target(endpoint, &parts.uri, true)?,
            headers: parts.headers.clone(),
            body: Bytes::new(),
        })
        .await?;

    if let Some(response) = upstream_error(endpoint, &upstream) {
        return Ok(response);
    }

    let (version, raw) = SszEnvelope::from_json(&upstream.body)?.decode()?;
    let response = write_ssz_response(
        upstream.status,
        &upstream.headers,
        Bytes::from(raw),
        Some(version.as_str()),
        file_name,
    )?;
    state.metrics.record_ssz_response();
    Ok(response)
}

async fn ssz_post(
    state: &GatewayState,
    endpoint: &Endpoint,
    parts: &Parts,
    body: Bytes,
) -> ApiResult<Response> {
    let mut headers = parts.headers.clone();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MEDIA_TYPE));
    relocate_version(&mut headers)?;

    let upstream = state
        .upstream
        .forward(UpstreamRequest {
            method: Method::POST,
            path_and_query: upstream_target(endpoint, &parts.uri, true)?,
            headers,
            body: encode_ssz_request(&body)?,
        })
        .await?;

    if let Some(response) = upstream_error(endpoint, &upstream) {
        return Ok(response);
    }

    state.metrics.record_ssz_post();
    Ok(write_empty_response(upstream.status, &upstream.headers)?)
}

async fn stream_events(
    state: &GatewayState,
    parts: &Parts,
    correlation_id: CorrelationId,
) -> ApiResult<Response> {
    let subscription = state
        .events
        .subscribe(parts.uri.query().unwrap_or_default())
        .await?;

    let (mut sink, body) = ChannelSink::new(EVENT_STREAM_BUFFER);
    let cancel = sink.closed();
    let relay = EventRelay::new(correlation_id, Arc::clone(&state.metrics));
    tokio::spawn(async move {
        if let Err(e) = relay.run(subscription, &mut sink, cancel).await {
            // the status line is already out; report in-band and close
            let err = ApiError::from(e);
            if sink.write(&err.to_json_bytes()).await.is_ok() {
                let _ = sink.flush().await;
            }
        }
    });

    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    Ok(response)
}

async fn state_root(
    state: &GatewayState,
    endpoint: &Endpoint,
    parts: &Parts,
) -> ApiResult<Response> {
    let resolver = state
        .resolver
        .as_ref()
        .ok_or_else(|| ApiError::internal("no state store configured"))?;
    let state_id = path_param(endpoint.path, parts.uri.path(), "state_id")
        .ok_or_else(|| ApiError::bad_request("missing state ID"))?;

    let root = resolver.state_root(state_id).await?;
    Ok(Json(serde_json::json!({
        "data": { "root": format!("0x{}", hex::encode(root)) }
    }))
    .into_response())
}

/// The upstream's own error, ready to hand to the client.
///
/// An error is a body carrying a non-empty `message`, or any non-2xx status.
/// The code is always the upstream's HTTP status.
fn upstream_error(endpoint: &Endpoint, upstream: &UpstreamResponse) -> Option<Response> {
    let parsed = serde_json::from_slice::<ApiError>(&upstream.body)
        .ok()
        .filter(|e| !e.message.is_empty());

    let mut err = match parsed {
        Some(err) => err,
        None if !upstream.status.is_success() => ApiError::new(
            upstream.status.as_u16(),
            upstream
                .status
                .canonical_reason()
                .unwrap_or("upstream request failed"),
        ),
        None => return None,
    };
    err.code = upstream.status.as_u16();

    if let Some(custom) = upstream
        .headers
        .get(CUSTOM_ERROR_METADATA)
        .and_then(|v| v.to_str().ok())
    {
        if let Err(e) = err.merge_custom(custom) {
            warn!(error = %e, "Could not unmarshal custom error message");
        }
    }

    debug!(endpoint = endpoint.path, code = err.code, "Passing upstream error through");
    Some(render_error(endpoint, err, Some(&upstream.headers)))
}

fn render_error(
    endpoint: &Endpoint,
    mut err: ApiError,
    upstream_headers: Option<&axum::http::HeaderMap>,
) -> Response {
    if !endpoint.indexed_failures() {
        err.failures = None;
    }
    let mut response = err.into_response();
    if let Some(upstream) = upstream_headers {
        response.headers_mut().extend(forwardable_headers(upstream));
    }
    response
}
