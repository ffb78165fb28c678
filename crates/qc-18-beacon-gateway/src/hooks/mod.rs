//! Per-endpoint request and response hooks.
//!
//! Hooks are named functions attached to an endpoint descriptor. Request
//! hooks run before the body is forwarded, response hooks after the upstream
//! answered successfully. A hook returns [`RunDefault`]: `RunDefault(true)`
//! lets the rest of the phase run (later hooks, then the default step),
//! `RunDefault(false)` ends the phase with the hook's result as final. The
//! first error aborts the request.
//!
//! Default steps: a POST body must be a JSON document; an upstream body
//! must be a JSON document.

pub mod request;
pub mod response;
pub mod wrap;

pub use request::{publish_block, relocate_version, relocate_version_header, wrap_and_relocate};
pub use response::{
    collapse_block_response, collapse_produced_blinded_block_response,
    collapse_produced_block_response, collapse_state_response, filter_pool_attestations,
    flatten_validator_aggregates,
};
pub use wrap::*;

use crate::dispatch::VersionDispatcher;
use crate::domain::error::ApiError;
use axum::http::HeaderMap;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Whether the rest of the phase should run after a hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunDefault(pub bool);

impl RunDefault {
    pub const YES: RunDefault = RunDefault(true);
    pub const NO: RunDefault = RunDefault(false);
}

/// Read-only context shared by all hooks of one request.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    pub dispatcher: &'a VersionDispatcher,
    /// Raw client query string, before any re-encoding.
    pub query: Option<&'a str>,
}

/// The outbound request as request hooks see it.
#[derive(Debug, Clone, Default)]
pub struct HookRequest {
    pub headers: HeaderMap,
    pub body: Bytes,
}

type RequestHookFn =
    dyn Fn(&HookContext<'_>, &mut HookRequest) -> Result<RunDefault, ApiError> + Send + Sync;
type ResponseHookFn =
    dyn Fn(&HookContext<'_>, &mut Bytes) -> Result<RunDefault, ApiError> + Send + Sync;

/// Pre-serialize hook.
#[derive(Clone)]
pub struct RequestHook {
    name: &'static str,
    run: Arc<RequestHookFn>,
}

impl RequestHook {
    pub fn new<F>(name: &'static str, f: F) -> Self
    where
        F: Fn(&HookContext<'_>, &mut HookRequest) -> Result<RunDefault, ApiError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name,
            run: Arc::new(f),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn call(&self, ctx: &HookContext<'_>, req: &mut HookRequest) -> Result<RunDefault, ApiError> {
        (self.run)(ctx, req)
    }
}

impl fmt::Debug for RequestHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RequestHook").field(&self.name).finish()
    }
}

/// Post-deserialize hook; may rewrite the upstream body.
#[derive(Clone)]
pub struct ResponseHook {
    name: &'static str,
    run: Arc<ResponseHookFn>,
}

impl ResponseHook {
    pub fn new<F>(name: &'static str, f: F) -> Self
    where
        F: Fn(&HookContext<'_>, &mut Bytes) -> Result<RunDefault, ApiError> + Send + Sync + 'static,
    {
        Self {
            name,
            run: Arc::new(f),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn call(&self, ctx: &HookContext<'_>, body: &mut Bytes) -> Result<RunDefault, ApiError> {
        (self.run)(ctx, body)
    }
}

impl fmt::Debug for ResponseHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResponseHook").field(&self.name).finish()
    }
}

/// Run request hooks in order, then the default step unless a hook ended
/// the phase.
pub fn run_request_hooks(
    hooks: &[RequestHook],
    ctx: &HookContext<'_>,
    req: &mut HookRequest,
) -> Result<(), ApiError> {
    for hook in hooks {
        debug!(hook = hook.name(), "Running request hook");
        if hook.call(ctx, req)? == RunDefault::NO {
            return Ok(());
        }
    }
    default_request_step(req)
}

/// Run response hooks in order, then the default step unless a hook ended
/// the phase.
pub fn run_response_hooks(
    hooks: &[ResponseHook],
    ctx: &HookContext<'_>,
    body: &mut Bytes,
) -> Result<(), ApiError> {
    for hook in hooks {
        debug!(hook = hook.name(), "Running response hook");
        if hook.call(ctx, body)? == RunDefault::NO {
            return Ok(());
        }
    }
    default_response_step(body)
}

fn default_request_step(req: &HookRequest) -> Result<(), ApiError> {
    if req.body.is_empty() {
        return Ok(());
    }
    serde_json::from_slice::<serde::de::IgnoredAny>(&req.body)
        .map(|_| ())
        .map_err(|e| ApiError::internal_with_context("could not decode request body", e))
}

fn default_response_step(body: &Bytes) -> Result<(), ApiError> {
    if body.is_empty() {
        return Ok(());
    }
    serde_json::from_slice::<serde::de::IgnoredAny>(body)
        .map(|_| ())
        .map_err(|e| ApiError::internal_with_context("could not unmarshal response", e))
}
