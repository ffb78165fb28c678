//! Endpoint descriptors.
//!
//! Every proxied route is described once, at start-up, by an [`Endpoint`]:
//! its path pattern, the error body shape, the hooks run around the forward
//! and the custom handlers that may take the request over entirely.
//! Descriptors are immutable after registration.

pub mod params;
pub mod registry;

pub use params::{encode_path_params, encode_query, path_param};
pub use registry::EndpointRegistry;

use crate::hooks::{RequestHook, ResponseHook};
use axum::http::Method;

/// Shape of the error body the endpoint reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorSchema {
    /// `{"message", "code"}`
    #[default]
    Default,
    /// `{"message", "code", "failures": [{"index", "message"}]}`, batch
    /// submissions only.
    IndexedFailures,
}

/// Handler that may answer a request instead of the default pipeline.
///
/// Handlers are tried in order; the first one that applies wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomHandler {
    /// Binary download when the client prefers `application/octet-stream`.
    SszGet { file_name: &'static str },
    /// Binary upload when the body is `application/octet-stream`.
    SszPost,
    /// Server-sent event stream.
    Events,
    /// State root answered from the local state store.
    StateRoot,
}

/// One proxied route.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub method: Method,
    /// axum path pattern, e.g. `/eth/v1/beacon/states/:state_id/root`
    pub path: &'static str,
    pub error_schema: ErrorSchema,
    pub request_hooks: Vec<RequestHook>,
    pub response_hooks: Vec<ResponseHook>,
    pub custom_handlers: Vec<CustomHandler>,
}

impl Endpoint {
    pub fn new(method: Method, path: &'static str) -> Self {
        Self {
            method,
            path,
            error_schema: ErrorSchema::Default,
            request_hooks: Vec::new(),
            response_hooks: Vec::new(),
            custom_handlers: Vec::new(),
        }
    }

    pub fn get(path: &'static str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: &'static str) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn with_error_schema(mut self, schema: ErrorSchema) -> Self {
        self.error_schema = schema;
        self
    }

    pub fn with_request_hook(mut self, hook: RequestHook) -> Self {
        self.request_hooks.push(hook);
        self
    }

    pub fn with_request_hooks(mut self, hooks: impl IntoIterator<Item = RequestHook>) -> Self {
        self.request_hooks.extend(hooks);
        self
    }

    pub fn with_response_hook(mut self, hook: ResponseHook) -> Self {
        self.response_hooks.push(hook);
        self
    }

    pub fn with_custom_handler(mut self, handler: CustomHandler) -> Self {
        self.custom_handlers.push(handler);
        self
    }

    /// Whether the endpoint keeps per-item failures in error bodies.
    pub fn indexed_failures(&self) -> bool {
        self.error_schema == ErrorSchema::IndexedFailures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::wrap_attestations_array;

    #[test]
    fn test_builder_preserves_order() {
        let endpoint = Endpoint::post("/eth/v1/beacon/pool/attestations")
            .with_error_schema(ErrorSchema::IndexedFailures)
            .with_request_hook(wrap_attestations_array())
            .with_custom_handler(CustomHandler::SszPost)
            .with_custom_handler(CustomHandler::Events);

        assert_eq!(endpoint.method, Method::POST);
        assert!(endpoint.indexed_failures());
        assert_eq!(endpoint.request_hooks[0].name(), "wrap_attestations_array");
        assert_eq!(
            endpoint.custom_handlers,
            vec![CustomHandler::SszPost, CustomHandler::Events]
        );
    }

    #[test]
    fn test_defaults() {
        let endpoint = Endpoint::get("/eth/v1/node/version");
        assert_eq!(endpoint.error_schema, ErrorSchema::Default);
        assert!(endpoint.request_hooks.is_empty());
        assert!(endpoint.custom_handlers.is_empty());
    }
}
