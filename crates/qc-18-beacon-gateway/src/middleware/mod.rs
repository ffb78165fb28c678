//! Middleware stack for the beacon gateway.
//!
//! Layer order: Request → CORS → Tracing → Handler
//!
//! Metrics are recorded by the handlers themselves, since only they know
//! whether a response was served as SSZ or opened an event stream.

pub mod cors;
pub mod metrics;
pub mod tracing;

pub use cors::create_cors_layer;
pub use metrics::{GatewayMetrics, RequestTimer};
pub use tracing::TracingLayer;

use crate::domain::config::GatewayConfig;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Middleware stack builder
#[derive(Debug, Clone)]
pub struct MiddlewareStack {
    pub cors: CorsLayer,
    pub tracing: TracingLayer,
    pub metrics: Arc<GatewayMetrics>,
}

impl MiddlewareStack {
    /// Create middleware stack from gateway config
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            cors: create_cors_layer(&config.cors),
            tracing: TracingLayer::new(),
            metrics: Arc::new(GatewayMetrics::new()),
        }
    }

    /// Get shared metrics
    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.metrics)
    }
}
