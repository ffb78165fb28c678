// Allow missing docs for internal items in development
#![allow(missing_docs)]

//! QC-18 Beacon Gateway - public Beacon API in front of a consensus node.
//!
//! Serves the standard Beacon API over HTTP. Requests are forwarded to the
//! node's internal RPC gateway, with JSON/SSZ negotiation, hex/base64
//! parameter re-encoding, fork-version aware body rewriting, and event
//! stream relaying done here.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                        BEACON GATEWAY (qc-18)                        │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐                              ┌─────────────┐       │
//! │  │  Beacon API  │                              │    Admin    │       │
//! │  │  Port 3501   │                              │  Port 8080  │       │
//! │  └──────┬───────┘                              └─────────────┘       │
//! │         │                                                            │
//! │  ┌──────┴────────────────────────────┐                               │
//! │  │  Middleware: CORS → Tracing       │                               │
//! │  └──────┬────────────────────────────┘                               │
//! │         │                                                            │
//! │  ┌──────┴────────────────────────────┐   ┌────────────────────────┐  │
//! │  │  Endpoint registry + proxy        │──▶│ Hooks / version        │  │
//! │  │  (custom handlers, params)        │   │ dispatch / SSZ codec   │  │
//! │  └──────┬──────────────┬─────────────┘   └────────────────────────┘  │
//! │         │              │                                             │
//! │  ┌──────┴──────┐ ┌─────┴────────┐ ┌──────────────────┐               │
//! │  │  Upstream   │ │ Event relay  │ │  State resolver  │               │
//! │  │  (reqwest)  │ │  (SSE)       │ │  (optional)      │               │
//! │  └──────┬──────┘ └─────┬────────┘ └──────────────────┘               │
//! └─────────┼──────────────┼─────────────────────────────────────────────┘
//!           ▼              ▼
//!        internal RPC gateway (Port 3500)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use qc_18_beacon_gateway::{BeaconGatewayService, GatewayConfig};
//!
//! let config = GatewayConfig::load("gateway.toml")?;
//! let mut service = BeaconGatewayService::from_config(config)?;
//! service.start().await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod codec;
pub mod dispatch;
pub mod domain;
pub mod endpoints;
pub mod events;
pub mod hooks;
pub mod middleware;
pub mod ports;
pub mod proxy;
pub mod service;
pub mod state;

// Re-exports for public API
pub use domain::config::GatewayConfig;
pub use domain::error::{ApiError, ApiResult, GatewayError};
pub use domain::types::*;
pub use domain::version::ForkVersion;
pub use endpoints::{Endpoint, EndpointRegistry};
pub use middleware::GatewayMetrics;
pub use ports::{ChainStateProvider, EventSubscriber, UpstreamClient};
pub use service::BeaconGatewayService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
