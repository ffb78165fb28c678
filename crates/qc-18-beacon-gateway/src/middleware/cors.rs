//! CORS layer built from `[cors]`.
//!
//! Browser clients need `Eth-Consensus-Version` and `Content-Disposition`
//! exposed to read SSZ downloads; both are in the default expose list.

use crate::domain::config::CorsConfig;
use axum::http::{HeaderName, Method};
use std::str::FromStr;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

fn is_wildcard(values: &[String]) -> bool {
    values.iter().any(|v| v == "*")
}

/// Entries that parse; invalid entries are skipped.
fn parse_all<T: FromStr>(values: &[String]) -> Vec<T> {
    values.iter().filter_map(|v| v.parse().ok()).collect()
}

/// Create CORS layer from gateway config
pub fn create_cors_layer(config: &CorsConfig) -> CorsLayer {
    if !config.enabled {
        return CorsLayer::very_permissive();
    }

    let mut cors = CorsLayer::new()
        .allow_methods(parse_all::<Method>(&config.allowed_methods))
        .max_age(Duration::from_secs(config.max_age));

    cors = if is_wildcard(&config.allowed_origins) {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(parse_all::<axum::http::HeaderValue>(&config.allowed_origins))
    };

    cors = if is_wildcard(&config.allowed_headers) {
        cors.allow_headers(Any)
    } else {
        cors.allow_headers(parse_all::<HeaderName>(&config.allowed_headers))
    };

    let expose = parse_all::<HeaderName>(&config.expose_headers);
    if !expose.is_empty() {
        cors = cors.expose_headers(expose);
    }

    // wildcard origins and credentials cannot be combined
    if config.allow_credentials && !is_wildcard(&config.allowed_origins) {
        cors = cors.allow_credentials(true);
    }

    cors
}
