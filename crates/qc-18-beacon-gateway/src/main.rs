//! Beacon gateway binary.
//!
//! Config path comes from the first argument or `BEACON_GATEWAY_CONFIG`;
//! without either the defaults are used. Log filtering follows `RUST_LOG`.

use anyhow::{Context, Result};
use qc_18_beacon_gateway::{BeaconGatewayService, GatewayConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn load_config() -> Result<GatewayConfig> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("BEACON_GATEWAY_CONFIG").ok());

    match path {
        Some(path) => {
            let config = GatewayConfig::load(&path)
                .with_context(|| format!("loading config from {}", path))?;
            info!(path = %path, "Loaded configuration");
            Ok(config)
        }
        None => {
            info!("No config file given, using defaults");
            Ok(GatewayConfig::default())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = load_config()?;
    let mut service = BeaconGatewayService::from_config(config)?;

    tokio::select! {
        result = service.start() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C received, shutting down");
        }
    }

    Ok(())
}
