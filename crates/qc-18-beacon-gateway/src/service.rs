//! Beacon gateway service - main entry point.
//!
//! Runs the public Beacon API server and the admin server (health and
//! metrics).

use crate::adapters::{HttpEventSubscriber, HttpUpstreamClient};
use crate::dispatch::VersionDispatcher;
use crate::domain::config::GatewayConfig;
use crate::domain::error::GatewayError;
use crate::endpoints::EndpointRegistry;
use crate::middleware::{GatewayMetrics, MiddlewareStack};
use crate::ports::{ChainStateProvider, EventSubscriber, UpstreamClient};
use crate::proxy::{api_router, GatewayState};
use crate::state::StateResolver;
use axum::{response::IntoResponse, routing::get, Json, Router};
use std::sync::Arc;
use tokio::sync::oneshot;
use tower::ServiceBuilder;
use tracing::{error, info};

/// Beacon gateway service state
pub struct BeaconGatewayService {
    config: GatewayConfig,
    registry: EndpointRegistry,
    state: GatewayState,
    middleware: MiddlewareStack,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl BeaconGatewayService {
    /// Create a service around explicit collaborators.
    ///
    /// `provider` enables locally answered state queries; without it every
    /// request is forwarded.
    pub fn new(
        config: GatewayConfig,
        upstream: Arc<dyn UpstreamClient>,
        events: Arc<dyn EventSubscriber>,
        provider: Option<Arc<dyn ChainStateProvider>>,
    ) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        // Fork schedule is built once and shared read-only
        let schedule = config
            .chain
            .fork_schedule()
            .map_err(|e| GatewayError::Config(e.to_string()))?;
        let middleware = MiddlewareStack::from_config(&config);

        let state = GatewayState {
            upstream,
            events,
            resolver: provider.map(|p| {
                StateResolver::new(p)
                    .with_history_window(config.chain.slots_per_historical_root as usize)
            }),
            dispatcher: VersionDispatcher::new(Arc::new(schedule)),
            metrics: middleware.metrics(),
            max_body_size: config.http.max_body_size,
        };

        Ok(Self {
            config,
            registry: EndpointRegistry::beacon(),
            state,
            middleware,
            shutdown_tx: None,
        })
    }

    /// Create a service talking HTTP to the configured upstream.
    pub fn from_config(config: GatewayConfig) -> Result<Self, GatewayError> {
        let upstream = HttpUpstreamClient::new(&config.upstream)?;
        let events = HttpEventSubscriber::new(upstream.http_client(), upstream.base_url());
        Self::new(config, Arc::new(upstream), Arc::new(events), None)
    }

    /// Start the gateway servers
    pub async fn start(&mut self) -> Result<(), GatewayError> {
        info!("Starting beacon gateway...");

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);

        let http_router = self.router();
        let admin_router = self.admin_router();

        // Bind before reporting success so port clashes surface here
        let http_handle = if self.config.http.enabled {
            let http_addr = self.config.http_addr();
            let listener = tokio::net::TcpListener::bind(http_addr)
                .await
                .map_err(|e| GatewayError::Bind(format!("{}: {}", http_addr, e)))?;
            info!(addr = %http_addr, endpoints = self.registry.len(), "Starting HTTP server");
            Some(tokio::spawn(async move {
                axum::serve(listener, http_router).await
            }))
        } else {
            None
        };

        let _admin_handle = if self.config.admin.enabled {
            let admin_addr = self.config.admin_addr();
            let listener = tokio::net::TcpListener::bind(admin_addr)
                .await
                .map_err(|e| GatewayError::Bind(format!("{}: {}", admin_addr, e)))?;
            info!(addr = %admin_addr, "Starting Admin server");
            Some(tokio::spawn(async move {
                axum::serve(listener, admin_router).await
            }))
        } else {
            None
        };

        info!(upstream = %self.config.upstream.url, "Beacon gateway started successfully");

        // Wait for shutdown signal or server error
        tokio::select! {
            _ = &mut shutdown_rx => {
                info!("Received shutdown signal");
            }
            result = async {
                match http_handle {
                    Some(h) => h.await,
                    None => std::future::pending().await,
                }
            } => {
                match result {
                    Ok(Err(e)) => error!(error = %e, "HTTP server error"),
                    Err(e) => error!(error = %e, "HTTP server task failed"),
                    Ok(Ok(())) => {}
                }
            }
        }

        info!("Beacon gateway stopped");
        Ok(())
    }

    /// Trigger graceful shutdown
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Get metrics
    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.state.metrics)
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    /// Public Beacon API router with the middleware stack applied.
    pub fn router(&self) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(self.middleware.cors.clone())
            .layer(self.middleware.tracing.clone());

        api_router(&self.registry, self.state.clone())
            .route("/health", get(health_check))
            .layer(middleware)
    }

    /// Admin router: health and metrics.
    pub fn admin_router(&self) -> Router {
        let metrics = Arc::clone(&self.state.metrics);
        let router = Router::new().route("/health", get(health_check)).route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&metrics);
                async move { Json(metrics.to_json()) }
            }),
        );

        #[cfg(feature = "metrics")]
        let router = {
            let metrics = Arc::clone(&self.state.metrics);
            router.route(
                "/metrics/prometheus",
                get(move || {
                    let metrics = Arc::clone(&metrics);
                    async move {
                        match metrics.to_prometheus() {
                            Ok(text) => text.into_response(),
                            Err(e) => crate::domain::error::ApiError::internal(e.to_string())
                                .into_response(),
                        }
                    }
                }),
            )
        };

        router
    }
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "beacon-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
