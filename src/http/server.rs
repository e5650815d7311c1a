//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the relay routes
//! - Wire up middleware (request ID, tracing)
//! - Own the shared tunnel transport and dispatcher
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::http::request::{
    mark_inbound_request_id, propagate_request_id_layer, set_request_id_layer,
};
use crate::http::routes;
use crate::proxy::dispatcher::Dispatcher;
use crate::tunnel::{SocksTransport, Transport, TransportError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub max_body_bytes: usize,
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a server whose upstream calls go through the configured SOCKS5 tunnel.
    pub fn new(config: ProxyConfig) -> Result<Self, TransportError> {
        let transport = SocksTransport::new(&config.socks5, &config.upstream)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a server over an arbitrary transport.
    pub fn with_transport(config: ProxyConfig, transport: Arc<dyn Transport>) -> Self {
        let state = AppState {
            dispatcher: Arc::new(Dispatcher::new(transport, &config.upstream)),
            max_body_bytes: config.upstream.max_body_bytes,
        };
        let router = Self::build_router(state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route(
                "/v1/{*path}",
                get(routes::proxy_get).post(routes::proxy_post),
            )
            .route("/health", get(routes::health))
            .with_state(state)
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
            .layer(middleware::from_fn(mark_inbound_request_id))
    }

    /// The fully layered router, for driving the relay without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.base_url,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}
