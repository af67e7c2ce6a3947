//! Relay server library.
//!
//! Provides a reusable serve function used by the binary and by the
//! integration tests.

#![deny(missing_docs)]

mod health;
mod shutdown;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::anyhow;
use axum::{Router, routing::get};
use config::Config;
use mcp::SessionRegistry;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Configuration for serving relay.
pub struct ServeConfig {
    /// The socket address (IP and port) the server will bind to.
    pub listen_address: SocketAddr,
    /// The resolved relay configuration.
    pub config: Config,
    /// Optional shutdown trigger replacing the process termination signals.
    /// Used by the integration tests to drive graceful shutdown in-process.
    pub shutdown: Option<CancellationToken>,
}

/// Starts and runs the relay server with the provided configuration.
///
/// Resolves after a graceful shutdown has drained every open session, or
/// fails if the listening socket cannot be bound.
pub async fn serve(
    ServeConfig {
        listen_address,
        config,
        shutdown,
    }: ServeConfig,
) -> anyhow::Result<()> {
    let registry = Arc::new(SessionRegistry::new());
    let protocol = mcp::service_from_config(&config.upstream);

    if protocol.is_none() {
        log::warn!(
            "Server starting without an initialized MCP server. \
            All transport endpoints will answer 503 until an access token is configured."
        );
    }

    let mut app = mcp::router(&config.mcp, registry.clone(), protocol.clone());

    if config.server.health.enabled {
        let health_router = Router::new().route(&config.server.health.path, get(health::health));
        app = app.merge(health_router);
    }

    let listener = TcpListener::bind(listen_address)
        .await
        .map_err(|e| anyhow!("Failed to bind to {listen_address}: {e}"))?;

    log::info!(
        "MCP SSE endpoint available at: http://{listen_address}{}",
        config.mcp.sse_path
    );

    let coordinator = shutdown::LifecycleCoordinator::new(registry, protocol);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown::graceful(coordinator, shutdown))
        .await
        .map_err(|e| anyhow!("Failed to start HTTP server: {e}"))?;

    Ok(())
}
