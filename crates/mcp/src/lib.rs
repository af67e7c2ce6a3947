//! MCP-over-SSE transport library: the session registry mapping long-lived
//! event streams to the short-lived POSTs that feed them, plus the axum
//! endpoints and protocol-server seam around it.

#![deny(missing_docs)]

mod handler;
mod protocol;
mod registry;
mod session;
mod transport;
mod upstream;

use std::sync::Arc;

use axum::{Router, routing};
use config::McpConfig;
use handler::McpState;

pub use protocol::ProtocolServer;
pub use registry::SessionRegistry;
pub use session::{OpenSession, SessionClosed, SessionHandle, SessionId};
pub use transport::SessionTransport;
pub use upstream::{UpstreamMcp, UpstreamService, service_from_config};

/// Creates the axum router exposing the SSE transport.
///
/// `protocol` may be `None` when the upstream server could not be
/// initialized; both endpoints then answer `503 Service Unavailable` and the
/// registry stays untouched.
pub fn router(config: &McpConfig, registry: Arc<SessionRegistry>, protocol: Option<Arc<dyn ProtocolServer>>) -> Router {
    log::info!(
        "Creating the MCP SSE router: stream at {}, messages at {}",
        config.sse_path,
        config.messages_path
    );

    let state = McpState {
        registry,
        protocol,
        messages_path: config.messages_path.as_str().into(),
    };

    Router::new()
        .route(&config.sse_path, routing::get(handler::open_stream))
        .route(&config.messages_path, routing::post(handler::post_message))
        .with_state(state)
}
