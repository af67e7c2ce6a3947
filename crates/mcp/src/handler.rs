//! Axum handlers for the two transport endpoints: opening the SSE stream
//! and posting protocol messages against an open session.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures_util::{Stream, StreamExt, stream};
use rmcp::model::ClientJsonRpcMessage;
use serde::Deserialize;
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    protocol::ProtocolServer,
    registry::SessionRegistry,
    session::{OpenSession, SessionId},
};

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Shared state of the transport endpoints.
#[derive(Clone)]
pub(crate) struct McpState {
    pub(crate) registry: Arc<SessionRegistry>,
    pub(crate) protocol: Option<Arc<dyn ProtocolServer>>,
    pub(crate) messages_path: Arc<str>,
}

/// `GET <sse-path>`: opens a session and streams its outbound messages.
pub(crate) async fn open_stream(
    State(state): State<McpState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Response {
    let Some(protocol) = state.protocol.clone() else {
        log::warn!("Rejecting SSE connection from {peer}: no MCP server is initialized");
        return (StatusCode::SERVICE_UNAVAILABLE, "MCP server not initialized").into_response();
    };

    let OpenSession {
        handle,
        transport,
        outbound,
    } = OpenSession::open();

    let session_id = handle.id().clone();

    // Registration and the disconnect guard are both set up before the
    // first await point: however early the client goes away, deregistration
    // is already wired to the response stream being dropped.
    state.registry.put(handle.clone());

    let guard = DisconnectGuard {
        registry: state.registry.clone(),
        handle: handle.clone(),
    };

    log::info!("SSE session {session_id} opened by {peer}");

    {
        let session_id = session_id.clone();

        tokio::spawn(async move {
            if let Err(e) = protocol.connect(transport).await {
                log::error!("SSE session {session_id}: MCP server bind failed: {e}");
            }

            // Whatever ended the bind, mark the session closed so pending
            // POSTs turn away and the response stream can terminate.
            handle.close().await;
        });
    }

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("{}?sessionId={session_id}", state.messages_path));

    let messages = ReceiverStream::new(outbound).filter_map(|message| {
        let event = match serde_json::to_string(&message) {
            Ok(json) => Some(Ok(Event::default().event("message").data(json))),
            Err(e) => {
                log::error!("Failed to serialize an outbound MCP message: {e}");
                None
            }
        };

        std::future::ready(event)
    });

    let stream = SessionStream {
        inner: stream::once(std::future::ready(Ok::<_, Infallible>(endpoint))).chain(messages),
        _guard: guard,
    };

    Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
        .into_response()
}

/// Query parameters of the message endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MessageParams {
    session_id: Option<String>,
}

/// `POST <messages-path>?sessionId=<id>`: forwards one protocol message to
/// the session's transport.
pub(crate) async fn post_message(
    State(state): State<McpState>,
    Query(params): Query<MessageParams>,
    body: String,
) -> Response {
    if state.protocol.is_none() {
        return (StatusCode::SERVICE_UNAVAILABLE, "MCP server not initialized").into_response();
    }

    let Some(session_id) = params.session_id else {
        return (StatusCode::BAD_REQUEST, "the sessionId query parameter is required").into_response();
    };

    let session_id = SessionId::from(session_id);

    let Some(handle) = state.registry.get(&session_id) else {
        log::debug!("Rejecting a message for unknown session {session_id}");
        return (StatusCode::NOT_FOUND, "Session not found or already closed").into_response();
    };

    let message: ClientJsonRpcMessage = match serde_json::from_str(&body) {
        Ok(message) => message,
        Err(e) => return (StatusCode::BAD_REQUEST, format!("Invalid MCP message: {e}")).into_response(),
    };

    match handle.accept(message).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => {
            log::error!("Failed to deliver a message to session {session_id}: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to deliver the message").into_response()
        }
    }
}

/// Removes the session from the registry and closes its handle when the SSE
/// response stream is dropped, which covers client disconnects, local
/// closure, and streams ended by a failed bind.
struct DisconnectGuard {
    registry: Arc<SessionRegistry>,
    handle: Arc<crate::session::SessionHandle>,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let id = self.handle.id();

        self.registry.remove(id);
        self.handle.close_now();

        log::info!("SSE session {id} disconnected");
    }
}

/// An event stream tied to its session's disconnect guard.
struct SessionStream<S> {
    inner: S,
    _guard: DisconnectGuard,
}

impl<S> Stream for SessionStream<S>
where
    S: Stream + Unpin,
{
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.poll_next_unpin(cx)
    }
}
