//! One SSE session: the identifier handed to the client and the transport
//! handle owning the inbound half of the connection.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use rmcp::model::{ClientJsonRpcMessage, ServerJsonRpcMessage};
use tokio::sync::mpsc;

use crate::transport::SessionTransport;

/// Messages buffered per direction before senders are backpressured.
const MESSAGE_BUFFER: usize = 64;

/// Opaque, server-generated identifier correlating posted messages with
/// their originating SSE stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(Arc<str>);

impl SessionId {
    pub(crate) fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string().into())
    }

    /// The identifier as sent over the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The message could not be delivered because the session's transport is
/// closed, or closing.
#[derive(Debug, thiserror::Error)]
#[error("session {0} is closed")]
pub struct SessionClosed(pub SessionId);

/// Handle to one open SSE session.
///
/// The handle owns the sending half of the session's inbound message channel.
/// Closing takes that sender; the protocol service bound to the session then
/// observes end-of-stream, shuts down and releases the outbound stream, which
/// terminates the SSE response. The handle never releases resources directly.
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    messages_in: Mutex<Option<mpsc::Sender<ClientJsonRpcMessage>>>,
}

impl SessionHandle {
    /// The session identifier generated at creation time.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Whether the session has been closed.
    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }

    /// Forwards a posted protocol message to the session's transport.
    ///
    /// The sender is cloned out of the lock before awaiting, so the open
    /// state is never held across a suspension point.
    pub async fn accept(&self, message: ClientJsonRpcMessage) -> Result<(), SessionClosed> {
        let sender = self.lock().clone();

        match sender {
            Some(tx) => tx.send(message).await.map_err(|_| SessionClosed(self.id.clone())),
            None => Err(SessionClosed(self.id.clone())),
        }
    }

    /// Closes the session. Safe to call any number of times; both the
    /// disconnect path and shutdown may race here.
    pub async fn close(&self) {
        self.close_now();
    }

    pub(crate) fn close_now(&self) {
        let taken = self.lock().take();

        if taken.is_some() {
            log::debug!("session {}: transport closed", self.id);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<mpsc::Sender<ClientJsonRpcMessage>>> {
        self.messages_in.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A freshly created session, before registration: the registry-owned handle,
/// the transport to bind the protocol server to, and the outbound message
/// stream feeding the SSE response.
pub struct OpenSession {
    /// The handle the registry owns while the session is open.
    pub handle: Arc<SessionHandle>,
    /// The transport to hand to the protocol server.
    pub transport: SessionTransport,
    /// Messages the protocol server emits for the SSE response.
    pub outbound: mpsc::Receiver<ServerJsonRpcMessage>,
}

impl OpenSession {
    /// Creates a session with a fresh identifier and wired channels.
    pub fn open() -> Self {
        let (in_tx, in_rx) = mpsc::channel(MESSAGE_BUFFER);
        let (out_tx, out_rx) = mpsc::channel(MESSAGE_BUFFER);

        Self {
            handle: Arc::new(SessionHandle {
                id: SessionId::new(),
                messages_in: Mutex::new(Some(in_tx)),
            }),
            transport: SessionTransport::new(in_rx, out_tx),
            outbound: out_rx,
        }
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use super::*;

    fn initialized_notification() -> ClientJsonRpcMessage {
        serde_json::from_str(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap()
    }

    #[test]
    fn session_ids_are_unique_and_nonempty() {
        let a = SessionId::new();
        let b = SessionId::new();

        assert!(!a.as_str().is_empty());
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn accept_delivers_to_the_transport() {
        let OpenSession {
            handle, mut transport, ..
        } = OpenSession::open();

        handle.accept(initialized_notification()).await.unwrap();

        assert!(transport.next().await.is_some());
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let OpenSession { handle, .. } = OpenSession::open();

        assert!(!handle.is_closed());

        handle.close().await;
        handle.close().await;

        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn accept_fails_once_closed() {
        let OpenSession { handle, .. } = OpenSession::open();

        handle.close().await;

        let error = handle.accept(initialized_notification()).await.unwrap_err();
        assert_eq!(error.0, *handle.id());
    }

    #[tokio::test]
    async fn close_ends_the_inbound_stream() {
        let OpenSession {
            handle, mut transport, ..
        } = OpenSession::open();

        handle.close().await;

        assert!(transport.next().await.is_none());
    }
}
