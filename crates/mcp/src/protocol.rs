//! Contract between the transport layer and the wrapped protocol server.

use async_trait::async_trait;

use crate::transport::SessionTransport;

/// The protocol server bound to incoming sessions.
///
/// The transport layer treats the implementation as opaque: it creates a
/// [`SessionTransport`] per connection and hands it over. Everything the
/// server does with the messages is its own business.
#[async_trait]
pub trait ProtocolServer: Send + Sync {
    /// Binds protocol logic to one session transport.
    ///
    /// Suspends for the lifetime of the session and resolves once the
    /// transport closes, whether by client disconnect or local closure. An
    /// error covers both a failed setup handshake and an abnormal session
    /// end; the caller reports it, nothing more.
    async fn connect(&self, transport: SessionTransport) -> anyhow::Result<()>;

    /// Global teardown, invoked once during shutdown.
    async fn close(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
