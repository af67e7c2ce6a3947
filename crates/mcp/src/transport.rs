//! The transport object a protocol server is bound to: a stream of posted
//! client messages paired with a sink of server messages destined for the
//! SSE response.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use rmcp::model::{ClientJsonRpcMessage, ServerJsonRpcMessage};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::PollSender;

/// One session's message channels, as seen by the protocol server.
///
/// Implements [`Stream`] for inbound client messages and [`Sink`] for
/// outbound server messages, which satisfies rmcp's transport contract. The
/// stream ends when the session handle is closed; dropping the transport
/// closes the outbound channel and with it the SSE response stream.
pub struct SessionTransport {
    incoming: ReceiverStream<ClientJsonRpcMessage>,
    outgoing: PollSender<ServerJsonRpcMessage>,
}

impl SessionTransport {
    pub(crate) fn new(
        incoming: mpsc::Receiver<ClientJsonRpcMessage>,
        outgoing: mpsc::Sender<ServerJsonRpcMessage>,
    ) -> Self {
        Self {
            incoming: ReceiverStream::new(incoming),
            outgoing: PollSender::new(outgoing),
        }
    }
}

impl Stream for SessionTransport {
    type Item = ClientJsonRpcMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.incoming.poll_next_unpin(cx)
    }
}

impl Sink<ServerJsonRpcMessage> for SessionTransport {
    type Error = io::Error;

    fn poll_ready(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.outgoing.poll_ready_unpin(cx).map_err(io::Error::other)
    }

    fn start_send(mut self: Pin<&mut Self>, item: ServerJsonRpcMessage) -> Result<(), Self::Error> {
        self.outgoing.start_send_unpin(item).map_err(io::Error::other)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.outgoing.poll_flush_unpin(cx).map_err(io::Error::other)
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.outgoing.poll_close_unpin(cx).map_err(io::Error::other)
    }
}
