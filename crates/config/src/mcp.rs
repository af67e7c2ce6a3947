//! SSE transport configuration settings.

/// SSE transport configuration settings.
///
/// The two paths together form the transport surface: clients open the event
/// stream with a `GET` on [`sse_path`](Self::sse_path) and submit protocol
/// messages with a `POST` on [`messages_path`](Self::messages_path), carrying
/// the session identifier they were handed on the stream.
#[derive(Debug, Clone)]
pub struct McpConfig {
    /// The path serving the SSE event stream.
    pub sse_path: String,
    /// The path accepting posted protocol messages.
    pub messages_path: String,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            sse_path: default_sse_path(),
            messages_path: default_messages_path(),
        }
    }
}

pub(crate) fn default_sse_path() -> String {
    "/sse".to_string()
}

pub(crate) fn default_messages_path() -> String {
    "/mcp-messages".to_string()
}
