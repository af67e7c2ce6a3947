//! Wrapped upstream MCP server configuration settings.

use secrecy::SecretString;
use url::Url;

/// Configuration for the wrapped upstream MCP server.
#[derive(Debug, Clone, Default)]
pub struct UpstreamConfig {
    /// Access token authenticating against the upstream platform.
    ///
    /// Required for the protocol server to be created at all; without it
    /// every transport endpoint degrades to `503 Service Unavailable`.
    pub access_token: Option<SecretString>,
    /// Optional project the upstream server is scoped to.
    pub project_ref: Option<String>,
    /// Restrict the upstream server to read-only operations.
    pub read_only: bool,
    /// Override for the upstream platform API base URL.
    pub api_url: Option<Url>,
}

impl UpstreamConfig {
    /// Returns the access token, if one is configured.
    pub fn access_token(&self) -> Option<&SecretString> {
        self.access_token.as_ref()
    }
}
