//! The wrapped upstream MCP server and its [`ProtocolServer`] adapter.

use std::fmt::Write;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use config::UpstreamConfig;
use rmcp::{
    ServerHandler, ServiceExt,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
};
use secrecy::SecretString;
use url::Url;

use crate::{protocol::ProtocolServer, transport::SessionTransport};

/// The MCP server handler served to every session.
///
/// This is the attachment point for the wrapped platform logic: it carries
/// the upstream credential and scoping, and announces the server over the
/// protocol handshake. Tool dispatch itself belongs to the upstream library
/// and is not part of this crate.
#[derive(Debug, Clone)]
pub struct UpstreamMcp {
    access_token: SecretString,
    project_ref: Option<String>,
    read_only: bool,
    api_url: Option<Url>,
}

impl UpstreamMcp {
    /// Builds the handler from upstream configuration. Fails without an
    /// access token; nothing upstream can be called unauthenticated.
    pub fn new(config: &UpstreamConfig) -> anyhow::Result<Self> {
        let access_token = config
            .access_token()
            .context("an upstream access token is required")?
            .clone();

        if let Some(project) = &config.project_ref {
            log::debug!("Upstream MCP server scoped to project {project}");
        }

        Ok(Self {
            access_token,
            project_ref: config.project_ref.clone(),
            read_only: config.read_only,
            api_url: config.api_url.clone(),
        })
    }

    /// The credential used against the upstream platform API.
    pub fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    /// The project this server is scoped to, if any.
    pub fn project_ref(&self) -> Option<&str> {
        self.project_ref.as_deref()
    }

    /// Whether mutating upstream operations are disabled.
    pub fn read_only(&self) -> bool {
        self.read_only
    }

    /// The upstream API base URL override, if any.
    pub fn api_url(&self) -> Option<&Url> {
        self.api_url.as_ref()
    }
}

impl ServerHandler for UpstreamMcp {
    fn get_info(&self) -> ServerInfo {
        let mut instructions = String::from("Relay exposes a platform MCP server over an SSE transport.");

        if let Some(project) = &self.project_ref {
            let _ = write!(instructions, " Operations are scoped to project {project}.");
        }

        if self.read_only {
            instructions.push_str(" The server is running in read-only mode.");
        }

        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities::default(),
            server_info: Implementation {
                name: "relay".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(instructions),
        }
    }
}

/// Serves a cloned [`UpstreamMcp`] per incoming session.
pub struct UpstreamService {
    prototype: UpstreamMcp,
}

impl UpstreamService {
    /// Wraps the handler for per-session serving.
    pub fn new(prototype: UpstreamMcp) -> Self {
        Self { prototype }
    }
}

#[async_trait]
impl ProtocolServer for UpstreamService {
    async fn connect(&self, transport: SessionTransport) -> anyhow::Result<()> {
        let running = self.prototype.clone().serve(transport).await?;
        let reason = running.waiting().await?;

        log::debug!("upstream MCP service finished: {reason:?}");

        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        log::debug!("upstream MCP server closed");

        Ok(())
    }
}

/// Builds the protocol server from configuration.
///
/// Returns `None` when the upstream cannot be initialized (no access token);
/// the transport endpoints then answer `503` instead of serving sessions.
pub fn service_from_config(config: &UpstreamConfig) -> Option<Arc<dyn ProtocolServer>> {
    match UpstreamMcp::new(config) {
        Ok(handler) => Some(Arc::new(UpstreamService::new(handler))),
        Err(e) => {
            log::error!("Cannot initialize the upstream MCP server: {e}");
            None
        }
    }
}
