//! Relay configuration structures and the environment/CLI resolution layer.

#![deny(missing_docs)]

mod health;
mod loader;
mod mcp;
mod server;
mod upstream;

pub use health::HealthConfig;
pub use loader::{CliValues, EnvSource, ProcessEnv, resolve};
pub use mcp::McpConfig;
pub use server::ServerConfig;
pub use upstream::UpstreamConfig;

/// Main configuration structure for the relay application.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// HTTP server configuration settings.
    pub server: ServerConfig,
    /// SSE transport configuration settings.
    pub mcp: McpConfig,
    /// Wrapped upstream MCP server configuration settings.
    pub upstream: UpstreamConfig,
}

impl Config {
    /// Resolve configuration from command-line values and the process
    /// environment. Environment values take precedence.
    pub fn from_sources(cli: CliValues) -> anyhow::Result<Config> {
        loader::resolve(cli, &ProcessEnv)
    }
}
