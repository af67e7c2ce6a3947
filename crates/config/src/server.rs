//! HTTP server configuration settings.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use crate::HealthConfig;

/// The address the server listens on when none is configured.
pub const DEFAULT_LISTEN_ADDRESS: SocketAddr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 3002));

/// HTTP server configuration settings.
#[derive(Default, Debug, Clone)]
pub struct ServerConfig {
    /// The socket address the server should listen on.
    pub listen_address: Option<SocketAddr>,
    /// Health endpoint configuration.
    pub health: HealthConfig,
}

impl ServerConfig {
    /// The configured listen address, or the default `127.0.0.1:3002`.
    pub fn listen_address(&self) -> SocketAddr {
        self.listen_address.unwrap_or(DEFAULT_LISTEN_ADDRESS)
    }
}
