use crate::auth::DEFAULT_TOKEN_TTL;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_AUTH_SECRET: &str = "parley-dev-secret-change-in-production";

/// How often an idle connection is pinged. A failed ping ends the session.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(54);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Shared HS256 secret used to verify and issue credentials.
    pub auth_secret: String,
    pub token_ttl: Duration,
    pub ping_interval: Duration,
}

impl ServerConfig {
    pub fn uses_default_secret(&self) -> bool {
        self.auth_secret == DEFAULT_AUTH_SECRET
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            auth_secret: DEFAULT_AUTH_SECRET.to_owned(),
            token_ttl: DEFAULT_TOKEN_TTL,
            ping_interval: DEFAULT_PING_INTERVAL,
        }
    }
}
