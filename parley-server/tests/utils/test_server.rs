use anyhow::Result;
use parley_core::Identity;
use parley_server::{AppState, DEFAULT_PING_INTERVAL, JwtCredentials, RoomRegistry, app};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::task::JoinHandle;

pub const TEST_SECRET: &str = "integration-test-secret";

/// A signaling server bound to an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub registry: RoomRegistry,
    pub credentials: JwtCredentials,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        Self::start_with_ping_interval(DEFAULT_PING_INTERVAL).await
    }

    pub async fn start_with_ping_interval(ping_interval: Duration) -> Result<Self> {
        let credentials = JwtCredentials::new(TEST_SECRET, Duration::from_secs(3600));
        let registry = RoomRegistry::new();
        let state = AppState::new(registry.clone(), credentials.clone())
            .with_ping_interval(ping_interval);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app(state)).await {
                tracing::error!("[TestServer] serve failed: {}", e);
            }
        });

        Ok(Self {
            addr,
            registry,
            credentials,
            handle,
        })
    }

    /// Issues a credential for `subject` and returns it with the identity the
    /// server will bind to it.
    pub fn issue(&self, subject: &str) -> Result<(String, Identity)> {
        let token = self.credentials.issue(subject)?;
        let identity = self.credentials.claims(&token)?.identity();
        Ok((token, identity))
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws/signal", self.addr)
    }

    pub fn ws_url_with_token(&self, token: &str) -> String {
        format!("{}?token={}", self.ws_url(), token)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
