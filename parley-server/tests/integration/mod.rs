//! Integration tests for parley-server.
//!
//! Tests are organized by functionality:
//! - `connection_tests` - authentication, keepalive, joining and disconnection
//! - `http_tests` - credential, health and stats routes
//! - `messaging_tests` - offer/answer/candidate relay
//! - `multi_peer_tests` - membership announcements across several peers

pub mod connection_tests;

use tracing::Level;

/// Initialize tracing for tests (call once per test).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}
