//! Integration tests for parley-client.
//!
//! Tests are organized by functionality:
//! - `negotiation_tests` - caller and callee paths, candidate ordering
//! - `signaling_client_tests` - the WebSocket client against a live server
//! - `teardown_tests` - hang-up, peer departure and transport failure


use tracing::Level;

/// Initialize tracing for tests (call once per test).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}
