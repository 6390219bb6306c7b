use parley_core::Signal;
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{TestClient, TestServer};

#[tokio::test]
async fn test_idle_connection_is_pinged() {
    init_tracing();

    let server = TestServer::start_with_ping_interval(Duration::from_millis(100))
        .await
        .expect("Failed to start server");
    let (mut alice, _) = TestClient::join_room(&server, "alice", "R1")
        .await
        .expect("alice failed to join");

    alice.expect_ping(1000).await.expect("no ping while idle");
    alice.expect_ping(1000).await.expect("pings stopped");

    // Answering pings keeps the session in its room.
    let (bob, _) = TestClient::join_room(&server, "bob", "R1")
        .await
        .expect("bob failed to join");
    assert_eq!(
        alice.recv().await.expect("alice missed peer_joined"),
        Signal::PeerJoined {
            peer_id: bob.identity.clone()
        }
    );
    assert_eq!(server.registry.stats().await.total_participants, 2);
}
