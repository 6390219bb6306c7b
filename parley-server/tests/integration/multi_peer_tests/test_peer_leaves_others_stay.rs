use parley_core::{RoomId, Signal};

use crate::integration::init_tracing;
use crate::utils::{TestClient, TestServer};

#[tokio::test]
async fn test_leave_notifies_every_remaining_peer() {
    init_tracing();

    let server = TestServer::start().await.expect("Failed to start server");
    let room = RoomId::from("R1");

    let mut clients = Vec::new();
    for name in ["alice", "bob", "carol", "dave"] {
        let (client, _) = TestClient::join_room(&server, name, "R1")
            .await
            .expect("join failed");
        clients.push(client);
    }
    // Drain peer_joined announcements.
    for (i, client) in clients.iter_mut().enumerate() {
        for _ in 0..(3 - i) {
            client.recv().await.expect("missing peer_joined");
        }
    }

    let mut leaver = clients.remove(0);
    leaver
        .send(&Signal::Leave {
            room_id: room.clone(),
        })
        .await
        .expect("Send failed");

    for client in &mut clients {
        assert_eq!(
            client.recv().await.expect("missing peer_left"),
            Signal::PeerLeft {
                peer_id: leaver.identity.clone()
            }
        );
    }
    leaver.expect_silence().await.expect("leaver was notified");
    assert_eq!(server.registry.members(&room).await.len(), 3);

    // The leaver is back in Authenticated and may join elsewhere.
    assert!(leaver.join("R2").await.expect("rejoin failed").is_empty());
}

#[tokio::test]
async fn test_switching_rooms_leaves_the_old_one() {
    init_tracing();

    let server = TestServer::start().await.expect("Failed to start server");

    let (mut alice, _) = TestClient::join_room(&server, "alice", "R1")
        .await
        .expect("alice failed to join");
    let (mut bob, _) = TestClient::join_room(&server, "bob", "R1")
        .await
        .expect("bob failed to join");
    alice.recv().await.expect("alice missed peer_joined");

    assert!(bob.join("R2").await.expect("switch failed").is_empty());

    assert_eq!(
        alice.recv().await.expect("alice missed peer_left"),
        Signal::PeerLeft {
            peer_id: bob.identity.clone()
        }
    );
    assert_eq!(
        server.registry.members(&RoomId::from("R1")).await,
        vec![alice.identity.clone()]
    );
    assert_eq!(
        server.registry.members(&RoomId::from("R2")).await,
        vec![bob.identity.clone()]
    );
}

#[tokio::test]
async fn test_leave_for_other_room_is_ignored() {
    init_tracing();

    let server = TestServer::start().await.expect("Failed to start server");
    let (mut alice, _) = TestClient::join_room(&server, "alice", "R1")
        .await
        .expect("alice failed to join");
    let (mut bob, _) = TestClient::join_room(&server, "bob", "R1")
        .await
        .expect("bob failed to join");
    alice.recv().await.expect("alice missed peer_joined");

    bob.send(&Signal::Leave {
        room_id: RoomId::from("elsewhere"),
    })
    .await
    .expect("Send failed");

    alice.expect_silence().await.expect("bogus leave was honored");
    assert_eq!(server.registry.members(&RoomId::from("R1")).await.len(), 2);
}
