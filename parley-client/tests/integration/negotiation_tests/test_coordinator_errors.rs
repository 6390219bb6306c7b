use parley_client::NegotiationError;
use parley_core::{RoomId, Signal};

use crate::integration::init_tracing;
use crate::utils::{TestPeer, candidate_signal, id};

#[tokio::test]
async fn test_call_requires_room() {
    init_tracing();

    let mut peer = TestPeer::new();
    assert_eq!(
        peer.coordinator.call(id("bob")).await,
        Err(NegotiationError::NotInRoom)
    );
    assert_eq!(
        peer.coordinator.leave(&RoomId::from("R1")),
        Err(NegotiationError::NotInRoom)
    );
}

#[tokio::test]
async fn test_call_rejects_unknown_and_busy_peers() {
    init_tracing();

    let mut alice = TestPeer::in_room("alice", &["bob"]).await;

    assert_eq!(
        alice.coordinator.call(id("zed")).await,
        Err(NegotiationError::UnknownPeer(id("zed")))
    );

    alice.coordinator.call(id("bob")).await.expect("call failed");
    assert_eq!(
        alice.coordinator.call(id("bob")).await,
        Err(NegotiationError::CallInProgress(id("bob")))
    );
    assert_eq!(alice.factory.created().await, 1);
}

#[tokio::test]
async fn test_answer_and_candidate_without_context_are_dropped() {
    init_tracing();

    let mut alice = TestPeer::in_room("alice", &["bob"]).await;

    assert_eq!(
        alice
            .coordinator
            .handle_signal(Signal::Answer {
                peer_id: id("bob"),
                sdp: "v=0".into(),
            })
            .await,
        Ok(())
    );
    assert_eq!(
        alice.coordinator.handle_signal(candidate_signal("bob", 1)).await,
        Ok(())
    );
    alice.expect_no_signal().await;
    assert_eq!(alice.factory.created().await, 0);
    assert!(alice.coordinator.active_peers().is_empty());
}

#[tokio::test]
async fn test_closed_signaling_is_reported() {
    init_tracing();

    let mut peer = TestPeer::new();
    peer.signals.close();

    assert_eq!(
        peer.coordinator.join(RoomId::from("R1")),
        Err(NegotiationError::SignalingClosed)
    );
}
