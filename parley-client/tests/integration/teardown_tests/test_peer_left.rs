use parley_client::{CoordinatorEvent, TransportEvent};
use parley_core::Signal;

use crate::integration::init_tracing;
use crate::utils::{TestPeer, candidate, candidate_signal, id};

#[tokio::test]
async fn test_peer_left_tears_down_negotiation() {
    init_tracing();

    let mut alice = TestPeer::in_room("alice", &["bob"]).await;
    alice.coordinator.call(id("bob")).await.expect("call failed");
    alice.next_signal().await.expect("no offer");

    // Queued candidates are discarded with the context.
    alice
        .coordinator
        .handle_signal(candidate_signal("bob", 1))
        .await
        .expect("candidate failed");

    alice
        .coordinator
        .handle_signal(Signal::PeerLeft { peer_id: id("bob") })
        .await
        .expect("peer_left failed");

    assert_eq!(
        alice.next_non_state_event().await,
        Some(CoordinatorEvent::PeerLeft(id("bob")))
    );
    assert!(alice.coordinator.active_peers().is_empty());
    assert!(alice.coordinator.peers().next().is_none());

    let recorder = alice.factory.recorder(&id("bob")).await.expect("no transport for bob");
    recorder.emit(TransportEvent::LocalCandidate(candidate(2))).await;
    alice.expect_no_signal().await;

    let calls = recorder.wait_for_calls(3, 1000).await;
    assert!(recorder.is_closed().await);
    assert!(
        !calls
            .iter()
            .any(|call| matches!(call, crate::utils::TransportCall::AddCandidate(_))),
        "queued candidate was applied after teardown"
    );
}

#[tokio::test]
async fn test_peer_left_without_call_only_updates_membership() {
    init_tracing();

    let mut alice = TestPeer::in_room("alice", &["bob", "carol"]).await;

    alice
        .coordinator
        .handle_signal(Signal::PeerLeft { peer_id: id("bob") })
        .await
        .expect("peer_left failed");

    assert_eq!(alice.next_event().await, Some(CoordinatorEvent::PeerLeft(id("bob"))));
    assert_eq!(alice.coordinator.peers().cloned().collect::<Vec<_>>(), vec![id("carol")]);
    assert_eq!(alice.factory.created().await, 0);
}
