use parley_client::{CoordinatorEvent, SessionDescription};
use parley_core::Signal;

use crate::integration::init_tracing;
use crate::utils::{MOCK_ANSWER_SDP, TestPeer, TransportCall, id};

#[tokio::test]
async fn test_callee_answers_unknown_offerer() {
    init_tracing();

    let mut bob = TestPeer::in_room("bob", &[]).await;

    bob.coordinator
        .handle_signal(Signal::PeerJoined { peer_id: id("alice") })
        .await
        .expect("peer_joined failed");
    assert_eq!(bob.next_event().await, Some(CoordinatorEvent::PeerJoined(id("alice"))));

    bob.coordinator
        .handle_signal(Signal::Offer {
            peer_id: id("alice"),
            sdp: "v=0 alice-offer".into(),
        })
        .await
        .expect("offer failed");

    assert_eq!(
        bob.next_signal().await,
        Some(Signal::Answer {
            peer_id: id("alice"),
            sdp: MOCK_ANSWER_SDP.into(),
        })
    );

    let recorder = bob.factory.recorder(&id("alice")).await.expect("no transport for alice");
    assert_eq!(
        recorder.calls().await,
        vec![
            TransportCall::SetRemote(SessionDescription::offer("v=0 alice-offer")),
            TransportCall::AttachMedia,
            TransportCall::CreateAnswer,
        ]
    );
    assert_eq!(bob.coordinator.active_peers(), vec![id("alice")]);
}

#[tokio::test]
async fn test_offer_from_existing_peer_reuses_context() {
    init_tracing();

    let mut bob = TestPeer::in_room("bob", &["alice"]).await;

    for n in 0..2 {
        bob.coordinator
            .handle_signal(Signal::Offer {
                peer_id: id("alice"),
                sdp: format!("v=0 offer-{n}"),
            })
            .await
            .expect("offer failed");
        assert!(matches!(bob.next_signal().await, Some(Signal::Answer { .. })));
    }

    assert_eq!(bob.factory.created().await, 1);
}
