use parley_client::{CoordinatorEvent, NegotiationCoordinator};
use parley_core::{IceCandidate, Identity, RoomId, Signal};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::utils::MockTransportFactory;

pub const RECV_TIMEOUT_MS: u64 = 1000;
pub const SILENCE_MS: u64 = 100;
pub const ROOM: &str = "R1";

/// A coordinator wired to a mock transport factory, with its outbound
/// signals and events captured.
pub struct TestPeer {
    pub coordinator: NegotiationCoordinator,
    pub factory: MockTransportFactory,
    pub signals: mpsc::UnboundedReceiver<Signal>,
    pub events: mpsc::UnboundedReceiver<CoordinatorEvent>,
}

impl TestPeer {
    pub fn new() -> Self {
        let factory = MockTransportFactory::new();
        let (signals_tx, signals) = mpsc::unbounded_channel();
        let (coordinator, events) = NegotiationCoordinator::new(Arc::new(factory.clone()), signals_tx);

        Self {
            coordinator,
            factory,
            signals,
            events,
        }
    }

    /// Joins [`ROOM`] as `me` with `peers` already present, consuming the
    /// outbound `join` and the `Joined` event.
    pub async fn in_room(me: &str, peers: &[&str]) -> Self {
        let mut peer = Self::new();
        peer.coordinator
            .join(RoomId::from(ROOM))
            .expect("join failed");
        assert!(matches!(peer.next_signal().await, Some(Signal::Join { .. })));

        peer.coordinator
            .handle_signal(Signal::Joined {
                room_id: Some(RoomId::from(ROOM)),
                identity: Some(id(me)),
                peers: peers.iter().map(|p| id(p)).collect(),
            })
            .await
            .expect("joined failed");
        assert!(matches!(
            peer.next_event().await,
            Some(CoordinatorEvent::Joined { .. })
        ));
        peer
    }

    pub async fn next_signal(&mut self) -> Option<Signal> {
        tokio::time::timeout(Duration::from_millis(RECV_TIMEOUT_MS), self.signals.recv())
            .await
            .ok()
            .flatten()
    }

    pub async fn expect_no_signal(&mut self) {
        let next = tokio::time::timeout(Duration::from_millis(SILENCE_MS), self.signals.recv()).await;
        if let Ok(Some(signal)) = next {
            panic!("expected no outbound signal, got {signal:?}");
        }
    }

    pub async fn next_event(&mut self) -> Option<CoordinatorEvent> {
        tokio::time::timeout(Duration::from_millis(RECV_TIMEOUT_MS), self.events.recv())
            .await
            .ok()
            .flatten()
    }

    /// Skips connection-state events until something else arrives.
    pub async fn next_non_state_event(&mut self) -> Option<CoordinatorEvent> {
        loop {
            match self.next_event().await? {
                CoordinatorEvent::ConnectionStateChanged { .. } => continue,
                event => return Some(event),
            }
        }
    }
}

pub fn id(name: &str) -> Identity {
    Identity::from(name)
}

pub fn candidate(n: u32) -> IceCandidate {
    IceCandidate {
        candidate: format!("candidate:{n} 1 udp 2122260223 10.0.0.{n} 5000 typ host"),
        sdp_mid: Some("0".into()),
        sdp_m_line_index: Some(0),
        username_fragment: None,
    }
}

pub fn candidate_signal(from: &str, n: u32) -> Signal {
    Signal::IceCandidate {
        peer_id: id(from),
        candidate: candidate(n).to_value(),
    }
}
