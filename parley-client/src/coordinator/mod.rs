mod candidate_queue;
mod context;
mod coordinator_event;

pub use candidate_queue::CandidateQueue;
pub use coordinator_event::CoordinatorEvent;

use crate::error::NegotiationError;
use crate::transport::TransportFactory;
use context::{ContextCommand, ContextHandle, NegotiationContext};
use parley_core::{IceCandidate, Identity, RoomId, Signal};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Client-side driver of peer negotiations.
///
/// Feeds routed signaling messages into one negotiation context per remote
/// peer and sends what the contexts produce back through `signals`. Contexts
/// for different peers run independently; operations on one context run in
/// order.
pub struct NegotiationCoordinator {
    factory: Arc<dyn TransportFactory>,
    signals: mpsc::UnboundedSender<Signal>,
    events: mpsc::UnboundedSender<CoordinatorEvent>,
    identity: Option<Identity>,
    room: Option<RoomId>,
    peers: BTreeSet<Identity>,
    contexts: HashMap<Identity, ContextHandle>,
}

impl NegotiationCoordinator {
    pub fn new(
        factory: Arc<dyn TransportFactory>,
        signals: mpsc::UnboundedSender<Signal>,
    ) -> (Self, mpsc::UnboundedReceiver<CoordinatorEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let coordinator = Self {
            factory,
            signals,
            events,
            identity: None,
            room: None,
            peers: BTreeSet::new(),
            contexts: HashMap::new(),
        };
        (coordinator, events_rx)
    }

    /// Our identity as bound by the server, known after the first `joined`.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn room(&self) -> Option<&RoomId> {
        self.room.as_ref()
    }

    /// Other members of the current room.
    pub fn peers(&self) -> impl Iterator<Item = &Identity> {
        self.peers.iter()
    }

    /// Joins `room`. Switching rooms ends every call in the old one.
    pub fn join(&mut self, room: RoomId) -> Result<(), NegotiationError> {
        if self.room.as_ref().is_some_and(|current| *current != room) {
            self.end_all_calls();
            self.peers.clear();
        }

        self.send(Signal::Join {
            room_id: room.clone(),
        })?;
        info!(room = %room, "Joining room");
        self.room = Some(room);
        Ok(())
    }

    /// Leaves `room`, ending every call first.
    pub fn leave(&mut self, room: &RoomId) -> Result<(), NegotiationError> {
        if self.room.as_ref() != Some(room) {
            return Err(NegotiationError::NotInRoom);
        }

        self.end_all_calls();
        self.peers.clear();
        self.room = None;

        info!(room = %room, "Leaving room");
        self.send(Signal::Leave {
            room_id: room.clone(),
        })
    }

    /// Starts a call to a member of the current room.
    pub async fn call(&mut self, peer: Identity) -> Result<(), NegotiationError> {
        if self.room.is_none() {
            return Err(NegotiationError::NotInRoom);
        }
        if self.live_context(&peer).is_some() {
            return Err(NegotiationError::CallInProgress(peer));
        }
        if !self.peers.contains(&peer) {
            return Err(NegotiationError::UnknownPeer(peer));
        }

        info!(peer = %peer, "Calling peer");
        let handle = self.spawn_context(&peer).await?;
        handle.send(ContextCommand::Call);
        self.contexts.insert(peer, handle);
        Ok(())
    }

    /// Ends the call with `peer`. Nothing more is sent for it after this returns.
    pub fn hang_up(&mut self, peer: &Identity) -> Result<(), NegotiationError> {
        match self.contexts.remove(peer) {
            Some(handle) if handle.is_active() => {
                handle.cancel();
                info!(peer = %peer, "Hung up");
                Ok(())
            }
            _ => Err(NegotiationError::UnknownPeer(peer.clone())),
        }
    }

    /// Peers with a negotiation that has not ended.
    pub fn active_peers(&mut self) -> Vec<Identity> {
        self.contexts.retain(|_, handle| handle.is_active());
        let mut peers: Vec<Identity> = self.contexts.keys().cloned().collect();
        peers.sort();
        peers
    }

    /// Applies one message received from the signaling server.
    pub async fn handle_signal(&mut self, signal: Signal) -> Result<(), NegotiationError> {
        match signal {
            Signal::Joined {
                room_id,
                identity,
                peers,
            } => {
                if identity.is_some() {
                    self.identity = identity.clone();
                }
                let room = room_id
                    .or_else(|| self.room.clone())
                    .ok_or(NegotiationError::NotInRoom)?;

                self.peers = peers.iter().cloned().collect();
                self.room = Some(room.clone());
                info!(room = %room, peers = peers.len(), "Joined room");
                self.emit(CoordinatorEvent::Joined {
                    room,
                    identity,
                    peers,
                });
            }

            Signal::PeerJoined { peer_id } => {
                if self.identity.as_ref() == Some(&peer_id) {
                    return Ok(());
                }
                self.peers.insert(peer_id.clone());
                self.emit(CoordinatorEvent::PeerJoined(peer_id));
            }

            Signal::PeerLeft { peer_id } => {
                self.peers.remove(&peer_id);
                if let Some(handle) = self.contexts.remove(&peer_id) {
                    handle.cancel();
                    info!(peer = %peer_id, "Peer left, call ended");
                }
                self.emit(CoordinatorEvent::PeerLeft(peer_id));
            }

            Signal::Offer { peer_id, sdp } => {
                if self.room.is_none() {
                    return Err(NegotiationError::NotInRoom);
                }
                if let Some(handle) = self.live_context(&peer_id) {
                    handle.send(ContextCommand::RemoteOffer(sdp));
                    return Ok(());
                }

                info!(peer = %peer_id, "Incoming call");
                let handle = self.spawn_context(&peer_id).await?;
                handle.send(ContextCommand::RemoteOffer(sdp));
                self.peers.insert(peer_id.clone());
                self.contexts.insert(peer_id, handle);
            }

            Signal::Answer { peer_id, sdp } => match self.live_context(&peer_id) {
                Some(handle) => {
                    handle.send(ContextCommand::RemoteAnswer(sdp));
                }
                None => debug!(peer = %peer_id, "Dropping answer with no call in progress"),
            },

            Signal::IceCandidate { peer_id, candidate } => {
                let candidate = match IceCandidate::from_value(&candidate) {
                    Ok(candidate) => candidate,
                    Err(e) => {
                        debug!(peer = %peer_id, "Dropping unreadable candidate: {}", e);
                        return Ok(());
                    }
                };
                match self.live_context(&peer_id) {
                    Some(handle) => {
                        handle.send(ContextCommand::RemoteCandidate(candidate));
                    }
                    None => debug!(peer = %peer_id, "Dropping candidate with no call in progress"),
                }
            }

            signal @ (Signal::Join { .. } | Signal::Leave { .. }) => {
                debug!(kind = %signal.kind(), "Ignoring client-originated message from server");
            }
        }
        Ok(())
    }

    async fn spawn_context(&self, peer: &Identity) -> Result<ContextHandle, NegotiationError> {
        NegotiationContext::spawn(
            peer.clone(),
            self.factory.as_ref(),
            self.signals.clone(),
            self.events.clone(),
        )
        .await
        .map_err(|e| {
            warn!(peer = %peer, "Failed to create transport: {}", e);
            NegotiationError::Transport(e)
        })
    }

    /// Looks up the context for `peer`, dropping it if it already ended.
    fn live_context(&mut self, peer: &Identity) -> Option<&ContextHandle> {
        if self.contexts.get(peer).is_some_and(|handle| !handle.is_active()) {
            self.contexts.remove(peer);
        }
        self.contexts.get(peer)
    }

    fn end_all_calls(&mut self) {
        for (peer, handle) in self.contexts.drain() {
            handle.cancel();
            debug!(peer = %peer, "Call ended");
        }
    }

    fn send(&self, signal: Signal) -> Result<(), NegotiationError> {
        self.signals
            .send(signal)
            .map_err(|_| NegotiationError::SignalingClosed)
    }

    fn emit(&self, event: CoordinatorEvent) {
        let _ = self.events.send(event);
    }
}

impl Drop for NegotiationCoordinator {
    fn drop(&mut self) {
        self.end_all_calls();
    }
}
