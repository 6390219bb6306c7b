use crate::error::SignalingError;
use crate::room::RoomRegistry;
use crate::signaling::ConnectionSession;
use parley_core::{RoomId, Signal, codec};
use tracing::{debug, info};

/// Protocol state machine for connection sessions.
///
/// Validates inbound messages, moves sessions between `Authenticated` and
/// `InRoom`, and routes negotiation messages through the [`RoomRegistry`].
/// Routed messages always carry the sender's authenticated identity.
#[derive(Clone)]
pub struct SignalingRouter {
    registry: RoomRegistry,
}

impl SignalingRouter {
    pub fn new(registry: RoomRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Handles one inbound text frame. Protocol errors end here: they are
    /// logged and the frame is dropped, the connection stays open.
    pub async fn handle_text(&self, session: &mut ConnectionSession, text: &str) {
        let Err(e) = self.process(session, text).await else {
            return;
        };

        if e.is_peer_not_found() {
            debug!(identity = %session.identity(), "Dropping message for departed peer: {}", e);
        } else {
            debug!(identity = %session.identity(), "Dropping message: {}", e);
        }
    }

    pub async fn process(
        &self,
        session: &mut ConnectionSession,
        text: &str,
    ) -> Result<(), SignalingError> {
        let signal = codec::decode(text)?;
        self.dispatch(session, signal).await
    }

    pub async fn dispatch(
        &self,
        session: &mut ConnectionSession,
        signal: Signal,
    ) -> Result<(), SignalingError> {
        match signal {
            Signal::Join { room_id } => self.join(session, room_id).await,
            Signal::Leave { room_id } => self.leave(session, room_id).await,
            signal if signal.kind().is_server_originated() => {
                Err(SignalingError::UnexpectedKind(signal.kind()))
            }
            signal => self.relay(session, signal).await,
        }
    }

    async fn join(
        &self,
        session: &mut ConnectionSession,
        room_id: RoomId,
    ) -> Result<(), SignalingError> {
        if session.current_room().is_some_and(|current| *current != room_id) {
            self.leave_current(session).await;
        }

        let peers = self
            .registry
            .join(&room_id, session.handle().clone())
            .await?;

        info!(
            identity = %session.identity(),
            room = %room_id,
            peers = peers.len(),
            "Session joined room"
        );
        session.enter_room(room_id);
        Ok(())
    }

    async fn leave(
        &self,
        session: &mut ConnectionSession,
        room_id: RoomId,
    ) -> Result<(), SignalingError> {
        if session.current_room() != Some(&room_id) {
            return Err(SignalingError::RoomMismatch {
                requested: room_id,
                current: session.current_room().cloned(),
            });
        }

        self.leave_current(session).await;
        Ok(())
    }

    async fn leave_current(&self, session: &mut ConnectionSession) {
        let Some(room_id) = session.exit_room() else {
            return;
        };

        let removed = self
            .registry
            .leave(&room_id, session.identity(), session.connection_id())
            .await;

        if removed {
            info!(identity = %session.identity(), room = %room_id, "Session left room");
        } else {
            debug!(
                identity = %session.identity(),
                room = %room_id,
                "Session was no longer bound to room"
            );
        }
    }

    async fn relay(
        &self,
        session: &mut ConnectionSession,
        signal: Signal,
    ) -> Result<(), SignalingError> {
        let kind = signal.kind();
        let room_id = session
            .current_room()
            .ok_or(SignalingError::NotInRoom(kind))?;
        let target = signal
            .peer_id()
            .cloned()
            .ok_or(SignalingError::NotInRoom(kind))?;

        if target == *session.identity() {
            return Err(SignalingError::SelfAddressed);
        }

        let routed = signal.readdressed(session.identity());
        self.registry
            .route(room_id, session.handle(), &target, routed)
            .await?;

        debug!(from = %session.identity(), to = %target, kind = %kind, "Relayed message");
        Ok(())
    }

    /// Tears down a session whose transport has closed.
    pub async fn disconnect(&self, mut session: ConnectionSession) {
        if let Some(room_id) = session.current_room() {
            info!(identity = %session.identity(), room = %room_id, "Disconnecting session from room");
        }
        self.leave_current(&mut session).await;
    }
}
