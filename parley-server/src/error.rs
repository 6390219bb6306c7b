//! Error types for the signaling server.
//!
//! None of these cross the signaling boundary: the router logs them and
//! drops the offending message.

use parley_core::{CodecError, Identity, RoomId, SignalKind};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Peer {target} is not in room {room}")]
    PeerNotFound { room: RoomId, target: Identity },

    #[error("Sender {sender} is not bound to room {room} on this connection")]
    SenderNotBound { room: RoomId, sender: Identity },

    #[error("Room {0} is closed")]
    RoomClosed(RoomId),

    #[error("Room {0} is unavailable")]
    RoomUnavailable(RoomId),
}

#[derive(Error, Debug)]
pub enum SignalingError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] CodecError),

    #[error("Message '{0}' may only be sent by the server")]
    UnexpectedKind(SignalKind),

    #[error("Message '{0}' requires room membership")]
    NotInRoom(SignalKind),

    #[error("Leave for room {requested} while in {current:?}")]
    RoomMismatch {
        requested: RoomId,
        current: Option<RoomId>,
    },

    #[error("Message addressed to its own sender")]
    SelfAddressed,

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl SignalingError {
    /// Expected under concurrent disconnects; not worth more than a debug line.
    pub fn is_peer_not_found(&self) -> bool {
        matches!(
            self,
            SignalingError::Registry(RegistryError::PeerNotFound { .. })
        )
    }
}
