use crate::transport::TransportError;
use parley_core::Identity;
use thiserror::Error;

/// Recoverable failures surfaced to the application. None of them affect room
/// membership or negotiations with other peers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("A call with {0} is already in progress")]
    CallInProgress(Identity),

    #[error("Not in a room")]
    NotInRoom,

    #[error("No negotiation with {0}")]
    UnknownPeer(Identity),

    #[error("Signaling connection is closed")]
    SignalingClosed,
}

#[derive(Error, Debug)]
pub enum SignalingClientError {
    #[error("Failed to connect to signaling server: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Signaling connection is closed")]
    Closed,
}
