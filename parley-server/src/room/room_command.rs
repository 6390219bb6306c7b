use crate::error::RegistryError;
use crate::signaling::SessionHandle;
use parley_core::{ConnectionId, Identity, Signal};
use tokio::sync::oneshot;

/// Commands processed one at a time by a room's event loop.
#[derive(Debug)]
pub enum RoomCommand {
    /// Add or replace a member. The room announces the join itself.
    Join {
        session: SessionHandle,
        reply: oneshot::Sender<Result<Vec<Identity>, RegistryError>>,
    },

    /// Remove a member if it is still bound to `connection_id`.
    Leave {
        identity: Identity,
        connection_id: ConnectionId,
        reply: oneshot::Sender<bool>,
    },

    /// Deliver to one member on behalf of a sender still bound to
    /// `connection_id`.
    Route {
        sender: Identity,
        connection_id: ConnectionId,
        target: Identity,
        signal: Signal,
        reply: oneshot::Sender<Result<(), RegistryError>>,
    },

    Broadcast {
        sender: Identity,
        signal: Signal,
    },

    Members {
        reply: oneshot::Sender<Vec<Identity>>,
    },
}
