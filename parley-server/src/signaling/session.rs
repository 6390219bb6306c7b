use parley_core::{ConnectionId, Identity, RoomId, Signal};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Signals queued for one connection before new ones are dropped.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Outbound side of a connection session: what rooms hold to reach a member.
///
/// Messages are queued in send order and written by the connection's writer
/// task, so everything addressed to one session arrives in emission order.
/// A session that stops reading loses new messages once its queue is full.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    connection_id: ConnectionId,
    identity: Identity,
    tx: mpsc::Sender<Signal>,
}

impl SessionHandle {
    pub fn new(identity: Identity) -> (Self, mpsc::Receiver<Signal>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let handle = Self {
            connection_id: ConnectionId::new(),
            identity,
            tx,
        };
        (handle, rx)
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Queues `signal` for delivery. Returns `false` if the connection is gone
    /// or its queue is full.
    pub fn deliver(&self, signal: Signal) -> bool {
        match self.tx.try_send(signal) {
            Ok(()) => true,
            Err(TrySendError::Full(signal)) => {
                warn!(
                    identity = %self.identity,
                    connection = %self.connection_id,
                    kind = %signal.kind(),
                    "Outbound queue full, dropping signal"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(
                    identity = %self.identity,
                    connection = %self.connection_id,
                    "Attempted to deliver to closed session"
                );
                false
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Authenticated,
    InRoom(RoomId),
}

/// One authenticated connection. Sessions only exist after the credential has
/// been verified, so there is no unauthenticated state to guard against here.
#[derive(Debug)]
pub struct ConnectionSession {
    handle: SessionHandle,
    state: SessionState,
}

impl ConnectionSession {
    pub fn new(identity: Identity) -> (Self, mpsc::Receiver<Signal>) {
        let (handle, rx) = SessionHandle::new(identity);
        let session = Self {
            handle,
            state: SessionState::Authenticated,
        };
        (session, rx)
    }

    pub fn identity(&self) -> &Identity {
        self.handle.identity()
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.handle.connection_id()
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn current_room(&self) -> Option<&RoomId> {
        match &self.state {
            SessionState::InRoom(room_id) => Some(room_id),
            SessionState::Authenticated => None,
        }
    }

    pub(crate) fn enter_room(&mut self, room_id: RoomId) {
        self.state = SessionState::InRoom(room_id);
    }

    pub(crate) fn exit_room(&mut self) -> Option<RoomId> {
        match std::mem::replace(&mut self.state, SessionState::Authenticated) {
            SessionState::InRoom(room_id) => Some(room_id),
            SessionState::Authenticated => None,
        }
    }
}
