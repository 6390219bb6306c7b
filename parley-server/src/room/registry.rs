use crate::error::RegistryError;
use crate::room::{Room, RoomCommand};
use crate::signaling::SessionHandle;
use dashmap::DashMap;
use parley_core::{ConnectionId, Identity, RoomId, Signal};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

const ROOM_MAILBOX_CAPACITY: usize = 100;
const JOIN_ATTEMPTS: usize = 8;

#[derive(Clone)]
pub(crate) struct RoomHandle {
    generation: u64,
    tx: mpsc::Sender<RoomCommand>,
}

pub(crate) struct RegistryInner {
    rooms: DashMap<RoomId, RoomHandle>,
    next_generation: AtomicU64,
}

impl RegistryInner {
    /// Removes the entry only if it still belongs to the given room instance.
    pub(crate) fn discard(&self, room_id: &RoomId, generation: u64) {
        self.rooms
            .remove_if(room_id, |_, handle| handle.generation == generation);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub active_rooms: usize,
    pub total_participants: usize,
}

/// Maps room ids to live rooms. Cloning shares the same registry; separately
/// constructed registries are fully independent.
#[derive(Clone)]
pub struct RoomRegistry {
    inner: Arc<RegistryInner>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                rooms: DashMap::new(),
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    fn get_or_create(&self, room_id: &RoomId) -> RoomHandle {
        if let Some(handle) = self.inner.rooms.get(room_id) {
            return handle.clone();
        }

        self.inner
            .rooms
            .entry(room_id.clone())
            .or_insert_with(|| {
                let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
                let (tx, rx) = mpsc::channel(ROOM_MAILBOX_CAPACITY);

                info!(room = %room_id, generation, "Creating new room");
                let room = Room::new(room_id.clone(), generation, rx, Arc::downgrade(&self.inner));
                tokio::spawn(room.run());

                RoomHandle { generation, tx }
            })
            .clone()
    }

    fn existing(&self, room_id: &RoomId) -> Option<RoomHandle> {
        self.inner.rooms.get(room_id).map(|handle| handle.clone())
    }

    /// Adds `session` to the room, creating the room if absent, and returns the
    /// other members. The room delivers `joined` to the session and
    /// `peer_joined` to everyone else before any later command is processed.
    /// Joining again under the same identity replaces the stored session.
    pub async fn join(
        &self,
        room_id: &RoomId,
        session: SessionHandle,
    ) -> Result<Vec<Identity>, RegistryError> {
        for _ in 0..JOIN_ATTEMPTS {
            let handle = self.get_or_create(room_id);
            let (reply, reply_rx) = oneshot::channel();
            let cmd = RoomCommand::Join {
                session: session.clone(),
                reply,
            };

            if handle.tx.send(cmd).await.is_err() {
                self.inner.discard(room_id, handle.generation);
                continue;
            }

            match reply_rx.await {
                Ok(Ok(peers)) => return Ok(peers),
                Ok(Err(RegistryError::RoomClosed(_))) | Err(_) => {
                    debug!(room = %room_id, "Room closed during join, retrying");
                    self.inner.discard(room_id, handle.generation);
                }
                Ok(Err(e)) => return Err(e),
            }
        }

        warn!(room = %room_id, "Giving up joining room");
        Err(RegistryError::RoomUnavailable(room_id.clone()))
    }

    /// Removes `identity` if it is still bound to `connection_id` and announces
    /// `peer_left` to the rest. The room is discarded when it becomes empty.
    pub async fn leave(
        &self,
        room_id: &RoomId,
        identity: &Identity,
        connection_id: ConnectionId,
    ) -> bool {
        let Some(handle) = self.existing(room_id) else {
            return false;
        };

        let (reply, reply_rx) = oneshot::channel();
        let cmd = RoomCommand::Leave {
            identity: identity.clone(),
            connection_id,
            reply,
        };
        if handle.tx.send(cmd).await.is_err() {
            return false;
        }
        reply_rx.await.unwrap_or(false)
    }

    /// Delivers `signal` to every member except `sender`.
    pub async fn broadcast_except(&self, room_id: &RoomId, sender: &Identity, signal: Signal) {
        let Some(handle) = self.existing(room_id) else {
            return;
        };

        let cmd = RoomCommand::Broadcast {
            sender: sender.clone(),
            signal,
        };
        if handle.tx.send(cmd).await.is_err() {
            debug!(room = %room_id, "Broadcast to closed room dropped");
        }
    }

    /// Delivers `signal` to `target` if it is a member and `sender` is still
    /// the session bound to its identity in the room.
    pub async fn route(
        &self,
        room_id: &RoomId,
        sender: &SessionHandle,
        target: &Identity,
        signal: Signal,
    ) -> Result<(), RegistryError> {
        let not_found = || RegistryError::PeerNotFound {
            room: room_id.clone(),
            target: target.clone(),
        };

        let handle = self.existing(room_id).ok_or_else(not_found)?;
        let (reply, reply_rx) = oneshot::channel();
        let cmd = RoomCommand::Route {
            sender: sender.identity().clone(),
            connection_id: sender.connection_id(),
            target: target.clone(),
            signal,
            reply,
        };

        handle.tx.send(cmd).await.map_err(|_| not_found())?;
        reply_rx.await.unwrap_or_else(|_| Err(not_found()))
    }

    /// Current members of the room, sorted. Empty if the room does not exist.
    pub async fn members(&self, room_id: &RoomId) -> Vec<Identity> {
        let Some(handle) = self.existing(room_id) else {
            return Vec::new();
        };
        Self::query_members(&handle).await
    }

    async fn query_members(handle: &RoomHandle) -> Vec<Identity> {
        let (reply, reply_rx) = oneshot::channel();
        if handle.tx.send(RoomCommand::Members { reply }).await.is_err() {
            return Vec::new();
        }
        reply_rx.await.unwrap_or_default()
    }

    pub fn contains_room(&self, room_id: &RoomId) -> bool {
        self.inner.rooms.contains_key(room_id)
    }

    pub fn room_count(&self) -> usize {
        self.inner.rooms.len()
    }

    pub async fn stats(&self) -> RegistryStats {
        // Collect handles first so no map guard is held across an await.
        let handles: Vec<RoomHandle> = self
            .inner
            .rooms
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut stats = RegistryStats {
            active_rooms: 0,
            total_participants: 0,
        };
        for handle in &handles {
            let members = Self::query_members(handle).await.len();
            if members > 0 {
                stats.active_rooms += 1;
                stats.total_participants += members;
            }
        }
        stats
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
