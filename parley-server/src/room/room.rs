use crate::error::RegistryError;
use crate::room::registry::RegistryInner;
use crate::room::room_command::RoomCommand;
use crate::signaling::SessionHandle;
use parley_core::{ConnectionId, Identity, RoomId, Signal};
use std::collections::HashMap;
use std::sync::Weak;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Single-writer owner of one room's membership.
///
/// Every join, leave and broadcast for the room goes through `command_rx`, so
/// announcements are always computed from the membership they describe.
pub struct Room {
    id: RoomId,
    generation: u64,
    members: HashMap<Identity, SessionHandle>,
    command_rx: mpsc::Receiver<RoomCommand>,
    registry: Weak<RegistryInner>,
    retired: bool,
}

impl Room {
    pub(crate) fn new(
        id: RoomId,
        generation: u64,
        command_rx: mpsc::Receiver<RoomCommand>,
        registry: Weak<RegistryInner>,
    ) -> Self {
        Self {
            id,
            generation,
            members: HashMap::new(),
            command_rx,
            registry,
            retired: false,
        }
    }

    pub async fn run(mut self) {
        info!(room = %self.id, generation = self.generation, "Room event loop started");

        while let Some(cmd) = self.command_rx.recv().await {
            self.handle_command(cmd);
        }

        info!(room = %self.id, generation = self.generation, "Room event loop finished");
    }

    fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join { session, reply } => {
                if self.retired {
                    let _ = reply.send(Err(RegistryError::RoomClosed(self.id.clone())));
                    return;
                }
                let peers = self.join(session);
                let _ = reply.send(Ok(peers));
            }

            RoomCommand::Leave {
                identity,
                connection_id,
                reply,
            } => {
                let bound_here = self.is_bound(&identity, connection_id);
                if bound_here {
                    self.leave(&identity);
                }
                let _ = reply.send(bound_here);
            }

            RoomCommand::Route {
                sender,
                connection_id,
                target,
                signal,
                reply,
            } => {
                let _ = reply.send(self.route(&sender, connection_id, &target, signal));
            }

            RoomCommand::Broadcast { sender, signal } => {
                self.broadcast_except(&sender, &signal);
            }

            RoomCommand::Members { reply } => {
                let _ = reply.send(self.member_list(None));
            }
        }
    }

    fn join(&mut self, session: SessionHandle) -> Vec<Identity> {
        let identity = session.identity().clone();
        let peers = self.member_list(Some(&identity));

        if let Some(previous) = self.members.insert(identity.clone(), session.clone()) {
            info!(
                room = %self.id,
                identity = %identity,
                old_connection = %previous.connection_id(),
                new_connection = %session.connection_id(),
                "Member session replaced"
            );
        } else {
            info!(room = %self.id, identity = %identity, members = self.members.len(), "Member joined");
        }

        session.deliver(Signal::Joined {
            room_id: Some(self.id.clone()),
            identity: Some(identity.clone()),
            peers: peers.clone(),
        });
        self.broadcast_except(&identity, &Signal::PeerJoined { peer_id: identity.clone() });

        peers
    }

    fn leave(&mut self, identity: &Identity) {
        self.members.remove(identity);
        info!(room = %self.id, identity = %identity, members = self.members.len(), "Member left");

        self.broadcast_except(
            identity,
            &Signal::PeerLeft {
                peer_id: identity.clone(),
            },
        );

        if self.members.is_empty() {
            self.retire();
        }
    }

    fn route(
        &self,
        sender: &Identity,
        connection_id: ConnectionId,
        target: &Identity,
        signal: Signal,
    ) -> Result<(), RegistryError> {
        // A replaced connection keeps its identity but no longer speaks for it.
        if !self.is_bound(sender, connection_id) {
            return Err(RegistryError::SenderNotBound {
                room: self.id.clone(),
                sender: sender.clone(),
            });
        }

        match self.members.get(target) {
            Some(session) if session.deliver(signal) => Ok(()),
            _ => Err(RegistryError::PeerNotFound {
                room: self.id.clone(),
                target: target.clone(),
            }),
        }
    }

    fn is_bound(&self, identity: &Identity, connection_id: ConnectionId) -> bool {
        self.members
            .get(identity)
            .is_some_and(|session| session.connection_id() == connection_id)
    }

    fn broadcast_except(&self, sender: &Identity, signal: &Signal) {
        for (identity, session) in &self.members {
            if identity == sender {
                continue;
            }
            if !session.deliver(signal.clone()) {
                debug!(room = %self.id, identity = %identity, kind = %signal.kind(), "Broadcast not delivered");
            }
        }
    }

    fn member_list(&self, except: Option<&Identity>) -> Vec<Identity> {
        let mut list: Vec<Identity> = self
            .members
            .keys()
            .filter(|identity| Some(*identity) != except)
            .cloned()
            .collect();
        list.sort();
        list
    }

    /// Drops the registry entry and stops accepting commands. Joins already
    /// queued are answered with `RoomClosed` so the caller retries on a fresh room.
    fn retire(&mut self) {
        self.retired = true;
        if let Some(registry) = self.registry.upgrade() {
            registry.discard(&self.id, self.generation);
        }
        self.command_rx.close();
        info!(room = %self.id, "Room is empty, discarding");
    }
}
