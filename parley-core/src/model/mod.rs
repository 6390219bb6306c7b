mod candidate;
mod connection;
mod identity;
mod room;
mod signaling;

pub use candidate::{IceCandidate, IceServerConfig};
pub use connection::ConnectionId;
pub use identity::Identity;
pub use room::RoomId;
pub use signaling::{Signal, SignalEnvelope, SignalKind};
