use parley_core::IceCandidate;

/// Remote media that became available on a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHandle {
    pub stream_id: String,
    pub track_id: String,
    /// `audio` or `video`.
    pub kind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl ConnectionState {
    /// States after which the transport will not recover on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Closed)
    }
}

/// Events a transport raises for its owning negotiation context.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A local candidate was gathered and should be sent to the remote peer.
    LocalCandidate(IceCandidate),

    RemoteMedia(StreamHandle),

    StateChanged(ConnectionState),
}
