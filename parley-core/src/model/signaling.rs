use crate::codec::CodecError;
use crate::model::identity::Identity;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The `type` discriminator of a signaling message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Join,
    Joined,
    PeerJoined,
    PeerLeft,
    Offer,
    Answer,
    IceCandidate,
    Leave,
}

impl SignalKind {
    pub fn parse(value: &str) -> Option<Self> {
        let kind = match value {
            "join" => Self::Join,
            "joined" => Self::Joined,
            "peer_joined" => Self::PeerJoined,
            "peer_left" => Self::PeerLeft,
            "offer" => Self::Offer,
            "answer" => Self::Answer,
            "ice-candidate" => Self::IceCandidate,
            "leave" => Self::Leave,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::Joined => "joined",
            Self::PeerJoined => "peer_joined",
            Self::PeerLeft => "peer_left",
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::IceCandidate => "ice-candidate",
            Self::Leave => "leave",
        }
    }

    /// Kinds only the server may emit.
    pub fn is_server_originated(&self) -> bool {
        matches!(self, Self::Joined | Self::PeerJoined | Self::PeerLeft)
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flat wire form of a signaling message. Every field except `type` is
/// optional here; [`Signal`] is the validated form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_id: Option<Identity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peers: Option<Vec<Identity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate: Option<serde_json::Value>,
}

/// A signaling message carrying exactly the fields its kind requires.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Join {
        room_id: RoomId,
    },
    Joined {
        room_id: Option<RoomId>,
        /// The joiner's own identity as bound by the server.
        identity: Option<Identity>,
        peers: Vec<Identity>,
    },
    PeerJoined {
        peer_id: Identity,
    },
    PeerLeft {
        peer_id: Identity,
    },
    Offer {
        peer_id: Identity,
        sdp: String,
    },
    Answer {
        peer_id: Identity,
        sdp: String,
    },
    IceCandidate {
        peer_id: Identity,
        candidate: serde_json::Value,
    },
    Leave {
        room_id: RoomId,
    },
}

impl Signal {
    pub fn kind(&self) -> SignalKind {
        match self {
            Signal::Join { .. } => SignalKind::Join,
            Signal::Joined { .. } => SignalKind::Joined,
            Signal::PeerJoined { .. } => SignalKind::PeerJoined,
            Signal::PeerLeft { .. } => SignalKind::PeerLeft,
            Signal::Offer { .. } => SignalKind::Offer,
            Signal::Answer { .. } => SignalKind::Answer,
            Signal::IceCandidate { .. } => SignalKind::IceCandidate,
            Signal::Leave { .. } => SignalKind::Leave,
        }
    }

    pub fn peer_id(&self) -> Option<&Identity> {
        match self {
            Signal::PeerJoined { peer_id }
            | Signal::PeerLeft { peer_id }
            | Signal::Offer { peer_id, .. }
            | Signal::Answer { peer_id, .. }
            | Signal::IceCandidate { peer_id, .. } => Some(peer_id),
            _ => None,
        }
    }

    /// Replaces the routing target with `sender`, so the recipient learns who
    /// the message came from. Non-routable messages are returned unchanged.
    pub fn readdressed(self, sender: &Identity) -> Self {
        match self {
            Signal::Offer { sdp, .. } => Signal::Offer {
                peer_id: sender.clone(),
                sdp,
            },
            Signal::Answer { sdp, .. } => Signal::Answer {
                peer_id: sender.clone(),
                sdp,
            },
            Signal::IceCandidate { candidate, .. } => Signal::IceCandidate {
                peer_id: sender.clone(),
                candidate,
            },
            other => other,
        }
    }
}

fn required<T>(value: Option<T>, kind: SignalKind, field: &'static str) -> Result<T, CodecError> {
    value.ok_or(CodecError::MissingField { kind, field })
}

fn non_empty<T: AsRef<str>>(value: Option<T>) -> Option<T> {
    value.filter(|v| !v.as_ref().is_empty())
}

impl TryFrom<SignalEnvelope> for Signal {
    type Error = CodecError;

    fn try_from(envelope: SignalEnvelope) -> Result<Self, Self::Error> {
        let kind = SignalKind::parse(&envelope.kind)
            .ok_or_else(|| CodecError::UnknownType(envelope.kind.clone()))?;

        let room_id = non_empty(envelope.room_id);
        let peer_id = non_empty(envelope.peer_id);
        let sdp = non_empty(envelope.sdp);
        let candidate = envelope.candidate.filter(|c| !c.is_null());

        let signal = match kind {
            SignalKind::Join => Signal::Join {
                room_id: required(room_id, kind, "roomId")?,
            },
            SignalKind::Joined => Signal::Joined {
                room_id,
                identity: peer_id,
                peers: required(envelope.peers, kind, "peers")?,
            },
            SignalKind::PeerJoined => Signal::PeerJoined {
                peer_id: required(peer_id, kind, "peerId")?,
            },
            SignalKind::PeerLeft => Signal::PeerLeft {
                peer_id: required(peer_id, kind, "peerId")?,
            },
            SignalKind::Offer => Signal::Offer {
                peer_id: required(peer_id, kind, "peerId")?,
                sdp: required(sdp, kind, "sdp")?,
            },
            SignalKind::Answer => Signal::Answer {
                peer_id: required(peer_id, kind, "peerId")?,
                sdp: required(sdp, kind, "sdp")?,
            },
            SignalKind::IceCandidate => Signal::IceCandidate {
                peer_id: required(peer_id, kind, "peerId")?,
                candidate: required(candidate, kind, "candidate")?,
            },
            SignalKind::Leave => Signal::Leave {
                room_id: required(room_id, kind, "roomId")?,
            },
        };

        Ok(signal)
    }
}

impl From<Signal> for SignalEnvelope {
    fn from(signal: Signal) -> Self {
        let mut envelope = SignalEnvelope {
            kind: signal.kind().as_str().to_owned(),
            ..Default::default()
        };

        match signal {
            Signal::Join { room_id } | Signal::Leave { room_id } => {
                envelope.room_id = Some(room_id);
            }
            Signal::Joined {
                room_id,
                identity,
                peers,
            } => {
                envelope.room_id = room_id;
                envelope.peer_id = identity;
                envelope.peers = Some(peers);
            }
            Signal::PeerJoined { peer_id } | Signal::PeerLeft { peer_id } => {
                envelope.peer_id = Some(peer_id);
            }
            Signal::Offer { peer_id, sdp } | Signal::Answer { peer_id, sdp } => {
                envelope.peer_id = Some(peer_id);
                envelope.sdp = Some(sdp);
            }
            Signal::IceCandidate { peer_id, candidate } => {
                envelope.peer_id = Some(peer_id);
                envelope.candidate = Some(candidate);
            }
        }

        envelope
    }
}
