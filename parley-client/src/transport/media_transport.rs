use crate::transport::TransportEvent;
use async_trait::async_trait;
use parley_core::{IceCandidate, Identity};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Failed to set up transport: {0}")]
    Setup(String),

    #[error("Rejected session description: {0}")]
    Description(String),

    #[error("Rejected candidate: {0}")]
    Candidate(String),

    #[error("Failed to attach local media: {0}")]
    Media(String),

    #[error("Connection failed")]
    ConnectionFailed,

    #[error("Transport is closed")]
    Closed,

    #[error("Transport error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpType {
    Offer,
    Answer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub kind: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// One peer-to-peer media session. Local candidates, remote media and state
/// changes are reported on the event channel given to the factory.
///
/// `create_offer` and `create_answer` also install the result as the local
/// description.
#[async_trait]
pub trait MediaTransport: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription, TransportError>;

    async fn create_answer(&self) -> Result<SessionDescription, TransportError>;

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), TransportError>;

    async fn add_remote_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError>;

    async fn attach_local_media(&self) -> Result<(), TransportError>;

    async fn close(&self) -> Result<(), TransportError>;
}

#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(
        &self,
        peer: &Identity,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn MediaTransport>, TransportError>;
}
