use crate::transport::{
    ConnectionState, MediaTransport, SdpType, SessionDescription, StreamHandle, TransportConfig,
    TransportError, TransportEvent, TransportFactory,
};
use async_trait::async_trait;
use parley_core::{IceCandidate, Identity};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8, MediaEngine};
use webrtc::api::{API, APIBuilder};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_remote::TrackRemote;

/// Builds [`WebRtcTransport`]s sharing one configured webrtc API.
pub struct WebRtcTransportFactory {
    api: API,
    config: TransportConfig,
}

impl WebRtcTransportFactory {
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let setup = |e: webrtc::Error| TransportError::Setup(e.to_string());

        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs().map_err(setup)?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine).map_err(setup)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        Ok(Self { api, config })
    }

    fn rtc_configuration(&self) -> RTCConfiguration {
        let ice_servers = self
            .config
            .ice_servers
            .iter()
            .map(|server| RTCIceServer {
                urls: server.urls.clone(),
                username: server.username.clone().unwrap_or_default(),
                credential: server.credential.clone().unwrap_or_default(),
            })
            .collect();

        RTCConfiguration {
            ice_servers,
            ..Default::default()
        }
    }
}

#[async_trait]
impl TransportFactory for WebRtcTransportFactory {
    async fn create(
        &self,
        peer: &Identity,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn MediaTransport>, TransportError> {
        let peer_connection = self
            .api
            .new_peer_connection(self.rtc_configuration())
            .await
            .map_err(|e| TransportError::Setup(e.to_string()))?;

        let transport = WebRtcTransport::new(peer.clone(), Arc::new(peer_connection), events);
        Ok(Box::new(transport))
    }
}

pub struct WebRtcTransport {
    peer: Identity,
    peer_connection: Arc<RTCPeerConnection>,
    media_attached: AtomicBool,
}

impl WebRtcTransport {
    fn new(
        peer: Identity,
        peer_connection: Arc<RTCPeerConnection>,
        events: mpsc::Sender<TransportEvent>,
    ) -> Self {
        let state_tx = events.clone();
        let state_peer = peer.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let peer = state_peer.clone();

                Box::pin(async move {
                    info!(peer = %peer, "Peer connection state changed: {}", s);
                    if let Some(state) = connection_state(s) {
                        let _ = tx.send(TransportEvent::StateChanged(state)).await;
                    }
                })
            },
        ));

        let ice_tx = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();

            Box::pin(async move {
                // `None` marks the end of gathering.
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let _ = tx
                    .send(TransportEvent::LocalCandidate(from_candidate_init(init)))
                    .await;
            })
        }));

        let track_tx = events;
        let track_peer = peer.clone();
        peer_connection.on_track(Box::new(move |track: Arc<TrackRemote>, _, _| {
            let tx = track_tx.clone();
            let peer = track_peer.clone();

            Box::pin(async move {
                let stream = StreamHandle {
                    stream_id: track.stream_id(),
                    track_id: track.id(),
                    kind: track.kind().to_string(),
                };
                debug!(peer = %peer, track = %stream.track_id, kind = %stream.kind, "Remote track arrived");
                let _ = tx.send(TransportEvent::RemoteMedia(stream)).await;
            })
        }));

        Self {
            peer,
            peer_connection,
            media_attached: AtomicBool::new(false),
        }
    }

    fn sample_track(&self, mime_type: &str, clock_rate: u32, channels: u16, kind: &str) -> Arc<TrackLocalStaticSample> {
        Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: mime_type.to_owned(),
                clock_rate,
                channels,
                sdp_fmtp_line: String::new(),
                rtcp_feedback: vec![],
            },
            format!("{}-{}", kind, self.peer),
            format!("parley-{}", self.peer),
        ))
    }
}

#[async_trait]
impl MediaTransport for WebRtcTransport {
    async fn create_offer(&self) -> Result<SessionDescription, TransportError> {
        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .map_err(|e| TransportError::Description(e.to_string()))?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await
            .map_err(|e| TransportError::Description(e.to_string()))?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription, TransportError> {
        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .map_err(|e| TransportError::Description(e.to_string()))?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await
            .map_err(|e| TransportError::Description(e.to_string()))?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), TransportError> {
        let desc = match description.kind {
            SdpType::Offer => RTCSessionDescription::offer(description.sdp),
            SdpType::Answer => RTCSessionDescription::answer(description.sdp),
        }
        .map_err(|e| TransportError::Description(e.to_string()))?;

        self.peer_connection
            .set_remote_description(desc)
            .await
            .map_err(|e| TransportError::Description(e.to_string()))
    }

    async fn add_remote_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError> {
        self.peer_connection
            .add_ice_candidate(to_candidate_init(candidate))
            .await
            .map_err(|e| TransportError::Candidate(e.to_string()))
    }

    /// Adds an Opus audio and a VP8 video sample track. Later calls are no-ops.
    async fn attach_local_media(&self) -> Result<(), TransportError> {
        if self.media_attached.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let audio = self.sample_track(MIME_TYPE_OPUS, 48000, 2, "audio");
        let video = self.sample_track(MIME_TYPE_VP8, 90000, 0, "video");

        for track in [audio, video] {
            self.peer_connection
                .add_track(track as Arc<dyn TrackLocal + Send + Sync>)
                .await
                .map_err(|e| TransportError::Media(e.to_string()))?;
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        if let Err(e) = self.peer_connection.close().await {
            warn!(peer = %self.peer, "Failed to close peer connection: {}", e);
            return Err(TransportError::Internal(e.to_string()));
        }
        Ok(())
    }
}

fn connection_state(state: RTCPeerConnectionState) -> Option<ConnectionState> {
    let state = match state {
        RTCPeerConnectionState::New => ConnectionState::New,
        RTCPeerConnectionState::Connecting => ConnectionState::Connecting,
        RTCPeerConnectionState::Connected => ConnectionState::Connected,
        RTCPeerConnectionState::Disconnected => ConnectionState::Disconnected,
        RTCPeerConnectionState::Failed => ConnectionState::Failed,
        RTCPeerConnectionState::Closed => ConnectionState::Closed,
        RTCPeerConnectionState::Unspecified => return None,
    };
    Some(state)
}

fn from_candidate_init(init: RTCIceCandidateInit) -> IceCandidate {
    IceCandidate {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_m_line_index: init.sdp_mline_index,
        username_fragment: init.username_fragment,
    }
}

fn to_candidate_init(candidate: IceCandidate) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: candidate.candidate,
        sdp_mid: candidate.sdp_mid,
        sdp_mline_index: candidate.sdp_m_line_index,
        username_fragment: candidate.username_fragment,
    }
}
