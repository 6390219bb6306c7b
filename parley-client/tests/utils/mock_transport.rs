use async_trait::async_trait;
use parley_client::{
    MediaTransport, SessionDescription, TransportError, TransportEvent, TransportFactory,
};
use parley_core::{IceCandidate, Identity};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};

pub const MOCK_OFFER_SDP: &str = "v=0 mock-offer";
pub const MOCK_ANSWER_SDP: &str = "v=0 mock-answer";

/// A call made on a mock transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    CreateOffer,
    CreateAnswer,
    SetRemote(SessionDescription),
    AddCandidate(IceCandidate),
    AttachMedia,
    Close,
}

/// Test-side view of one mock transport: what was called on it, and a way to
/// raise transport events.
#[derive(Clone)]
pub struct MockTransportRecorder {
    calls: Arc<Mutex<Vec<TransportCall>>>,
    events: mpsc::Sender<TransportEvent>,
}

impl MockTransportRecorder {
    pub async fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().await.clone()
    }

    pub async fn emit(&self, event: TransportEvent) {
        let _ = self.events.send(event).await;
    }

    /// Waits until at least `count` calls were recorded.
    pub async fn wait_for_calls(&self, count: usize, timeout_ms: u64) -> Vec<TransportCall> {
        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(timeout_ms);

        loop {
            let calls = self.calls().await;
            if calls.len() >= count || start.elapsed() > timeout {
                return calls;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.calls().await.contains(&TransportCall::Close)
    }
}

#[derive(Default)]
struct FactoryState {
    recorders: HashMap<Identity, MockTransportRecorder>,
    reject_remote: HashSet<Identity>,
    remote_delay: Option<Duration>,
    created: usize,
}

/// Creates mock transports and keeps a recorder for each.
#[derive(Clone, Default)]
pub struct MockTransportFactory {
    state: Arc<Mutex<FactoryState>>,
}

impl MockTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transports created for `peer` reject every remote description.
    pub async fn reject_remote_description_for(&self, peer: &Identity) {
        self.state.lock().await.reject_remote.insert(peer.clone());
    }

    /// Makes every `set_remote_description` take this long.
    pub async fn delay_remote_description(&self, delay: Duration) {
        self.state.lock().await.remote_delay = Some(delay);
    }

    pub async fn recorder(&self, peer: &Identity) -> Option<MockTransportRecorder> {
        self.state.lock().await.recorders.get(peer).cloned()
    }

    pub async fn created(&self) -> usize {
        self.state.lock().await.created
    }
}

#[async_trait]
impl TransportFactory for MockTransportFactory {
    async fn create(
        &self,
        peer: &Identity,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn MediaTransport>, TransportError> {
        let mut state = self.state.lock().await;
        let recorder = MockTransportRecorder {
            calls: Arc::new(Mutex::new(Vec::new())),
            events,
        };
        state.recorders.insert(peer.clone(), recorder.clone());
        state.created += 1;

        tracing::debug!("[MockTransport] created for {}", peer);
        Ok(Box::new(MockTransport {
            calls: recorder.calls,
            reject_remote: state.reject_remote.contains(peer),
            remote_delay: state.remote_delay,
        }))
    }
}

struct MockTransport {
    calls: Arc<Mutex<Vec<TransportCall>>>,
    reject_remote: bool,
    remote_delay: Option<Duration>,
}

impl MockTransport {
    async fn record(&self, call: TransportCall) {
        self.calls.lock().await.push(call);
    }
}

#[async_trait]
impl MediaTransport for MockTransport {
    async fn create_offer(&self) -> Result<SessionDescription, TransportError> {
        self.record(TransportCall::CreateOffer).await;
        Ok(SessionDescription::offer(MOCK_OFFER_SDP))
    }

    async fn create_answer(&self) -> Result<SessionDescription, TransportError> {
        self.record(TransportCall::CreateAnswer).await;
        Ok(SessionDescription::answer(MOCK_ANSWER_SDP))
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), TransportError> {
        if let Some(delay) = self.remote_delay {
            tokio::time::sleep(delay).await;
        }
        self.record(TransportCall::SetRemote(description)).await;
        if self.reject_remote {
            return Err(TransportError::Description("scripted rejection".into()));
        }
        Ok(())
    }

    async fn add_remote_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError> {
        self.record(TransportCall::AddCandidate(candidate)).await;
        Ok(())
    }

    async fn attach_local_media(&self) -> Result<(), TransportError> {
        self.record(TransportCall::AttachMedia).await;
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.record(TransportCall::Close).await;
        Ok(())
    }
}
