use crate::coordinator::{CandidateQueue, CoordinatorEvent};
use crate::error::NegotiationError;
use crate::transport::{
    ConnectionState, MediaTransport, SessionDescription, TransportError, TransportEvent,
    TransportFactory,
};
use parley_core::{IceCandidate, Identity, Signal};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const TRANSPORT_EVENT_CAPACITY: usize = 64;

#[derive(Debug)]
pub(crate) enum ContextCommand {
    Call,
    RemoteOffer(String),
    RemoteAnswer(String),
    RemoteCandidate(IceCandidate),
}

/// Everything a context emits goes through here. Closing it is synchronous,
/// so once a handle is cancelled nothing more reaches signaling or the app.
struct Outlet {
    closed: Mutex<bool>,
    signals: mpsc::UnboundedSender<Signal>,
    events: mpsc::UnboundedSender<CoordinatorEvent>,
}

impl Outlet {
    fn signal(&self, signal: Signal) {
        let closed = self.closed.lock().unwrap_or_else(PoisonError::into_inner);
        if !*closed && self.signals.send(signal).is_err() {
            debug!("Signaling sender is gone, dropping outbound signal");
        }
    }

    fn event(&self, event: CoordinatorEvent) {
        let closed = self.closed.lock().unwrap_or_else(PoisonError::into_inner);
        if !*closed {
            let _ = self.events.send(event);
        }
    }

    fn close(&self) {
        *self.closed.lock().unwrap_or_else(PoisonError::into_inner) = true;
    }
}

/// The coordinator's side of a running negotiation context.
pub(crate) struct ContextHandle {
    commands: mpsc::UnboundedSender<ContextCommand>,
    cancel: CancellationToken,
    outlet: Arc<Outlet>,
}

impl ContextHandle {
    pub(crate) fn send(&self, cmd: ContextCommand) -> bool {
        self.is_active() && self.commands.send(cmd).is_ok()
    }

    pub(crate) fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Stops the context. Returns once no further signal or event can be
    /// emitted; the transport is closed by the context task.
    pub(crate) fn cancel(&self) {
        self.outlet.close();
        self.cancel.cancel();
    }
}

/// Negotiation with one remote peer: its transport, the candidates received
/// ahead of the remote description, and a mailbox that serializes every
/// transport operation for this peer.
pub(crate) struct NegotiationContext {
    peer: Identity,
    transport: Box<dyn MediaTransport>,
    candidates: CandidateQueue,
    commands: mpsc::UnboundedReceiver<ContextCommand>,
    transport_events: mpsc::Receiver<TransportEvent>,
    outlet: Arc<Outlet>,
    cancel: CancellationToken,
}

impl NegotiationContext {
    pub(crate) async fn spawn(
        peer: Identity,
        factory: &dyn TransportFactory,
        signals: mpsc::UnboundedSender<Signal>,
        events: mpsc::UnboundedSender<CoordinatorEvent>,
    ) -> Result<ContextHandle, TransportError> {
        let (event_tx, event_rx) = mpsc::channel(TRANSPORT_EVENT_CAPACITY);
        let transport = factory.create(&peer, event_tx).await?;

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let outlet = Arc::new(Outlet {
            closed: Mutex::new(false),
            signals,
            events,
        });

        let context = Self {
            peer,
            transport,
            candidates: CandidateQueue::new(),
            commands: cmd_rx,
            transport_events: event_rx,
            outlet: outlet.clone(),
            cancel: cancel.clone(),
        };
        tokio::spawn(context.run());

        Ok(ContextHandle {
            commands: cmd_tx,
            cancel,
            outlet,
        })
    }

    async fn run(mut self) {
        info!(peer = %self.peer, "Negotiation context started");
        let cancel = self.cancel.clone();

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                cmd = self.commands.recv() => {
                    let Some(cmd) = cmd else { break };
                    let result = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        result = self.handle_command(cmd) => result,
                    };
                    if let Err(e) = result {
                        self.fail(e);
                        break;
                    }
                }

                Some(event) = self.transport_events.recv() => {
                    if let Err(e) = self.handle_transport_event(event) {
                        self.fail(e);
                        break;
                    }
                }
            }
        }

        self.teardown().await;
    }

    async fn handle_command(&mut self, cmd: ContextCommand) -> Result<(), TransportError> {
        match cmd {
            ContextCommand::Call => {
                self.transport.attach_local_media().await?;
                let offer = self.transport.create_offer().await?;
                debug!(peer = %self.peer, "Sending offer");
                self.outlet.signal(Signal::Offer {
                    peer_id: self.peer.clone(),
                    sdp: offer.sdp,
                });
            }

            ContextCommand::RemoteOffer(sdp) => {
                self.apply_remote(SessionDescription::offer(sdp)).await?;
                self.transport.attach_local_media().await?;
                let answer = self.transport.create_answer().await?;
                debug!(peer = %self.peer, "Sending answer");
                self.outlet.signal(Signal::Answer {
                    peer_id: self.peer.clone(),
                    sdp: answer.sdp,
                });
            }

            ContextCommand::RemoteAnswer(sdp) => {
                self.apply_remote(SessionDescription::answer(sdp)).await?;
            }

            ContextCommand::RemoteCandidate(candidate) => {
                match self.candidates.admit(candidate) {
                    Some(candidate) => self.transport.add_remote_candidate(candidate).await?,
                    None => debug!(
                        peer = %self.peer,
                        queued = self.candidates.len(),
                        "Queued candidate until remote description is applied"
                    ),
                }
            }
        }
        Ok(())
    }

    async fn apply_remote(&mut self, description: SessionDescription) -> Result<(), TransportError> {
        self.transport.set_remote_description(description).await?;

        let queued = self.candidates.remote_applied();
        if !queued.is_empty() {
            debug!(peer = %self.peer, count = queued.len(), "Flushing queued candidates");
        }
        for candidate in queued {
            self.transport.add_remote_candidate(candidate).await?;
        }
        Ok(())
    }

    fn handle_transport_event(&mut self, event: TransportEvent) -> Result<(), TransportError> {
        match event {
            // Sent as soon as gathered.
            TransportEvent::LocalCandidate(candidate) => {
                self.outlet.signal(Signal::IceCandidate {
                    peer_id: self.peer.clone(),
                    candidate: candidate.to_value(),
                });
            }

            TransportEvent::RemoteMedia(stream) => {
                info!(peer = %self.peer, track = %stream.track_id, "Remote media available");
                self.outlet.event(CoordinatorEvent::RemoteMedia {
                    peer: self.peer.clone(),
                    stream,
                });
            }

            TransportEvent::StateChanged(state) => {
                self.outlet.event(CoordinatorEvent::ConnectionStateChanged {
                    peer: self.peer.clone(),
                    state,
                });
                match state {
                    ConnectionState::Failed => return Err(TransportError::ConnectionFailed),
                    state if state.is_terminal() => return Err(TransportError::Closed),
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn fail(&mut self, error: TransportError) {
        warn!(peer = %self.peer, "Negotiation failed: {}", error);
        // Inactive before the app hears about it, so a retry starts fresh.
        self.cancel.cancel();
        self.outlet.event(CoordinatorEvent::NegotiationFailed {
            peer: self.peer.clone(),
            error: NegotiationError::Transport(error),
        });
    }

    async fn teardown(&mut self) {
        self.outlet.close();
        self.cancel.cancel();
        self.candidates.clear();
        self.transport_events.close();

        if let Err(e) = self.transport.close().await {
            debug!(peer = %self.peer, "Transport close reported: {}", e);
        }
        info!(peer = %self.peer, "Negotiation context finished");
    }
}
