//! WebSocket client for the signaling protocol.

use crate::error::SignalingClientError;
use futures::{SinkExt, StreamExt};
use parley_core::{Signal, codec};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A connected signaling session. Outbound signals are written in send order;
/// inbound frames that do not decode are dropped.
pub struct SignalingClient {
    outbound: mpsc::UnboundedSender<Signal>,
    inbound: mpsc::UnboundedReceiver<Signal>,
    cancel: CancellationToken,
}

impl SignalingClient {
    /// Connects to `url` (e.g. `ws://host:8080/ws/signal`) presenting
    /// `credential` as the `token` query parameter.
    pub async fn connect(url: &str, credential: &str) -> Result<Self, SignalingClientError> {
        let separator = if url.contains('?') { '&' } else { '?' };
        let (stream, _) = connect_async(format!("{url}{separator}token={credential}")).await?;
        info!("Connected to signaling server at {}", url);

        let (mut sink, mut source) = stream.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Signal>();
        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let writer_cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                let signal = tokio::select! {
                    _ = writer_cancel.cancelled() => break,
                    signal = outbound_rx.recv() => match signal {
                        Some(signal) => signal,
                        None => break,
                    },
                };

                let text = match codec::encode(&signal) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Failed to encode signal: {}", e);
                        continue;
                    }
                };
                if sink.send(Message::text(text)).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
            writer_cancel.cancel();
        });

        let reader_cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                let frame = tokio::select! {
                    _ = reader_cancel.cancelled() => break,
                    frame = source.next() => frame,
                };

                match frame {
                    Some(Ok(Message::Text(text))) => match codec::decode(text.as_str()) {
                        Ok(signal) => {
                            if inbound_tx.send(signal).is_err() {
                                break;
                            }
                        }
                        Err(e) => debug!("Dropping undecodable frame: {}", e),
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!("Signaling read error: {}", e);
                        break;
                    }
                }
            }
            info!("Signaling connection closed");
            reader_cancel.cancel();
        });

        Ok(Self {
            outbound,
            inbound,
            cancel,
        })
    }

    /// A sender for outbound signals, suitable for a
    /// [`NegotiationCoordinator`](crate::NegotiationCoordinator).
    pub fn sender(&self) -> mpsc::UnboundedSender<Signal> {
        self.outbound.clone()
    }

    pub fn send(&self, signal: Signal) -> Result<(), SignalingClientError> {
        if self.cancel.is_cancelled() {
            return Err(SignalingClientError::Closed);
        }
        self.outbound
            .send(signal)
            .map_err(|_| SignalingClientError::Closed)
    }

    /// Next inbound signal, or `None` once the connection is closed.
    pub async fn recv(&mut self) -> Option<Signal> {
        self.inbound.recv().await
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for SignalingClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
