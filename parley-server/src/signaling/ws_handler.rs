use crate::AppState;
use crate::auth::{CredentialQuery, authenticate};
use crate::signaling::{ConnectionSession, SignalingRouter};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parley_core::{Identity, Signal, codec};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Upgrades `/ws/signal`. The credential is checked before the upgrade, so a
/// rejected client never gets a session.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<CredentialQuery>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    let identity = match authenticate(&state.credentials, query.credential(&headers)).await {
        Ok(identity) => identity,
        Err(e) => {
            warn!("Rejected signaling connection: {}", e);
            return (StatusCode::UNAUTHORIZED, e.to_string()).into_response();
        }
    };

    let router = state.router.clone();
    let ping_interval = state.ping_interval;
    ws.on_upgrade(move |socket| handle_socket(socket, identity, router, ping_interval))
}

async fn handle_socket(
    socket: WebSocket,
    identity: Identity,
    router: SignalingRouter,
    ping_interval: Duration,
) {
    let (mut session, rx) = ConnectionSession::new(identity);
    info!(
        identity = %session.identity(),
        connection = %session.connection_id(),
        "New signaling connection"
    );

    let (sender, mut receiver) = socket.split();
    let mut send_task = tokio::spawn(write_loop(
        sender,
        rx,
        session.identity().clone(),
        ping_interval,
    ));

    read_loop(&router, &mut session, &mut receiver, &mut send_task).await;

    router.disconnect(session).await;
    send_task.abort();
}

/// Writes queued signals and pings the client while idle. Stops at the first
/// failed write, which is how a half-open connection is noticed.
async fn write_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Signal>,
    identity: Identity,
    ping_interval: Duration,
) {
    let mut ping = tokio::time::interval_at(Instant::now() + ping_interval, ping_interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            signal = rx.recv() => {
                let Some(signal) = signal else { break };
                let text = match codec::encode(&signal) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(identity = %identity, "Failed to encode outbound signal: {}", e);
                        continue;
                    }
                };
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }

            _ = ping.tick() => {
                if sender.send(Message::Ping(Default::default())).await.is_err() {
                    debug!(identity = %identity, "Ping failed, closing session");
                    break;
                }
            }
        }
    }
    drain(&mut rx);
}

/// Feeds inbound frames to the router until the client goes away or the
/// writer stops. A frame is always fully dispatched before the next check.
async fn read_loop(
    router: &SignalingRouter,
    session: &mut ConnectionSession,
    receiver: &mut SplitStream<WebSocket>,
    send_task: &mut JoinHandle<()>,
) {
    loop {
        let frame = tokio::select! {
            frame = receiver.next() => frame,
            _ = &mut *send_task => {
                debug!(identity = %session.identity(), "Writer stopped, closing session");
                break;
            }
        };

        match frame {
            Some(Ok(Message::Text(text))) => router.handle_text(session, text.as_str()).await,
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                debug!(identity = %session.identity(), "WebSocket read error: {}", e);
                break;
            }
        }
    }

    info!(
        identity = %session.identity(),
        connection = %session.connection_id(),
        "Signaling connection closed"
    );
}

/// Closes the outbound queue once the socket can no longer be written, so
/// rooms stop delivering to this session.
fn drain(rx: &mut mpsc::Receiver<Signal>) {
    rx.close();
    while rx.try_recv().is_ok() {}
}
