//! WebSocket upgrade handler

use std::fmt::Display;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{Frame, HubEvent, HubHandle, SessionId};
use crate::util::rate_limit::SessionRateLimiter;
use crate::ws::protocol::ClientMsg;

/// Frames buffered per session before it counts as lagging
pub const OUTBOUND_QUEUE_CAPACITY: usize = 64;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let session = Uuid::new_v4();
    info!(session_id = %session, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::channel::<Frame>(OUTBOUND_QUEUE_CAPACITY);

    let connect = HubEvent::Connect {
        session,
        outbound: outbound_tx,
    };
    if state.hub.submit(connect).await.is_err() {
        error!(session_id = %session, "Game hub unavailable, closing connection");
        return;
    }

    let rate_limiter = SessionRateLimiter::new(state.config.input_rate_limit);
    run_session(
        session,
        ws_stream,
        ws_sink,
        outbound_rx,
        &state.hub,
        &rate_limiter,
    )
    .await;

    info!(session_id = %session, "WebSocket connection closed");
}

/// Drive both directions until either one ends, then report the disconnect.
///
/// Returning drops both socket halves, which closes the connection.
async fn run_session<St, Si, E>(
    session: SessionId,
    ws_stream: St,
    ws_sink: Si,
    outbound_rx: mpsc::Receiver<Frame>,
    hub: &HubHandle,
    rate_limiter: &SessionRateLimiter,
) where
    St: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
    Si: Sink<Message> + Unpin,
    Si::Error: Display,
{
    tokio::select! {
        _ = read_messages(session, ws_stream, hub, rate_limiter) => {}
        _ = write_frames(session, ws_sink, outbound_rx) => {
            debug!(session_id = %session, "Writer finished, closing connection");
        }
    }

    // Teardown is idempotent in the hub, so this is safe after a writer failure
    let _ = hub.submit(HubEvent::Disconnect { session }).await;
}

/// Session queue -> WebSocket. Ends on a send failure or when the hub drops the session.
async fn write_frames<Si>(
    session: SessionId,
    mut ws_sink: Si,
    mut outbound_rx: mpsc::Receiver<Frame>,
) where
    Si: Sink<Message> + Unpin,
    Si::Error: Display,
{
    while let Some(frame) = outbound_rx.recv().await {
        if let Err(e) = ws_sink.send(Message::Text(frame.to_string())).await {
            debug!(session_id = %session, error = %e, "WebSocket send failed");
            break;
        }
    }
}

/// WebSocket -> hub
async fn read_messages<St, E>(
    session: SessionId,
    mut ws_stream: St,
    hub: &HubHandle,
    rate_limiter: &SessionRateLimiter,
) where
    St: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(session_id = %session, "Rate limited input message");
                    continue;
                }

                let event = match ClientMsg::decode(&text) {
                    Ok(ClientMsg::Join(request)) => HubEvent::Join { session, request },
                    Ok(ClientMsg::Action(request)) => HubEvent::Action { session, request },
                    Err(e) => {
                        warn!(session_id = %session, error = %e, "Failed to parse client message");
                        continue;
                    }
                };

                if hub.submit(event).await.is_err() {
                    debug!(session_id = %session, "Game hub closed");
                    break;
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(session_id = %session, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(session_id = %session, "Client initiated close");
                break;
            }
            Err(e) => {
                debug!(session_id = %session, error = %e, "WebSocket read error");
                break;
            }
        }
    }
}
