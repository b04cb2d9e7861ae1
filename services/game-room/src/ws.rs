use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State as AxumState;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use tycoon_types::{GameError, LobbySummary};

use crate::hub::{Hub, Seat};
use crate::protocol::{parse_request, Ack, Inbound, Push};

#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
    pub max_message_bytes: usize,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    AxumState(state): AxumState<AppState>,
) -> impl IntoResponse {
    ws.max_message_size(state.max_message_bytes)
        .on_upgrade(|socket| handle_socket(socket, state))
}

fn send_json(tx: &mpsc::UnboundedSender<Message>, frame: &impl Serialize) {
    match serde_json::to_string(frame) {
        Ok(payload) => {
            let _ = tx.send(Message::Text(payload));
        }
        Err(err) => warn!(?err, "failed to encode frame"),
    }
}

fn push_state(hub: &Hub, seat: &Seat, tx: &mpsc::UnboundedSender<Message>) {
    if let Some(view) = hub.view(seat) {
        send_json(tx, &Push::State { view });
    }
}

/// Waits on an optional subscription; pends forever when there is none.
async fn next_change(rx: &mut Option<broadcast::Receiver<()>>) -> Result<(), RecvError> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn next_lobby(
    rx: &mut Option<broadcast::Receiver<Vec<LobbySummary>>>,
) -> Result<Vec<LobbySummary>, RecvError> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let hub = state.hub;
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    let write_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let mut seat = Seat::default();
    let mut game_rx: Option<broadcast::Receiver<()>> = None;
    let mut lobby_rx: Option<broadcast::Receiver<Vec<LobbySummary>>> = None;

    loop {
        tokio::select! {
            message = receiver.next() => {
                let Some(Ok(message)) = message else {
                    break;
                };
                match message {
                    Message::Text(text) => {
                        let watched = seat.code.clone();
                        handle_text(&hub, &mut seat, &text, &tx);
                        if seat.code != watched {
                            drop(game_rx.take());
                            game_rx = seat.code.as_ref().map(|code| hub.subscribe_game(code));
                            push_state(&hub, &seat, &tx);
                        }
                        if seat.lobby && lobby_rx.is_none() {
                            lobby_rx = Some(hub.subscribe_lobby());
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            changed = next_change(&mut game_rx) => match changed {
                Ok(()) | Err(RecvError::Lagged(_)) => push_state(&hub, &seat, &tx),
                Err(RecvError::Closed) => game_rx = None,
            },
            games = next_lobby(&mut lobby_rx) => match games {
                Ok(games) => send_json(&tx, &Push::Lobby { games }),
                Err(RecvError::Lagged(_)) => send_json(&tx, &Push::Lobby { games: hub.lobby() }),
                Err(RecvError::Closed) => lobby_rx = None,
            },
        }
    }

    drop(game_rx);
    hub.leave(&mut seat);
    write_task.abort();
}

fn handle_text(hub: &Hub, seat: &mut Seat, text: &str, tx: &mpsc::UnboundedSender<Message>) {
    let inbound = match serde_json::from_str::<Inbound>(text) {
        Ok(inbound) => inbound,
        Err(err) => {
            warn!(?err, "invalid inbound message");
            let request_id = serde_json::from_str::<Value>(text)
                .ok()
                .and_then(|value| value.get("requestId").cloned())
                .unwrap_or(Value::Null);
            send_json(tx, &Ack::error(request_id, &GameError::bad_input("malformed message")));
            return;
        }
    };

    let event = inbound.event.clone();
    let result = parse_request(&inbound.event, inbound.payload)
        .and_then(|request| hub.dispatch(seat, request));
    let ack = match result {
        Ok(data) => Ack::ok(inbound.request_id, data),
        Err(err) => {
            debug!(%event, code = ?seat.code, error = err.code(), "request rejected");
            Ack::error(inbound.request_id, &err)
        }
    };
    send_json(tx, &ack);
}
