//! Routes requests to the session store and fans out change notifications.
//!
//! Projections are per viewer, so the per-game channel only carries a "changed" signal;
//! each connection renders its own view when it hears one. The lobby channel carries the
//! rendered summary list, which is the same for every watcher.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{debug, info};
use tycoon_execution::{Reply, SessionStore};
use tycoon_types::{GameCode, GameError, GameView, LobbySummary, PlayerId};

use crate::protocol::{Request, SessionEvent};

/// What a single connection is attached to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Seat {
    pub code: Option<GameCode>,
    /// `None` for spectators.
    pub player: Option<PlayerId>,
    pub lobby: bool,
}

pub struct Hub {
    store: Arc<SessionStore>,
    games: Mutex<HashMap<GameCode, broadcast::Sender<()>>>,
    lobby: broadcast::Sender<Vec<LobbySummary>>,
    capacity: usize,
}

impl Hub {
    pub fn new(store: Arc<SessionStore>, capacity: usize) -> Self {
        let (lobby, _) = broadcast::channel(capacity);
        Self {
            store,
            games: Mutex::new(HashMap::new()),
            lobby,
            capacity,
        }
    }

    pub fn subscribe_game(&self, code: &GameCode) -> broadcast::Receiver<()> {
        let mut games = self.games.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        games.retain(|_, sender| sender.receiver_count() > 0);
        games
            .entry(code.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    pub fn subscribe_lobby(&self) -> broadcast::Receiver<Vec<LobbySummary>> {
        self.lobby.subscribe()
    }

    fn notify_game(&self, code: &GameCode) {
        let games = self.games.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(sender) = games.get(code) {
            let _ = sender.send(());
        }
    }

    fn publish_lobby(&self) {
        let _ = self.lobby.send(self.store.lobby());
    }

    pub fn lobby(&self) -> Vec<LobbySummary> {
        self.store.lobby()
    }

    /// The seat's current projection, if it is attached to a game.
    pub fn view(&self, seat: &Seat) -> Option<GameView> {
        let code = seat.code.as_ref()?;
        self.store.view(code, seat.player).ok()
    }

    /// Handles one request for `seat`. Only successful mutations notify anyone.
    pub fn dispatch(&self, seat: &mut Seat, request: Request) -> Result<Value, GameError> {
        match request {
            Request::Session(event) => self.session_event(seat, event),
            Request::Game(command) => {
                let (Some(code), Some(actor)) = (seat.code.clone(), seat.player) else {
                    return Err(GameError::Forbidden("join a game first".into()));
                };
                let query = command.is_query();
                let touches_lobby = command.touches_lobby();
                let reply = self.store.execute(&code, actor, command)?;
                if !query {
                    self.notify_game(&code);
                }
                if touches_lobby {
                    self.publish_lobby();
                }
                Ok(match reply {
                    Reply::Done => json!({}),
                    Reply::Card(card) => json!({ "card": card }),
                    Reply::Preview(preview) => json!({ "preview": preview }),
                })
            }
        }
    }

    fn session_event(&self, seat: &mut Seat, event: SessionEvent) -> Result<Value, GameError> {
        match event {
            SessionEvent::CreateGame { name, config } => {
                let joined = self.store.create_game(&name, config)?;
                self.leave(seat);
                seat.code = Some(joined.code.clone());
                seat.player = Some(joined.player_id);
                self.publish_lobby();
                Ok(json!({
                    "code": joined.code,
                    "playerId": joined.player_id,
                    "token": joined.token,
                }))
            }
            SessionEvent::JoinGame { code, name } => {
                let joined = self.store.join_game(&code, &name)?;
                self.leave(seat);
                seat.code = Some(joined.code.clone());
                seat.player = Some(joined.player_id);
                self.notify_game(&joined.code);
                self.publish_lobby();
                Ok(json!({
                    "code": joined.code,
                    "playerId": joined.player_id,
                    "token": joined.token,
                }))
            }
            SessionEvent::ReconnectGame {
                code,
                player_id,
                token,
            } => {
                let code = GameCode::normalize(&code.0);
                self.store.reconnect(&code, player_id, &token)?;
                if seat.code.as_ref() != Some(&code) || seat.player != Some(player_id) {
                    self.leave(seat);
                }
                seat.code = Some(code.clone());
                seat.player = Some(player_id);
                self.notify_game(&code);
                info!(%code, player = %player_id, "player reconnected");
                Ok(json!({ "code": code, "playerId": player_id }))
            }
            SessionEvent::WatchLobby => {
                seat.lobby = true;
                Ok(json!({ "games": self.store.lobby() }))
            }
            SessionEvent::WatchGame { code } => {
                let code = GameCode::normalize(&code.0);
                let view = self.store.view(&code, None)?;
                self.leave(seat);
                seat.code = Some(code);
                seat.player = None;
                Ok(json!({ "view": view }))
            }
        }
    }

    /// Detaches the seat from its game, marking its player offline.
    pub fn leave(&self, seat: &mut Seat) {
        let Some(code) = seat.code.take() else {
            return;
        };
        if let Some(player) = seat.player.take() {
            debug!(%code, %player, "seat left");
            self.store.disconnect(&code, player);
            self.notify_game(&code);
        }
        self.prune_games();
    }

    /// Forgets change channels nobody listens to any more.
    fn prune_games(&self) {
        let mut games = self.games.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        games.retain(|_, sender| sender.receiver_count() > 0);
    }
}
