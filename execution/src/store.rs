//! In-memory session registry.
//!
//! Every game lives behind its own mutex so commands for one session serialize while
//! different sessions proceed in parallel. Mutations run against a scratch copy and are
//! committed only when the command succeeds and the invariants still hold, which makes
//! each command atomic: a rejected or panicking command leaves the game untouched.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info, warn};
use tycoon_types::{
    Catalog, Game, GameCode, GameConfig, GameError, GameView, LobbySummary, PlayerId,
    GAME_CODE_LENGTH,
};

use crate::command::{self, Command, Reply};
use crate::{lobby, projector};

/// Credentials handed out by create, join and reconnect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Joined {
    pub code: GameCode,
    pub player_id: PlayerId,
    pub token: String,
}

pub struct SessionStore {
    catalog: Arc<Catalog>,
    sessions: RwLock<HashMap<GameCode, Arc<Mutex<Game>>>>,
    rng: Mutex<ChaCha8Rng>,
}

fn poisoned<T>(_: T) -> GameError {
    GameError::Internal("session lock poisoned".into())
}

fn new_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl SessionStore {
    /// `seed` fixes game codes and trend timelines; `None` draws one from the OS.
    pub fn new(catalog: Arc<Catalog>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            catalog,
            sessions: RwLock::new(HashMap::new()),
            rng: Mutex::new(rng),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn session(&self, code: &GameCode) -> Result<Arc<Mutex<Game>>, GameError> {
        let code = GameCode::normalize(&code.0);
        self.sessions
            .read()
            .map_err(poisoned)?
            .get(&code)
            .cloned()
            .ok_or_else(|| GameError::NotFound(format!("game {code}")))
    }

    /// Runs `f` against a copy of the game and commits the copy only on success.
    fn with_game<T>(
        &self,
        code: &GameCode,
        f: impl FnOnce(&mut Game, &Catalog) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        let session = self.session(code)?;
        let mut game = session.lock().map_err(poisoned)?;
        let mut scratch = game.clone();
        let catalog = self.catalog.as_ref();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(&mut scratch, catalog)))
            .map_err(|_| {
                warn!(code = %game.code, "command panicked, state kept");
                GameError::Internal("command failed".into())
            })??;
        if let Err(err) = scratch.validate_invariants() {
            warn!(code = %game.code, error = %err, "invariant violated, state kept");
            return Err(GameError::Internal(err.to_string()));
        }
        *game = scratch;
        Ok(outcome)
    }

    /// Runs a read-only `f`; a panic is reported like a failed command and never poisons
    /// the session.
    fn read_game<T>(&self, code: &GameCode, f: impl FnOnce(&Game, &Catalog) -> T) -> Result<T, GameError> {
        let session = self.session(code)?;
        let game = session.lock().map_err(poisoned)?;
        let catalog = self.catalog.as_ref();
        panic::catch_unwind(AssertUnwindSafe(|| f(&game, catalog))).map_err(|_| {
            warn!(code = %game.code, "query panicked");
            GameError::Internal("query failed".into())
        })
    }

    fn fresh_code(&self, rng: &mut ChaCha8Rng) -> Result<GameCode, GameError> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        loop {
            let code: String = (0..GAME_CODE_LENGTH)
                .map(|_| char::from(b'A' + rng.gen_range(0..26u8)))
                .collect();
            let code = GameCode(code);
            if !sessions.contains_key(&code) {
                return Ok(code);
            }
        }
    }

    /// Opens a new lobby with the caller as its game master.
    pub fn create_game(&self, gm_name: &str, config: GameConfig) -> Result<Joined, GameError> {
        let (code, seed) = {
            let mut rng = self.rng.lock().map_err(poisoned)?;
            let code = self.fresh_code(&mut rng)?;
            (code, rng.gen::<u64>())
        };
        let token = new_token();
        let game = lobby::new_game(code.clone(), config, gm_name, token.clone(), seed, &self.catalog)?;
        let player_id = game
            .gm()
            .map(|gm| gm.id)
            .ok_or_else(|| GameError::Internal("game without GM".into()))?;

        let mut sessions = self.sessions.write().map_err(poisoned)?;
        if sessions.contains_key(&code) {
            return Err(GameError::Internal("game code collision".into()));
        }
        sessions.insert(code.clone(), Arc::new(Mutex::new(game)));
        info!(%code, years = config.years_total, max_players = config.max_players, "game created");
        Ok(Joined {
            code,
            player_id,
            token,
        })
    }

    pub fn join_game(&self, code: &GameCode, name: &str) -> Result<Joined, GameError> {
        let token = new_token();
        let player_id = self.with_game(code, |game, _| lobby::join(game, name, token.clone()))?;
        Ok(Joined {
            code: GameCode::normalize(&code.0),
            player_id,
            token,
        })
    }

    pub fn reconnect(&self, code: &GameCode, player: PlayerId, token: &str) -> Result<(), GameError> {
        self.with_game(code, |game, _| lobby::reconnect(game, player, token))
    }

    /// Marks the player offline. Unknown sessions or players are ignored.
    pub fn disconnect(&self, code: &GameCode, player: PlayerId) {
        if let Err(err) = self.with_game(code, |game, _| lobby::set_connected(game, player, false)) {
            debug!(%code, %player, error = %err, "disconnect ignored");
        }
    }

    /// Runs one in-game command atomically.
    pub fn execute(&self, code: &GameCode, actor: PlayerId, command: Command) -> Result<Reply, GameError> {
        let name = command.name();
        let result = if command.is_query() {
            self.read_game(code, |game, catalog| {
                let mut scratch = game.clone();
                command::apply(&mut scratch, catalog, actor, command)
            })
            .and_then(|reply| reply)
        } else {
            self.with_game(code, |game, catalog| command::apply(game, catalog, actor, command))
        };
        if let Err(err) = &result {
            debug!(%code, %actor, command = name, error = err.code(), "command rejected");
        }
        result
    }

    pub fn view(&self, code: &GameCode, viewer: Option<PlayerId>) -> Result<GameView, GameError> {
        self.read_game(code, |game, catalog| projector::project(game, catalog, viewer))
    }

    /// Summaries of every session, ordered by code.
    pub fn lobby(&self) -> Vec<LobbySummary> {
        let Ok(sessions) = self.sessions.read() else {
            return Vec::new();
        };
        let mut summaries: Vec<LobbySummary> = sessions
            .values()
            .filter_map(|session| session.lock().ok().map(|game| projector::lobby_summary(&game)))
            .collect();
        summaries.sort_by(|a, b| a.code.cmp(&b.code));
        summaries
    }

    pub fn remove(&self, code: &GameCode) -> bool {
        self.sessions
            .write()
            .map(|mut sessions| sessions.remove(&GameCode::normalize(&code.0)).is_some())
            .unwrap_or(false)
    }

    pub fn contains(&self, code: &GameCode) -> bool {
        self.session(code).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tycoon_types::{BizStep, CardBody, CardId, GameStatus};

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(Catalog::standard()), Some(7))
    }

    #[test]
    fn test_create_and_join() {
        let store = store();
        let gm = store.create_game("Host", GameConfig::default()).unwrap();
        assert_eq!(gm.code.0.len(), GAME_CODE_LENGTH);
        assert!(gm.code.0.chars().all(|c| c.is_ascii_uppercase()));
        assert_eq!(gm.player_id, PlayerId(1));

        let lower = GameCode(gm.code.0.to_lowercase());
        let ada = store.join_game(&lower, "Ada").unwrap();
        assert_eq!(ada.code, gm.code);
        assert_ne!(ada.token, gm.token);
        assert_eq!(store.lobby()[0].players, 1);
        assert_eq!(
            store.join_game(&GameCode("ZZZZZ".into()), "Bob").unwrap_err().code(),
            "NOT_FOUND"
        );
    }

    #[test]
    fn test_seeded_store_is_deterministic() {
        let a = store().create_game("Host", GameConfig::default()).unwrap();
        let b = store().create_game("Host", GameConfig::default()).unwrap();
        assert_eq!(a.code, b.code);
    }

    #[test]
    fn test_rejected_command_leaves_state() {
        let store = store();
        let gm = store.create_game("Host", GameConfig::default()).unwrap();
        let ada = store.join_game(&gm.code, "Ada").unwrap();
        store.execute(&gm.code, gm.player_id, Command::StartGame).unwrap();

        let before = store.view(&gm.code, Some(gm.player_id)).unwrap();
        let err = store
            .execute(&gm.code, ada.player_id, Command::CommitAcquire { amount: Some(1) })
            .unwrap_err();
        assert_eq!(err.code(), "BAD_STATE");
        assert_eq!(store.view(&gm.code, Some(gm.player_id)).unwrap(), before);

        store
            .execute(&gm.code, ada.player_id, Command::CommitMlBid { bid: Some(9) })
            .unwrap();
        store.execute(&gm.code, gm.player_id, Command::GmNext).unwrap();
        let view = store.view(&gm.code, Some(ada.player_id)).unwrap();
        assert_eq!(view.status, GameStatus::InProgress);
        assert_eq!(view.step, Some(BizStep::Move));
    }

    #[test]
    fn test_queries_do_not_mutate() {
        let store = store();
        let gm = store.create_game("Host", GameConfig::default()).unwrap();
        let ada = store.join_game(&gm.code, "Ada").unwrap();
        store.execute(&gm.code, gm.player_id, Command::StartGame).unwrap();
        let before = store.view(&gm.code, Some(gm.player_id)).unwrap();
        let reply = store.execute(&gm.code, ada.player_id, Command::AuditPreview).unwrap();
        assert!(matches!(reply, Reply::Preview(result) if result.total == 0));
        assert_eq!(store.view(&gm.code, Some(gm.player_id)).unwrap(), before);
    }

    #[test]
    fn test_oversized_cards_keep_the_session_usable() {
        let mut catalog = Catalog::standard();
        for card in &mut catalog.cards {
            match &mut card.body {
                CardBody::Investment(investment) if card.id.0 == "INV-01" => {
                    investment.usd_production = u64::MAX;
                }
                CardBody::MiningFarm(farm) if card.id.0 == "FARM-01" => {
                    farm.production = u64::MAX;
                    farm.electricity_cost = u64::MAX;
                }
                _ => {}
            }
        }
        let store = SessionStore::new(Arc::new(catalog), Some(7));
        let gm = store.create_game("Host", GameConfig::default()).unwrap();
        let ada = store.join_game(&gm.code, "Ada").unwrap();
        store.execute(&gm.code, gm.player_id, Command::StartGame).unwrap();
        for card in ["INV-01", "FARM-01"] {
            store
                .execute(&gm.code, ada.player_id, Command::ClaimCard { card_id: CardId::from(card) })
                .unwrap();
        }

        store.execute(&gm.code, ada.player_id, Command::AuditPreview).unwrap();
        store.view(&gm.code, Some(ada.player_id)).unwrap();
        store.execute(&gm.code, gm.player_id, Command::GmNext).unwrap();
        assert_eq!(store.view(&gm.code, None).unwrap().step, Some(BizStep::Move));
    }

    #[test]
    fn test_reconnect_and_disconnect() {
        let store = store();
        let gm = store.create_game("Host", GameConfig::default()).unwrap();
        let ada = store.join_game(&gm.code, "Ada").unwrap();
        store.disconnect(&gm.code, ada.player_id);
        let view = store.view(&gm.code, None).unwrap();
        assert!(!view.players.iter().any(|p| p.id == ada.player_id && p.connected));
        assert_eq!(
            store.reconnect(&gm.code, ada.player_id, &gm.token).unwrap_err().code(),
            "FORBIDDEN"
        );
        store.reconnect(&gm.code, ada.player_id, &ada.token).unwrap();
        store.disconnect(&GameCode("NOPE1".into()), ada.player_id);
    }

    #[test]
    fn test_remove() {
        let store = store();
        let gm = store.create_game("Host", GameConfig::default()).unwrap();
        assert!(store.contains(&gm.code));
        assert!(store.remove(&gm.code));
        assert!(!store.contains(&gm.code));
        assert!(store.lobby().is_empty());
    }

    #[test]
    fn test_sessions_are_independent() {
        let store = store();
        let a = store.create_game("Host", GameConfig::default()).unwrap();
        let b = store.create_game("Other", GameConfig::default()).unwrap();
        assert_ne!(a.code, b.code);
        store.join_game(&a.code, "Ada").unwrap();
        store.execute(&a.code, a.player_id, Command::StartGame).unwrap();
        let view = store.view(&b.code, None).unwrap();
        assert_eq!(view.status, GameStatus::Lobby);
        assert_eq!(view.phase, None);
    }
}
