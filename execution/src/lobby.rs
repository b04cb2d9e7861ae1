//! Session roster: game creation, joining, starting and connectivity.

use tycoon_types::{
    Catalog, Game, GameCode, GameConfig, GameError, GameStatus, Inventory, Player, PlayerId, Role,
    MAX_NAME_LENGTH,
};

use crate::guards::require_gm;
use crate::{stage_machine, trend_generator};

/// Trims a display name and checks its length.
pub fn validate_name(raw: &str) -> Result<String, GameError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(GameError::bad_input("name must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(GameError::bad_input(format!(
            "name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(name.to_string())
}

/// A fresh lobby owned by its game master.
pub fn new_game(
    code: GameCode,
    config: GameConfig,
    gm_name: &str,
    gm_token: String,
    seed: u64,
    catalog: &Catalog,
) -> Result<Game, GameError> {
    config.validate()?;
    let name = validate_name(gm_name)?;
    let mut game = Game::new(code, config, name, gm_token, catalog);
    game.seed = seed;
    Ok(game)
}

pub fn join(game: &mut Game, name: &str, token: String) -> Result<PlayerId, GameError> {
    let name = validate_name(name)?;
    if game.status != GameStatus::Lobby {
        return Err(GameError::bad_state("game already started"));
    }
    if game.participant_count() >= usize::from(game.config.max_players) {
        return Err(GameError::Full);
    }
    if game
        .players
        .iter()
        .any(|player| player.name.eq_ignore_ascii_case(&name))
    {
        return Err(GameError::NameTaken);
    }

    let id = PlayerId(game.players.iter().map(|p| p.id.0).max().unwrap_or(0) + 1);
    let seat = game.players.iter().map(|p| p.seat).max().unwrap_or(0) + 1;
    game.players.push(Player::new(id, name, Role::Player, seat, token));
    tracing::info!(code = %game.code, player = %id, seat, "player joined");
    Ok(id)
}

/// Locks the roster, draws the trend timeline and enters year 1.
pub fn start(game: &mut Game, catalog: &Catalog, actor: PlayerId) -> Result<(), GameError> {
    require_gm(game, actor)?;
    if game.status != GameStatus::Lobby {
        return Err(GameError::bad_state("game already started"));
    }
    if game.participant_count() == 0 {
        return Err(GameError::bad_state("at least one player must join first"));
    }

    game.timeline = trend_generator::generate_timeline(catalog, game.config.years_total, game.seed);
    for id in game.participant_ids() {
        game.inventories.entry(id).or_insert_with(Inventory::default);
    }
    game.status = GameStatus::InProgress;
    tracing::info!(
        code = %game.code,
        players = game.participant_count(),
        years = game.config.years_total,
        "game started"
    );
    stage_machine::begin_year(game, 1);
    Ok(())
}

/// Re-attaches a player after a dropped connection. The token is the one issued on
/// create or join.
pub fn reconnect(game: &mut Game, player: PlayerId, token: &str) -> Result<(), GameError> {
    let Some(entry) = game.player_mut(player) else {
        return Err(GameError::NotFound(format!("player {player}")));
    };
    if entry.token != token {
        return Err(GameError::Forbidden("reconnect token mismatch".into()));
    }
    entry.connected = true;
    Ok(())
}

pub fn set_connected(game: &mut Game, player: PlayerId, connected: bool) -> Result<(), GameError> {
    let Some(entry) = game.player_mut(player) else {
        return Err(GameError::NotFound(format!("player {player}")));
    };
    entry.connected = connected;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{lobby_game, GM, P1};
    use tycoon_types::Stage;

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Ada ").unwrap(), "Ada");
        assert_eq!(validate_name("   ").unwrap_err().code(), "BAD_INPUT");
        assert!(validate_name(&"x".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_new_game_rejects_bad_config() {
        let config = GameConfig {
            years_total: 3,
            ..GameConfig::default()
        };
        let err = new_game(GameCode::normalize("ABCDE"), config, "GM", "t".into(), 1, &Catalog::standard())
            .unwrap_err();
        assert_eq!(err.code(), "BAD_INPUT");
    }

    #[test]
    fn test_join_assigns_ids_and_seats() {
        let (mut game, _) = lobby_game();
        let first = join(&mut game, "Ada", "a".into()).unwrap();
        let second = join(&mut game, "Bob", "b".into()).unwrap();
        assert_eq!(first, P1);
        assert_eq!(game.player(second).unwrap().seat, 2);
        assert_eq!(game.player(first).unwrap().role, Role::Player);
    }

    #[test]
    fn test_join_rejections() {
        let (mut game, _) = lobby_game();
        game.config.max_players = 1;
        join(&mut game, "Ada", "a".into()).unwrap();
        assert_eq!(join(&mut game, "ada", "x".into()).unwrap_err().code(), "FULL");
        game.config.max_players = 2;
        assert_eq!(join(&mut game, "ADA", "x".into()).unwrap_err().code(), "NAME_TAKEN");
        assert_eq!(join(&mut game, "gm", "x".into()).unwrap_err().code(), "NAME_TAKEN");
        game.status = GameStatus::InProgress;
        assert_eq!(join(&mut game, "Cy", "x".into()).unwrap_err().code(), "BAD_STATE");
    }

    #[test]
    fn test_start_enters_year_one() {
        let (mut game, catalog) = lobby_game();
        assert_eq!(start(&mut game, &catalog, GM).unwrap_err().code(), "BAD_STATE");
        join(&mut game, "Ada", "a".into()).unwrap();
        assert_eq!(start(&mut game, &catalog, P1).unwrap_err().code(), "FORBIDDEN");
        start(&mut game, &catalog, GM).unwrap();
        assert_eq!(game.status, GameStatus::InProgress);
        assert_eq!(game.year, 1);
        assert_eq!(game.stage, Some(Stage::OPENING));
        assert_eq!(game.timeline.years.len(), usize::from(game.config.years_total));
        assert!(game.inventory(P1).is_some());
        game.validate_invariants().unwrap();
        assert_eq!(start(&mut game, &catalog, GM).unwrap_err().code(), "BAD_STATE");
    }

    #[test]
    fn test_reconnect_checks_token() {
        let (mut game, _) = lobby_game();
        join(&mut game, "Ada", "secret".into()).unwrap();
        set_connected(&mut game, P1, false).unwrap();
        assert_eq!(reconnect(&mut game, P1, "wrong").unwrap_err().code(), "FORBIDDEN");
        assert!(!game.player(P1).unwrap().connected);
        reconnect(&mut game, P1, "secret").unwrap();
        assert!(game.player(P1).unwrap().connected);
        assert_eq!(reconnect(&mut game, PlayerId(9), "x").unwrap_err().code(), "NOT_FOUND");
    }
}
