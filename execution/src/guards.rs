//! Precondition checks shared by the command handlers.

use tycoon_types::{Game, GameError, GameStatus, PlayerId, Stage, MAX_AMOUNT};

pub(crate) fn require_in_progress(game: &Game) -> Result<(), GameError> {
    if game.status != GameStatus::InProgress {
        return Err(GameError::bad_state(format!(
            "game is {:?}",
            game.status
        )));
    }
    Ok(())
}

pub(crate) fn require_stage(game: &Game, stage: Stage) -> Result<(), GameError> {
    require_in_progress(game)?;
    match game.stage {
        Some(current) if current == stage => Ok(()),
        Some(current) => Err(GameError::bad_state(format!(
            "expected {stage}, current step is {current}"
        ))),
        None => Err(GameError::bad_state("no active step")),
    }
}

pub(crate) fn require_gm(game: &Game, actor: PlayerId) -> Result<(), GameError> {
    match game.player(actor) {
        Some(player) if player.is_gm() => Ok(()),
        Some(_) => Err(GameError::Forbidden("only the game master may do this".into())),
        None => Err(GameError::NotFound(format!("player {actor}"))),
    }
}

/// The actor must be a non-GM player of this game.
pub(crate) fn require_participant(game: &Game, actor: PlayerId) -> Result<(), GameError> {
    match game.player(actor) {
        Some(player) if player.is_gm() => {
            Err(GameError::Forbidden("the game master does not play".into()))
        }
        Some(_) => Ok(()),
        None => Err(GameError::NotFound(format!("player {actor}"))),
    }
}

pub(crate) fn check_amount(amount: u64, field: &str) -> Result<u64, GameError> {
    if amount > MAX_AMOUNT {
        return Err(GameError::bad_input(format!(
            "{field} exceeds {MAX_AMOUNT}"
        )));
    }
    Ok(amount)
}

/// Barrier check: every participant satisfies `done`.
pub(crate) fn all_participants(game: &Game, done: impl Fn(PlayerId) -> bool) -> bool {
    let mut any = false;
    for player in game.participants() {
        any = true;
        if !done(player.id) {
            return false;
        }
    }
    any
}

pub(crate) fn saturate(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}
