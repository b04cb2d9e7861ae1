//! GM-driven phase/step state machine.
//!
//! Each year walks the same graph:
//!
//! ```text
//! BIZ.ML_BID -> BIZ.MOVE -> BIZ.AUCTION_ENVELOPE -> BIZ.ACQUIRE -> CRYPTO -> SETTLE
//! ```
//!
//! Leaving SETTLE starts the next year at BIZ.ML_BID, or ends the game after the final
//! year. Only the game master moves along the graph; the collector never advances it.
//!
//! ## Sub-state
//! Entering a step going forward resets that step's sub-state. Rewinding into a step keeps
//! it. Rewinding is refused while the current step holds any commitment.
//!
//! ## Year boundary
//! Starting a year keeps the previous SETTLE aside. Rewinding the opening step puts the
//! year-bound state back (stage, per-step sub-state, leaders, exchange rates, wallets,
//! notices), undoing the year-start effects. Card ownership, protections and reveals are
//! left as they are. Only the first year's opening step cannot be rewound.

use tycoon_types::{
    AcquireState, AuctionState, BizStep, CryptoState, Game, GameError, GameStatus, MlBidState,
    MoveState, PlayerId, SettlementState, Stage,
};

use crate::guards::{require_gm, require_in_progress};
use crate::{collector, trends};

/// Where a successful `advance` landed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Moved to another step of the same year.
    Step(Stage),
    /// Started the given year at its opening step.
    NewYear(u8),
    /// Left the final SETTLE.
    GameOver,
}

/// Successor of a step within a year. `None` after SETTLE.
pub fn next_stage(stage: Stage) -> Option<Stage> {
    match stage {
        Stage::Biz(BizStep::MlBid) => Some(Stage::Biz(BizStep::Move)),
        Stage::Biz(BizStep::Move) => Some(Stage::Biz(BizStep::AuctionEnvelope)),
        Stage::Biz(BizStep::AuctionEnvelope) => Some(Stage::Biz(BizStep::Acquire)),
        Stage::Biz(BizStep::Acquire) => Some(Stage::Crypto),
        Stage::Crypto => Some(Stage::Settle),
        Stage::Settle => None,
    }
}

/// Predecessor of a step within a year. `None` at the opening step.
pub fn previous_stage(stage: Stage) -> Option<Stage> {
    match stage {
        Stage::Biz(BizStep::MlBid) => None,
        Stage::Biz(BizStep::Move) => Some(Stage::Biz(BizStep::MlBid)),
        Stage::Biz(BizStep::AuctionEnvelope) => Some(Stage::Biz(BizStep::Move)),
        Stage::Biz(BizStep::Acquire) => Some(Stage::Biz(BizStep::AuctionEnvelope)),
        Stage::Crypto => Some(Stage::Biz(BizStep::Acquire)),
        Stage::Settle => Some(Stage::Crypto),
    }
}

/// Whether any player has committed in `stage` (for SETTLE: started the audit).
///
/// Pending audit choices that have not been started do not count.
pub fn has_commits(game: &Game, stage: Stage) -> bool {
    match stage {
        Stage::Biz(BizStep::MlBid) => !game.ml_bid.bids.is_empty(),
        Stage::Biz(BizStep::Move) => !game.moves.picks.is_empty(),
        Stage::Biz(BizStep::AuctionEnvelope) => {
            game.auction.entries.values().any(|entry| entry.committed)
        }
        Stage::Biz(BizStep::Acquire) => !game.acquire.entries.is_empty(),
        Stage::Crypto => !game.crypto.entries.is_empty(),
        Stage::Settle => game.settlement.entries.values().any(|entry| entry.started),
    }
}

pub fn advance(game: &mut Game, actor: PlayerId) -> Result<Transition, GameError> {
    require_gm(game, actor)?;
    require_in_progress(game)?;
    let current = game
        .stage
        .ok_or_else(|| GameError::Internal("in progress without a stage".into()))?;

    leave(game, current);
    let transition = match next_stage(current) {
        Some(next) => {
            enter(game, next);
            Transition::Step(next)
        }
        None if game.is_final_year() => {
            game.status = GameStatus::GameOver;
            game.stage = None;
            game.previous_year = None;
            tracing::info!(code = %game.code, year = game.year, "game over");
            Transition::GameOver
        }
        None => {
            let year = game.year + 1;
            let mut settle = game.clone();
            settle.previous_year = None;
            begin_year(game, year);
            game.previous_year = Some(Box::new(settle));
            Transition::NewYear(year)
        }
    };
    if let Transition::Step(stage) = transition {
        tracing::info!(code = %game.code, year = game.year, stage = %stage, "stage advanced");
    }
    Ok(transition)
}

pub fn rewind(game: &mut Game, actor: PlayerId) -> Result<Stage, GameError> {
    require_gm(game, actor)?;
    require_in_progress(game)?;
    let current = game
        .stage
        .ok_or_else(|| GameError::Internal("in progress without a stage".into()))?;
    if has_commits(game, current) {
        return Err(GameError::GuardFail(format!("{current} already has commitments")));
    }
    let Some(previous) = previous_stage(current) else {
        return rewind_year(game);
    };
    game.stage = Some(previous);
    tracing::info!(code = %game.code, year = game.year, stage = %previous, "stage rewound");
    Ok(previous)
}

/// Steps back from the opening step into the previous year's SETTLE.
fn rewind_year(game: &mut Game) -> Result<Stage, GameError> {
    let Some(settle) = game.previous_year.take() else {
        return Err(GameError::bad_state("no earlier step to rewind to"));
    };
    let settle = *settle;
    game.year = settle.year;
    game.stage = settle.stage;
    game.incumbent_leader = settle.incumbent_leader;
    game.market_leader = settle.market_leader;
    game.ml_bid = settle.ml_bid;
    game.moves = settle.moves;
    game.auction = settle.auction;
    game.acquire = settle.acquire;
    game.crypto = settle.crypto;
    game.settlement = settle.settlement;
    game.exchange_rates = settle.exchange_rates;
    game.notices = settle.notices;
    for player in &mut game.players {
        if let Some(before) = settle.players.iter().find(|before| before.id == player.id) {
            player.wallet = before.wallet.clone();
            player.market = before.market.clone();
        }
    }
    tracing::info!(code = %game.code, year = game.year, "year start rewound");
    Ok(Stage::Settle)
}

/// Makes `year` current: every per-step sub-state is cleared, the market leader rolls over
/// and the year's start-of-year trend effects fire.
pub fn begin_year(game: &mut Game, year: u8) {
    game.year = year;
    game.stage = Some(Stage::OPENING);
    game.incumbent_leader = game.market_leader.take();
    game.ml_bid = MlBidState::default();
    clear_moves(game);
    game.auction = AuctionState::default();
    game.acquire = AcquireState::default();
    game.crypto = CryptoState::default();
    game.settlement = SettlementState::default();
    tracing::info!(code = %game.code, year, "year started");
    trends::apply_year_start(game);
}

fn leave(game: &mut Game, stage: Stage) {
    if stage == Stage::OPENING {
        game.market_leader = collector::ml_ranking(game)
            .into_iter()
            .find(|entry| entry.amount.is_some())
            .map(|entry| entry.player);
        tracing::debug!(code = %game.code, leader = ?game.market_leader, "market leader fixed");
    }
}

fn enter(game: &mut Game, stage: Stage) {
    game.stage = Some(stage);
    match stage {
        Stage::Biz(BizStep::MlBid) => game.ml_bid = MlBidState::default(),
        Stage::Biz(BizStep::Move) => clear_moves(game),
        Stage::Biz(BizStep::AuctionEnvelope) => game.auction = AuctionState::default(),
        Stage::Biz(BizStep::Acquire) => game.acquire = AcquireState::default(),
        Stage::Crypto => game.crypto = CryptoState::default(),
        Stage::Settle => game.settlement = SettlementState::default(),
    }
}

fn clear_moves(game: &mut Game) {
    game.moves = MoveState::default();
    for player in &mut game.players {
        player.market = None;
    }
}
