//! Per-step private commitments: ML bids, market picks, acquisitions and crypto trades.
//!
//! Contents stay private to their author until the step's barrier is met; the projector
//! only exposes who has committed. The collector never advances the stage.

use std::collections::BTreeMap;
use tycoon_types::{
    BizStep, Catalog, Coin, Commit, CryptoEntry, Game, GameError, MarketId, PlayerId, Stage,
    MAX_AMOUNT,
};

use crate::guards::{all_participants, check_amount, require_participant, require_stage, saturate};
use crate::ranking::{rank, RankedEntry};

/// `bid = None` passes. Re-committing overwrites the previous bid.
pub fn commit_ml_bid(game: &mut Game, actor: PlayerId, bid: Option<u64>) -> Result<(), GameError> {
    require_participant(game, actor)?;
    require_stage(game, Stage::Biz(BizStep::MlBid))?;
    if let Some(bid) = bid {
        check_amount(bid, "bid")?;
    }
    let seq = game.next_seq();
    game.ml_bid.bids.insert(actor, Commit { value: bid, seq });
    if all_participants(game, |id| game.ml_bid.bids.contains_key(&id)) {
        tracing::debug!(code = %game.code, year = game.year, "ml bids complete");
    }
    Ok(())
}

/// The ML ranking over the bids committed so far.
pub fn ml_ranking(game: &Game) -> Vec<RankedEntry> {
    let entries = game
        .ml_bid
        .bids
        .iter()
        .map(|(player, commit)| RankedEntry {
            player: *player,
            amount: commit.value,
            seq: commit.seq,
            seat: game.seat_of(*player),
        })
        .collect();
    rank(entries, game.config.tie_break, game.incumbent_leader)
}

/// Claims `market` for the actor, releasing any market held before. `None` stays out.
pub fn pick_market(
    game: &mut Game,
    catalog: &Catalog,
    actor: PlayerId,
    market: Option<MarketId>,
) -> Result<(), GameError> {
    require_participant(game, actor)?;
    require_stage(game, Stage::Biz(BizStep::Move))?;
    if let Some(market) = &market {
        if catalog.market(market).is_none() {
            return Err(GameError::NotFound(format!("market {market}")));
        }
        if let Some(holder) = game.moves.holder(market) {
            if holder != actor {
                return Err(GameError::Locked(market.to_string()));
            }
        }
    }

    game.moves.locks.retain(|_, holder| *holder != actor);
    if let Some(market) = &market {
        game.moves.locks.insert(market.clone(), actor);
    }
    if let Some(player) = game.player_mut(actor) {
        player.market = market.clone();
    }
    let seq = game.next_seq();
    game.moves.picks.insert(actor, Commit { value: market, seq });
    Ok(())
}

/// Write-once. `None` declines to acquire.
pub fn commit_acquire(game: &mut Game, actor: PlayerId, amount: Option<u64>) -> Result<(), GameError> {
    require_participant(game, actor)?;
    require_stage(game, Stage::Biz(BizStep::Acquire))?;
    if game.acquire.entries.contains_key(&actor) {
        return Err(GameError::Already("acquisition committed".into()));
    }
    if let Some(amount) = amount {
        check_amount(amount, "amount")?;
    }
    let seq = game.next_seq();
    game.acquire.entries.insert(actor, Commit { value: amount, seq });
    Ok(())
}

/// Write-once crypto order: positive quantities buy, negative quantities sell.
///
/// The last commit of the step settles every order against the current exchange rates.
pub fn commit_crypto(
    game: &mut Game,
    actor: PlayerId,
    trades: BTreeMap<Coin, i64>,
) -> Result<(), GameError> {
    require_participant(game, actor)?;
    require_stage(game, Stage::Crypto)?;
    if game.crypto.resolved || game.crypto.entries.contains_key(&actor) {
        return Err(GameError::Already("crypto trades committed".into()));
    }
    let wallet = game
        .player(actor)
        .map(|player| player.wallet.clone())
        .unwrap_or_default();
    let mut accepted = BTreeMap::new();
    for (coin, quantity) in trades {
        if quantity.unsigned_abs() > MAX_AMOUNT {
            return Err(GameError::bad_input(format!("{} quantity too large", coin.symbol())));
        }
        if quantity < 0 && quantity.unsigned_abs() > wallet.balance(coin) {
            return Err(GameError::bad_input(format!(
                "cannot sell more {} than held",
                coin.symbol()
            )));
        }
        if quantity != 0 {
            accepted.insert(coin, quantity);
        }
    }

    let seq = game.next_seq();
    game.crypto.entries.insert(
        actor,
        CryptoEntry {
            trades: accepted,
            usd_delta: None,
            seq,
        },
    );
    if all_participants(game, |id| game.crypto.entries.contains_key(&id)) {
        resolve_crypto(game)?;
    }
    Ok(())
}

fn resolve_crypto(game: &mut Game) -> Result<(), GameError> {
    if game.crypto.resolved {
        return Ok(());
    }
    let rates = game.exchange_rates.clone();
    let players: Vec<PlayerId> = game.crypto.entries.keys().copied().collect();
    for id in players {
        let trades = game.crypto.entries[&id].trades.clone();
        let mut spent: i128 = 0;
        for (coin, quantity) in &trades {
            let rate = rates.get(coin).copied().unwrap_or(0);
            spent += i128::from(*quantity) * i128::from(rate);
            let applied = game
                .player_mut(id)
                .map(|player| player.wallet.apply(*coin, *quantity))
                .unwrap_or(false);
            if !applied {
                return Err(GameError::Internal(format!(
                    "wallet of {id} cannot settle {} trade",
                    coin.symbol()
                )));
            }
        }
        if let Some(entry) = game.crypto.entries.get_mut(&id) {
            entry.usd_delta = Some(saturate(-spent));
        }
    }
    game.crypto.resolved = true;
    tracing::info!(code = %game.code, year = game.year, "crypto trades settled");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{started_game, GM, P1, P2};

    fn at(game: &mut Game, stage: Stage) {
        game.stage = Some(stage);
    }

    #[test]
    fn test_ml_bid_recommit_overwrites() {
        let (mut game, _) = started_game(2);
        commit_ml_bid(&mut game, P1, Some(100)).unwrap();
        commit_ml_bid(&mut game, P1, Some(60)).unwrap();
        assert_eq!(game.ml_bid.bids[&P1].value, Some(60));
        assert_eq!(game.ml_bid.bids.len(), 1);
    }

    #[test]
    fn test_ml_bid_rejections() {
        let (mut game, _) = started_game(2);
        assert_eq!(commit_ml_bid(&mut game, GM, Some(1)).unwrap_err().code(), "FORBIDDEN");
        assert_eq!(
            commit_ml_bid(&mut game, P1, Some(MAX_AMOUNT + 1)).unwrap_err().code(),
            "BAD_INPUT"
        );
        at(&mut game, Stage::Crypto);
        assert_eq!(commit_ml_bid(&mut game, P1, Some(1)).unwrap_err().code(), "BAD_STATE");
        assert!(game.ml_bid.bids.is_empty());
    }

    #[test]
    fn test_ml_ranking_orders_and_passes_last() {
        let (mut game, _) = started_game(3);
        commit_ml_bid(&mut game, P1, None).unwrap();
        commit_ml_bid(&mut game, P2, Some(10)).unwrap();
        commit_ml_bid(&mut game, PlayerId(4), Some(30)).unwrap();
        let order: Vec<_> = ml_ranking(&game).into_iter().map(|e| e.player).collect();
        assert_eq!(order, vec![PlayerId(4), P2, P1]);
    }

    #[test]
    fn test_pick_market_locks_exclusively() {
        let (mut game, catalog) = started_game(2);
        at(&mut game, Stage::Biz(BizStep::Move));
        let nyc = MarketId::from("NYC");
        let ldn = MarketId::from("LDN");

        pick_market(&mut game, &catalog, P1, Some(nyc.clone())).unwrap();
        assert_eq!(
            pick_market(&mut game, &catalog, P2, Some(nyc.clone())).unwrap_err().code(),
            "LOCKED"
        );
        pick_market(&mut game, &catalog, P1, Some(nyc.clone())).unwrap();

        pick_market(&mut game, &catalog, P1, Some(ldn.clone())).unwrap();
        assert_eq!(game.moves.holder(&nyc), None);
        assert_eq!(game.moves.holder(&ldn), Some(P1));
        pick_market(&mut game, &catalog, P2, Some(nyc.clone())).unwrap();
        game.validate_invariants().unwrap();

        pick_market(&mut game, &catalog, P1, None).unwrap();
        assert_eq!(game.moves.holder(&ldn), None);
        assert_eq!(game.player(P1).unwrap().market, None);
        assert!(game.moves.picks.contains_key(&P1));

        assert_eq!(
            pick_market(&mut game, &catalog, P1, Some(MarketId::from("XXX"))).unwrap_err().code(),
            "NOT_FOUND"
        );
        game.validate_invariants().unwrap();
    }

    #[test]
    fn test_acquire_is_write_once() {
        let (mut game, _) = started_game(2);
        at(&mut game, Stage::Biz(BizStep::Acquire));
        commit_acquire(&mut game, P1, Some(5)).unwrap();
        assert_eq!(commit_acquire(&mut game, P1, Some(6)).unwrap_err().code(), "ALREADY");
        assert_eq!(game.acquire.entries[&P1].value, Some(5));
    }

    #[test]
    fn test_crypto_resolves_once_all_committed() {
        let (mut game, _) = started_game(2);
        at(&mut game, Stage::Crypto);
        game.player_mut(P2).unwrap().wallet.set(Coin::Eth, 4);
        let btc = game.exchange_rates[&Coin::Btc] as i64;
        let eth = game.exchange_rates[&Coin::Eth] as i64;

        commit_crypto(&mut game, P1, BTreeMap::from([(Coin::Btc, 2)])).unwrap();
        assert!(!game.crypto.resolved);
        assert_eq!(game.player(P1).unwrap().wallet.balance(Coin::Btc), 0);
        assert_eq!(
            commit_crypto(&mut game, P1, BTreeMap::new()).unwrap_err().code(),
            "ALREADY"
        );

        commit_crypto(&mut game, P2, BTreeMap::from([(Coin::Eth, -3), (Coin::Sol, 0)])).unwrap();
        assert!(game.crypto.resolved);
        assert_eq!(game.player(P1).unwrap().wallet.balance(Coin::Btc), 2);
        assert_eq!(game.player(P2).unwrap().wallet.balance(Coin::Eth), 1);
        assert_eq!(game.crypto.entries[&P1].usd_delta, Some(-2 * btc));
        assert_eq!(game.crypto.entries[&P2].usd_delta, Some(3 * eth));
        assert!(!game.crypto.entries[&P2].trades.contains_key(&Coin::Sol));
    }

    #[test]
    fn test_crypto_rejects_oversell() {
        let (mut game, _) = started_game(1);
        at(&mut game, Stage::Crypto);
        game.player_mut(P1).unwrap().wallet.set(Coin::Doge, 10);
        assert_eq!(
            commit_crypto(&mut game, P1, BTreeMap::from([(Coin::Doge, -11)])).unwrap_err().code(),
            "BAD_INPUT"
        );
        assert!(game.crypto.entries.is_empty());
        commit_crypto(&mut game, P1, BTreeMap::from([(Coin::Doge, -10)])).unwrap();
        assert!(game.crypto.resolved);
        assert_eq!(game.player(P1).unwrap().wallet.balance(Coin::Doge), 0);
    }
}
