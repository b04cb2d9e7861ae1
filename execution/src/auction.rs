//! Sealed-envelope auction with a lobbyist last call.
//!
//! Round 1 collects one sealed bid (or pass) per player, optionally spending a lobbyist
//! token. Once every player has committed, the auction resolves immediately unless somebody
//! used a lobbyist, in which case a last-call window opens where only those players may
//! submit a final bid. No winner is computed: after resolution the GM sees the ranked list.

use tycoon_types::{
    Ability, AuctionEntry, BizStep, Game, GameError, PlayerId, RankedBid, Stage,
};

use crate::guards::{all_participants, check_amount, require_participant, require_stage};
use crate::ranking::{rank, RankedEntry};

const STAGE: Stage = Stage::Biz(BizStep::AuctionEnvelope);

pub fn commit_auction_bid(
    game: &mut Game,
    actor: PlayerId,
    bid: Option<u64>,
    use_lobbyist: bool,
) -> Result<(), GameError> {
    require_participant(game, actor)?;
    require_stage(game, STAGE)?;
    if game
        .auction
        .entries
        .get(&actor)
        .is_some_and(|entry| entry.committed)
    {
        return Err(GameError::Already("auction bid committed".into()));
    }
    if let Some(bid) = bid {
        check_amount(bid, "bid")?;
    }
    if use_lobbyist {
        if !game.spend_experts(actor, Ability::Lobbyist, 1) {
            return Err(GameError::NoPower(Ability::Lobbyist.to_string()));
        }
    }

    let seq = game.next_seq();
    game.auction.entries.insert(
        actor,
        AuctionEntry {
            bid,
            committed: true,
            use_lobbyist,
            seq,
            ..AuctionEntry::default()
        },
    );

    if all_participants(game, |id| {
        game.auction.entries.get(&id).is_some_and(|entry| entry.committed)
    }) {
        if game.auction.entries.values().any(|entry| entry.use_lobbyist) {
            game.auction.last_call = true;
            tracing::info!(code = %game.code, year = game.year, "auction last call opened");
        } else {
            resolve(game);
        }
    }
    Ok(())
}

/// Round 2: `final_bid = None` keeps the round-1 bid.
pub fn commit_auction_final_bid(
    game: &mut Game,
    actor: PlayerId,
    final_bid: Option<u64>,
) -> Result<(), GameError> {
    require_participant(game, actor)?;
    require_stage(game, STAGE)?;
    if !game.auction.last_call {
        return Err(GameError::bad_state("auction last call is not open"));
    }
    let Some(entry) = game.auction.entries.get(&actor) else {
        return Err(GameError::Forbidden("no lobbyist declared".into()));
    };
    if !entry.use_lobbyist {
        return Err(GameError::Forbidden("no lobbyist declared".into()));
    }
    if entry.final_committed {
        return Err(GameError::Already("final bid committed".into()));
    }
    if let Some(bid) = final_bid {
        check_amount(bid, "finalBid")?;
    }
    if let Some(entry) = game.auction.entries.get_mut(&actor) {
        entry.final_bid = final_bid;
        entry.final_committed = true;
    }

    let pending = game
        .auction
        .entries
        .values()
        .any(|entry| entry.use_lobbyist && !entry.final_committed);
    if !pending {
        resolve(game);
    }
    Ok(())
}

fn resolve(game: &mut Game) {
    if game.auction.resolved {
        return;
    }
    game.auction.last_call = false;
    game.auction.resolved = true;
    tracing::info!(
        code = %game.code,
        year = game.year,
        bids = game.auction.entries.len(),
        "auction resolved"
    );
}

/// Every committed entry ranked by effective bid.
pub fn ranked_bids(game: &Game) -> Vec<RankedBid> {
    let entries = game
        .auction
        .entries
        .iter()
        .filter(|(_, entry)| entry.committed)
        .map(|(player, entry)| RankedEntry {
            player: *player,
            amount: entry.effective_bid(),
            seq: entry.seq,
            seat: game.seat_of(*player),
        })
        .collect();
    rank(entries, game.config.tie_break, game.incumbent_leader)
        .into_iter()
        .enumerate()
        .map(|(index, ranked)| {
            let entry = &game.auction.entries[&ranked.player];
            RankedBid {
                rank: index + 1,
                player: ranked.player,
                bid: ranked.amount,
                used_lobbyist: entry.use_lobbyist,
                revised: entry.revised(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{give_card, started_game, P1, P2};
    use tycoon_types::{Catalog, TieBreak};

    const P3: PlayerId = PlayerId(4);

    fn auction_game(players: usize) -> (Game, Catalog) {
        let (mut game, catalog) = started_game(players);
        game.stage = Some(STAGE);
        (game, catalog)
    }

    #[test]
    fn test_resolves_without_lobbyist() {
        let (mut game, _) = auction_game(2);
        commit_auction_bid(&mut game, P1, Some(10), false).unwrap();
        assert!(!game.auction.resolved);
        commit_auction_bid(&mut game, P2, None, false).unwrap();
        assert!(game.auction.resolved);
        assert!(!game.auction.last_call);
    }

    #[test]
    fn test_round_one_is_write_once() {
        let (mut game, _) = auction_game(2);
        commit_auction_bid(&mut game, P1, Some(10), false).unwrap();
        assert_eq!(
            commit_auction_bid(&mut game, P1, Some(11), false).unwrap_err().code(),
            "ALREADY"
        );
    }

    #[test]
    fn test_lobbyist_requires_token() {
        let (mut game, catalog) = auction_game(2);
        assert_eq!(
            commit_auction_bid(&mut game, P1, Some(10), true).unwrap_err().code(),
            "NO_POWER"
        );
        assert!(game.auction.entries.is_empty());
        give_card(&mut game, &catalog, P1, "LOB-01");
        commit_auction_bid(&mut game, P1, Some(10), true).unwrap();
        assert_eq!(game.inventory(P1).unwrap().abilities.available(Ability::Lobbyist), 0);
    }

    #[test]
    fn test_last_call_flow() {
        let (mut game, catalog) = auction_game(3);
        give_card(&mut game, &catalog, P1, "LOB-01");
        commit_auction_bid(&mut game, P1, Some(50), true).unwrap();
        assert_eq!(
            commit_auction_final_bid(&mut game, P1, Some(70)).unwrap_err().code(),
            "BAD_STATE"
        );
        commit_auction_bid(&mut game, P2, Some(60), false).unwrap();
        commit_auction_bid(&mut game, P3, Some(55), false).unwrap();
        assert!(game.auction.last_call);
        assert!(!game.auction.resolved);

        assert_eq!(
            commit_auction_final_bid(&mut game, P2, Some(99)).unwrap_err().code(),
            "FORBIDDEN"
        );
        commit_auction_final_bid(&mut game, P1, Some(70)).unwrap();
        assert!(game.auction.resolved);
        assert!(!game.auction.last_call);
        assert_eq!(
            commit_auction_final_bid(&mut game, P1, Some(80)).unwrap_err().code(),
            "BAD_STATE"
        );

        let ranked = ranked_bids(&game);
        assert_eq!(ranked[0].player, P1);
        assert_eq!(ranked[0].bid, Some(70));
        assert!(ranked[0].revised);
        assert_eq!(ranked.iter().map(|r| r.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_absent_final_bid_keeps_round_one() {
        let (mut game, catalog) = auction_game(1);
        give_card(&mut game, &catalog, P1, "LOB-01");
        commit_auction_bid(&mut game, P1, Some(40), true).unwrap();
        commit_auction_final_bid(&mut game, P1, None).unwrap();
        let ranked = ranked_bids(&game);
        assert_eq!(ranked[0].bid, Some(40));
        assert!(!ranked[0].revised);
    }

    #[test]
    fn test_final_bid_is_write_once_while_others_pending() {
        let (mut game, catalog) = auction_game(2);
        give_card(&mut game, &catalog, P1, "LOB-01");
        give_card(&mut game, &catalog, P2, "LOB-02");
        commit_auction_bid(&mut game, P1, Some(1), true).unwrap();
        commit_auction_bid(&mut game, P2, Some(2), true).unwrap();
        commit_auction_final_bid(&mut game, P1, Some(3)).unwrap();
        assert_eq!(
            commit_auction_final_bid(&mut game, P1, Some(4)).unwrap_err().code(),
            "ALREADY"
        );
        assert!(game.auction.last_call);
        commit_auction_final_bid(&mut game, P2, None).unwrap();
        assert!(game.auction.resolved);
    }

    #[test]
    fn test_ties_follow_policy() {
        let (mut game, _) = auction_game(2);
        game.config.tie_break = TieBreak::SeatOrder;
        commit_auction_bid(&mut game, P2, Some(10), false).unwrap();
        commit_auction_bid(&mut game, P1, Some(10), false).unwrap();
        assert_eq!(ranked_bids(&game)[0].player, P1);

        game.config.tie_break = TieBreak::EarliestCommit;
        assert_eq!(ranked_bids(&game)[0].player, P2);
    }
}
