//! Per-viewer projection of a [`Game`].
//!
//! [`project`] is pure: it reads the aggregate and builds a fresh [`GameView`], dropping
//! everything the viewer may not see. Sealed bids and pending audit choices are visible
//! to their author only. Ranked bid lists are visible to the GM only. Future trend years
//! are visible after an analyst reveal. Reconnect tokens are never projected.

use std::collections::BTreeMap;
use tycoon_types::{
    AcquireView, AuctionView, BidView, Catalog, CryptoView, Game, GameView, LobbySummary,
    MlBidView, MoveView, PlayerId, PlayerView, SettlementEntryView, SettlementView, Stage,
};

use crate::guards::all_participants;
use crate::{audit, auction, collector};

/// Who is looking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Viewer {
    Gm(PlayerId),
    Player(PlayerId),
    Spectator,
}

impl Viewer {
    fn of(game: &Game, viewer: Option<PlayerId>) -> Self {
        match viewer.and_then(|id| game.player(id)) {
            Some(player) if player.is_gm() => Viewer::Gm(player.id),
            Some(player) => Viewer::Player(player.id),
            None => Viewer::Spectator,
        }
    }

    fn id(&self) -> Option<PlayerId> {
        match self {
            Viewer::Gm(id) | Viewer::Player(id) => Some(*id),
            Viewer::Spectator => None,
        }
    }

    fn is_gm(&self) -> bool {
        matches!(self, Viewer::Gm(_))
    }

    /// The GM sees private state of every player; a player only their own.
    fn sees(&self, player: PlayerId) -> bool {
        match self {
            Viewer::Gm(_) => true,
            Viewer::Player(id) => *id == player,
            Viewer::Spectator => false,
        }
    }
}

pub fn project(game: &Game, catalog: &Catalog, viewer: Option<PlayerId>) -> GameView {
    let viewer = Viewer::of(game, viewer);
    let own = viewer.id().filter(|_| !viewer.is_gm());

    let players = game
        .players
        .iter()
        .map(|player| {
            let inventory = game.inventory(player.id);
            PlayerView {
                id: player.id,
                name: player.name.clone(),
                role: player.role,
                seat: player.seat,
                connected: player.connected,
                market: player.market.clone(),
                wallet: player.wallet.clone(),
                investments: inventory.map(|i| i.investments.clone()).unwrap_or_default(),
                farms: inventory.map(|i| i.farms.clone()).unwrap_or_default(),
                experts: inventory.map(|i| i.experts.clone()).unwrap_or_default(),
            }
        })
        .collect();

    let trends = game
        .current_trends()
        .map(|year| year.iter().cloned().collect())
        .unwrap_or_default();
    let revealed = game
        .timeline
        .years
        .iter()
        .filter(|(year, _)| **year > game.year)
        .filter(|(year, _)| {
            viewer.is_gm()
                || own.is_some_and(|id| {
                    game.reveals
                        .get(&id)
                        .is_some_and(|years| years.contains(*year))
                })
        })
        .map(|(year, trends)| (*year, trends.clone()))
        .collect();

    let abilities = own
        .and_then(|id| game.inventory(id))
        .map(|inventory| inventory.abilities.iter().collect())
        .unwrap_or_default();

    GameView {
        code: game.code.clone(),
        status: game.status,
        config: game.config,
        year: game.year,
        phase: game.phase(),
        step: game.step(),
        viewer: viewer.id(),
        players,
        trends,
        revealed,
        exchange_rates: game.exchange_rates.clone(),
        availability: game.availability.clone(),
        abilities,
        protections: game
            .protections
            .iter()
            .filter(|protection| viewer.sees(protection.player))
            .cloned()
            .collect(),
        notices: game
            .notices
            .iter()
            .filter(|notice| viewer.sees(notice.player))
            .cloned()
            .collect(),
        ml_bid: ml_bid_view(game, own),
        moves: MoveView {
            locks: game.moves.locks.clone(),
            committed: game.moves.picks.keys().copied().collect(),
        },
        auction: auction_view(game, viewer, own),
        acquire: acquire_view(game, viewer, own),
        crypto: crypto_view(game, viewer, own),
        settlement: settlement_view(game, catalog, own),
    }
}

fn ml_bid_view(game: &Game, own: Option<PlayerId>) -> MlBidView {
    let bids = &game.ml_bid.bids;
    let complete = all_participants(game, |id| bids.contains_key(&id));
    let own_commit = own.and_then(|id| bids.get(&id));
    let ranking = complete.then(|| collector::ml_ranking(game));
    MlBidView {
        committed: bids.keys().copied().collect(),
        own_committed: own_commit.is_some(),
        own_bid: own_commit.and_then(|commit| commit.value),
        bids: ranking.as_ref().map(|ranking| {
            ranking
                .iter()
                .map(|entry| BidView {
                    player: entry.player,
                    bid: entry.amount,
                })
                .collect()
        }),
        ranking: ranking.map(|ranking| ranking.into_iter().map(|entry| entry.player).collect()),
        leader: game.market_leader,
    }
}

fn auction_view(game: &Game, viewer: Viewer, own: Option<PlayerId>) -> AuctionView {
    let entries = &game.auction.entries;
    AuctionView {
        committed: entries
            .iter()
            .filter(|(_, entry)| entry.committed)
            .map(|(id, _)| *id)
            .collect(),
        last_call: game.auction.last_call,
        resolved: game.auction.resolved,
        final_committed: entries
            .iter()
            .filter(|(_, entry)| entry.final_committed)
            .map(|(id, _)| *id)
            .collect(),
        own: own.and_then(|id| entries.get(&id)).cloned(),
        bids: (viewer.is_gm() && game.auction.resolved).then(|| auction::ranked_bids(game)),
    }
}

fn acquire_view(game: &Game, viewer: Viewer, own: Option<PlayerId>) -> AcquireView {
    let entries = &game.acquire.entries;
    let complete = all_participants(game, |id| entries.contains_key(&id));
    let own_commit = own.and_then(|id| entries.get(&id));
    AcquireView {
        committed: entries.keys().copied().collect(),
        own_committed: own_commit.is_some(),
        own_amount: own_commit.and_then(|commit| commit.value),
        amounts: (viewer.is_gm() && complete).then(|| {
            entries
                .iter()
                .map(|(player, commit)| BidView {
                    player: *player,
                    bid: commit.value,
                })
                .collect()
        }),
    }
}

fn crypto_view(game: &Game, viewer: Viewer, own: Option<PlayerId>) -> CryptoView {
    let crypto = &game.crypto;
    CryptoView {
        committed: crypto.entries.keys().copied().collect(),
        resolved: crypto.resolved,
        own: own.and_then(|id| crypto.entries.get(&id)).cloned(),
        results: (viewer.is_gm() && crypto.resolved).then(|| {
            crypto
                .entries
                .iter()
                .map(|(player, entry)| (*player, entry.usd_delta.unwrap_or(0)))
                .collect::<BTreeMap<_, _>>()
        }),
    }
}

fn settlement_view(game: &Game, catalog: &Catalog, own: Option<PlayerId>) -> SettlementView {
    let settlement = &game.settlement;
    let in_settle = game.stage == Some(Stage::Settle);
    let entries = game
        .participants()
        .map(|player| {
            let entry = settlement.entries.get(&player.id);
            let mine = own == Some(player.id);
            SettlementEntryView {
                player: player.id,
                started: entry.is_some_and(|entry| entry.started),
                paid: entry.is_some_and(|entry| entry.paid),
                pending: entry
                    .filter(|_| mine)
                    .map(|entry| entry.pending.clone()),
                preview: (mine && in_settle && !settlement.finalized)
                    .then(|| audit::preview_unchecked(game, catalog, player.id)),
                result: entry
                    .filter(|_| settlement.finalized)
                    .and_then(|entry| entry.result.clone()),
            }
        })
        .collect();
    SettlementView {
        entries,
        finalized: settlement.finalized,
        closed: settlement.closed,
    }
}

/// Row for the lobby watcher list.
pub fn lobby_summary(game: &Game) -> LobbySummary {
    LobbySummary {
        code: game.code.clone(),
        status: game.status,
        gm: game.gm().map(|gm| gm.name.clone()).unwrap_or_default(),
        players: game.participant_count(),
        max_players: game.config.max_players,
    }
}
