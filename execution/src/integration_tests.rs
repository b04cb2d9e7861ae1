//! End-to-end sessions driven through the store, the way the gateway drives them.

use std::sync::Arc;
use tycoon_types::{
    BizStep, BreakdownLine, CardBody, CardId, Catalog, GameCode, GameConfig, GameStatus,
    MarketId, PlayerId, Stage,
};

use crate::command::{Command, Reply};
use crate::mocks::quiet_catalog;
use crate::stage_machine::next_stage;
use crate::store::{Joined, SessionStore};

/// Two investments sharing a sector on different continents, producing 3 and 5.
fn sector_pair_catalog() -> Catalog {
    let mut catalog = quiet_catalog();
    for card in &mut catalog.cards {
        if let CardBody::Investment(investment) = &mut card.body {
            match card.id.0.as_str() {
                "INV-01" => investment.usd_production = 3,
                "INV-02" => investment.usd_production = 5,
                _ => {}
            }
        }
    }
    catalog
}

struct Table {
    store: SessionStore,
    gm: Joined,
    ada: Joined,
    bob: Joined,
}

impl Table {
    fn new(catalog: Catalog) -> Self {
        let store = SessionStore::new(Arc::new(catalog), Some(1));
        let gm = store.create_game("Host", GameConfig::default()).unwrap();
        let ada = store.join_game(&gm.code, "Ada").unwrap();
        let bob = store.join_game(&gm.code, "Bob").unwrap();
        Self { store, gm, ada, bob }
    }

    fn code(&self) -> &GameCode {
        &self.gm.code
    }

    fn run(&self, actor: PlayerId, command: Command) -> Result<Reply, String> {
        self.store
            .execute(self.code(), actor, command)
            .map_err(|err| err.code().to_string())
    }

    fn gm_next(&self) {
        self.run(self.gm.player_id, Command::GmNext).unwrap();
    }

    fn stage(&self) -> Option<Stage> {
        let view = self.store.view(self.code(), None).unwrap();
        match (view.phase, view.step) {
            (None, _) => None,
            (Some(_), Some(step)) => Some(Stage::Biz(step)),
            (Some(phase), None) => [Stage::Crypto, Stage::Settle]
                .into_iter()
                .find(|stage| stage.phase() == phase),
        }
    }

    fn claim(&self, player: PlayerId, card: &str) {
        self.run(
            player,
            Command::ClaimCard {
                card_id: CardId::from(card),
            },
        )
        .unwrap();
    }
}

#[test]
fn test_full_year_through_the_store() {
    let table = Table::new(sector_pair_catalog());
    let (gm, ada, bob) = (table.gm.player_id, table.ada.player_id, table.bob.player_id);

    table.run(gm, Command::StartGame).unwrap();
    assert_eq!(table.stage(), Some(Stage::OPENING));

    // ML bid: re-committing overwrites.
    table.run(ada, Command::CommitMlBid { bid: Some(5) }).unwrap();
    table.run(bob, Command::CommitMlBid { bid: Some(10) }).unwrap();
    table.run(ada, Command::CommitMlBid { bid: Some(20) }).unwrap();
    let view = table.store.view(table.code(), Some(bob)).unwrap();
    assert_eq!(view.ml_bid.ranking, Some(vec![ada, bob]));
    table.gm_next();
    assert_eq!(table.store.view(table.code(), None).unwrap().ml_bid.leader, Some(ada));

    // Move: a held market is locked for everyone else.
    let london = MarketId::from("LDN");
    table
        .run(ada, Command::PickMarket { market: Some(london.clone()) })
        .unwrap();
    assert_eq!(
        table.run(bob, Command::PickMarket { market: Some(london) }),
        Err("LOCKED".to_string())
    );
    table
        .run(bob, Command::PickMarket { market: Some(MarketId::from("TKY")) })
        .unwrap();
    table.gm_next();

    // Auction with a lobbyist last call.
    table.claim(ada, "LOB-01");
    table
        .run(ada, Command::CommitAuctionBid { bid: Some(50), use_lobbyist: true })
        .unwrap();
    table
        .run(bob, Command::CommitAuctionBid { bid: Some(60), use_lobbyist: false })
        .unwrap();
    assert!(table.store.view(table.code(), Some(ada)).unwrap().auction.last_call);
    assert_eq!(
        table.run(bob, Command::CommitAuctionFinalBid { final_bid: Some(99) }),
        Err("FORBIDDEN".to_string())
    );
    table
        .run(ada, Command::CommitAuctionFinalBid { final_bid: Some(70) })
        .unwrap();
    let gm_view = table.store.view(table.code(), Some(gm)).unwrap();
    let bids = gm_view.auction.bids.unwrap();
    assert_eq!(bids[0].player, ada);
    assert_eq!(bids[0].bid, Some(70));
    assert!(table.store.view(table.code(), Some(bob)).unwrap().auction.bids.is_none());
    table.gm_next();

    table.run(ada, Command::CommitAcquire { amount: Some(3) }).unwrap();
    table.run(bob, Command::CommitAcquire { amount: None }).unwrap();
    table.gm_next();

    table.run(ada, Command::CommitCrypto { trades: Default::default() }).unwrap();
    table.run(bob, Command::CommitCrypto { trades: Default::default() }).unwrap();
    table.gm_next();
    assert_eq!(table.stage(), Some(Stage::Settle));

    // Settlement: 30000 + 50000 + a 10000 sector pair.
    table.claim(ada, "INV-01");
    table.claim(ada, "INV-02");
    let Reply::Preview(preview) = table.run(ada, Command::AuditPreview).unwrap() else {
        panic!("preview expected");
    };
    assert_eq!(preview.total, 90_000);
    assert_eq!(preview.breakdown[0], BreakdownLine::Base { amount: 80_000 });

    assert_eq!(table.run(ada, Command::AuditPay), Err("WAIT".to_string()));
    table.run(ada, Command::CommitSettlementReady).unwrap();
    assert_eq!(
        table.run(ada, Command::ClaimCard { card_id: CardId::from("INV-03") }),
        Err("BAD_STATE".to_string())
    );
    table.run(bob, Command::CommitSettlementReady).unwrap();

    let view = table.store.view(table.code(), Some(bob)).unwrap();
    assert!(view.settlement.finalized);
    let ada_result = view
        .settlement
        .entries
        .iter()
        .find(|entry| entry.player == ada)
        .and_then(|entry| entry.result.clone())
        .unwrap();
    assert_eq!(ada_result.total, 90_000);

    table.run(ada, Command::AuditPay).unwrap();
    assert_eq!(table.run(ada, Command::AuditPay), Err("ALREADY".to_string()));
    table.run(bob, Command::AuditPay).unwrap();
    assert!(table.store.view(table.code(), None).unwrap().settlement.closed);

    table.gm_next();
    let view = table.store.view(table.code(), None).unwrap();
    assert_eq!(view.year, 2);
    assert_eq!(view.step, Some(BizStep::MlBid));
    assert!(!view.settlement.finalized);
}

#[test]
fn test_game_runs_to_completion() {
    let table = Table::new(quiet_catalog());
    table.run(table.gm.player_id, Command::StartGame).unwrap();

    let steps_per_year = std::iter::successors(Some(Stage::OPENING), |stage| next_stage(*stage)).count();
    let years = usize::from(GameConfig::default().years_total);
    for _ in 0..steps_per_year * years {
        table.gm_next();
    }
    let view = table.store.view(table.code(), None).unwrap();
    assert_eq!(view.status, GameStatus::GameOver);
    assert_eq!(view.phase, None);
    assert_eq!(
        table.run(table.gm.player_id, Command::GmNext),
        Err("BAD_STATE".to_string())
    );
    assert_eq!(
        table.run(table.ada.player_id, Command::ClaimCard { card_id: CardId::from("INV-01") }),
        Err("BAD_STATE".to_string())
    );
}

#[test]
fn test_rewind_guard() {
    let table = Table::new(quiet_catalog());
    let (gm, ada) = (table.gm.player_id, table.ada.player_id);
    table.run(gm, Command::StartGame).unwrap();
    assert_eq!(table.run(gm, Command::GmBack), Err("BAD_STATE".to_string()));

    table.gm_next();
    table.run(gm, Command::GmBack).unwrap();
    assert_eq!(table.stage(), Some(Stage::OPENING));

    table.run(ada, Command::CommitMlBid { bid: None }).unwrap();
    table.gm_next();
    table
        .run(ada, Command::PickMarket { market: Some(MarketId::from("NYC")) })
        .unwrap();
    assert_eq!(table.run(gm, Command::GmBack), Err("GUARD_FAIL".to_string()));
}

#[test]
fn test_rewind_across_year_boundary() {
    let table = Table::new(quiet_catalog());
    let gm = table.gm.player_id;
    table.run(gm, Command::StartGame).unwrap();
    for _ in 0..6 {
        table.gm_next();
    }
    assert_eq!(table.store.view(table.code(), None).unwrap().year, 2);
    assert_eq!(table.stage(), Some(Stage::OPENING));

    table.run(gm, Command::GmBack).unwrap();
    assert_eq!(table.store.view(table.code(), None).unwrap().year, 1);
    assert_eq!(table.stage(), Some(Stage::Settle));
    table.run(gm, Command::GmBack).unwrap();
    assert_eq!(table.stage(), Some(Stage::Crypto));
}

#[test]
fn test_lobby_listing_tracks_sessions() {
    let table = Table::new(quiet_catalog());
    let lobby = table.store.lobby();
    assert_eq!(lobby.len(), 1);
    assert_eq!(lobby[0].status, GameStatus::Lobby);
    assert_eq!(lobby[0].players, 2);

    table.run(table.gm.player_id, Command::StartGame).unwrap();
    assert_eq!(table.store.lobby()[0].status, GameStatus::InProgress);
    assert_eq!(
        table.store.join_game(table.code(), "Late").unwrap_err().code(),
        "BAD_STATE"
    );
}
