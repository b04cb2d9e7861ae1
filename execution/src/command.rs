//! In-game commands as they arrive from a connected client, and their dispatch.
//!
//! Session-level events (create, join, reconnect, watch) are handled by the store and the
//! gateway; everything a seated player or the GM can do inside a game is a [`Command`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tycoon_types::{
    AttackKind, CardId, CardInfo, Catalog, Coin, Game, GameError, LawyerChoice, LobbyAttack,
    MarketId, PlayerId, SettlementResult,
};

use crate::{audit, auction, cards, collector, lobby, stage_machine, trends};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum Command {
    StartGame,
    GmNext,
    GmBack,
    CommitMlBid {
        #[serde(default)]
        bid: Option<u64>,
    },
    PickMarket {
        #[serde(default)]
        market: Option<MarketId>,
    },
    CommitAuctionBid {
        #[serde(default)]
        bid: Option<u64>,
        #[serde(default, rename = "useLobbyist")]
        use_lobbyist: bool,
    },
    CommitAuctionFinalBid {
        #[serde(default, rename = "finalBid")]
        final_bid: Option<u64>,
    },
    CommitAcquire {
        #[serde(default)]
        amount: Option<u64>,
    },
    CommitCrypto {
        #[serde(default)]
        trades: BTreeMap<Coin, i64>,
    },
    ScanCard {
        #[serde(rename = "cardId")]
        card_id: CardId,
    },
    ClaimCard {
        #[serde(rename = "cardId")]
        card_id: CardId,
    },
    DropCard {
        #[serde(rename = "cardId")]
        card_id: CardId,
    },
    UseLawyerOnTrend {
        year: u8,
        #[serde(rename = "trendKey")]
        trend_key: String,
    },
    RevealTrends {
        year: u8,
    },
    AuditSetPendingLawyer {
        #[serde(default)]
        choice: Option<LawyerChoice>,
    },
    AuditAddPendingLobby {
        #[serde(rename = "type")]
        kind: AttackKind,
        target: PlayerId,
    },
    AuditRemovePendingLobby {
        index: usize,
    },
    AuditPreview,
    CommitSettlementReady,
    AuditPay,
}

/// Data returned alongside a successful acknowledgment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Done,
    Card(CardInfo),
    Preview(SettlementResult),
}

impl Command {
    /// Wire event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartGame => "start_game",
            Self::GmNext => "gm_next",
            Self::GmBack => "gm_back",
            Self::CommitMlBid { .. } => "commit_ml_bid",
            Self::PickMarket { .. } => "pick_market",
            Self::CommitAuctionBid { .. } => "commit_auction_bid",
            Self::CommitAuctionFinalBid { .. } => "commit_auction_final_bid",
            Self::CommitAcquire { .. } => "commit_acquire",
            Self::CommitCrypto { .. } => "commit_crypto",
            Self::ScanCard { .. } => "scan_card",
            Self::ClaimCard { .. } => "claim_card",
            Self::DropCard { .. } => "drop_card",
            Self::UseLawyerOnTrend { .. } => "use_lawyer_on_trend",
            Self::RevealTrends { .. } => "reveal_trends",
            Self::AuditSetPendingLawyer { .. } => "audit_set_pending_lawyer",
            Self::AuditAddPendingLobby { .. } => "audit_add_pending_lobby",
            Self::AuditRemovePendingLobby { .. } => "audit_remove_pending_lobby",
            Self::AuditPreview => "audit_preview",
            Self::CommitSettlementReady => "commit_settlement_ready",
            Self::AuditPay => "audit_pay",
        }
    }

    /// Read-only commands never change the game and are not broadcast.
    pub fn is_query(&self) -> bool {
        matches!(self, Self::ScanCard { .. } | Self::AuditPreview)
    }

    /// Whether a successful run may change what the lobby watchers see.
    pub fn touches_lobby(&self) -> bool {
        matches!(self, Self::StartGame | Self::GmNext | Self::GmBack)
    }
}

/// Runs `command` for `actor`. On error the game may be partially written; callers run
/// this against a scratch copy and only keep it on success.
pub fn apply(
    game: &mut Game,
    catalog: &Catalog,
    actor: PlayerId,
    command: Command,
) -> Result<Reply, GameError> {
    match command {
        Command::StartGame => lobby::start(game, catalog, actor)?,
        Command::GmNext => {
            stage_machine::advance(game, actor)?;
        }
        Command::GmBack => {
            stage_machine::rewind(game, actor)?;
        }
        Command::CommitMlBid { bid } => collector::commit_ml_bid(game, actor, bid)?,
        Command::PickMarket { market } => collector::pick_market(game, catalog, actor, market)?,
        Command::CommitAuctionBid { bid, use_lobbyist } => {
            auction::commit_auction_bid(game, actor, bid, use_lobbyist)?
        }
        Command::CommitAuctionFinalBid { final_bid } => {
            auction::commit_auction_final_bid(game, actor, final_bid)?
        }
        Command::CommitAcquire { amount } => collector::commit_acquire(game, actor, amount)?,
        Command::CommitCrypto { trades } => collector::commit_crypto(game, actor, trades)?,
        Command::ScanCard { card_id } => {
            return cards::scan_card(game, catalog, actor, &card_id).map(Reply::Card)
        }
        Command::ClaimCard { card_id } => cards::claim_card(game, catalog, actor, &card_id)?,
        Command::DropCard { card_id } => cards::drop_card(game, catalog, actor, &card_id)?,
        Command::UseLawyerOnTrend { year, trend_key } => {
            trends::use_lawyer_on_trend(game, actor, year, &trend_key)?
        }
        Command::RevealTrends { year } => trends::reveal_trends(game, actor, year)?,
        Command::AuditSetPendingLawyer { choice } => audit::set_pending_lawyer(game, actor, choice)?,
        Command::AuditAddPendingLobby { kind, target } => {
            audit::add_pending_lobby(game, actor, LobbyAttack { kind, target })?
        }
        Command::AuditRemovePendingLobby { index } => {
            audit::remove_pending_lobby(game, actor, index)?
        }
        Command::AuditPreview => return audit::preview(game, catalog, actor).map(Reply::Preview),
        Command::CommitSettlementReady => audit::start(game, catalog, actor)?,
        Command::AuditPay => audit::pay(game, actor)?,
    }
    Ok(Reply::Done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{started_game, GM, P1};
    use serde_json::json;
    use tycoon_types::{BizStep, Stage};

    fn parse(value: serde_json::Value) -> Command {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_wire_names_match_serde() {
        let commands = [
            Command::GmNext,
            Command::CommitMlBid { bid: Some(3) },
            Command::CommitAuctionBid {
                bid: None,
                use_lobbyist: true,
            },
            Command::AuditAddPendingLobby {
                kind: AttackKind::Steal,
                target: P1,
            },
            Command::AuditPreview,
        ];
        for command in commands {
            let value = serde_json::to_value(&command).unwrap();
            assert_eq!(value["event"], command.name());
        }
    }

    #[test]
    fn test_parse_client_payloads() {
        assert_eq!(
            parse(json!({"event": "commit_auction_bid", "payload": {"bid": 12, "useLobbyist": true}})),
            Command::CommitAuctionBid {
                bid: Some(12),
                use_lobbyist: true
            }
        );
        assert_eq!(
            parse(json!({"event": "commit_ml_bid", "payload": {"bid": null}})),
            Command::CommitMlBid { bid: None }
        );
        assert_eq!(
            parse(json!({"event": "audit_add_pending_lobby", "payload": {"type": "SABOTAGE", "target": 3}})),
            Command::AuditAddPendingLobby {
                kind: AttackKind::Sabotage,
                target: PlayerId(3)
            }
        );
        assert_eq!(
            parse(json!({"event": "audit_set_pending_lawyer", "payload": {"choice": {"type": "SHIELD"}}})),
            Command::AuditSetPendingLawyer {
                choice: Some(LawyerChoice::Shield)
            }
        );
        assert_eq!(parse(json!({"event": "gm_next"})), Command::GmNext);
        assert!(serde_json::from_value::<Command>(json!({"event": "commit_ml_bid", "payload": {"bid": -1}})).is_err());
        assert!(serde_json::from_value::<Command>(json!({"event": "launch_rockets"})).is_err());
    }

    #[test]
    fn test_apply_dispatches() {
        let (mut game, catalog) = started_game(1);
        assert_eq!(
            apply(&mut game, &catalog, P1, Command::GmNext).unwrap_err().code(),
            "FORBIDDEN"
        );
        apply(&mut game, &catalog, P1, Command::CommitMlBid { bid: Some(5) }).unwrap();
        apply(&mut game, &catalog, GM, Command::GmNext).unwrap();
        assert_eq!(game.stage, Some(Stage::Biz(BizStep::Move)));

        let reply = apply(
            &mut game,
            &catalog,
            P1,
            Command::ScanCard {
                card_id: CardId::from("INV-01"),
            },
        )
        .unwrap();
        assert!(matches!(reply, Reply::Card(info) if info.available));
        assert!(matches!(
            apply(&mut game, &catalog, P1, Command::AuditPreview).unwrap(),
            Reply::Preview(_)
        ));
    }

    #[test]
    fn test_query_classification() {
        assert!(Command::AuditPreview.is_query());
        assert!(!Command::AuditPay.is_query());
        assert!(Command::GmBack.touches_lobby());
        assert!(!Command::CommitAcquire { amount: None }.touches_lobby());
    }
}
