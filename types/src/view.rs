//! Per-viewer projections pushed to clients.
//!
//! Nothing in here carries another player's secrets: sealed bids, pending audit choices,
//! reconnect tokens and unrevealed trends are filtered out by the projector before these
//! structs are built.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    Ability, AttackKind, AuctionEntry, Availability, BizStep, CardId, Coin, CryptoEntry,
    GameCode, GameConfig, GameStatus, MarketId, Notice, PendingActions, Phase, PlayerId,
    Protection, Role, SettlementResult, TokenCount, TrendInstance, Wallet, YearTrends,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub role: Role,
    pub seat: u8,
    pub connected: bool,
    pub market: Option<MarketId>,
    pub wallet: Wallet,
    pub investments: Vec<CardId>,
    pub farms: Vec<CardId>,
    pub experts: Vec<CardId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidView {
    pub player: PlayerId,
    pub bid: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MlBidView {
    pub committed: Vec<PlayerId>,
    pub own_committed: bool,
    pub own_bid: Option<u64>,
    /// Revealed once every player has committed.
    pub bids: Option<Vec<BidView>>,
    pub ranking: Option<Vec<PlayerId>>,
    pub leader: Option<PlayerId>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveView {
    pub locks: BTreeMap<MarketId, PlayerId>,
    pub committed: Vec<PlayerId>,
}

/// One line of the GM's resolved auction list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedBid {
    pub rank: usize,
    pub player: PlayerId,
    pub bid: Option<u64>,
    pub used_lobbyist: bool,
    pub revised: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionView {
    pub committed: Vec<PlayerId>,
    pub last_call: bool,
    pub resolved: bool,
    pub final_committed: Vec<PlayerId>,
    pub own: Option<AuctionEntry>,
    /// Only for the GM, once resolved.
    pub bids: Option<Vec<RankedBid>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcquireView {
    pub committed: Vec<PlayerId>,
    pub own_committed: bool,
    pub own_amount: Option<u64>,
    pub amounts: Option<Vec<BidView>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoView {
    pub committed: Vec<PlayerId>,
    pub resolved: bool,
    pub own: Option<CryptoEntry>,
    /// USD cash flow per player, once resolved.
    pub results: Option<BTreeMap<PlayerId, i64>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementEntryView {
    pub player: PlayerId,
    pub started: bool,
    pub paid: bool,
    /// Owner only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingActions>,
    /// Owner only, until finalized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<SettlementResult>,
    /// Everyone, once finalized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<SettlementResult>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementView {
    pub entries: Vec<SettlementEntryView>,
    pub finalized: bool,
    pub closed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub code: GameCode,
    pub status: GameStatus,
    pub config: GameConfig,
    pub year: u8,
    pub phase: Option<Phase>,
    pub step: Option<BizStep>,
    pub viewer: Option<PlayerId>,
    pub players: Vec<PlayerView>,
    pub trends: Vec<TrendInstance>,
    pub revealed: BTreeMap<u8, YearTrends>,
    pub exchange_rates: BTreeMap<Coin, u64>,
    pub availability: Availability,
    pub abilities: BTreeMap<Ability, TokenCount>,
    pub protections: Vec<Protection>,
    pub notices: Vec<Notice>,
    pub ml_bid: MlBidView,
    pub moves: MoveView,
    pub auction: AuctionView,
    pub acquire: AcquireView,
    pub crypto: CryptoView,
    pub settlement: SettlementView,
}

/// Row of the lobby watcher's list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbySummary {
    pub code: GameCode,
    pub status: GameStatus,
    pub gm: String,
    pub players: usize,
    pub max_players: u8,
}

/// Reply to `scan_card`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardInfo {
    pub card: crate::Card,
    pub available: bool,
    pub owner: Option<PlayerId>,
}

/// Audit attack as resolved, kept for tests and logs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedAttack {
    pub attacker: PlayerId,
    pub target: PlayerId,
    pub kind: AttackKind,
    pub amount: i64,
    pub blocked: bool,
}
