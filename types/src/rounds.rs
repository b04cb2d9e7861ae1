//! Per-step sub-state of a year.
//!
//! Every struct here is reset to its `Default` when its step is entered going forward.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Coin, MarketId, PlayerId};

/// A committed value together with its arrival order inside the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit<T> {
    pub value: T,
    pub seq: u64,
}

/// ML_BID: `None` means the player passed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MlBidState {
    pub bids: BTreeMap<PlayerId, Commit<Option<u64>>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MoveState {
    pub locks: BTreeMap<MarketId, PlayerId>,
    /// `None` means the player stays out of every market this year.
    pub picks: BTreeMap<PlayerId, Commit<Option<MarketId>>>,
}

impl MoveState {
    pub fn holder(&self, market: &MarketId) -> Option<PlayerId> {
        self.locks.get(market).copied()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionEntry {
    pub bid: Option<u64>,
    pub committed: bool,
    pub use_lobbyist: bool,
    pub final_bid: Option<u64>,
    pub final_committed: bool,
    #[serde(skip)]
    pub seq: u64,
}

impl AuctionEntry {
    /// The bid used for resolution: a present final bid supersedes the sealed one.
    pub fn effective_bid(&self) -> Option<u64> {
        match (self.final_committed, self.final_bid) {
            (true, Some(final_bid)) => Some(final_bid),
            _ => self.bid,
        }
    }

    pub fn revised(&self) -> bool {
        self.final_committed && self.final_bid.is_some()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuctionState {
    pub entries: BTreeMap<PlayerId, AuctionEntry>,
    /// Lobbyist last-call sub-window is open.
    pub last_call: bool,
    pub resolved: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AcquireState {
    pub entries: BTreeMap<PlayerId, Commit<Option<u64>>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoEntry {
    /// Positive quantities buy, negative quantities sell.
    pub trades: BTreeMap<Coin, i64>,
    /// USD cash flow once resolved (negative when the player spent cash).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usd_delta: Option<i64>,
    #[serde(skip)]
    pub seq: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CryptoState {
    pub entries: BTreeMap<PlayerId, CryptoEntry>,
    pub resolved: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LawyerChoice {
    /// Neutralize one of this year's trends for the holder.
    BlockTrend {
        #[serde(rename = "trendKey")]
        trend_key: String,
    },
    /// Block the single most damaging lobbyist attack aimed at the holder.
    Shield,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttackKind {
    Steal,
    Sabotage,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyAttack {
    #[serde(rename = "type")]
    pub kind: AttackKind,
    pub target: PlayerId,
}

/// Secret audit choices, editable until the player starts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingActions {
    pub lawyer: Option<LawyerChoice>,
    pub lobby: Vec<LobbyAttack>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "row", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakdownLine {
    Base { amount: i64 },
    RegionalBonus { amount: i64 },
    GlobalBonus { amount: i64 },
    Mining { amount: i64 },
    Electricity { amount: i64 },
    #[serde(rename_all = "camelCase")]
    TrendNote { trend_key: String, text: String },
    StealGain { from: PlayerId, amount: i64 },
    StealLoss { by: PlayerId, amount: i64 },
    SabotageLoss { by: PlayerId, amount: i64 },
    AttackBlocked { by: PlayerId, kind: AttackKind, amount: i64 },
}

impl BreakdownLine {
    /// Signed contribution of the row to the total.
    pub fn contribution(&self) -> i64 {
        match self {
            BreakdownLine::Base { amount }
            | BreakdownLine::RegionalBonus { amount }
            | BreakdownLine::GlobalBonus { amount }
            | BreakdownLine::Mining { amount }
            | BreakdownLine::StealGain { amount, .. } => *amount,
            BreakdownLine::Electricity { amount }
            | BreakdownLine::StealLoss { amount, .. }
            | BreakdownLine::SabotageLoss { amount, .. } => amount.saturating_neg(),
            BreakdownLine::TrendNote { .. } | BreakdownLine::AttackBlocked { .. } => 0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementResult {
    pub total: i64,
    pub breakdown: Vec<BreakdownLine>,
}

impl SettlementResult {
    pub fn push(&mut self, line: BreakdownLine) {
        self.total = self.total.saturating_add(line.contribution());
        self.breakdown.push(line);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SettlementEntry {
    pub pending: PendingActions,
    pub started: bool,
    pub paid: bool,
    pub result: Option<SettlementResult>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SettlementState {
    pub entries: BTreeMap<PlayerId, SettlementEntry>,
    /// The global computation has run for this year.
    pub finalized: bool,
    /// Every player has paid.
    pub closed: bool,
}
