use serde::{Deserialize, Serialize};
use std::fmt;

use crate::LawyerWindow;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Lobby,
    InProgress,
    GameOver,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Biz,
    Crypto,
    Settle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BizStep {
    MlBid,
    Move,
    AuctionEnvelope,
    Acquire,
}

/// A node of the yearly transition graph.
///
/// Carrying the BIZ step inside the variant makes "step is set iff phase is BIZ" hold by
/// construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Biz(BizStep),
    Crypto,
    Settle,
}

impl Stage {
    /// First node of every year.
    pub const OPENING: Stage = Stage::Biz(BizStep::MlBid);

    pub fn phase(&self) -> Phase {
        match self {
            Stage::Biz(_) => Phase::Biz,
            Stage::Crypto => Phase::Crypto,
            Stage::Settle => Phase::Settle,
        }
    }

    pub fn step(&self) -> Option<BizStep> {
        match self {
            Stage::Biz(step) => Some(*step),
            _ => None,
        }
    }

    /// The lawyer window this node corresponds to, if any.
    pub fn lawyer_window(&self) -> Option<LawyerWindow> {
        match self {
            Stage::Biz(BizStep::MlBid) => Some(LawyerWindow::MlBid),
            Stage::Biz(BizStep::Move) => Some(LawyerWindow::Move),
            Stage::Settle => Some(LawyerWindow::Settle),
            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Biz(BizStep::MlBid) => f.write_str("BIZ.ML_BID"),
            Stage::Biz(BizStep::Move) => f.write_str("BIZ.MOVE"),
            Stage::Biz(BizStep::AuctionEnvelope) => f.write_str("BIZ.AUCTION_ENVELOPE"),
            Stage::Biz(BizStep::Acquire) => f.write_str("BIZ.ACQUIRE"),
            Stage::Crypto => f.write_str("CRYPTO"),
            Stage::Settle => f.write_str("SETTLE"),
        }
    }
}
