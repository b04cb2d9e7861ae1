//! Bid ordering shared by the ML ranking and the auction bid list.

use std::cmp::Ordering;
use tycoon_types::{PlayerId, TieBreak};

/// One committed bid as seen by the ranking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RankedEntry {
    pub player: PlayerId,
    /// `None` is a pass.
    pub amount: Option<u64>,
    /// Arrival order of the commit.
    pub seq: u64,
    pub seat: u8,
}

/// Sorts bids descending with passes last. Equal amounts are ordered by `policy`, and
/// anything still equal falls back to seat order.
pub fn rank(
    mut entries: Vec<RankedEntry>,
    policy: TieBreak,
    incumbent: Option<PlayerId>,
) -> Vec<RankedEntry> {
    entries.sort_by(|a, b| compare(a, b, policy, incumbent));
    entries
}

fn compare(
    a: &RankedEntry,
    b: &RankedEntry,
    policy: TieBreak,
    incumbent: Option<PlayerId>,
) -> Ordering {
    // `None < Some(_)`, so reversing puts the highest bid first and passes last.
    let by_amount = b.amount.cmp(&a.amount);
    if by_amount != Ordering::Equal {
        return by_amount;
    }
    let by_policy = match policy {
        TieBreak::EarliestCommit => a.seq.cmp(&b.seq),
        TieBreak::SeatOrder => a.seat.cmp(&b.seat),
        TieBreak::MarketLeader => {
            let a_leads = Some(a.player) == incumbent;
            let b_leads = Some(b.player) == incumbent;
            b_leads.cmp(&a_leads).then(a.seq.cmp(&b.seq))
        }
    };
    by_policy
        .then(a.seat.cmp(&b.seat))
        .then(a.player.cmp(&b.player))
}
