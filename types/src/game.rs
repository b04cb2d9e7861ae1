use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

use crate::{
    Ability, AcquireState, AuctionState, BizStep, CardId, CardKind, Catalog, Coin, CryptoState,
    GameError, GameStatus, Inventory, MlBidState, MoveState, Notice, Phase, Player, PlayerId,
    Protection, Role, SettlementState, Stage, TrendTimeline, YearTrends, GM_SEAT, MAX_PLAYERS,
    MAX_YEARS, MIN_PLAYERS, MIN_YEARS,
};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameCode(pub String);

impl GameCode {
    /// Codes are matched case-insensitively.
    pub fn normalize(raw: &str) -> Self {
        Self(raw.trim().to_ascii_uppercase())
    }
}

impl fmt::Display for GameCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How equal bids are ordered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TieBreak {
    /// Whoever committed first ranks first.
    #[default]
    EarliestCommit,
    /// Lower seat ranks first.
    SeatOrder,
    /// The incumbent market leader ranks first, then earliest commit.
    MarketLeader,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    pub years_total: u8,
    pub max_players: u8,
    #[serde(default)]
    pub tie_break: TieBreak,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            years_total: MIN_YEARS,
            max_players: MAX_PLAYERS,
            tie_break: TieBreak::default(),
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), GameError> {
        if !(MIN_YEARS..=MAX_YEARS).contains(&self.years_total) {
            return Err(GameError::bad_input(format!(
                "yearsTotal must be between {MIN_YEARS} and {MAX_YEARS}"
            )));
        }
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.max_players) {
            return Err(GameError::bad_input(format!(
                "maxPlayers must be between {MIN_PLAYERS} and {MAX_PLAYERS}"
            )));
        }
        Ok(())
    }
}

/// Cards still in the shared pool, per kind.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub investment: BTreeSet<CardId>,
    pub mining_farm: BTreeSet<CardId>,
    pub expert: BTreeSet<CardId>,
}

impl Availability {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let mut availability = Self::default();
        for card in &catalog.cards {
            availability.pool_mut(card.kind()).insert(card.id.clone());
        }
        availability
    }

    pub fn pool(&self, kind: CardKind) -> &BTreeSet<CardId> {
        match kind {
            CardKind::Investment => &self.investment,
            CardKind::MiningFarm => &self.mining_farm,
            CardKind::Expert => &self.expert,
        }
    }

    pub fn pool_mut(&mut self, kind: CardKind) -> &mut BTreeSet<CardId> {
        match kind {
            CardKind::Investment => &mut self.investment,
            CardKind::MiningFarm => &mut self.mining_farm,
            CardKind::Expert => &mut self.expert,
        }
    }

    pub fn contains(&self, kind: CardKind, id: &CardId) -> bool {
        self.pool(kind).contains(id)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameInvariantError {
    #[error("status {status:?} does not match stage {stage:?}")]
    StageMismatch {
        status: GameStatus,
        stage: Option<Stage>,
    },
    #[error("year {year} outside 1..={total}")]
    YearOutOfRange { year: u8, total: u8 },
    #[error("market {market} lock disagrees with player assignments")]
    MarketLockMismatch { market: String },
    #[error("card {card} is owned more than once or also in the pool")]
    CardDuplicated { card: String },
    #[error("expert {card} token disagrees with the used-up experts")]
    ExpertSpentMismatch { card: String },
}

/// The whole authoritative state of one session.
#[derive(Clone, Debug)]
pub struct Game {
    pub code: GameCode,
    pub status: GameStatus,
    pub config: GameConfig,
    /// 1-based once started, 0 in the lobby.
    pub year: u8,
    pub stage: Option<Stage>,
    pub players: Vec<Player>,
    pub seed: u64,
    pub timeline: TrendTimeline,
    pub inventories: BTreeMap<PlayerId, Inventory>,
    pub availability: Availability,
    pub exchange_rates: BTreeMap<Coin, u64>,
    pub protections: BTreeSet<Protection>,
    /// Future years each player has revealed with an analyst.
    pub reveals: BTreeMap<PlayerId, BTreeSet<u8>>,
    pub notices: Vec<Notice>,
    /// Leader of the previous year's ML bid.
    pub incumbent_leader: Option<PlayerId>,
    /// Leader of this year's ML bid, fixed when ML_BID is left.
    pub market_leader: Option<PlayerId>,
    pub ml_bid: MlBidState,
    pub moves: MoveState,
    pub auction: AuctionState,
    pub acquire: AcquireState,
    pub crypto: CryptoState,
    pub settlement: SettlementState,
    /// Expert cards whose one-shot power has been used, wherever the card now is.
    pub spent_experts: BTreeSet<CardId>,
    /// The game as it stood in the previous SETTLE, kept until the next year starts so the
    /// opening step can be rewound.
    pub previous_year: Option<Box<Game>>,
    next_seq: u64,
}

impl Game {
    pub fn new(
        code: GameCode,
        config: GameConfig,
        gm_name: String,
        gm_token: String,
        catalog: &Catalog,
    ) -> Self {
        let gm = Player::new(PlayerId(1), gm_name, Role::Gm, GM_SEAT, gm_token);
        Self {
            code,
            status: GameStatus::Lobby,
            config,
            year: 0,
            stage: None,
            players: vec![gm],
            seed: 0,
            timeline: TrendTimeline::default(),
            inventories: BTreeMap::new(),
            availability: Availability::from_catalog(catalog),
            exchange_rates: catalog.exchange_rates.clone(),
            protections: BTreeSet::new(),
            reveals: BTreeMap::new(),
            notices: Vec::new(),
            incumbent_leader: None,
            market_leader: None,
            ml_bid: MlBidState::default(),
            moves: MoveState::default(),
            auction: AuctionState::default(),
            acquire: AcquireState::default(),
            crypto: CryptoState::default(),
            settlement: SettlementState::default(),
            spent_experts: BTreeSet::new(),
            previous_year: None,
            next_seq: 0,
        }
    }

    pub fn phase(&self) -> Option<Phase> {
        self.stage.map(|stage| stage.phase())
    }

    pub fn step(&self) -> Option<BizStep> {
        self.stage.and_then(|stage| stage.step())
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|player| player.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|player| player.id == id)
    }

    pub fn gm(&self) -> Option<&Player> {
        self.players.iter().find(|player| player.is_gm())
    }

    /// Players taking part in the economy (everyone but the GM), in seat order.
    pub fn participants(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|player| !player.is_gm())
    }

    pub fn participant_ids(&self) -> Vec<PlayerId> {
        self.participants().map(|player| player.id).collect()
    }

    pub fn participant_count(&self) -> usize {
        self.participants().count()
    }

    pub fn seat_of(&self, id: PlayerId) -> u8 {
        self.player(id).map(|player| player.seat).unwrap_or(u8::MAX)
    }

    pub fn inventory(&self, id: PlayerId) -> Option<&Inventory> {
        self.inventories.get(&id)
    }

    pub fn current_trends(&self) -> Option<&YearTrends> {
        self.timeline.year(self.year)
    }

    pub fn is_protected(&self, player: PlayerId, year: u8, trend_key: &str) -> bool {
        self.protections.contains(&Protection {
            player,
            year,
            trend_key: trend_key.to_string(),
        })
    }

    /// Uses up `n` of the player's expert tokens at once, or none if fewer are available.
    pub fn spend_experts(&mut self, player: PlayerId, ability: Ability, n: u32) -> bool {
        let inventory = self.inventories.entry(player).or_default();
        let Some(used) = inventory.abilities.consume(ability, n) else {
            return false;
        };
        self.spent_experts.extend(used);
        true
    }

    /// Arrival order counter for commits.
    pub fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    pub fn is_final_year(&self) -> bool {
        self.year >= self.config.years_total
    }

    pub fn validate_invariants(&self) -> Result<(), GameInvariantError> {
        let stage_ok = match self.status {
            GameStatus::InProgress => self.stage.is_some(),
            GameStatus::Lobby | GameStatus::GameOver => self.stage.is_none(),
        };
        if !stage_ok {
            return Err(GameInvariantError::StageMismatch {
                status: self.status,
                stage: self.stage,
            });
        }
        if self.status == GameStatus::InProgress
            && (self.year == 0 || self.year > self.config.years_total)
        {
            return Err(GameInvariantError::YearOutOfRange {
                year: self.year,
                total: self.config.years_total,
            });
        }

        for (market, holder) in &self.moves.locks {
            let assigned = self
                .player(*holder)
                .map(|player| player.market.as_ref() == Some(market))
                .unwrap_or(false);
            let others = self
                .players
                .iter()
                .filter(|player| player.market.as_ref() == Some(market))
                .count();
            if !assigned || others != 1 {
                return Err(GameInvariantError::MarketLockMismatch {
                    market: market.to_string(),
                });
            }
        }

        let mut seen = BTreeSet::new();
        for inventory in self.inventories.values() {
            for id in inventory.card_ids() {
                let pooled = self.availability.investment.contains(id)
                    || self.availability.mining_farm.contains(id)
                    || self.availability.expert.contains(id);
                if !seen.insert(id) || pooled {
                    return Err(GameInvariantError::CardDuplicated {
                        card: id.to_string(),
                    });
                }
            }
            for (id, token) in inventory.abilities.cards() {
                if token.spent != self.spent_experts.contains(id) {
                    return Err(GameInvariantError::ExpertSpentMismatch {
                        card: id.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}
