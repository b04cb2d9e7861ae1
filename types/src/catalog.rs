//! Static card, market and trend definitions.
//!
//! A [`Catalog`] is loaded once per process and shared read-only by every session. It can be
//! deserialized from JSON ([`Catalog::from_json`]) or taken from the built-in
//! [`Catalog::standard`] deck.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid catalog: {0}")]
    Invalid(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Coin {
    Btc,
    Eth,
    Sol,
    Doge,
}

impl Coin {
    pub const ALL: [Coin; 4] = [Coin::Btc, Coin::Eth, Coin::Sol, Coin::Doge];

    pub fn symbol(&self) -> &'static str {
        match self {
            Coin::Btc => "BTC",
            Coin::Eth => "ETH",
            Coin::Sol => "SOL",
            Coin::Doge => "DOGE",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Continent {
    Americas,
    Europe,
    Asia,
    Africa,
    Oceania,
}

impl Continent {
    pub const ALL: [Continent; 5] = [
        Continent::Americas,
        Continent::Europe,
        Continent::Asia,
        Continent::Africa,
        Continent::Oceania,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Continent::Americas => "AMERICAS",
            Continent::Europe => "EUROPE",
            Continent::Asia => "ASIA",
            Continent::Africa => "AFRICA",
            Continent::Oceania => "OCEANIA",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sector {
    Tech,
    Energy,
    Agriculture,
    Finance,
    Retail,
}

impl Sector {
    pub const ALL: [Sector; 5] = [
        Sector::Tech,
        Sector::Energy,
        Sector::Agriculture,
        Sector::Finance,
        Sector::Retail,
    ];
}

/// Consumable power granted by an expert card.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Ability {
    /// Neutralizes one trend for its holder, or shields against one audit attack.
    Lawyer,
    /// Auction last call, audit steal and audit sabotage.
    Lobbyist,
    /// Reveals a future year of the trend timeline.
    Analyst,
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Ability::Lawyer => "lawyer",
            Ability::Lobbyist => "lobbyist",
            Ability::Analyst => "analyst",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub String);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CardId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketId(pub String);

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MarketId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardKind {
    Investment,
    MiningFarm,
    Expert,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentCard {
    /// Production in card units; multiply by [`crate::UNIT_SCALE`] for USD.
    pub usd_production: u64,
    pub continent: Continent,
    pub sector: Sector,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiningFarmCard {
    pub coin: Coin,
    /// Coins produced per year.
    pub production: u64,
    /// USD paid per year.
    pub electricity_cost: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpertCard {
    pub ability: Ability,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardBody {
    Investment(InvestmentCard),
    MiningFarm(MiningFarmCard),
    Expert(ExpertCard),
}

impl CardBody {
    pub fn kind(&self) -> CardKind {
        match self {
            CardBody::Investment(_) => CardKind::Investment,
            CardBody::MiningFarm(_) => CardKind::MiningFarm,
            CardBody::Expert(_) => CardKind::Expert,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub name: String,
    #[serde(flatten)]
    pub body: CardBody,
}

impl Card {
    pub fn kind(&self) -> CardKind {
        self.body.kind()
    }

    pub fn as_investment(&self) -> Option<&InvestmentCard> {
        match &self.body {
            CardBody::Investment(card) => Some(card),
            _ => None,
        }
    }

    pub fn as_farm(&self) -> Option<&MiningFarmCard> {
        match &self.body {
            CardBody::MiningFarm(card) => Some(card),
            _ => None,
        }
    }

    pub fn as_expert(&self) -> Option<&ExpertCard> {
        match &self.body {
            CardBody::Expert(card) => Some(card),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    pub name: String,
    pub continent: Continent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendKind {
    Global,
    Regional,
    Crypto,
}

/// Step of the year during which a lawyer may be spent on a trend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LawyerWindow {
    MlBid,
    Move,
    Settle,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LawyerRule {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<LawyerWindow>,
}

impl LawyerRule {
    pub fn forbidden() -> Self {
        Self {
            allowed: false,
            phase: None,
        }
    }

    pub fn during(window: LawyerWindow) -> Self {
        Self {
            allowed: true,
            phase: Some(window),
        }
    }

    /// The window in which the trend can be blocked, if it can be blocked at all.
    pub fn window(&self) -> Option<LawyerWindow> {
        if self.allowed {
            self.phase
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendEffect {
    /// Halves wallet balances at year start (one coin, or every coin when `coin` is absent).
    WalletHalving {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        coin: Option<Coin>,
    },
    /// Doubles wallet balances of a coin at year start. Never blockable.
    WalletFork { coin: Coin },
    /// Shifts a coin's exchange rate by `percent` at year start.
    ExchangeRate { coin: Coin, percent: i32 },
    /// Traditional base production is zeroed.
    EconomicCrisis,
    /// Traditional base production is doubled. Never blockable.
    Boom,
    /// Continent and sector bonuses are zeroed.
    Antimonopoly,
    /// Mining production doubles (one coin, or every coin when `coin` is absent).
    LowerDifficulty {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        coin: Option<Coin>,
    },
    /// Electricity costs double.
    ExpensiveElectricity,
    /// Investment cards located on the trend's continent produce nothing.
    RegionalFreeze,
    /// Informational only.
    Notice { text: String },
}

impl TrendEffect {
    /// Effects applied to wallets or prices the instant their year becomes current.
    pub fn fires_at_year_start(&self) -> bool {
        matches!(
            self,
            TrendEffect::WalletHalving { .. }
                | TrendEffect::WalletFork { .. }
                | TrendEffect::ExchangeRate { .. }
                | TrendEffect::Notice { .. }
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendDef {
    pub key: String,
    pub name: String,
    pub kind: TrendKind,
    pub effects: Vec<TrendEffect>,
    pub lawyer: LawyerRule,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPools {
    pub global: Vec<TrendDef>,
    pub crypto: Vec<TrendDef>,
    pub regional: Vec<TrendDef>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub cards: Vec<Card>,
    pub markets: Vec<Market>,
    pub trends: TrendPools,
    /// Starting USD price of one unit of each coin.
    pub exchange_rates: BTreeMap<Coin, u64>,
}

impl Catalog {
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_json::from_str(raw)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn card(&self, id: &CardId) -> Option<&Card> {
        self.cards.iter().find(|card| &card.id == id)
    }

    pub fn market(&self, id: &MarketId) -> Option<&Market> {
        self.markets.iter().find(|market| &market.id == id)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        let invalid = |msg: String| Err(CatalogError::Invalid(msg));

        let mut ids = BTreeSet::new();
        for card in &self.cards {
            if !ids.insert(&card.id) {
                return invalid(format!("duplicate card id {}", card.id));
            }
            let in_range = match &card.body {
                CardBody::Investment(investment) => {
                    investment.usd_production <= crate::MAX_CARD_UNITS / crate::UNIT_SCALE.unsigned_abs()
                }
                CardBody::MiningFarm(farm) => {
                    farm.production <= crate::MAX_CARD_UNITS && farm.electricity_cost <= crate::MAX_CARD_UNITS
                }
                CardBody::Expert(_) => true,
            };
            if !in_range {
                return invalid(format!("card {} is out of range", card.id));
            }
        }
        let mut markets = BTreeSet::new();
        for market in &self.markets {
            if !markets.insert(&market.id) {
                return invalid(format!("duplicate market id {}", market.id));
            }
        }
        for coin in Coin::ALL {
            match self.exchange_rates.get(&coin) {
                Some(rate) if *rate > 0 && *rate <= crate::MAX_CARD_UNITS => {}
                _ => return invalid(format!("missing or out-of-range exchange rate for {}", coin.symbol())),
            }
        }
        if self.trends.global.len() < crate::GLOBAL_TRENDS_PER_YEAR {
            return invalid(format!(
                "global pool needs at least {} trends",
                crate::GLOBAL_TRENDS_PER_YEAR
            ));
        }
        if self.trends.crypto.is_empty() || self.trends.regional.is_empty() {
            return invalid("crypto and regional pools must not be empty".to_string());
        }

        let pools = [
            (TrendKind::Global, &self.trends.global),
            (TrendKind::Crypto, &self.trends.crypto),
            (TrendKind::Regional, &self.trends.regional),
        ];
        for (kind, pool) in pools {
            let mut keys = BTreeSet::new();
            for trend in pool.iter() {
                if trend.kind != kind {
                    return invalid(format!("trend {} is in the wrong pool", trend.key));
                }
                if !keys.insert(&trend.key) {
                    return invalid(format!("duplicate trend key {}", trend.key));
                }
                if trend.lawyer.allowed && trend.lawyer.phase.is_none() {
                    return invalid(format!("trend {} allows a lawyer without a phase", trend.key));
                }
                let regional_only = trend
                    .effects
                    .iter()
                    .any(|effect| matches!(effect, TrendEffect::RegionalFreeze));
                if regional_only && kind != TrendKind::Regional {
                    return invalid(format!("trend {} freezes a region outside the regional pool", trend.key));
                }
            }
        }
        Ok(())
    }

    /// The built-in deck used when no catalog file is configured.
    pub fn standard() -> Self {
        let mut cards = Vec::new();

        for i in 0..20usize {
            let continent = Continent::ALL[i % Continent::ALL.len()];
            let sector = Sector::ALL[(i / 2) % Sector::ALL.len()];
            cards.push(Card {
                id: CardId(format!("INV-{:02}", i + 1)),
                name: format!("{:?} {:?} #{}", continent, sector, i + 1),
                body: CardBody::Investment(InvestmentCard {
                    usd_production: 2 + ((i as u64 * 3) % 7),
                    continent,
                    sector,
                }),
            });
        }
        for i in 0..8usize {
            let coin = Coin::ALL[i % Coin::ALL.len()];
            cards.push(Card {
                id: CardId(format!("FARM-{:02}", i + 1)),
                name: format!("{} farm #{}", coin.symbol(), i + 1),
                body: CardBody::MiningFarm(MiningFarmCard {
                    coin,
                    production: 1 + (i as u64 % 4),
                    electricity_cost: 5_000 * (1 + (i as u64 % 3)),
                }),
            });
        }
        let experts = [
            (Ability::Lawyer, "LAW", 4),
            (Ability::Lobbyist, "LOB", 4),
            (Ability::Analyst, "ANA", 3),
        ];
        for (ability, prefix, count) in experts {
            for i in 0..count {
                cards.push(Card {
                    id: CardId(format!("{prefix}-{:02}", i + 1)),
                    name: format!("{ability} #{}", i + 1),
                    body: CardBody::Expert(ExpertCard { ability }),
                });
            }
        }

        let markets = [
            ("NYC", "New York", Continent::Americas),
            ("SAO", "Sao Paulo", Continent::Americas),
            ("LDN", "London", Continent::Europe),
            ("TKY", "Tokyo", Continent::Asia),
            ("LOS", "Lagos", Continent::Africa),
            ("SYD", "Sydney", Continent::Oceania),
        ]
        .into_iter()
        .map(|(id, name, continent)| Market {
            id: MarketId::from(id),
            name: name.to_string(),
            continent,
        })
        .collect();

        let trend = |key: &str, name: &str, kind, effects, lawyer| TrendDef {
            key: key.to_string(),
            name: name.to_string(),
            kind,
            effects,
            lawyer,
        };
        let global = vec![
            trend(
                "economic_crisis",
                "Economic crisis",
                TrendKind::Global,
                vec![TrendEffect::EconomicCrisis],
                LawyerRule::during(LawyerWindow::Settle),
            ),
            trend("boom", "Boom", TrendKind::Global, vec![TrendEffect::Boom], LawyerRule::forbidden()),
            trend(
                "antimonopoly",
                "Antimonopoly law",
                TrendKind::Global,
                vec![TrendEffect::Antimonopoly],
                LawyerRule::during(LawyerWindow::Settle),
            ),
            trend(
                "expensive_electricity",
                "Expensive electricity",
                TrendKind::Global,
                vec![TrendEffect::ExpensiveElectricity],
                LawyerRule::during(LawyerWindow::Settle),
            ),
            trend(
                "lower_difficulty",
                "Lower mining difficulty",
                TrendKind::Global,
                vec![TrendEffect::LowerDifficulty { coin: None }],
                LawyerRule::forbidden(),
            ),
            trend(
                "btc_halving",
                "Bitcoin halving",
                TrendKind::Global,
                vec![TrendEffect::WalletHalving { coin: Some(Coin::Btc) }],
                LawyerRule::during(LawyerWindow::Settle),
            ),
            trend(
                "exchange_hack",
                "Exchange hack",
                TrendKind::Global,
                vec![TrendEffect::WalletHalving { coin: None }],
                LawyerRule::during(LawyerWindow::Move),
            ),
            trend(
                "eth_fork",
                "Ethereum fork",
                TrendKind::Global,
                vec![TrendEffect::WalletFork { coin: Coin::Eth }],
                LawyerRule::forbidden(),
            ),
            trend(
                "trade_summit",
                "Trade summit",
                TrendKind::Global,
                vec![TrendEffect::Notice {
                    text: "World leaders meet; markets hold their breath".to_string(),
                }],
                LawyerRule::forbidden(),
            ),
        ];
        let crypto = vec![
            trend(
                "btc_rally",
                "Bitcoin rally",
                TrendKind::Crypto,
                vec![TrendEffect::ExchangeRate { coin: Coin::Btc, percent: 50 }],
                LawyerRule::forbidden(),
            ),
            trend(
                "eth_slump",
                "Ether slump",
                TrendKind::Crypto,
                vec![TrendEffect::ExchangeRate { coin: Coin::Eth, percent: -30 }],
                LawyerRule::forbidden(),
            ),
            trend(
                "sol_surge",
                "Solana surge",
                TrendKind::Crypto,
                vec![TrendEffect::ExchangeRate { coin: Coin::Sol, percent: 100 }],
                LawyerRule::forbidden(),
            ),
            trend(
                "doge_mania",
                "Doge mania",
                TrendKind::Crypto,
                vec![TrendEffect::ExchangeRate { coin: Coin::Doge, percent: 200 }],
                LawyerRule::forbidden(),
            ),
            trend(
                "stable_market",
                "Stable market",
                TrendKind::Crypto,
                vec![TrendEffect::Notice {
                    text: "Prices stay flat this year".to_string(),
                }],
                LawyerRule::forbidden(),
            ),
        ];
        let regional = vec![
            trend(
                "regional_freeze",
                "Regional sanctions",
                TrendKind::Regional,
                vec![TrendEffect::RegionalFreeze],
                LawyerRule::during(LawyerWindow::MlBid),
            ),
            trend(
                "regional_strike",
                "General strike",
                TrendKind::Regional,
                vec![TrendEffect::RegionalFreeze],
                LawyerRule::during(LawyerWindow::Move),
            ),
            trend(
                "regional_expo",
                "Regional expo",
                TrendKind::Regional,
                vec![TrendEffect::Notice {
                    text: "Investors tour the region".to_string(),
                }],
                LawyerRule::forbidden(),
            ),
            trend(
                "regional_calm",
                "Quiet year",
                TrendKind::Regional,
                vec![],
                LawyerRule::forbidden(),
            ),
        ];

        let exchange_rates = BTreeMap::from([
            (Coin::Btc, 40_000),
            (Coin::Eth, 2_500),
            (Coin::Sol, 100),
            (Coin::Doge, 1),
        ]);

        Self {
            cards,
            markets,
            trends: TrendPools {
                global,
                crypto,
                regional,
            },
            exchange_rates,
        }
    }
}
