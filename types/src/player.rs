use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::{Ability, Card, CardBody, CardId, Coin, MarketId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Gm,
    Player,
}

/// Coin balances in whole units.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wallet {
    coins: BTreeMap<Coin, u64>,
}

impl Wallet {
    pub fn balance(&self, coin: Coin) -> u64 {
        self.coins.get(&coin).copied().unwrap_or(0)
    }

    pub fn set(&mut self, coin: Coin, amount: u64) {
        if amount == 0 {
            self.coins.remove(&coin);
        } else {
            self.coins.insert(coin, amount);
        }
    }

    /// Applies a signed quantity. Returns `false` (and changes nothing) if it would go negative.
    pub fn apply(&mut self, coin: Coin, delta: i64) -> bool {
        let balance = self.balance(coin);
        let next = if delta >= 0 {
            balance.checked_add(delta.unsigned_abs())
        } else {
            balance.checked_sub(delta.unsigned_abs())
        };
        match next {
            Some(next) => {
                self.set(coin, next);
                true
            }
            None => false,
        }
    }

    pub fn halve(&mut self, coin: Coin) {
        self.set(coin, self.balance(coin) / 2);
    }

    pub fn double(&mut self, coin: Coin) {
        self.set(coin, self.balance(coin).saturating_mul(2));
    }

    pub fn iter(&self) -> impl Iterator<Item = (Coin, u64)> + '_ {
        self.coins.iter().map(|(coin, amount)| (*coin, *amount))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub role: Role,
    pub seat: u8,
    pub connected: bool,
    pub market: Option<MarketId>,
    pub wallet: Wallet,
    /// Secret presented by `reconnect_game`. Never projected.
    pub token: String,
}

impl Player {
    pub fn new(id: PlayerId, name: String, role: Role, seat: u8, token: String) -> Self {
        Self {
            id,
            name,
            role,
            seat,
            connected: true,
            market: None,
            wallet: Wallet::default(),
            token,
        }
    }

    pub fn is_gm(&self) -> bool {
        self.role == Role::Gm
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCount {
    pub available: u32,
    pub spent: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpertToken {
    pub ability: Ability,
    pub spent: bool,
}

/// Expert powers held by a player, one token per expert card.
///
/// Spent status belongs to the card, so dropping a spent expert and claiming it back
/// never yields a fresh token.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbilityTokens {
    cards: BTreeMap<CardId, ExpertToken>,
}

impl AbilityTokens {
    pub fn available(&self, ability: Ability) -> u32 {
        self.count(ability, false)
    }

    pub fn spent(&self, ability: Ability) -> u32 {
        self.count(ability, true)
    }

    fn count(&self, ability: Ability, spent: bool) -> u32 {
        self.cards
            .values()
            .filter(|token| token.ability == ability && token.spent == spent)
            .count() as u32
    }

    pub fn grant(&mut self, card: CardId, ability: Ability, spent: bool) {
        self.cards.insert(card, ExpertToken { ability, spent });
    }

    /// Spends `n` tokens at once, or none if fewer than `n` are available.
    /// Returns the expert cards that were used up.
    pub fn consume(&mut self, ability: Ability, n: u32) -> Option<Vec<CardId>> {
        if self.available(ability) < n {
            return None;
        }
        let mut used = Vec::with_capacity(n as usize);
        for (card, token) in self.cards.iter_mut() {
            if used.len() == n as usize {
                break;
            }
            if token.ability == ability && !token.spent {
                token.spent = true;
                used.push(card.clone());
            }
        }
        Some(used)
    }

    /// Forgets the token of a dropped expert card.
    pub fn revoke(&mut self, card: &CardId) -> Option<ExpertToken> {
        self.cards.remove(card)
    }

    pub fn token(&self, card: &CardId) -> Option<ExpertToken> {
        self.cards.get(card).copied()
    }

    pub fn cards(&self) -> impl Iterator<Item = (&CardId, ExpertToken)> {
        self.cards.iter().map(|(card, token)| (card, *token))
    }

    /// Available and spent counts per ability.
    pub fn iter(&self) -> impl Iterator<Item = (Ability, TokenCount)> {
        let mut counts: BTreeMap<Ability, TokenCount> = BTreeMap::new();
        for token in self.cards.values() {
            let count = counts.entry(token.ability).or_default();
            if token.spent {
                count.spent += 1;
            } else {
                count.available += 1;
            }
        }
        counts.into_iter()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Inventory {
    pub investments: Vec<CardId>,
    pub farms: Vec<CardId>,
    pub experts: Vec<CardId>,
    pub abilities: AbilityTokens,
}

impl Inventory {
    pub fn holds(&self, id: &CardId) -> bool {
        self.investments.contains(id) || self.farms.contains(id) || self.experts.contains(id)
    }

    pub fn card_ids(&self) -> impl Iterator<Item = &CardId> {
        self.investments
            .iter()
            .chain(self.farms.iter())
            .chain(self.experts.iter())
    }

    /// Takes `card` into the inventory. `spent` marks an expert that was already used up.
    pub fn add(&mut self, card: &Card, spent: bool) {
        match &card.body {
            CardBody::Investment(_) => self.investments.push(card.id.clone()),
            CardBody::MiningFarm(_) => self.farms.push(card.id.clone()),
            CardBody::Expert(expert) => {
                self.experts.push(card.id.clone());
                self.abilities.grant(card.id.clone(), expert.ability, spent);
            }
        }
    }

    pub fn remove(&mut self, card: &Card) -> bool {
        let list = match &card.body {
            CardBody::Investment(_) => &mut self.investments,
            CardBody::MiningFarm(_) => &mut self.farms,
            CardBody::Expert(_) => &mut self.experts,
        };
        let Some(index) = list.iter().position(|id| id == &card.id) else {
            return false;
        };
        list.remove(index);
        if let CardBody::Expert(_) = &card.body {
            self.abilities.revoke(&card.id);
        }
        true
    }
}
