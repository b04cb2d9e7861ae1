use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Continent, LawyerRule, LawyerWindow, PlayerId, TrendDef, TrendEffect, TrendKind};

/// A trend drawn into a specific year of the timeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendInstance {
    /// Unique within its year. Regional instances are keyed `<def>:<CONTINENT>`.
    pub key: String,
    pub name: String,
    pub kind: TrendKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continent: Option<Continent>,
    pub effects: Vec<TrendEffect>,
    pub lawyer: LawyerRule,
}

impl TrendInstance {
    pub fn from_def(def: &TrendDef, continent: Option<Continent>) -> Self {
        let key = match continent {
            Some(continent) => format!("{}:{}", def.key, continent.code()),
            None => def.key.clone(),
        };
        Self {
            key,
            name: def.name.clone(),
            kind: def.kind,
            continent,
            effects: def.effects.clone(),
            lawyer: def.lawyer.clone(),
        }
    }

    pub fn has_effect(&self, predicate: impl Fn(&TrendEffect) -> bool) -> bool {
        self.effects.iter().any(predicate)
    }

    /// Whether a blockable part of this trend fires the moment its year starts, which means
    /// protection has to be bought during an earlier year.
    pub fn blockable_at_year_start(&self) -> bool {
        self.has_effect(|effect| matches!(effect, TrendEffect::WalletHalving { .. }))
    }

    pub fn lawyer_window(&self) -> Option<LawyerWindow> {
        self.lawyer.window()
    }
}

/// Every trend active during one year.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearTrends {
    pub global: Vec<TrendInstance>,
    pub crypto: TrendInstance,
    pub regional: BTreeMap<Continent, TrendInstance>,
}

impl YearTrends {
    /// Global trends first, then the crypto trend, then regional trends by continent.
    pub fn iter(&self) -> impl Iterator<Item = &TrendInstance> {
        self.global
            .iter()
            .chain(std::iter::once(&self.crypto))
            .chain(self.regional.values())
    }

    pub fn find(&self, key: &str) -> Option<&TrendInstance> {
        self.iter().find(|trend| trend.key == key)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendTimeline {
    pub years: BTreeMap<u8, YearTrends>,
}

impl TrendTimeline {
    pub fn year(&self, year: u8) -> Option<&YearTrends> {
        self.years.get(&year)
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }
}

/// A lawyer spent on `trend_key` for `player` during `year`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Protection {
    pub player: PlayerId,
    pub year: u8,
    pub trend_key: String,
}

/// Private message produced when a trend touches (or skips) a player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub player: PlayerId,
    pub year: u8,
    pub trend_key: String,
    pub text: String,
}
