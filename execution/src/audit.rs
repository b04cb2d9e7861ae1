//! Yearly audit: settlement preview, secret lawyer/lobbyist choices, the global final
//! computation and payment.
//!
//! ## Totals
//! ```text
//! total = base + regional bonus + global bonus + mining - electricity
//! ```
//! then every declared attack is applied: all steals first, then all sabotages, each group
//! in (attacker seat, declaration index) order. A shielded target skips the single attack
//! that would have hurt it most.

use std::collections::{BTreeMap, BTreeSet};
use tycoon_types::{
    Ability, AttackKind, BreakdownLine, Catalog, Continent, Game, GameError, InvestmentCard,
    LawyerChoice, LawyerWindow, LobbyAttack, PlayerId, Protection, ResolvedAttack, Sector,
    SettlementResult, Stage, TrendEffect, TrendInstance, BONUS_PAIR, BONUS_QUAD, BONUS_SET,
    UNIT_SCALE,
};

use crate::guards::{all_participants, require_in_progress, require_participant, require_stage, saturate};

/// Bonus paid for a group of `size` investment cards sharing a continent or a sector.
pub const fn staircase(size: usize) -> i64 {
    match size {
        0 | 1 => 0,
        2 | 3 => BONUS_PAIR,
        4 | 5 => BONUS_QUAD,
        _ => BONUS_SET,
    }
}

/// USD production units in settlement money.
fn scaled(units: u64) -> i64 {
    i64::try_from(units)
        .unwrap_or(i64::MAX)
        .saturating_mul(UNIT_SCALE)
}

/// Applicable trend effects for one player in the current year.
struct Modifiers<'a> {
    game: &'a Game,
    player: PlayerId,
    trends: Vec<&'a TrendInstance>,
    /// A pending BLOCK_TREND honored by the preview only.
    pending_block: Option<&'a str>,
}

impl<'a> Modifiers<'a> {
    fn new(game: &'a Game, player: PlayerId, pending_block: Option<&'a str>) -> Self {
        let trends = game
            .current_trends()
            .map(|trends| trends.iter().collect())
            .unwrap_or_default();
        Self {
            game,
            player,
            trends,
            pending_block,
        }
    }

    fn blocked(&self, trend: &TrendInstance) -> bool {
        self.pending_block == Some(trend.key.as_str())
            || self.game.is_protected(self.player, self.game.year, &trend.key)
    }

    /// Trends carrying a matching effect, paired with whether the player blocked them.
    fn matching(&self, predicate: impl Fn(&TrendEffect) -> bool) -> Vec<(&'a TrendInstance, bool)> {
        self.trends
            .iter()
            .filter(|trend| trend.has_effect(&predicate))
            .map(|trend| (*trend, self.blocked(trend)))
            .collect()
    }
}

/// Settlement before attacks. `pending_block` is honored as if it were a protection.
pub fn settlement_base(
    game: &Game,
    catalog: &Catalog,
    player: PlayerId,
    pending_block: Option<&str>,
) -> SettlementResult {
    let modifiers = Modifiers::new(game, player, pending_block);
    let mut notes = Vec::new();
    let mut note = |trend: &TrendInstance, text: &str| {
        notes.push(BreakdownLine::TrendNote {
            trend_key: trend.key.clone(),
            text: text.to_string(),
        })
    };

    let Some(inventory) = game.inventory(player) else {
        return SettlementResult::default();
    };
    let investments: Vec<&InvestmentCard> = inventory
        .investments
        .iter()
        .filter_map(|id| catalog.card(id))
        .filter_map(|card| card.as_investment())
        .collect();

    let mut frozen = BTreeSet::<Continent>::new();
    for (trend, blocked) in modifiers.matching(|e| matches!(e, TrendEffect::RegionalFreeze)) {
        let Some(continent) = trend.continent else {
            continue;
        };
        if !investments.iter().any(|card| card.continent == continent) {
            continue;
        }
        if blocked {
            note(trend, "lawyer kept production running");
        } else {
            frozen.insert(continent);
            note(trend, "regional production frozen");
        }
    }

    let mut base: i64 = investments
        .iter()
        .filter(|card| !frozen.contains(&card.continent))
        .map(|card| scaled(card.usd_production))
        .fold(0, i64::saturating_add);
    for (trend, blocked) in modifiers.matching(|e| matches!(e, TrendEffect::EconomicCrisis)) {
        if blocked {
            note(trend, "lawyer blocked the crisis");
        } else if base != 0 {
            base = 0;
            note(trend, "base production zeroed");
        }
    }
    for (trend, _) in modifiers.matching(|e| matches!(e, TrendEffect::Boom)) {
        base = base.saturating_mul(2);
        note(trend, "base production doubled");
    }

    let mut by_continent = BTreeMap::<Continent, usize>::new();
    let mut by_sector = BTreeMap::<Sector, usize>::new();
    for card in &investments {
        *by_continent.entry(card.continent).or_default() += 1;
        *by_sector.entry(card.sector).or_default() += 1;
    }
    let mut regional: i64 = by_continent.values().map(|size| staircase(*size)).sum();
    let mut global: i64 = by_sector.values().map(|size| staircase(*size)).sum();
    for (trend, blocked) in modifiers.matching(|e| matches!(e, TrendEffect::Antimonopoly)) {
        if blocked {
            note(trend, "lawyer kept the bonuses");
        } else if regional + global != 0 {
            regional = 0;
            global = 0;
            note(trend, "bonuses zeroed");
        }
    }

    let difficulty = modifiers.matching(|e| matches!(e, TrendEffect::LowerDifficulty { .. }));
    let mut mining: i128 = 0;
    let mut electricity: i64 = 0;
    for farm in inventory
        .farms
        .iter()
        .filter_map(|id| catalog.card(id))
        .filter_map(|card| card.as_farm())
    {
        let doubled = difficulty.iter().any(|(trend, _)| {
            trend.has_effect(|effect| {
                matches!(effect, TrendEffect::LowerDifficulty { coin } if coin.map_or(true, |c| c == farm.coin))
            })
        });
        let production = if doubled {
            farm.production.saturating_mul(2)
        } else {
            farm.production
        };
        let rate = game.exchange_rates.get(&farm.coin).copied().unwrap_or(0);
        mining = mining.saturating_add(i128::from(production).saturating_mul(i128::from(rate)));
        electricity = electricity.saturating_add(i64::try_from(farm.electricity_cost).unwrap_or(i64::MAX));
    }
    if !inventory.farms.is_empty() {
        for (trend, _) in &difficulty {
            note(trend, "mining output doubled");
        }
        for (trend, blocked) in modifiers.matching(|e| matches!(e, TrendEffect::ExpensiveElectricity)) {
            if blocked {
                note(trend, "lawyer kept electricity prices");
            } else {
                electricity = electricity.saturating_mul(2);
                note(trend, "electricity cost doubled");
            }
        }
    }

    let mut result = SettlementResult::default();
    result.push(BreakdownLine::Base { amount: base });
    result.push(BreakdownLine::RegionalBonus { amount: regional });
    result.push(BreakdownLine::GlobalBonus { amount: global });
    result.push(BreakdownLine::Mining { amount: saturate(mining) });
    result.push(BreakdownLine::Electricity { amount: electricity });
    for line in notes {
        result.push(line);
    }
    result
}

/// Repeatable, side-effect free settlement estimate including pending choices.
pub fn preview(game: &Game, catalog: &Catalog, actor: PlayerId) -> Result<SettlementResult, GameError> {
    require_participant(game, actor)?;
    require_in_progress(game)?;
    Ok(preview_unchecked(game, catalog, actor))
}

pub(crate) fn preview_unchecked(game: &Game, catalog: &Catalog, player: PlayerId) -> SettlementResult {
    let pending_block = game
        .settlement
        .entries
        .get(&player)
        .filter(|entry| !entry.started)
        .and_then(|entry| match &entry.pending.lawyer {
            Some(LawyerChoice::BlockTrend { trend_key }) => Some(trend_key.as_str()),
            _ => None,
        });
    settlement_base(game, catalog, player, pending_block)
}

fn require_open_entry(game: &Game, actor: PlayerId) -> Result<(), GameError> {
    require_participant(game, actor)?;
    require_stage(game, Stage::Settle)?;
    if game
        .settlement
        .entries
        .get(&actor)
        .is_some_and(|entry| entry.started)
    {
        return Err(GameError::bad_state("audit already started"));
    }
    Ok(())
}

fn available(game: &Game, player: PlayerId, ability: Ability) -> u32 {
    game.inventory(player)
        .map(|inventory| inventory.abilities.available(ability))
        .unwrap_or(0)
}

pub fn set_pending_lawyer(
    game: &mut Game,
    actor: PlayerId,
    choice: Option<LawyerChoice>,
) -> Result<(), GameError> {
    require_open_entry(game, actor)?;
    if let Some(choice) = &choice {
        if available(game, actor, Ability::Lawyer) == 0 {
            return Err(GameError::NoLawyer);
        }
        if let LawyerChoice::BlockTrend { trend_key } = choice {
            let trend = game
                .current_trends()
                .and_then(|trends| trends.find(trend_key))
                .ok_or_else(|| GameError::NotActive(trend_key.clone()))?;
            match trend.lawyer_window() {
                None => return Err(GameError::bad_input(format!("{trend_key} cannot be blocked"))),
                Some(LawyerWindow::Settle) => {}
                Some(window) => {
                    return Err(GameError::BadTime(format!(
                        "{trend_key} can only be blocked during {window:?}"
                    )))
                }
            }
            if game.is_protected(actor, game.year, trend_key) {
                return Err(GameError::Already(format!("{trend_key} is already blocked")));
            }
        }
    }
    game.settlement.entries.entry(actor).or_default().pending.lawyer = choice;
    Ok(())
}

pub fn add_pending_lobby(game: &mut Game, actor: PlayerId, attack: LobbyAttack) -> Result<(), GameError> {
    require_open_entry(game, actor)?;
    let target_ok = attack.target != actor
        && game
            .player(attack.target)
            .is_some_and(|player| !player.is_gm());
    if !target_ok {
        return Err(GameError::bad_input("attacks must target another player"));
    }
    let declared = game
        .settlement
        .entries
        .get(&actor)
        .map(|entry| entry.pending.lobby.len())
        .unwrap_or(0);
    if declared as u32 >= available(game, actor, Ability::Lobbyist) {
        return Err(GameError::NoPower(Ability::Lobbyist.to_string()));
    }
    game.settlement.entries.entry(actor).or_default().pending.lobby.push(attack);
    Ok(())
}

pub fn remove_pending_lobby(game: &mut Game, actor: PlayerId, index: usize) -> Result<(), GameError> {
    require_open_entry(game, actor)?;
    let lobby = &mut game.settlement.entries.entry(actor).or_default().pending.lobby;
    if index >= lobby.len() {
        return Err(GameError::bad_input(format!("no pending attack at {index}")));
    }
    lobby.remove(index);
    Ok(())
}

/// Locks in the actor's pending choices, consuming their expert tokens all at once.
/// The last player to start triggers the global computation.
pub fn start(game: &mut Game, catalog: &Catalog, actor: PlayerId) -> Result<(), GameError> {
    require_participant(game, actor)?;
    require_stage(game, Stage::Settle)?;
    let entry = game.settlement.entries.entry(actor).or_default().clone();
    if entry.started {
        return Err(GameError::Already("audit already started".into()));
    }

    let lawyers = u32::from(entry.pending.lawyer.is_some());
    let lobbyists = entry.pending.lobby.len() as u32;
    if available(game, actor, Ability::Lawyer) < lawyers {
        return Err(GameError::NoPower(Ability::Lawyer.to_string()));
    }
    if available(game, actor, Ability::Lobbyist) < lobbyists {
        return Err(GameError::NoPower(Ability::Lobbyist.to_string()));
    }
    if !game.spend_experts(actor, Ability::Lawyer, lawyers)
        || !game.spend_experts(actor, Ability::Lobbyist, lobbyists)
    {
        return Err(GameError::Internal("expert tokens changed while starting".into()));
    }

    if let Some(LawyerChoice::BlockTrend { trend_key }) = &entry.pending.lawyer {
        game.protections.insert(Protection {
            player: actor,
            year: game.year,
            trend_key: trend_key.clone(),
        });
    }
    if let Some(entry) = game.settlement.entries.get_mut(&actor) {
        entry.started = true;
    }
    tracing::info!(
        code = %game.code,
        player = %actor,
        lawyer = lawyers,
        attacks = lobbyists,
        "audit started"
    );

    if all_participants(game, |id| {
        game.settlement.entries.get(&id).is_some_and(|entry| entry.started)
    }) {
        finalize(game, catalog);
    }
    Ok(())
}

/// One declared attack, positioned in application order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlannedAttack {
    pub attacker: PlayerId,
    pub attacker_seat: u8,
    /// Position in the attacker's declaration list.
    pub index: usize,
    pub kind: AttackKind,
    pub target: PlayerId,
}

/// Steals first, then sabotages, each by (attacker seat, declaration index).
pub fn order_attacks(mut attacks: Vec<PlannedAttack>) -> Vec<PlannedAttack> {
    attacks.sort_by_key(|attack| (attack.kind, attack.attacker_seat, attack.index));
    attacks
}

/// Applies ordered attacks to running totals.
///
/// `steal_values` holds each player's highest investment card value. Shielded targets skip
/// the attack whose reduction, measured on an unshielded run of the same order, is largest;
/// ties go to the earlier attack.
pub fn resolve_attacks(
    totals: &mut BTreeMap<PlayerId, i64>,
    attacks: &[PlannedAttack],
    steal_values: &BTreeMap<PlayerId, i64>,
    shielded: &BTreeSet<PlayerId>,
) -> Vec<ResolvedAttack> {
    let simulated = run_attacks(&mut totals.clone(), attacks, steal_values, &BTreeSet::new());

    let mut blocked = BTreeSet::new();
    for target in shielded {
        let worst = simulated
            .iter()
            .enumerate()
            .filter(|(_, attack)| attack.target == *target)
            .fold(None::<(usize, i64)>, |best, (position, attack)| match best {
                Some((_, amount)) if amount >= attack.amount => best,
                _ => Some((position, attack.amount)),
            });
        if let Some((position, _)) = worst {
            blocked.insert(position);
        }
    }

    let mut resolved = run_attacks(totals, attacks, steal_values, &blocked);
    for position in &blocked {
        resolved[*position].amount = simulated[*position].amount;
    }
    resolved
}

fn run_attacks(
    totals: &mut BTreeMap<PlayerId, i64>,
    attacks: &[PlannedAttack],
    steal_values: &BTreeMap<PlayerId, i64>,
    blocked: &BTreeSet<usize>,
) -> Vec<ResolvedAttack> {
    attacks
        .iter()
        .enumerate()
        .map(|(position, attack)| {
            let running = totals.get(&attack.target).copied().unwrap_or(0);
            let amount = match attack.kind {
                AttackKind::Steal => steal_values.get(&attack.target).copied().unwrap_or(0),
                AttackKind::Sabotage => running.max(0) / 2,
            };
            let is_blocked = blocked.contains(&position);
            if !is_blocked {
                let target = totals.entry(attack.target).or_default();
                *target = target.saturating_sub(amount);
                if attack.kind == AttackKind::Steal {
                    let attacker = totals.entry(attack.attacker).or_default();
                    *attacker = attacker.saturating_add(amount);
                }
            }
            ResolvedAttack {
                attacker: attack.attacker,
                target: attack.target,
                kind: attack.kind,
                amount,
                blocked: is_blocked,
            }
        })
        .collect()
}

fn highest_card_value(game: &Game, catalog: &Catalog, player: PlayerId) -> i64 {
    game.inventory(player)
        .into_iter()
        .flat_map(|inventory| inventory.investments.iter())
        .filter_map(|id| catalog.card(id))
        .filter_map(|card| card.as_investment())
        .map(|card| scaled(card.usd_production))
        .max()
        .unwrap_or(0)
}

fn finalize(game: &mut Game, catalog: &Catalog) {
    if game.settlement.finalized {
        return;
    }
    let participants = game.participant_ids();

    let mut results: BTreeMap<PlayerId, SettlementResult> = participants
        .iter()
        .map(|id| (*id, settlement_base(game, catalog, *id, None)))
        .collect();
    let mut totals: BTreeMap<PlayerId, i64> =
        results.iter().map(|(id, result)| (*id, result.total)).collect();
    let steal_values: BTreeMap<PlayerId, i64> = participants
        .iter()
        .map(|id| (*id, highest_card_value(game, catalog, *id)))
        .collect();

    let mut planned = Vec::new();
    let mut shielded = BTreeSet::new();
    for (player, entry) in &game.settlement.entries {
        if entry.pending.lawyer == Some(LawyerChoice::Shield) {
            shielded.insert(*player);
        }
        for (index, attack) in entry.pending.lobby.iter().enumerate() {
            planned.push(PlannedAttack {
                attacker: *player,
                attacker_seat: game.seat_of(*player),
                index,
                kind: attack.kind,
                target: attack.target,
            });
        }
    }
    let planned = order_attacks(planned);
    let resolved = resolve_attacks(&mut totals, &planned, &steal_values, &shielded);

    for attack in &resolved {
        let target_line = match (attack.blocked, attack.kind) {
            (true, kind) => BreakdownLine::AttackBlocked {
                by: attack.attacker,
                kind,
                amount: attack.amount,
            },
            (false, AttackKind::Steal) => BreakdownLine::StealLoss {
                by: attack.attacker,
                amount: attack.amount,
            },
            (false, AttackKind::Sabotage) => BreakdownLine::SabotageLoss {
                by: attack.attacker,
                amount: attack.amount,
            },
        };
        if let Some(result) = results.get_mut(&attack.target) {
            result.push(target_line);
        }
        if !attack.blocked && attack.kind == AttackKind::Steal {
            if let Some(result) = results.get_mut(&attack.attacker) {
                result.push(BreakdownLine::StealGain {
                    from: attack.target,
                    amount: attack.amount,
                });
            }
        }
    }

    for (player, result) in results {
        debug_assert_eq!(Some(&result.total), totals.get(&player));
        game.settlement.entries.entry(player).or_default().result = Some(result);
    }
    game.settlement.finalized = true;
    tracing::info!(
        code = %game.code,
        year = game.year,
        attacks = resolved.len(),
        blocked = resolved.iter().filter(|attack| attack.blocked).count(),
        "settlement finalized"
    );
}

pub fn pay(game: &mut Game, actor: PlayerId) -> Result<(), GameError> {
    require_participant(game, actor)?;
    require_stage(game, Stage::Settle)?;
    if !game.settlement.finalized {
        return Err(GameError::Wait);
    }
    let entry = game.settlement.entries.entry(actor).or_default();
    if entry.paid {
        return Err(GameError::Already("settlement paid".into()));
    }
    entry.paid = true;
    if all_participants(game, |id| {
        game.settlement.entries.get(&id).is_some_and(|entry| entry.paid)
    }) {
        game.settlement.closed = true;
        tracing::info!(code = %game.code, year = game.year, "settlement closed");
    }
    Ok(())
}
