//! Year-start trend effects, lawyer protection and analyst reveals.
//!
//! Protection is recorded as `(player, year, trend key)` and checked when an effect is
//! applied, so a lawyer can be bought in an earlier year for a trend that fires the moment
//! its year starts.

use tycoon_types::{
    Ability, Coin, Game, GameError, Notice, PlayerId, Protection, TrendEffect, TrendInstance,
};

use crate::guards::{require_in_progress, require_participant};

/// Applies the current year's start-of-year effects in their fixed order:
///
/// 0. exchange-rate shifts
/// 1. wallet halvings, skipped for protected players
/// 2. wallet forks, never skipped
/// 3. informational notices
pub fn apply_year_start(game: &mut Game) {
    let Some(trends) = game.current_trends().cloned() else {
        return;
    };
    let year = game.year;
    let instances: Vec<&TrendInstance> = trends.iter().collect();
    let participants = game.participant_ids();

    for trend in &instances {
        for effect in &trend.effects {
            if let TrendEffect::ExchangeRate { coin, percent } = effect {
                shift_rate(game, *coin, *percent);
            }
        }
    }

    for trend in &instances {
        for effect in &trend.effects {
            let TrendEffect::WalletHalving { coin } = effect else {
                continue;
            };
            for player in &participants {
                if game.is_protected(*player, year, &trend.key) {
                    notify(game, *player, trend, "your lawyer kept your wallet intact".into());
                    continue;
                }
                if let Some(wallet) = game.player_mut(*player).map(|p| &mut p.wallet) {
                    for target in coins(*coin) {
                        wallet.halve(target);
                    }
                }
                notify(game, *player, trend, format!("{} halved your {}", trend.name, label(*coin)));
            }
        }
    }

    for trend in &instances {
        for effect in &trend.effects {
            let TrendEffect::WalletFork { coin } = effect else {
                continue;
            };
            for player in &participants {
                if let Some(p) = game.player_mut(*player) {
                    p.wallet.double(*coin);
                }
                notify(game, *player, trend, format!("{} doubled your {}", trend.name, coin.symbol()));
            }
        }
    }

    for trend in &instances {
        for effect in &trend.effects {
            let TrendEffect::Notice { text } = effect else {
                continue;
            };
            for player in &participants {
                notify(game, *player, trend, text.clone());
            }
        }
    }

    tracing::debug!(code = %game.code, year, rates = ?game.exchange_rates, "year-start effects applied");
}

fn shift_rate(game: &mut Game, coin: Coin, percent: i32) {
    let rate = game.exchange_rates.entry(coin).or_insert(1);
    let shifted = i128::from(*rate) * (100 + i128::from(percent)) / 100;
    *rate = u64::try_from(shifted.max(1)).unwrap_or(u64::MAX);
}

fn coins(coin: Option<Coin>) -> Vec<Coin> {
    match coin {
        Some(coin) => vec![coin],
        None => Coin::ALL.to_vec(),
    }
}

fn label(coin: Option<Coin>) -> &'static str {
    coin.map(|coin| coin.symbol()).unwrap_or("coins")
}

fn notify(game: &mut Game, player: PlayerId, trend: &TrendInstance, text: String) {
    game.notices.push(Notice {
        player,
        year: game.year,
        trend_key: trend.key.clone(),
        text,
    });
}

/// Spends a lawyer to neutralize `trend_key` for the actor during `year`.
pub fn use_lawyer_on_trend(
    game: &mut Game,
    actor: PlayerId,
    year: u8,
    trend_key: &str,
) -> Result<(), GameError> {
    require_participant(game, actor)?;
    require_in_progress(game)?;
    if year < game.year || year > game.config.years_total {
        return Err(GameError::bad_input(format!("year {year} is not current or upcoming")));
    }
    let trend = game
        .timeline
        .year(year)
        .and_then(|trends| trends.find(trend_key))
        .ok_or_else(|| GameError::NotActive(trend_key.to_string()))?;
    let Some(window) = trend.lawyer_window() else {
        return Err(GameError::bad_input(format!("{trend_key} cannot be blocked")));
    };
    if game.stage.and_then(|stage| stage.lawyer_window()) != Some(window) {
        return Err(GameError::BadTime(format!("{trend_key} can only be blocked during {window:?}")));
    }
    if trend.blockable_at_year_start() && year <= game.year {
        return Err(GameError::BadTime(format!(
            "{trend_key} fires at the start of its year and must be blocked in advance"
        )));
    }
    if game.is_protected(actor, year, trend_key) {
        return Err(GameError::Already(format!("{trend_key} is already blocked")));
    }
    if !game.spend_experts(actor, Ability::Lawyer, 1) {
        return Err(GameError::NoLawyer);
    }
    game.protections.insert(Protection {
        player: actor,
        year,
        trend_key: trend_key.to_string(),
    });
    tracing::info!(code = %game.code, player = %actor, year, trend = trend_key, "lawyer used");
    Ok(())
}

/// Spends an analyst to reveal a future year of the timeline to the actor.
pub fn reveal_trends(game: &mut Game, actor: PlayerId, year: u8) -> Result<(), GameError> {
    require_participant(game, actor)?;
    require_in_progress(game)?;
    if year <= game.year || year > game.config.years_total {
        return Err(GameError::bad_input(format!("year {year} is not an upcoming year")));
    }
    if game
        .reveals
        .get(&actor)
        .is_some_and(|years| years.contains(&year))
    {
        return Err(GameError::Already(format!("year {year} already revealed")));
    }
    if !game.spend_experts(actor, Ability::Analyst, 1) {
        return Err(GameError::NoPower(Ability::Analyst.to_string()));
    }
    game.reveals.entry(actor).or_default().insert(year);
    tracing::info!(code = %game.code, player = %actor, year, "trends revealed");
    Ok(())
}
