//! Fixtures for tests: ready-made sessions, card hand-outs and hand-placed trends.

use tycoon_types::{
    Catalog, CardId, Continent, Game, GameCode, GameConfig, LawyerRule, PlayerId, TrendDef,
    TrendEffect, TrendInstance, TrendKind, TrendPools, YearTrends,
};

use crate::lobby;

pub const GM: PlayerId = PlayerId(1);
pub const P1: PlayerId = PlayerId(2);
pub const P2: PlayerId = PlayerId(3);

const NAMES: [&str; 6] = ["Ada", "Bob", "Cy", "Dee", "Eve", "Fay"];

fn quiet(key: &str, kind: TrendKind) -> TrendDef {
    TrendDef {
        key: key.to_string(),
        name: key.replace('_', " "),
        kind,
        effects: Vec::new(),
        lawyer: LawyerRule::forbidden(),
    }
}

/// The standard deck with trend pools that never change anything.
pub fn quiet_catalog() -> Catalog {
    let mut catalog = Catalog::standard();
    catalog.trends = TrendPools {
        global: (1..=4)
            .map(|i| quiet(&format!("calm_{i}"), TrendKind::Global))
            .collect(),
        crypto: vec![quiet("flat_market", TrendKind::Crypto)],
        regional: vec![quiet("local_news", TrendKind::Regional)],
    };
    catalog
}

/// A lobby with only its GM, named "GM".
pub fn lobby_game() -> (Game, Catalog) {
    let catalog = quiet_catalog();
    let game = lobby::new_game(
        GameCode::normalize("TESTS"),
        GameConfig::default(),
        "GM",
        "secret-gm".to_string(),
        42,
        &catalog,
    )
    .expect("valid lobby");
    (game, catalog)
}

/// A started game in year 1, BIZ.ML_BID, with `players` seated participants.
pub fn started_game(players: usize) -> (Game, Catalog) {
    let (mut game, catalog) = lobby_game();
    for (i, name) in NAMES.iter().take(players).enumerate() {
        lobby::join(&mut game, name, format!("secret-player-{i}")).expect("join");
    }
    lobby::start(&mut game, &catalog, GM).expect("start");
    (game, catalog)
}

/// Moves a card from the pool straight into a player's inventory.
pub fn give_card(game: &mut Game, catalog: &Catalog, player: PlayerId, id: &str) {
    let id = CardId::from(id);
    let card = catalog.card(&id).expect("card in catalog");
    assert!(
        game.availability.pool_mut(card.kind()).remove(&id),
        "card {id} already taken"
    );
    let spent = game.spent_experts.contains(&id);
    game.inventories.entry(player).or_default().add(card, spent);
}

pub fn trend(key: &str, kind: TrendKind, effects: Vec<TrendEffect>, lawyer: LawyerRule) -> TrendInstance {
    TrendInstance {
        key: key.to_string(),
        name: key.to_string(),
        kind,
        continent: None,
        effects,
        lawyer,
    }
}

pub fn regional(
    def_key: &str,
    continent: Continent,
    effects: Vec<TrendEffect>,
    lawyer: LawyerRule,
) -> TrendInstance {
    let def = TrendDef {
        key: def_key.to_string(),
        name: def_key.to_string(),
        kind: TrendKind::Regional,
        effects,
        lawyer,
    };
    TrendInstance::from_def(&def, Some(continent))
}

/// Places a trend into `year`: global trends are added, the crypto trend and the
/// continent's regional trend are replaced.
pub fn install_trend(game: &mut Game, year: u8, trend: TrendInstance) {
    let slot = game.timeline.years.entry(year).or_insert_with(|| YearTrends {
        global: Vec::new(),
        crypto: self::trend("flat_market", TrendKind::Crypto, Vec::new(), LawyerRule::forbidden()),
        regional: Default::default(),
    });
    match (trend.kind, trend.continent) {
        (TrendKind::Global, _) => slot.global.push(trend),
        (TrendKind::Crypto, _) => slot.crypto = trend,
        (TrendKind::Regional, Some(continent)) => {
            slot.regional.insert(continent, trend);
        }
        (TrendKind::Regional, None) => panic!("regional trend {} without a continent", trend.key),
    }
}
