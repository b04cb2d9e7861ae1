//! Deterministic trend timeline generation.
//!
//! The timeline is drawn once when a game starts, from a per-game seed, with a
//! [`ChaCha8Rng`] so the same seed yields the same timeline on every platform.
//!
//! Per year:
//! - [`GLOBAL_TRENDS_PER_YEAR`] global trends, distinct within the year
//! - one crypto trend
//! - one regional trend for every continent

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use tycoon_types::{
    Catalog, Continent, TrendInstance, TrendTimeline, YearTrends, GLOBAL_TRENDS_PER_YEAR,
};

/// Draws the timeline for `years_total` years.
///
/// Pools are assumed non-empty, which [`Catalog::validate`] guarantees. An empty pool
/// yields a timeline without that year.
pub fn generate_timeline(catalog: &Catalog, years_total: u8, seed: u64) -> TrendTimeline {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let pools = &catalog.trends;
    let mut timeline = TrendTimeline::default();

    for year in 1..=years_total {
        let global: Vec<TrendInstance> = pools
            .global
            .choose_multiple(&mut rng, GLOBAL_TRENDS_PER_YEAR)
            .map(|def| TrendInstance::from_def(def, None))
            .collect();
        let Some(crypto) = pools.crypto.choose(&mut rng) else {
            continue;
        };
        let crypto = TrendInstance::from_def(crypto, None);

        let mut regional = BTreeMap::new();
        for continent in Continent::ALL {
            if let Some(def) = pools.regional.choose(&mut rng) {
                regional.insert(continent, TrendInstance::from_def(def, Some(continent)));
            }
        }

        timeline.years.insert(
            year,
            YearTrends {
                global,
                crypto,
                regional,
            },
        );
    }
    timeline
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tycoon_types::TrendKind;

    #[test]
    fn test_timeline_covers_every_year() {
        let timeline = generate_timeline(&Catalog::standard(), 5, 7);
        assert_eq!(timeline.years.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_year_shape() {
        let timeline = generate_timeline(&Catalog::standard(), 4, 11);
        for trends in timeline.years.values() {
            assert_eq!(trends.global.len(), GLOBAL_TRENDS_PER_YEAR);
            let keys: BTreeSet<_> = trends.global.iter().map(|t| &t.key).collect();
            assert_eq!(keys.len(), GLOBAL_TRENDS_PER_YEAR, "globals repeat within a year");
            assert!(trends.global.iter().all(|t| t.kind == TrendKind::Global));
            assert_eq!(trends.crypto.kind, TrendKind::Crypto);
            assert_eq!(trends.regional.len(), Continent::ALL.len());
            for (continent, trend) in &trends.regional {
                assert_eq!(trend.continent, Some(*continent));
                assert!(trend.key.ends_with(continent.code()));
            }
        }
    }

    #[test]
    fn test_same_seed_same_timeline() {
        let catalog = Catalog::standard();
        assert_eq!(
            generate_timeline(&catalog, 4, 42),
            generate_timeline(&catalog, 4, 42)
        );
    }

    #[test]
    fn test_different_seeds_diverge() {
        let catalog = Catalog::standard();
        let first = generate_timeline(&catalog, 5, 1);
        let differs = (2..20).any(|seed| generate_timeline(&catalog, 5, seed) != first);
        assert!(differs);
    }
}
