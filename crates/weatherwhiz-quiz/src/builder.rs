use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

use crate::model::{QuizItem, QuizPools, WeatherCard};

/// Turns an answer key into two independently shuffled pools.
pub struct QuizBuilder<R = StdRng> {
    rng: R,
}

impl QuizBuilder<StdRng> {
    /// Builder seeded from the operating system.
    pub fn from_os_rng() -> Self {
        Self::new(StdRng::from_os_rng())
    }

    /// Builder with reproducible shuffles.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_seed_option(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_os_rng(),
        }
    }
}

impl<R: Rng> QuizBuilder<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Shuffle names and cards with separate draws from the generator.
    ///
    /// `items` is left untouched and stays the round's answer key.
    pub fn build(&mut self, items: &[QuizItem]) -> QuizPools {
        let mut names: Vec<String> = items.iter().map(|i| i.location_name.clone()).collect();
        names.shuffle(&mut self.rng);

        let mut cards: Vec<WeatherCard> = items.iter().map(QuizItem::card).collect();
        cards.shuffle(&mut self.rng);

        QuizPools { names, cards }
    }
}

/// Keep only the first record for each display name.
///
/// Pairing resolves a name through the answer key, so two records sharing a
/// name would leave one of them unmatchable.
pub fn dedupe_by_name(items: Vec<QuizItem>) -> Vec<QuizItem> {
    let mut seen = HashSet::new();
    let before = items.len();

    let unique: Vec<QuizItem> = items
        .into_iter()
        .filter(|item| seen.insert(item.location_name.clone()))
        .collect();

    if unique.len() != before {
        tracing::warn!(
            "Dropped {} records with duplicate location names",
            before - unique.len()
        );
    }
    unique
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use std::collections::HashMap;

    fn item(id: i64, name: &str, temperature: f64) -> QuizItem {
        QuizItem {
            location_id: id,
            location_name: name.to_string(),
            temperature,
            temperature_unit: "°C".into(),
            humidity: 50,
            wind_speed: 3.0,
            wind_speed_unit: "km/h".into(),
            weather_code: 0,
            observed_at: None,
        }
    }

    fn sample() -> Vec<QuizItem> {
        (1..=8).map(|i| item(i, &format!("City {i}"), i as f64)).collect()
    }

    #[test]
    fn test_pools_match_answer_key_by_id() {
        let items = sample();
        let pools = QuizBuilder::seeded(42).build(&items);

        assert_eq!(pools.names.len(), items.len());
        assert_eq!(pools.cards.len(), items.len());

        let id_by_name: HashMap<&str, i64> = items
            .iter()
            .map(|i| (i.location_name.as_str(), i.location_id))
            .collect();
        let mut from_names: Vec<i64> = pools.names.iter().map(|n| id_by_name[n.as_str()]).collect();
        let mut from_cards: Vec<i64> = pools.cards.iter().map(|c| c.location_id).collect();
        from_names.sort_unstable();
        from_cards.sort_unstable();
        assert_eq!(from_names, from_cards);
    }

    #[test]
    fn test_answer_key_untouched() {
        let items = sample();
        let snapshot = items.clone();
        let _ = QuizBuilder::seeded(1).build(&items);
        assert_eq!(items, snapshot);
    }

    #[test]
    fn test_same_seed_same_pools() {
        let items = sample();
        assert_eq!(
            QuizBuilder::seeded(9).build(&items),
            QuizBuilder::seeded(9).build(&items)
        );
    }

    #[test]
    fn test_cards_carry_item_weather() {
        let items = sample();
        let pools = QuizBuilder::seeded(3).build(&items);
        for card in &pools.cards {
            let source = items.iter().find(|i| i.location_id == card.location_id).unwrap();
            assert_eq!(card.temperature, source.temperature);
            assert_eq!(card.weather_code, source.weather_code);
        }
    }

    #[test]
    fn test_single_item_pools() {
        let pools = QuizBuilder::seeded(0).build(&[item(10, "Oslo", -3.0)]);
        assert_eq!(pools.names, vec!["Oslo".to_string()]);
        assert_eq!(pools.cards[0].location_id, 10);
    }

    #[test]
    fn test_dedupe_keeps_first_per_name() {
        let items = vec![
            item(1, "Springfield", 10.0),
            item(2, "Shelbyville", 11.0),
            item(3, "Springfield", 12.0),
        ];
        let unique = dedupe_by_name(items);
        let ids: Vec<i64> = unique.iter().map(|i| i.location_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
