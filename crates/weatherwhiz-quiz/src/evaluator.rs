//! Match evaluation: the only place score state changes.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use weatherwhiz_catalog::LocationId;

use crate::model::{QuizItem, QuizPools};

/// Score state of the current round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scoreboard {
    /// Locations paired correctly so far. Only ever grows within a round.
    pub matched: BTreeSet<LocationId>,
    pub wrong_guesses: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Correct {
        location_id: LocationId,
        /// False when this location had already been matched.
        newly_matched: bool,
    },
    Incorrect {
        name: String,
        card_location_id: LocationId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub outcome: MatchOutcome,
    pub round_complete: bool,
}

/// Number of distinct locations in the answer key.
pub fn distinct_locations(answer_key: &[QuizItem]) -> usize {
    answer_key
        .iter()
        .map(|item| item.location_id)
        .collect::<HashSet<_>>()
        .len()
}

/// Evaluate pairing the name at `name_index` with the card at `card_index`.
///
/// Correctness is decided by location id through the answer key, never by
/// pool position. Returns `None` without touching `scoreboard` when either
/// index is out of range.
pub fn evaluate(
    name_index: usize,
    card_index: usize,
    pools: &QuizPools,
    answer_key: &[QuizItem],
    scoreboard: &mut Scoreboard,
) -> Option<Evaluation> {
    let name = pools.names.get(name_index)?;
    let card = pools.cards.get(card_index)?;

    // Names are unique per round, so the first hit is the only hit.
    let expected = answer_key
        .iter()
        .find(|item| item.location_name == *name)
        .map(|item| item.location_id);

    let outcome = if expected == Some(card.location_id) {
        let newly_matched = scoreboard.matched.insert(card.location_id);
        MatchOutcome::Correct {
            location_id: card.location_id,
            newly_matched,
        }
    } else {
        scoreboard.wrong_guesses += 1;
        MatchOutcome::Incorrect {
            name: name.clone(),
            card_location_id: card.location_id,
        }
    };

    Some(Evaluation {
        outcome,
        round_complete: scoreboard.matched.len() == distinct_locations(answer_key),
    })
}
