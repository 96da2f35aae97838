//! Pure building blocks of a result recomputation.
//!
//! Storage backends run these inside their own transaction: rescore the
//! guesses of the resulted game, write them grouped by score, then rebuild the
//! totals of the participants who own them from all of their guesses.

use std::collections::{BTreeMap, BTreeSet};

use uuid::Uuid;

use crate::{
    dao::models::{GuessEntity, MatchScore},
    engine::scoring::score_guess,
};

/// New score for one guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuessRescore {
    /// Guess being rescored.
    pub guess_id: Uuid,
    /// Owner of the guess.
    pub participant_id: Uuid,
    /// Score under the new result.
    pub score: i32,
}

/// Score every guess against `actual` from scratch.
///
/// Previous scores are ignored, so applying the same result twice or replacing
/// one result by another always yields the scores of the latest result alone.
pub fn rescore_guesses(guesses: &[GuessEntity], actual: MatchScore) -> Vec<GuessRescore> {
    guesses
        .iter()
        .map(|guess| GuessRescore {
            guess_id: guess.id,
            participant_id: guess.participant_id,
            score: i32::from(score_guess(guess.predicted, actual)),
        })
        .collect()
}

/// Participants whose aggregate can change after `rescored` is written.
pub fn affected_participants(rescored: &[GuessRescore]) -> BTreeSet<Uuid> {
    rescored.iter().map(|entry| entry.participant_id).collect()
}

/// Sum guess scores per participant for every id in `owners`.
///
/// Owners without any guess in `guesses` get a total of zero; guesses owned by
/// anybody else are ignored.
pub fn participant_totals<'a, I>(owners: &BTreeSet<Uuid>, guesses: I) -> BTreeMap<Uuid, i32>
where
    I: IntoIterator<Item = &'a GuessEntity>,
{
    let mut totals: BTreeMap<Uuid, i32> = owners.iter().map(|id| (*id, 0)).collect();
    for guess in guesses {
        if let Some(total) = totals.get_mut(&guess.participant_id) {
            *total += guess.score;
        }
    }
    totals
}

/// Bucket `(key, value)` pairs by value so each bucket becomes one batched write.
pub fn group_by_value<K, V, I>(pairs: I) -> BTreeMap<V, Vec<K>>
where
    V: Ord,
    I: IntoIterator<Item = (K, V)>,
{
    let mut groups: BTreeMap<V, Vec<K>> = BTreeMap::new();
    for (key, value) in pairs {
        groups.entry(value).or_default().push(key);
    }
    groups
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn guess(participant_id: Uuid, predicted: MatchScore, score: i32) -> GuessEntity {
        let at = datetime!(2022-11-20 12:00 UTC);
        GuessEntity {
            id: Uuid::new_v4(),
            participant_id,
            game_id: Uuid::nil(),
            predicted,
            score,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn rescore_ignores_previous_scores() {
        let owner = Uuid::new_v4();
        let guesses = vec![
            guess(owner, MatchScore::new(2, 1), 0),
            guess(owner, MatchScore::new(0, 0), 5),
        ];

        let rescored = rescore_guesses(&guesses, MatchScore::new(2, 1));
        let scores: Vec<i32> = rescored.iter().map(|entry| entry.score).collect();
        assert_eq!(scores, vec![5, 0]);
    }

    #[test]
    fn rescore_with_new_result_drops_stale_bonus() {
        let owner = Uuid::new_v4();
        let guesses = vec![guess(owner, MatchScore::new(1, 1), 0)];

        let first = rescore_guesses(&guesses, MatchScore::new(2, 2));
        assert_eq!(first[0].score, 3);

        let second = rescore_guesses(&guesses, MatchScore::new(3, 0));
        assert_eq!(second[0].score, 0);
    }

    #[test]
    fn totals_cover_every_owner_and_ignore_others() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let guesses = vec![
            guess(alice, MatchScore::new(1, 0), 5),
            guess(alice, MatchScore::new(1, 0), 2),
            guess(stranger, MatchScore::new(1, 0), 4),
        ];
        let owners = BTreeSet::from([alice, bob]);

        let totals = participant_totals(&owners, &guesses);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[&alice], 7);
        assert_eq!(totals[&bob], 0);
    }

    #[test]
    fn group_by_value_buckets_keys() {
        let groups = group_by_value([("a", 5), ("b", 0), ("c", 5)]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[&5], vec!["a", "c"]);
        assert_eq!(groups[&0], vec!["b"]);
    }
}
