//! Points awarded to a single guess once its game has an official result.

use std::cmp::Ordering;

use crate::dao::models::MatchScore;

/// Awarded when both sides are predicted exactly. No other bonus is added.
pub const EXACT_SCORE_POINTS: u8 = 5;
/// Awarded when a draw is predicted and the game ends in a draw.
pub const DRAW_POINTS: u8 = 3;
/// Awarded when the predicted winner wins.
pub const WINNER_POINTS: u8 = 2;
/// Awarded when at least one side's points are predicted exactly.
pub const ONE_SIDE_POINTS: u8 = 1;

/// Score a prediction against the official result.
///
/// The result is always within `0..=5`: an exact prediction is worth
/// [`EXACT_SCORE_POINTS`]; otherwise the draw bonus (or the winner bonus, they
/// cannot both apply) is added to the one-side bonus.
pub fn score_guess(predicted: MatchScore, actual: MatchScore) -> u8 {
    if predicted == actual {
        return EXACT_SCORE_POINTS;
    }

    let mut points = 0;

    if predicted.is_draw() && actual.is_draw() {
        points += DRAW_POINTS;
    }

    if let Some(side) = winner(predicted) {
        if winner(actual) == Some(side) {
            points += WINNER_POINTS;
        }
    }

    if predicted.first == actual.first || predicted.second == actual.second {
        points += ONE_SIDE_POINTS;
    }

    points
}

/// Strict winner of a score pair; `None` for a draw.
fn winner(score: MatchScore) -> Option<Ordering> {
    match score.first.cmp(&score.second) {
        Ordering::Equal => None,
        side => Some(side),
    }
}
