use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Points scored (or predicted) by both sides of a game.
///
/// Both sides always travel together so a half-written result cannot be represented.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MatchScore {
    /// Points of the first team.
    pub first: u8,
    /// Points of the second team.
    pub second: u8,
}

impl MatchScore {
    /// Highest number of points accepted for either side.
    pub const MAX_POINTS: u8 = 99;

    /// Build a score pair.
    pub const fn new(first: u8, second: u8) -> Self {
        Self { first, second }
    }

    /// Build a score pair from caller supplied integers, rejecting values outside `0..=99`.
    pub fn checked(first: i64, second: i64) -> Option<Self> {
        let range = 0..=i64::from(Self::MAX_POINTS);
        if range.contains(&first) && range.contains(&second) {
            Some(Self::new(first as u8, second as u8))
        } else {
            None
        }
    }

    /// Whether both sides scored the same.
    pub fn is_draw(&self) -> bool {
        self.first == self.second
    }
}

/// Registered user profile. Identity itself is verified elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEntity {
    /// Stable identifier, equal to the subject of the user's tokens.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Optional avatar picture.
    pub avatar_url: Option<String>,
    /// First registration time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A group contest identified by a short join code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolEntity {
    /// Primary key of the pool.
    pub id: Uuid,
    /// Human readable title.
    pub title: String,
    /// Unique 6-character uppercase alphanumeric join code.
    pub code: String,
    /// User owning the pool, if any.
    pub owner_id: Option<Uuid>,
    /// Creation timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A user's membership and standing within one pool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantEntity {
    /// Primary key of the participant.
    pub id: Uuid,
    /// Member user.
    pub user_id: Uuid,
    /// Pool the membership belongs to.
    pub pool_id: Uuid,
    /// Sum of the scores of every guess owned by this participant.
    pub score: i32,
    /// Join time, used to break ranking ties.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ParticipantEntity {
    /// Fresh membership with a zero score.
    pub fn new(user_id: Uuid, pool_id: Uuid, joined_at: OffsetDateTime) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            pool_id,
            score: 0,
            created_at: joined_at,
        }
    }
}

/// A match with a scheduled kickoff and, once available, an official result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Scheduled kickoff; guesses are closed from this instant on.
    #[serde(with = "time::serde::rfc3339")]
    pub kickoff: OffsetDateTime,
    /// Code of the first team (usually a country code).
    pub first_team: String,
    /// Code of the second team.
    pub second_team: String,
    /// Official result, absent while the game is scheduled.
    pub result: Option<MatchScore>,
    /// Creation timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl GameEntity {
    /// Whether an official result has been posted.
    pub fn is_resulted(&self) -> bool {
        self.result.is_some()
    }
}

/// A participant's prediction for one game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuessEntity {
    /// Primary key of the guess.
    pub id: Uuid,
    /// Owner of the guess.
    pub participant_id: Uuid,
    /// Game being predicted.
    pub game_id: Uuid,
    /// Predicted result.
    pub predicted: MatchScore,
    /// Points earned; zero until the game has a result.
    pub score: i32,
    /// First submission time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last time the prediction changed.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Prediction written by the admission layer; the store decides whether it creates or updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessUpsert {
    /// Owner of the guess.
    pub participant_id: Uuid,
    /// Game being predicted.
    pub game_id: Uuid,
    /// Predicted result.
    pub predicted: MatchScore,
    /// Submission time.
    pub submitted_at: OffsetDateTime,
}

/// Result of a successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// The membership that was created.
    pub participant: ParticipantEntity,
    /// Whether the joining user became the pool owner.
    pub became_owner: bool,
}

/// Summary of a committed result recomputation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecomputeReport {
    /// Game as committed, with its new result.
    pub game: GameEntity,
    /// Number of guesses rescored.
    pub guesses_rescored: usize,
    /// New totals of every participant owning a guess on the game.
    pub participant_scores: Vec<(Uuid, i32)>,
    /// Pools whose ranking may have changed.
    pub affected_pools: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_accepts_bounds() {
        assert_eq!(MatchScore::checked(0, 99), Some(MatchScore::new(0, 99)));
        assert_eq!(MatchScore::checked(99, 0), Some(MatchScore::new(99, 0)));
    }

    #[test]
    fn checked_rejects_out_of_range() {
        assert_eq!(MatchScore::checked(-1, 0), None);
        assert_eq!(MatchScore::checked(0, 100), None);
        assert_eq!(MatchScore::checked(i64::MAX, i64::MIN), None);
    }
}
