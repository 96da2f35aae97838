use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{GameEntity, MatchScore, RecomputeReport},
    dto::{guess::GuessResponse, validation::validate_team_code},
};

/// Points of both sides of a game.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ScoreDto {
    pub first: u8,
    pub second: u8,
}

impl From<MatchScore> for ScoreDto {
    fn from(score: MatchScore) -> Self {
        Self {
            first: score.first,
            second: score.second,
        }
    }
}

/// Payload used to schedule a game.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateGameRequest {
    #[validate(custom(function = "validate_team_code"))]
    pub first_team: String,
    #[validate(custom(function = "validate_team_code"))]
    pub second_team: String,
    /// RFC 3339 kickoff instant, offset included.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub kickoff: OffsetDateTime,
}

/// Official result of a game.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SetResultRequest {
    #[validate(range(min = 0, max = 99))]
    pub first: i64,
    #[validate(range(min = 0, max = 99))]
    pub second: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GameResponse {
    pub id: Uuid,
    pub first_team: String,
    pub second_team: String,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub kickoff: OffsetDateTime,
    /// Present once the game has been resulted.
    pub result: Option<ScoreDto>,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: OffsetDateTime,
}

impl From<GameEntity> for GameResponse {
    fn from(game: GameEntity) -> Self {
        Self {
            id: game.id,
            first_team: game.first_team,
            second_team: game.second_team,
            kickoff: game.kickoff,
            result: game.result.map(Into::into),
            created_at: game.created_at,
        }
    }
}

/// Outcome of posting a result.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SetResultResponse {
    pub game: GameResponse,
    pub guesses_rescored: usize,
    pub participants_updated: usize,
    pub affected_pools: Vec<Uuid>,
}

impl From<RecomputeReport> for SetResultResponse {
    fn from(report: RecomputeReport) -> Self {
        Self {
            game: report.game.into(),
            guesses_rescored: report.guesses_rescored,
            participants_updated: report.participant_scores.len(),
            affected_pools: report.affected_pools,
        }
    }
}

/// A game as seen from inside a pool, with the caller's own guess if any.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PoolGameView {
    pub game: GameResponse,
    pub guess: Option<GuessResponse>,
}
