use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{dao::models::GuessEntity, dto::game::ScoreDto};

/// Predicted points of both sides.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitGuessRequest {
    #[validate(range(min = 0, max = 99))]
    pub first: i64,
    #[validate(range(min = 0, max = 99))]
    pub second: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GuessResponse {
    pub id: Uuid,
    pub participant_id: Uuid,
    pub game_id: Uuid,
    pub predicted: ScoreDto,
    /// Points earned; zero until the game is resulted.
    pub score: i32,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: OffsetDateTime,
}

impl From<GuessEntity> for GuessResponse {
    fn from(guess: GuessEntity) -> Self {
        Self {
            id: guess.id,
            participant_id: guess.participant_id,
            game_id: guess.game_id,
            predicted: guess.predicted.into(),
            score: guess.score,
            created_at: guess.created_at,
            updated_at: guess.updated_at,
        }
    }
}
