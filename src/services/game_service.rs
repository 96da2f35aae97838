use std::collections::HashMap;

use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::{GameEntity, MatchScore, RecomputeReport},
    dto::{game::PoolGameView, validation::validate_team_code},
    error::ServiceError,
    services::{pool_service::require_membership, sse_events},
    state::SharedState,
};

/// Schedule a game between two teams.
pub async fn create_game(
    state: &SharedState,
    first_team: &str,
    second_team: &str,
    kickoff: OffsetDateTime,
) -> Result<GameEntity, ServiceError> {
    validate_team_code(first_team)
        .map_err(|err| ServiceError::invalid_field("first_team", err))?;
    validate_team_code(second_team)
        .map_err(|err| ServiceError::invalid_field("second_team", err))?;

    let store = state.require_pool_store().await?;
    let game = GameEntity {
        id: Uuid::now_v7(),
        kickoff,
        first_team: first_team.trim().to_owned(),
        second_team: second_team.trim().to_owned(),
        result: None,
        created_at: state.clock().now(),
    };
    store.insert_game(game.clone()).await?;

    info!(game_id = %game.id, kickoff = %game.kickoff, "game scheduled");
    sse_events::broadcast_game_created(state, &game);
    Ok(game)
}

/// Post the official result of a game and recompute every affected score.
///
/// Input is validated before anything is touched. The rescoring of the game's
/// guesses and the rebuild of their owners' totals commit together or not at
/// all. Posting a result again replaces the previous one; scores are always
/// recomputed from scratch.
pub async fn set_game_result(
    state: &SharedState,
    game_id: Uuid,
    first: i64,
    second: i64,
) -> Result<RecomputeReport, ServiceError> {
    let result = MatchScore::checked(first, second).ok_or_else(|| {
        ServiceError::InvalidInput("result points must be between 0 and 99".into())
    })?;
    let store = state.require_pool_store().await?;

    let _guard = state.lock_game_result(game_id).await;

    let report = store
        .apply_game_result(game_id, result)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}` not found")))?;

    info!(
        %game_id,
        first = result.first,
        second = result.second,
        guesses = report.guesses_rescored,
        participants = report.participant_scores.len(),
        pools = report.affected_pools.len(),
        "game result applied"
    );
    sse_events::broadcast_game_resulted(state, &report);
    Ok(report)
}

/// Every game, latest kickoff first, with the caller's guess inside `pool_id`.
pub async fn list_pool_games(
    state: &SharedState,
    user_id: Uuid,
    pool_id: Uuid,
) -> Result<Vec<PoolGameView>, ServiceError> {
    let store = state.require_pool_store().await?;
    let (_, participant) = require_membership(store.as_ref(), pool_id, user_id).await?;

    let mut games = store.list_games().await?;
    games.sort_by(|a, b| b.kickoff.cmp(&a.kickoff).then(a.id.cmp(&b.id)));

    let mut guesses: HashMap<Uuid, _> = store
        .list_participant_guesses(participant.id)
        .await?
        .into_iter()
        .map(|guess| (guess.game_id, guess))
        .collect();

    Ok(games
        .into_iter()
        .map(|game| PoolGameView {
            guess: guesses.remove(&game.id).map(Into::into),
            game: game.into(),
        })
        .collect())
}
