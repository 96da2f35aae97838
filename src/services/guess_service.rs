use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::{GameEntity, GuessEntity, GuessUpsert, MatchScore},
    error::ServiceError,
    services::pool_service::require_membership,
    state::SharedState,
};

/// Create or replace the prediction of `participant_id` for `game_id`.
///
/// Checks run in order: point range, participant and game existence, then the
/// deadline. Only the predicted pair and `updated_at` of an existing guess change.
pub async fn submit_guess(
    state: &SharedState,
    participant_id: Uuid,
    game_id: Uuid,
    first: i64,
    second: i64,
) -> Result<GuessEntity, ServiceError> {
    let predicted = MatchScore::checked(first, second).ok_or_else(|| {
        ServiceError::InvalidInput("guessed points must be between 0 and 99".into())
    })?;

    let store = state.require_pool_store().await?;
    store
        .find_participant(participant_id)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("participant `{participant_id}` not found"))
        })?;
    let game = store
        .find_game(game_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}` not found")))?;

    let now = state.clock().now();
    ensure_open(&game, now)?;

    let guess = store
        .upsert_guess(GuessUpsert {
            participant_id,
            game_id,
            predicted,
            submitted_at: now,
        })
        .await?;
    info!(guess_id = %guess.id, %participant_id, %game_id, "guess saved");
    Ok(guess)
}

/// Submit a guess on behalf of `user_id` inside `pool_id`.
pub async fn submit_pool_guess(
    state: &SharedState,
    user_id: Uuid,
    pool_id: Uuid,
    game_id: Uuid,
    first: i64,
    second: i64,
) -> Result<GuessEntity, ServiceError> {
    let store = state.require_pool_store().await?;
    let (_, participant) = require_membership(store.as_ref(), pool_id, user_id).await?;
    submit_guess(state, participant.id, game_id, first, second).await
}

fn ensure_open(game: &GameEntity, now: OffsetDateTime) -> Result<(), ServiceError> {
    if game.is_resulted() {
        return Err(ServiceError::DeadlinePassed(
            "the game already has a result".into(),
        ));
    }
    if now >= game.kickoff {
        return Err(ServiceError::DeadlinePassed(
            "guesses close at kickoff".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use time::{Duration, macros::datetime};

    use super::*;

    fn game(result: Option<MatchScore>) -> GameEntity {
        GameEntity {
            id: Uuid::new_v4(),
            kickoff: datetime!(2022-11-20 16:00 UTC),
            first_team: "QAT".into(),
            second_team: "ECU".into(),
            result,
            created_at: datetime!(2022-11-01 00:00 UTC),
        }
    }

    #[test]
    fn open_strictly_before_kickoff() {
        let scheduled = game(None);
        assert!(ensure_open(&scheduled, scheduled.kickoff - Duration::seconds(1)).is_ok());
        assert!(matches!(
            ensure_open(&scheduled, scheduled.kickoff),
            Err(ServiceError::DeadlinePassed(_))
        ));
    }

    #[test]
    fn kickoff_compares_instants_across_offsets() {
        let scheduled = game(None);
        // 12:59 at -03:00 is 15:59 UTC.
        assert!(ensure_open(&scheduled, datetime!(2022-11-20 12:59 -3)).is_ok());
        assert!(ensure_open(&scheduled, datetime!(2022-11-20 13:00 -3)).is_err());
    }

    #[test]
    fn resulted_game_is_closed() {
        let resulted = game(Some(MatchScore::new(0, 2)));
        assert!(matches!(
            ensure_open(&resulted, resulted.kickoff - Duration::days(1)),
            Err(ServiceError::DeadlinePassed(_))
        ));
    }
}
