use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    dao::models::UserEntity,
    dto::ranking::RankingEntry,
    engine::ranking::rank,
    error::ServiceError,
    services::pool_service::require_membership,
    state::SharedState,
};

/// Participants of `pool_id` in ranking order.
pub async fn get_pool_ranking(
    state: &SharedState,
    pool_id: Uuid,
) -> Result<Vec<RankingEntry>, ServiceError> {
    let store = state.require_pool_store().await?;
    store
        .find_pool(pool_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("pool `{pool_id}` not found")))?;

    let participants = rank(store.list_pool_participants(pool_id).await?);
    let users: HashMap<Uuid, UserEntity> = store
        .find_users(participants.iter().map(|p| p.user_id).collect())
        .await?
        .into_iter()
        .map(|user| (user.id, user))
        .collect();

    Ok(participants
        .into_iter()
        .enumerate()
        .map(|(index, participant)| {
            let user = users.get(&participant.user_id);
            RankingEntry {
                position: index + 1,
                participant_id: participant.id,
                user_id: participant.user_id,
                score: participant.score,
                name: user.map(|u| u.name.clone()),
                avatar_url: user.and_then(|u| u.avatar_url.clone()),
                joined_at: participant.created_at,
            }
        })
        .collect())
}

/// Ranking of a pool the caller participates in.
pub async fn get_member_ranking(
    state: &SharedState,
    user_id: Uuid,
    pool_id: Uuid,
) -> Result<Vec<RankingEntry>, ServiceError> {
    let store = state.require_pool_store().await?;
    require_membership(store.as_ref(), pool_id, user_id).await?;
    get_pool_ranking(state, pool_id).await
}
