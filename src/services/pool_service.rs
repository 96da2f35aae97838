use std::collections::HashMap;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::{JoinOutcome, ParticipantEntity, PoolEntity},
        pool_store::PoolStore,
        storage::StorageError,
    },
    dto::{
        pool::{PoolDetail, PoolSummary},
        user::UserSummary,
        validation::validate_title,
    },
    engine::code::normalize_code,
    error::ServiceError,
    services::sse_events,
    state::SharedState,
};

/// Members listed in a pool summary.
const PARTICIPANT_PREVIEW: usize = 4;

/// Open a pool under a freshly generated code, enrolling `owner_id` when given.
///
/// Code collisions are retried with a new code up to the configured number of
/// attempts, after which the call fails with [`ServiceError::Conflict`].
pub async fn create_pool(
    state: &SharedState,
    title: &str,
    owner_id: Option<Uuid>,
) -> Result<PoolEntity, ServiceError> {
    validate_title(title).map_err(|err| ServiceError::invalid_field("title", err))?;
    let title = title.trim().to_owned();
    let store = state.require_pool_store().await?;
    let created_at = state.clock().now();
    let attempts = state.config().max_code_attempts();

    for attempt in 1..=attempts {
        let pool = PoolEntity {
            id: Uuid::now_v7(),
            title: title.clone(),
            code: state.codes().next_code(),
            owner_id,
            created_at,
        };
        let owner = owner_id.map(|user_id| ParticipantEntity::new(user_id, pool.id, created_at));

        match store.insert_pool(pool.clone(), owner).await {
            Ok(()) => {
                info!(pool_id = %pool.id, code = %pool.code, "pool created");
                sse_events::broadcast_pool_created(state, &pool);
                return Ok(pool);
            }
            Err(StorageError::DuplicateKey { .. }) => {
                debug!(attempt, code = %pool.code, "pool code already taken; regenerating");
            }
            Err(err) => return Err(err.into()),
        }
    }

    warn!(attempts, "could not allocate a unique pool code");
    Err(ServiceError::Conflict(
        "could not allocate a unique pool code".into(),
    ))
}

/// Enrol `user_id` in the pool identified by `code`.
///
/// The first user joining a pool without owner becomes its owner.
pub async fn join_pool(
    state: &SharedState,
    code: &str,
    user_id: Uuid,
) -> Result<JoinOutcome, ServiceError> {
    let code = normalize_code(code);
    let store = state.require_pool_store().await?;
    let pool = store
        .find_pool_by_code(code.clone())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("no pool with code `{code}`")))?;

    if store.find_membership(pool.id, user_id).await?.is_some() {
        return Err(ServiceError::Conflict(
            "user already participates in this pool".into(),
        ));
    }

    let participant = ParticipantEntity::new(user_id, pool.id, state.clock().now());
    let outcome = store.join_pool(participant).await.map_err(|err| match err {
        StorageError::DuplicateKey { .. } => {
            ServiceError::Conflict("user already participates in this pool".into())
        }
        other => other.into(),
    })?;

    info!(
        pool_id = %pool.id,
        %user_id,
        became_owner = outcome.became_owner,
        "user joined pool"
    );
    sse_events::broadcast_pool_joined(state, &outcome);
    Ok(outcome)
}

/// Pools `user_id` participates in, most recently joined first.
pub async fn list_user_pools(
    state: &SharedState,
    user_id: Uuid,
) -> Result<Vec<PoolSummary>, ServiceError> {
    let store = state.require_pool_store().await?;
    let mut memberships = store.list_user_memberships(user_id).await?;
    memberships.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

    let mut pools = Vec::with_capacity(memberships.len());
    for membership in memberships {
        let Some(pool) = store.find_pool(membership.pool_id).await? else {
            warn!(pool_id = %membership.pool_id, "membership references a missing pool");
            continue;
        };

        let mut participants = store.list_pool_participants(pool.id).await?;
        let participant_count = participants.len();
        participants.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        participants.truncate(PARTICIPANT_PREVIEW);

        let preview = user_summaries(
            store.as_ref(),
            participants.iter().map(|p| p.user_id).collect(),
        )
        .await?;
        pools.push(PoolSummary::new(pool, participant_count, preview));
    }

    Ok(pools)
}

/// Detail of a pool the caller participates in.
pub async fn get_pool(
    state: &SharedState,
    user_id: Uuid,
    pool_id: Uuid,
) -> Result<PoolDetail, ServiceError> {
    let store = state.require_pool_store().await?;
    let (pool, _) = require_membership(store.as_ref(), pool_id, user_id).await?;

    let owner = match pool.owner_id {
        Some(owner_id) => store.find_user(owner_id).await?,
        None => None,
    };
    let participant_count = store.list_pool_participants(pool.id).await?.len();
    Ok(PoolDetail::new(pool, owner, participant_count))
}

/// Resolve the pool and the caller's membership in it.
pub(crate) async fn require_membership(
    store: &dyn PoolStore,
    pool_id: Uuid,
    user_id: Uuid,
) -> Result<(PoolEntity, ParticipantEntity), ServiceError> {
    let pool = store
        .find_pool(pool_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("pool `{pool_id}` not found")))?;
    let participant = store
        .find_membership(pool_id, user_id)
        .await?
        .ok_or_else(|| ServiceError::Forbidden("caller does not participate in this pool".into()))?;
    Ok((pool, participant))
}

/// Profiles of `user_ids`, in the given order, skipping users without a profile.
async fn user_summaries(
    store: &dyn PoolStore,
    user_ids: Vec<Uuid>,
) -> Result<Vec<UserSummary>, ServiceError> {
    let mut users: HashMap<Uuid, UserSummary> = store
        .find_users(user_ids.clone())
        .await?
        .into_iter()
        .map(|user| (user.id, user.into()))
        .collect();
    Ok(user_ids
        .iter()
        .filter_map(|id| users.remove(id))
        .collect())
}
