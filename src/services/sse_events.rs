use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{GameEntity, JoinOutcome, PoolEntity, RecomputeReport},
    dto::sse::{
        GameCreatedEvent, GameResultedEvent, PoolCreatedEvent, PoolJoinedEvent,
        RankingUpdatedEvent, ServerEvent, SystemStatus,
    },
    state::SharedState,
};

const EVENT_POOL_CREATED: &str = "pool.created";
const EVENT_POOL_JOINED: &str = "pool.joined";
const EVENT_GAME_CREATED: &str = "game.created";
const EVENT_GAME_RESULTED: &str = "game.resulted";
const EVENT_RANKING_UPDATED: &str = "ranking.updated";
const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Broadcast that a new pool has been opened.
pub fn broadcast_pool_created(state: &SharedState, pool: &PoolEntity) {
    let payload = PoolCreatedEvent {
        pool_id: pool.id,
        title: pool.title.clone(),
    };
    send_public_event(state, EVENT_POOL_CREATED, &payload);
}

/// Broadcast that a user joined a pool.
pub fn broadcast_pool_joined(state: &SharedState, outcome: &JoinOutcome) {
    let payload = PoolJoinedEvent {
        pool_id: outcome.participant.pool_id,
        participant_id: outcome.participant.id,
        user_id: outcome.participant.user_id,
    };
    send_public_event(state, EVENT_POOL_JOINED, &payload);
}

/// Broadcast a newly scheduled game.
pub fn broadcast_game_created(state: &SharedState, game: &GameEntity) {
    let payload = GameCreatedEvent(game.clone().into());
    send_public_event(state, EVENT_GAME_CREATED, &payload);
}

/// Broadcast a committed result followed by one ranking update per affected pool.
pub fn broadcast_game_resulted(state: &SharedState, report: &RecomputeReport) {
    if let Some(result) = report.game.result {
        let payload = GameResultedEvent {
            game_id: report.game.id,
            result: result.into(),
            guesses_rescored: report.guesses_rescored,
        };
        send_public_event(state, EVENT_GAME_RESULTED, &payload);
    }

    for pool_id in &report.affected_pools {
        broadcast_ranking_updated(state, *pool_id);
    }
}

/// Broadcast that the ranking of `pool_id` may have changed.
pub fn broadcast_ranking_updated(state: &SharedState, pool_id: Uuid) {
    send_public_event(state, EVENT_RANKING_UPDATED, &RankingUpdatedEvent { pool_id });
}

/// Broadcast the degraded flag.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    send_public_event(state, EVENT_SYSTEM_STATUS, &SystemStatus { degraded });
}

/// Forward every degraded mode change to the public stream until the state is dropped.
pub async fn relay_system_status(state: SharedState) {
    let mut watcher = state.degraded_watcher();
    while watcher.changed().await.is_ok() {
        let degraded = *watcher.borrow_and_update();
        info!(degraded, "storage status changed");
        broadcast_system_status(&state, degraded);
    }
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(payload) => {
            let receivers = state.public_sse().broadcast(payload);
            debug!(event, receivers, "public SSE event sent");
        }
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}
