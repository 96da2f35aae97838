use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::game::{GameResponse, ScoreDto};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Build an event from an already serialised payload.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PoolCreatedEvent {
    pub pool_id: Uuid,
    pub title: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PoolJoinedEvent {
    pub pool_id: Uuid,
    pub participant_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct GameCreatedEvent(pub GameResponse);

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast once a result has been committed and every guess rescored.
pub struct GameResultedEvent {
    pub game_id: Uuid,
    pub result: ScoreDto,
    pub guesses_rescored: usize,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast per pool whose ranking may have changed.
pub struct RankingUpdatedEvent {
    pub pool_id: Uuid,
}
