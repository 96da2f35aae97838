use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// One line of a pool ranking.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct RankingEntry {
    /// 1-based place in the list.
    pub position: usize,
    pub participant_id: Uuid,
    pub user_id: Uuid,
    pub score: i32,
    /// Profile name, absent when the user never registered a profile.
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub joined_at: OffsetDateTime,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PoolRankingResponse {
    pub pool_id: Uuid,
    pub entries: Vec<RankingEntry>,
}
