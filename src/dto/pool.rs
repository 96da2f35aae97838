use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{PoolEntity, UserEntity},
    dto::{user::UserSummary, validation::validate_title},
};

/// Payload used to open a new pool.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreatePoolRequest {
    #[validate(custom(function = "validate_title"))]
    pub title: String,
}

/// Identifiers of a freshly created pool.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatePoolResponse {
    pub id: Uuid,
    /// Code other users type to join.
    pub code: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinPoolRequest {
    /// Join code; surrounding whitespace and case are ignored.
    #[validate(length(min = 1, max = 32))]
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JoinPoolResponse {
    pub participant_id: Uuid,
    pub pool_id: Uuid,
    /// Whether the caller became the owner of a previously owner-less pool.
    pub became_owner: bool,
}

/// One of the pools the caller belongs to, with a preview of its members.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PoolSummary {
    pub id: Uuid,
    pub title: String,
    pub code: String,
    pub owner_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: OffsetDateTime,
    pub participant_count: usize,
    /// First members by join order.
    pub participants: Vec<UserSummary>,
}

impl PoolSummary {
    pub fn new(pool: PoolEntity, participant_count: usize, preview: Vec<UserSummary>) -> Self {
        Self {
            id: pool.id,
            title: pool.title,
            code: pool.code,
            owner_id: pool.owner_id,
            created_at: pool.created_at,
            participant_count,
            participants: preview,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PoolDetail {
    pub id: Uuid,
    pub title: String,
    pub code: String,
    pub owner: Option<UserSummary>,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: OffsetDateTime,
    pub participant_count: usize,
}

impl PoolDetail {
    pub fn new(pool: PoolEntity, owner: Option<UserEntity>, participant_count: usize) -> Self {
        Self {
            id: pool.id,
            title: pool.title,
            code: pool.code,
            owner: owner.map(Into::into),
            created_at: pool.created_at,
            participant_count,
        }
    }
}
