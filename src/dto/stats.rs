use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Number of stored records of one kind.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CountResponse {
    pub count: u64,
}
