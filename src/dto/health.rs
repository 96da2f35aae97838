use serde::Serialize;
use utoipa::ToSchema;

/// Liveness payload returned by `/healthcheck`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok` while storage answers, `degraded` otherwise.
    pub status: String,
    /// Whether storage-backed routes currently answer 503.
    pub degraded: bool,
}

impl HealthResponse {
    pub fn new(degraded: bool) -> Self {
        Self {
            status: if degraded { "degraded" } else { "ok" }.to_owned(),
            degraded,
        }
    }
}
