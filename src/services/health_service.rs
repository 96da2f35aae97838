use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Ping the installed store and report the degraded flag.
///
/// A failed ping is only logged here; the storage supervisor owns the flag.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.pool_store().await {
        Some(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        None => warn!("no storage installed (degraded mode)"),
    }

    HealthResponse::new(state.is_degraded())
}
