use crate::{dto::stats::CountResponse, error::ServiceError, state::SharedState};

/// Number of pools ever created.
pub async fn count_pools(state: &SharedState) -> Result<CountResponse, ServiceError> {
    let store = state.require_pool_store().await?;
    Ok(CountResponse {
        count: store.count_pools().await?,
    })
}

/// Number of stored guesses.
pub async fn count_guesses(state: &SharedState) -> Result<CountResponse, ServiceError> {
    let store = state.require_pool_store().await?;
    Ok(CountResponse {
        count: store.count_guesses().await?,
    })
}

/// Number of registered users.
pub async fn count_users(state: &SharedState) -> Result<CountResponse, ServiceError> {
    let store = state.require_pool_store().await?;
    Ok(CountResponse {
        count: store.count_users().await?,
    })
}
