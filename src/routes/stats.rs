use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::stats::CountResponse, error::AppError, services::stats_service, state::SharedState,
};

/// Public counters.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/pools/count", get(count_pools))
        .route("/guesses/count", get(count_guesses))
        .route("/users/count", get(count_users))
}

#[utoipa::path(
    get,
    path = "/pools/count",
    tag = "stats",
    responses((status = 200, description = "Number of pools", body = CountResponse))
)]
pub async fn count_pools(
    State(state): State<SharedState>,
) -> Result<Json<CountResponse>, AppError> {
    Ok(Json(stats_service::count_pools(&state).await?))
}

#[utoipa::path(
    get,
    path = "/guesses/count",
    tag = "stats",
    responses((status = 200, description = "Number of guesses", body = CountResponse))
)]
pub async fn count_guesses(
    State(state): State<SharedState>,
) -> Result<Json<CountResponse>, AppError> {
    Ok(Json(stats_service::count_guesses(&state).await?))
}

#[utoipa::path(
    get,
    path = "/users/count",
    tag = "stats",
    responses((status = 200, description = "Number of users", body = CountResponse))
)]
pub async fn count_users(
    State(state): State<SharedState>,
) -> Result<Json<CountResponse>, AppError> {
    Ok(Json(stats_service::count_users(&state).await?))
}
