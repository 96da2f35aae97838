use axum::{Json, Router, extract::State, routing::get};
use axum_valid::Valid;

use crate::{
    dto::user::{UpsertProfileRequest, UserResponse},
    error::AppError,
    services::{
        auth_service::{AuthContext, Credential},
        user_service,
    },
    state::SharedState,
};

/// Profile endpoints of the token holder.
pub fn router() -> Router<SharedState> {
    Router::new().route("/me", get(me).put(upsert_profile))
}

/// Register or update the caller's profile. Only a valid token is required.
#[utoipa::path(
    put,
    path = "/me",
    tag = "users",
    request_body = UpsertProfileRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Profile saved", body = UserResponse),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn upsert_profile(
    State(state): State<SharedState>,
    credential: Credential,
    Valid(Json(request)): Valid<Json<UpsertProfileRequest>>,
) -> Result<Json<UserResponse>, AppError> {
    let user = user_service::upsert_profile(&state, credential, request).await?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Caller's profile", body = UserResponse),
        (status = 401, description = "Missing token or unregistered user")
    )
)]
pub async fn me(auth: AuthContext) -> Json<UserResponse> {
    Json(auth.user.into())
}
