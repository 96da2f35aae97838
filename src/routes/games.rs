use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::game::{CreateGameRequest, GameResponse, SetResultRequest, SetResultResponse},
    error::AppError,
    services::{auth_service::AuthContext, game_service},
    state::SharedState,
};

/// Game scheduling and result endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", post(create_game))
        .route("/games/{id}/result", put(set_result))
}

#[utoipa::path(
    post,
    path = "/games",
    tag = "games",
    request_body = CreateGameRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Game scheduled", body = GameResponse),
        (status = 400, description = "Invalid team code")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    _auth: AuthContext,
    Valid(Json(request)): Valid<Json<CreateGameRequest>>,
) -> Result<(StatusCode, Json<GameResponse>), AppError> {
    let game = game_service::create_game(
        &state,
        &request.first_team,
        &request.second_team,
        request.kickoff,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(game.into())))
}

/// Post or replace the official result and recompute every affected score.
#[utoipa::path(
    put,
    path = "/games/{id}/result",
    tag = "games",
    params(("id" = Uuid, Path, description = "Game id")),
    request_body = SetResultRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Result applied", body = SetResultResponse),
        (status = 400, description = "Points out of range"),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn set_result(
    State(state): State<SharedState>,
    _auth: AuthContext,
    Path(id): Path<Uuid>,
    Valid(Json(request)): Valid<Json<SetResultRequest>>,
) -> Result<Json<SetResultResponse>, AppError> {
    let report = game_service::set_game_result(&state, id, request.first, request.second).await?;
    Ok(Json(report.into()))
}
