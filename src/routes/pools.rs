use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        game::PoolGameView,
        guess::{GuessResponse, SubmitGuessRequest},
        pool::{
            CreatePoolRequest, CreatePoolResponse, JoinPoolRequest, JoinPoolResponse, PoolDetail,
            PoolSummary,
        },
        ranking::PoolRankingResponse,
    },
    error::AppError,
    services::{
        auth_service::{AuthContext, Credential},
        game_service, guess_service, pool_service, ranking_service,
    },
    state::SharedState,
};

/// Pool membership, ranking and guess endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/pools", get(list_pools).post(create_pool))
        .route("/pools/join", post(join_pool))
        .route("/pools/{id}", get(get_pool))
        .route("/pools/{id}/ranking", get(get_ranking))
        .route("/pools/{id}/games", get(list_pool_games))
        .route("/pools/{pool_id}/games/{game_id}/guesses", post(submit_guess))
}

/// Open a pool. An authenticated caller becomes its owner and first participant.
#[utoipa::path(
    post,
    path = "/pools",
    tag = "pools",
    request_body = CreatePoolRequest,
    security((), ("bearer" = [])),
    responses(
        (status = 201, description = "Pool created", body = CreatePoolResponse),
        (status = 400, description = "Invalid title"),
        (status = 401, description = "Invalid token"),
        (status = 409, description = "No unique code could be allocated")
    )
)]
pub async fn create_pool(
    State(state): State<SharedState>,
    credential: Option<Credential>,
    Valid(Json(request)): Valid<Json<CreatePoolRequest>>,
) -> Result<(StatusCode, Json<CreatePoolResponse>), AppError> {
    let owner_id = credential.map(|c| c.user_id);
    let pool = pool_service::create_pool(&state, &request.title, owner_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatePoolResponse {
            id: pool.id,
            code: pool.code,
        }),
    ))
}

/// Join a pool by its code.
#[utoipa::path(
    post,
    path = "/pools/join",
    tag = "pools",
    request_body = JoinPoolRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Joined", body = JoinPoolResponse),
        (status = 404, description = "Unknown code"),
        (status = 409, description = "Already a participant")
    )
)]
pub async fn join_pool(
    State(state): State<SharedState>,
    auth: AuthContext,
    Valid(Json(request)): Valid<Json<JoinPoolRequest>>,
) -> Result<(StatusCode, Json<JoinPoolResponse>), AppError> {
    let outcome = pool_service::join_pool(&state, &request.code, auth.user_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(JoinPoolResponse {
            participant_id: outcome.participant.id,
            pool_id: outcome.participant.pool_id,
            became_owner: outcome.became_owner,
        }),
    ))
}

/// List the pools the caller participates in.
#[utoipa::path(
    get,
    path = "/pools",
    tag = "pools",
    security(("bearer" = [])),
    responses((status = 200, description = "Caller's pools", body = [PoolSummary]))
)]
pub async fn list_pools(
    State(state): State<SharedState>,
    auth: AuthContext,
) -> Result<Json<Vec<PoolSummary>>, AppError> {
    Ok(Json(pool_service::list_user_pools(&state, auth.user_id).await?))
}

#[utoipa::path(
    get,
    path = "/pools/{id}",
    tag = "pools",
    params(("id" = Uuid, Path, description = "Pool id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Pool detail", body = PoolDetail),
        (status = 403, description = "Caller does not participate"),
        (status = 404, description = "Unknown pool")
    )
)]
pub async fn get_pool(
    State(state): State<SharedState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<PoolDetail>, AppError> {
    Ok(Json(pool_service::get_pool(&state, auth.user_id, id).await?))
}

/// Ranking of a pool: score descending, ties to the earliest joiner.
#[utoipa::path(
    get,
    path = "/pools/{id}/ranking",
    tag = "pools",
    params(("id" = Uuid, Path, description = "Pool id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Ordered participants", body = PoolRankingResponse),
        (status = 403, description = "Caller does not participate"),
        (status = 404, description = "Unknown pool")
    )
)]
pub async fn get_ranking(
    State(state): State<SharedState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<PoolRankingResponse>, AppError> {
    let entries = ranking_service::get_member_ranking(&state, auth.user_id, id).await?;
    Ok(Json(PoolRankingResponse {
        pool_id: id,
        entries,
    }))
}

#[utoipa::path(
    get,
    path = "/pools/{id}/games",
    tag = "pools",
    params(("id" = Uuid, Path, description = "Pool id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Games with the caller's guesses", body = [PoolGameView]),
        (status = 403, description = "Caller does not participate"),
        (status = 404, description = "Unknown pool")
    )
)]
pub async fn list_pool_games(
    State(state): State<SharedState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PoolGameView>>, AppError> {
    Ok(Json(game_service::list_pool_games(&state, auth.user_id, id).await?))
}

/// Create or replace the caller's guess for a game.
#[utoipa::path(
    post,
    path = "/pools/{pool_id}/games/{game_id}/guesses",
    tag = "guesses",
    params(
        ("pool_id" = Uuid, Path, description = "Pool id"),
        ("game_id" = Uuid, Path, description = "Game id")
    ),
    request_body = SubmitGuessRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Guess saved", body = GuessResponse),
        (status = 400, description = "Points out of range"),
        (status = 403, description = "Caller does not participate"),
        (status = 404, description = "Unknown pool or game"),
        (status = 422, description = "Guesses are closed for this game")
    )
)]
pub async fn submit_guess(
    State(state): State<SharedState>,
    auth: AuthContext,
    Path((pool_id, game_id)): Path<(Uuid, Uuid)>,
    Valid(Json(request)): Valid<Json<SubmitGuessRequest>>,
) -> Result<(StatusCode, Json<GuessResponse>), AppError> {
    let guess = guess_service::submit_pool_guess(
        &state,
        auth.user_id,
        pool_id,
        game_id,
        request.first,
        request.second,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(guess.into())))
}
