use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

#[derive(OpenApi)]
/// Aggregated OpenAPI document for the guess pool backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::stats::count_pools,
        crate::routes::stats::count_guesses,
        crate::routes::stats::count_users,
        crate::routes::pools::create_pool,
        crate::routes::pools::join_pool,
        crate::routes::pools::list_pools,
        crate::routes::pools::get_pool,
        crate::routes::pools::get_ranking,
        crate::routes::pools::list_pool_games,
        crate::routes::pools::submit_guess,
        crate::routes::games::create_game,
        crate::routes::games::set_result,
        crate::routes::users::upsert_profile,
        crate::routes::users::me,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::stats::CountResponse,
            crate::dto::pool::CreatePoolRequest,
            crate::dto::pool::CreatePoolResponse,
            crate::dto::pool::JoinPoolRequest,
            crate::dto::pool::JoinPoolResponse,
            crate::dto::pool::PoolSummary,
            crate::dto::pool::PoolDetail,
            crate::dto::user::UpsertProfileRequest,
            crate::dto::user::UserResponse,
            crate::dto::user::UserSummary,
            crate::dto::game::ScoreDto,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::SetResultRequest,
            crate::dto::game::GameResponse,
            crate::dto::game::SetResultResponse,
            crate::dto::game::PoolGameView,
            crate::dto::guess::SubmitGuessRequest,
            crate::dto::guess::GuessResponse,
            crate::dto::ranking::RankingEntry,
            crate::dto::ranking::PoolRankingResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::PoolCreatedEvent,
            crate::dto::sse::PoolJoinedEvent,
            crate::dto::sse::GameCreatedEvent,
            crate::dto::sse::GameResultedEvent,
            crate::dto::sse::RankingUpdatedEvent,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "stats", description = "Public counters"),
        (name = "pools", description = "Pool creation, membership and ranking"),
        (name = "games", description = "Game scheduling and results"),
        (name = "guesses", description = "Predictions of pool participants"),
        (name = "users", description = "Profile of the token holder"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` scheme referenced by secured operations.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_secured_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/pools/{id}/ranking"));
        assert!(doc.paths.paths.contains_key("/games/{id}/result"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer"));
    }
}
