use axum::Router;

use crate::state::SharedState;

pub mod auth;
pub mod docs;
pub mod games;
pub mod health;
pub mod pools;
pub mod sse;
pub mod stats;
pub mod users;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(stats::router())
        .merge(pools::router())
        .merge(games::router())
        .merge(users::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
