/// Bearer token verification and user resolution.
pub mod auth_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Game scheduling and result recomputation.
pub mod game_service;
/// Guess admission.
pub mod guess_service;
/// Health check service.
pub mod health_service;
/// Pool creation, joining and listing.
pub mod pool_service;
/// Pool rankings.
pub mod ranking_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Public counters.
pub mod stats_service;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
/// User profile registration.
pub mod user_service;
