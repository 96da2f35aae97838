mod common;

use std::time::Duration as StdDuration;

use common::{START, harness, register};
use guess_pool_back::{
    dto::sse::ServerEvent,
    services::{game_service, guess_service, pool_service, sse_events, sse_service},
};
use serde_json::Value;
use time::Duration;
use tokio::{sync::broadcast::Receiver, time::timeout};

async fn next(receiver: &mut Receiver<ServerEvent>) -> (String, Value) {
    let event = timeout(StdDuration::from_secs(1), receiver.recv())
        .await
        .expect("event within a second")
        .unwrap();
    (
        event.event.unwrap_or_default(),
        serde_json::from_str(&event.data).unwrap(),
    )
}

#[tokio::test]
async fn result_announces_the_game_and_each_affected_ranking() {
    let h = harness().await;
    let user = register(&h.state, "Ana").await;
    let pool = pool_service::create_pool(&h.state, "Office", Some(user)).await.unwrap();
    let game = game_service::create_game(&h.state, "NED", "USA", START + Duration::hours(1))
        .await
        .unwrap();
    guess_service::submit_pool_guess(&h.state, user, pool.id, game.id, 3, 1)
        .await
        .unwrap();
    h.clock.advance(Duration::hours(2));

    let mut receiver = sse_service::subscribe_public(&h.state);
    game_service::set_game_result(&h.state, game.id, 3, 1).await.unwrap();

    let (name, payload) = next(&mut receiver).await;
    assert_eq!(name, "game.resulted");
    assert_eq!(payload["game_id"], game.id.to_string());
    assert_eq!(payload["result"]["first"], 3);

    let (name, payload) = next(&mut receiver).await;
    assert_eq!(name, "ranking.updated");
    assert_eq!(payload["pool_id"], pool.id.to_string());
}

#[tokio::test]
async fn pool_activity_is_published() {
    let h = harness().await;
    let mut receiver = sse_service::subscribe_public(&h.state);
    let user = register(&h.state, "Bia").await;

    let pool = pool_service::create_pool(&h.state, "Open", None).await.unwrap();
    pool_service::join_pool(&h.state, &pool.code, user).await.unwrap();

    let (name, payload) = next(&mut receiver).await;
    assert_eq!(name, "pool.created");
    assert_eq!(payload["title"], "Open");
    let (name, payload) = next(&mut receiver).await;
    assert_eq!(name, "pool.joined");
    assert_eq!(payload["user_id"], user.to_string());
}

#[tokio::test]
async fn degraded_changes_are_relayed() {
    let h = harness().await;
    let mut receiver = sse_service::subscribe_public(&h.state);
    tokio::spawn(sse_events::relay_system_status(h.state.clone()));
    tokio::task::yield_now().await;

    h.state.clear_pool_store().await;
    let (name, payload) = next(&mut receiver).await;
    assert_eq!(name, "system.status");
    assert_eq!(payload["degraded"], true);

    let handshake = sse_service::handshake(&h.state).unwrap();
    assert_eq!(handshake.event.as_deref(), Some("handshake"));
    assert!(handshake.data.contains("\"degraded\":true"));
}
