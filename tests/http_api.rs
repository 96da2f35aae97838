mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{SECRET, START, harness};
use guess_pool_back::{routes, services::auth_service::Claims};
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

fn token(user_id: Uuid) -> String {
    encode(
        &Header::default(),
        &Claims {
            sub: user_id.to_string(),
            exp: 4_102_444_800,
        },
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn sign_up(app: &Router, name: &str) -> String {
    let bearer = token(Uuid::new_v4());
    let (status, _) = send(
        app,
        "PUT",
        "/me",
        Some(&bearer),
        Some(json!({"name": name, "email": "player@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    bearer
}

#[tokio::test]
async fn profile_requires_a_valid_token() {
    let h = harness().await;
    let app = routes::router(h.state.clone());

    let (status, _) = send(&app, "GET", "/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/me", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let bearer = token(Uuid::new_v4());
    let (status, _) = send(&app, "GET", "/me", Some(&bearer), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let bearer = sign_up(&app, "Ana").await;
    let (status, body) = send(&app, "GET", "/me", Some(&bearer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Ana");

    let (status, body) = send(&app, "GET", "/users/count", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn pool_lifecycle_over_http() {
    let h = harness().await;
    let app = routes::router(h.state.clone());
    let ana = sign_up(&app, "Ana").await;
    let bia = sign_up(&app, "Bia").await;

    let (status, created) =
        send(&app, "POST", "/pools", Some(&ana), Some(json!({"title": "Office"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let pool_id = created["id"].as_str().unwrap().to_owned();
    let code = created["code"].as_str().unwrap().to_owned();

    let (status, _) = send(&app, "GET", &format!("/pools/{pool_id}"), Some(&bia), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, joined) =
        send(&app, "POST", "/pools/join", Some(&bia), Some(json!({"code": code}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(joined["became_owner"], false);

    let (status, _) =
        send(&app, "POST", "/pools/join", Some(&bia), Some(json!({"code": code}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let kickoff = (START + Duration::hours(1))
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap();
    let (status, game) = send(
        &app,
        "POST",
        "/games",
        Some(&ana),
        Some(json!({"first_team": "BRA", "second_team": "SUI", "kickoff": kickoff})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let game_id = game["id"].as_str().unwrap().to_owned();

    let guess_uri = format!("/pools/{pool_id}/games/{game_id}/guesses");
    let (status, _) = send(
        &app,
        "POST",
        &guess_uri,
        Some(&bia),
        Some(json!({"first": 1, "second": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        "POST",
        &guess_uri,
        Some(&bia),
        Some(json!({"first": 120, "second": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    h.clock.advance(Duration::hours(2));
    let (status, _) = send(
        &app,
        "POST",
        &guess_uri,
        Some(&ana),
        Some(json!({"first": 1, "second": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, report) = send(
        &app,
        "PUT",
        &format!("/games/{game_id}/result"),
        Some(&ana),
        Some(json!({"first": 1, "second": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["guesses_rescored"], 1);

    let (status, ranking) = send(
        &app,
        "GET",
        &format!("/pools/{pool_id}/ranking"),
        Some(&ana),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ranking["entries"][0]["name"], "Bia");
    assert_eq!(ranking["entries"][0]["score"], 5);
    assert_eq!(ranking["entries"][1]["score"], 0);

    let (status, pools) = send(&app, "GET", "/pools", Some(&bia), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pools.as_array().map(Vec::len), Some(1));
    assert_eq!(pools[0]["participant_count"], 2);
}

#[tokio::test]
async fn anonymous_pool_creation_is_allowed() {
    let h = harness().await;
    let app = routes::router(h.state.clone());

    let (status, created) =
        send(&app, "POST", "/pools", None, Some(json!({"title": "Open"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["code"].as_str().map(str::len), Some(6));

    let (status, _) = send(
        &app,
        "POST",
        "/pools",
        Some("garbage"),
        Some(json!({"title": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, count) = send(&app, "GET", "/pools/count", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(count["count"], 1);
}

#[tokio::test]
async fn degraded_backend_answers_service_unavailable() {
    let h = harness().await;
    h.state.clear_pool_store().await;
    let app = routes::router(h.state.clone());

    let (status, _) = send(&app, "GET", "/guesses/count", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = send(&app, "GET", "/healthcheck", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
}
