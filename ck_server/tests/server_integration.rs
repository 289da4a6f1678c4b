//! Integration tests for the HTTP API.
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chkobba::{GameMode, Lobby, LobbyConfig, PlayerId, game::Card};
use ck_server::api::{AppState, create_router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt; // For `oneshot` method

fn create_test_server() -> (axum::Router, Lobby) {
    let lobby = Lobby::new(LobbyConfig {
        // no fallback ticks during tests
        fallback_think_ms: 3_600_000,
        ..Default::default()
    });
    let app = create_router(AppState {
        lobby: lobby.clone(),
    });
    (app, lobby)
}

fn request(method: &str, uri: &str, player: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(player) = player {
        builder = builder.header("x-player-id", player);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn dealt_match(lobby: &Lobby) -> String {
    let m = lobby
        .create_match(
            GameMode::OneVsOne,
            5,
            vec![PlayerId::new("alice"), PlayerId::new("bob")],
        )
        .await
        .unwrap();
    lobby.deal(&m.id).await.unwrap();
    m.id
}

fn first_card_in_hand(view: &Value, player: &str) -> String {
    let me = view["players"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["id"] == player)
        .unwrap();
    let card: Card = serde_json::from_value(me["hand"][0].clone()).unwrap();
    card.id().as_str().to_string()
}

// ============================================================================
// Public endpoints
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let (app, _) = create_test_server();

    let response = app
        .clone()
        .oneshot(request("GET", "/health", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let (_, body) = send(&app, request("GET", "/health", None, None)).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["matches"]["active_count"], 0);
}

#[tokio::test]
async fn test_config_surface() {
    let (app, _) = create_test_server();

    let (status, body) = send(&app, request("GET", "/api/v1/config", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid_stakes"], json!([1, 3, 5, 10]));
    assert_eq!(body["modes"], json!(["1v1", "2v2"]));
    assert_eq!(body["queue_wait_secs"], 20);
    assert_eq!(body["queue_max_wait_secs"], 30);
}

// ============================================================================
// Queue
// ============================================================================

#[tokio::test]
async fn test_queue_requires_identity() {
    let (app, _) = create_test_server();
    let body = json!({"stake": 5, "mode": "1v1"});

    let (status, _) = send(
        &app,
        request("POST", "/api/v1/queue/join", None, Some(body.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        request("POST", "/api/v1/queue/join", Some("bot-1234abcd"), Some(body)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_join_with_invalid_stake_is_rejected() {
    let (app, lobby) = create_test_server();

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/v1/queue/join",
            Some("alice"),
            Some(json!({"stake": 4, "mode": "1v1"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains('4'));
    assert_eq!(lobby.queue_size(4, GameMode::OneVsOne).await, 0);
}

#[tokio::test]
async fn test_join_size_and_cancel() {
    let (app, _) = create_test_server();
    let body = json!({"stake": 5, "mode": "2v2"});

    let (status, joined) = send(
        &app,
        request("POST", "/api/v1/queue/join", Some("alice"), Some(body.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(joined["entry"]["player_id"], "alice");
    assert_eq!(joined["match_id"], Value::Null);

    let (status, _) = send(
        &app,
        request("POST", "/api/v1/queue/join", Some("alice"), Some(body.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, size) = send(&app, request("GET", "/api/v1/queue/5/2v2", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(size["size"], 1);

    let (_, cancelled) = send(
        &app,
        request("POST", "/api/v1/queue/cancel", Some("alice"), Some(body.clone())),
    )
    .await;
    assert_eq!(cancelled["cancelled"], true);

    let (_, cancelled) = send(
        &app,
        request("POST", "/api/v1/queue/cancel", Some("alice"), Some(body)),
    )
    .await;
    assert_eq!(cancelled["cancelled"], false);

    let (_, size) = send(&app, request("GET", "/api/v1/queue/5/2v2", None, None)).await;
    assert_eq!(size["size"], 0);
}

#[tokio::test]
async fn test_queue_size_rejects_unknown_mode() {
    let (app, _) = create_test_server();
    let (status, _) = send(&app, request("GET", "/api/v1/queue/5/3v3", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Matches
// ============================================================================

#[tokio::test]
async fn test_unknown_match() {
    let (app, _) = create_test_server();

    let (status, body) = send(
        &app,
        request("GET", "/api/v1/matches/does-not-exist", Some("alice"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Match not found");

    let (status, _) = send(
        &app,
        request("GET", "/api/v1/players/me/match", Some("alice"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_view_is_redacted_and_private() {
    let (app, lobby) = create_test_server();
    let match_id = dealt_match(&lobby).await;

    let (status, view) = send(
        &app,
        request("GET", &format!("/api/v1/matches/{match_id}"), Some("alice"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["status"], "playing");
    assert_eq!(view["table"].as_array().unwrap().len(), 4);
    for player in view["players"].as_array().unwrap() {
        assert_eq!(player["hand_size"], 3);
        let visible = player["hand"].as_array().unwrap().len();
        if player["id"] == "alice" {
            assert_eq!(visible, 3);
        } else {
            assert_eq!(visible, 0);
        }
    }

    let (status, _) = send(
        &app,
        request("GET", &format!("/api/v1/matches/{match_id}"), Some("mallory"), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, seated) = send(
        &app,
        request("GET", "/api/v1/players/me/match", Some("bob"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(seated["id"], match_id.as_str());
}

#[tokio::test]
async fn test_moves_follow_turn_order() {
    let (app, lobby) = create_test_server();
    let match_id = dealt_match(&lobby).await;
    let moves_uri = format!("/api/v1/matches/{match_id}/moves");

    let (_, view) = send(
        &app,
        request("GET", &format!("/api/v1/matches/{match_id}"), Some("alice"), None),
    )
    .await;
    let card = first_card_in_hand(&view, "alice");

    // bob is out of turn
    let (status, _) = send(
        &app,
        request(
            "POST",
            &moves_uri,
            Some("bob"),
            Some(json!({"kind": "play", "card": card})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // alice does not hold a card she never drew
    let (status, _) = send(
        &app,
        request(
            "POST",
            &moves_uri,
            Some("alice"),
            Some(json!({"kind": "play", "card": "nowhere-Z"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, played) = send(
        &app,
        request(
            "POST",
            &moves_uri,
            Some("alice"),
            Some(json!({"kind": "play", "card": card})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(played["record"]["action"], "play");
    assert_eq!(played["turn"]["outcome"], "continued");
    assert_eq!(played["view"]["current_player"], "bob");

    // only the acting player may pass
    let end_turn_uri = format!("/api/v1/matches/{match_id}/end-turn");
    let (status, _) = send(&app, request("POST", &end_turn_uri, Some("alice"), None)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, passed) = send(&app, request("POST", &end_turn_uri, Some("bob"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(passed["view"]["current_player"], "alice");
}

#[tokio::test]
async fn test_complete_abandoned_match() {
    let (app, lobby) = create_test_server();
    let match_id = dealt_match(&lobby).await;
    let complete_uri = format!("/api/v1/matches/{match_id}/complete");

    let (status, _) = send(&app, request("POST", &complete_uri, Some("mallory"), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, request("POST", &complete_uri, Some("alice"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["match_id"], match_id.as_str());
    assert_eq!(body["settlements"], Value::Null);
    assert_eq!(lobby.active_matches().await, 0);

    let (status, _) = send(&app, request("POST", &complete_uri, Some("alice"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_concurrent_end_turn_passes_once() {
    let (app, lobby) = create_test_server();
    let players: Vec<PlayerId> = ["alice", "bob", "carol", "dave"]
        .into_iter()
        .map(PlayerId::new)
        .collect();
    let m = lobby
        .create_match(GameMode::TwoVsTwo, 5, players)
        .await
        .unwrap();
    lobby.deal(&m.id).await.unwrap();
    let end_turn_uri = format!("/api/v1/matches/{}/end-turn", m.id);

    let ((first, _), (second, _)) = tokio::join!(
        send(&app, request("POST", &end_turn_uri, Some("alice"), None)),
        send(&app, request("POST", &end_turn_uri, Some("alice"), None)),
    );
    let mut statuses = [first, second];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT]);

    let (_, view) = send(
        &app,
        request("GET", &format!("/api/v1/matches/{}", m.id), Some("bob"), None),
    )
    .await;
    assert_eq!(view["current_player"], "bob");
}

#[tokio::test]
async fn test_seated_player_cannot_join_queue() {
    let (app, lobby) = create_test_server();
    dealt_match(&lobby).await;

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/api/v1/queue/join",
            Some("alice"),
            Some(json!({"stake": 5, "mode": "2v2"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(lobby.queue_size(5, GameMode::TwoVsTwo).await, 0);
}
