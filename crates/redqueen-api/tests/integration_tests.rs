//! Integration tests for the Red Queen API.
//!
//! Each test builds its own router around fresh state. Reply delays run on
//! tokio's paused clock so deferred replies resolve instantly.

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use redqueen_api::create_router;
use redqueen_api::handlers::{ConversationView, HealthResponse, StateResponse};
use redqueen_api::state::AppState;
use redqueen_core::config::RedQueenConfig;
use redqueen_core::types::{ConversationSummary, Role};

// =============================================================================
// Helpers
// =============================================================================

fn test_config() -> RedQueenConfig {
    let mut config = RedQueenConfig::default();
    config.chat.seed = Some(11);
    config.chat.prefix_probability = 0.0;
    config
}

fn make_app_with(config: RedQueenConfig) -> axum::Router {
    create_router(AppState::new(config))
}

fn make_app() -> axum::Router {
    make_app_with(test_config())
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::post(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, json: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::delete(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap()
        .to_vec()
}

async fn send(app: &axum::Router, req: Request<Body>) -> axum::response::Response {
    app.clone().oneshot(req).await.unwrap()
}

async fn state_of(resp: axum::response::Response) -> StateResponse {
    assert_eq!(resp.status(), StatusCode::OK);
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

async fn current_state(app: &axum::Router) -> StateResponse {
    state_of(send(app, get("/state")).await).await
}

async fn send_message(app: &axum::Router, content: &str) -> StateResponse {
    let body = serde_json::json!({ "content": content }).to_string();
    state_of(send(app, post_json("/messages", &body)).await).await
}

async fn wait_for_replies() {
    tokio::time::sleep(Duration::from_millis(3000)).await;
}

// =============================================================================
// Page and health endpoints
// =============================================================================

#[tokio::test]
async fn test_health() {
    let app = make_app();
    let resp = send(&app, get("/health")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let health: HealthResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.conversation_count, 0);
}

#[tokio::test]
async fn test_chat_page_served_at_root_and_ui() {
    let app = make_app();
    for uri in ["/", "/ui"] {
        let resp = send(&app, get(uri)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = String::from_utf8(body_bytes(resp).await).unwrap();
        assert!(body.starts_with("<!DOCTYPE html>"));
    }
}

#[tokio::test]
async fn test_highlight_css() {
    let app = make_app();
    let resp = send(&app, get("/highlight.css")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/css; charset=utf-8"
    );
    let body = String::from_utf8(body_bytes(resp).await).unwrap();
    assert!(body.contains(".hl-"));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = make_app();
    let resp = send(&app, get("/nope")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Messaging
// =============================================================================

#[tokio::test]
async fn test_initial_state_is_empty() {
    let app = make_app();
    let state = current_state(&app).await;
    assert!(state.conversations.is_empty());
    assert!(state.current_conversation_id.is_none());
    assert!(state.messages.is_empty());
    assert!(!state.is_typing);
}

#[tokio::test(start_paused = true)]
async fn test_send_message_creates_conversation_and_reply_arrives() {
    let app = make_app();
    let state = send_message(&app, "Hello there!").await;
    assert_eq!(state.conversations.len(), 1);
    assert_eq!(state.conversations[0].title, "Hello there!");
    assert_eq!(state.current_conversation_id, Some(state.conversations[0].id));
    assert_eq!(state.messages.len(), 1);
    assert_eq!(state.messages[0].role, Role::User);
    assert!(state.is_typing);

    wait_for_replies().await;

    let state = current_state(&app).await;
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.messages[1].role, Role::Assistant);
    assert!(!state.messages[1].html.is_empty());
    assert!(!state.is_typing);
}

#[tokio::test(start_paused = true)]
async fn test_code_reply_is_rendered_with_highlighting() {
    let app = make_app();
    send_message(&app, "write a python script").await;
    wait_for_replies().await;

    let state = current_state(&app).await;
    let reply = &state.messages[1];
    assert!(reply.content.contains("```"));
    assert!(reply.html.contains("<pre><code class=\"language-"));
    assert!(reply.html.contains("<span class=\"hl-"));
}

#[tokio::test]
async fn test_user_html_is_escaped() {
    let app = make_app();
    let state = send_message(&app, "<img src=x onerror=alert(1)>").await;
    assert!(!state.messages[0].html.contains("<img"));
    assert!(state.messages[0].html.contains("&lt;img"));
}

#[tokio::test]
async fn test_blank_message_rejected() {
    let app = make_app();
    let resp = send(&app, post_json("/messages", r#"{"content": "   "}"#)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(json["error"], "bad_request");

    assert!(current_state(&app).await.conversations.is_empty());
}

#[tokio::test]
async fn test_oversized_message_rejected() {
    let mut config = test_config();
    config.chat.max_message_chars = 10;
    let app = make_app_with(config);

    let resp = send(
        &app,
        post_json("/messages", r#"{"content": "this is more than ten"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_body_over_limit_rejected() {
    let app = make_app();
    let huge = "a".repeat(70 * 1024);
    let body = serde_json::json!({ "content": huge }).to_string();
    let resp = send(&app, post_json("/messages", &body)).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

// =============================================================================
// Conversations
// =============================================================================

#[tokio::test]
async fn test_create_conversation_without_body() {
    let app = make_app();
    let state = state_of(send(&app, post_empty("/conversations")).await).await;
    assert_eq!(state.conversations.len(), 1);
    assert_eq!(state.conversations[0].title, "New Conversation");
    assert!(state.messages.is_empty());
    assert!(!state.is_typing);
}

#[tokio::test(start_paused = true)]
async fn test_create_conversation_with_first_message() {
    let app = make_app();
    let body = r#"{"first_message": "Explain quantum tunneling in exactly fifty characters!"}"#;
    let state = state_of(send(&app, post_json("/conversations", body)).await).await;
    assert_eq!(
        state.conversations[0].title,
        "Explain quantum tunneling in exactly fif..."
    );
    assert_eq!(state.messages.len(), 1);
    assert!(state.is_typing);
}

#[tokio::test]
async fn test_create_conversation_invalid_json() {
    let app = make_app();
    let resp = send(&app, post_json("/conversations", "{not json")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_conversations_newest_first() {
    let app = make_app();
    send(&app, post_json("/conversations", r#"{"first_message":"first"}"#)).await;
    std::thread::sleep(Duration::from_millis(5));
    send(&app, post_json("/conversations", r#"{"first_message":"second"}"#)).await;

    let resp = send(&app, get("/conversations")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let list: Vec<ConversationSummary> = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    let titles: Vec<&str> = list.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["second", "first"]);
}

#[tokio::test]
async fn test_get_conversation() {
    let app = make_app();
    let state = send_message(&app, "**bold** move").await;
    let id = state.conversations[0].id;

    let resp = send(&app, get(&format!("/conversations/{id}"))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let conv: ConversationView = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(conv.id, id);
    assert!(conv.messages[0].html.contains("<strong>bold</strong>"));
}

#[tokio::test]
async fn test_get_unknown_conversation_is_404() {
    let app = make_app();
    let resp = send(&app, get("/conversations/99")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let json: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(json["error"], "not_found");
}

#[tokio::test(start_paused = true)]
async fn test_delete_current_conversation_aborts_reply() {
    let app = make_app();
    let state = send_message(&app, "What is this place?").await;
    let id = state.conversations[0].id;

    let state = state_of(send(&app, delete(&format!("/conversations/{id}"))).await).await;
    assert!(state.conversations.is_empty());
    assert!(state.current_conversation_id.is_none());

    wait_for_replies().await;
    let state = current_state(&app).await;
    assert!(state.conversations.is_empty());
    assert!(!state.is_typing);
}

#[tokio::test]
async fn test_delete_unknown_is_noop() {
    let app = make_app();
    send_message(&app, "keep me").await;
    let state = state_of(send(&app, delete("/conversations/42")).await).await;
    assert_eq!(state.conversations.len(), 1);
}

#[tokio::test]
async fn test_select_and_clear_selection() {
    let app = make_app();
    let first = send_message(&app, "first").await.conversations[0].id;
    send(&app, post_empty("/selection/clear")).await;
    let state = send_message(&app, "second").await;
    assert_eq!(state.conversations.len(), 2);
    assert_ne!(state.current_conversation_id, Some(first));

    let state = state_of(send(&app, post_empty(&format!("/conversations/{first}/select"))).await).await;
    assert_eq!(state.current_conversation_id, Some(first));
    assert_eq!(state.messages[0].content, "first");

    let state = state_of(send(&app, post_empty("/selection/clear")).await).await;
    assert!(state.current_conversation_id.is_none());
    assert!(state.messages.is_empty());
}

#[tokio::test]
async fn test_select_unknown_is_404_and_keeps_selection() {
    let app = make_app();
    let id = send_message(&app, "hello").await.conversations[0].id;
    let resp = send(&app, post_empty("/conversations/77/select")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(current_state(&app).await.current_conversation_id, Some(id));
}

// =============================================================================
// Regenerate
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_regenerate_noop_while_last_message_is_user() {
    let app = make_app();
    send_message(&app, "explain the system").await;
    let state = state_of(send(&app, post_empty("/regenerate")).await).await;
    assert_eq!(state.messages.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_regenerate_replaces_reply() {
    let app = make_app();
    send_message(&app, "explain the system").await;
    wait_for_replies().await;
    let before = current_state(&app).await;
    assert_eq!(before.messages.len(), 2);

    let state = state_of(send(&app, post_empty("/regenerate")).await).await;
    assert_eq!(state.messages.len(), 1);
    assert!(state.is_typing);

    wait_for_replies().await;
    let after = current_state(&app).await;
    assert_eq!(after.messages.len(), 2);
    assert!(after.messages[1].id > before.messages[1].id);
}

// =============================================================================
// Host allow list
// =============================================================================

fn app_with_allowed_hosts() -> axum::Router {
    let mut config = test_config();
    config.server.allowed_hosts = vec!["demo.example.com".to_string()];
    make_app_with(config)
}

fn get_with_host(uri: &str, host: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::HOST, host)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_disallowed_host_is_forbidden() {
    let app = app_with_allowed_hosts();
    let resp = send(&app, get_with_host("/health", "evil.example.org")).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let json: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(json["error"], "forbidden");
}

#[tokio::test]
async fn test_allowed_and_local_hosts_pass() {
    let app = app_with_allowed_hosts();
    for host in ["demo.example.com", "demo.example.com:4173", "localhost:3030", "127.0.0.1"] {
        let resp = send(&app, get_with_host("/health", host)).await;
        assert_eq!(resp.status(), StatusCode::OK, "host {host} should pass");
    }
}

#[tokio::test]
async fn test_missing_host_rejected_when_list_configured() {
    let app = app_with_allowed_hosts();
    let resp = send(&app, get("/health")).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
