//! The host bridge routes, driven in-process.

mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use helpers::{app_with, wait_until};
use http_body_util::BodyExt;
use panelhook::notification::test_utils::ScriptedTransport;
use panelhook::server::router;
use panelhook::{DispatchConfig, PanelConfig};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn initial_config() -> DispatchConfig {
    DispatchConfig::new(
        vec![PanelConfig::new("http://panel.test/one").with_max_retries(1)],
        true,
    )
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_get_settings_returns_current_config() {
    let (app, _storage) = app_with(initial_config(), Arc::new(ScriptedTransport::always_ok())).await;

    let response = router(app.state().clone())
        .oneshot(Request::get("/settings").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["allow-retry"], true);
    assert_eq!(body["panels"][0]["address"], "http://panel.test/one");
    assert_eq!(body["panels"][0]["max-retries"], 1);
}

#[tokio::test]
async fn test_update_settings_reports_success() {
    let (app, storage) = app_with(initial_config(), Arc::new(ScriptedTransport::always_ok())).await;
    let payload = r#"{"panels":[{"address":"https://new.test","enabled":true}],"allow-retry":false}"#;

    let response = router(app.state().clone())
        .oneshot(Request::post("/settings").body(Body::from(payload)).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "success");
    let expected = DispatchConfig::new(vec![PanelConfig::new("https://new.test")], false);
    assert_eq!(*app.state().store.snapshot(), expected);
    assert_eq!(storage.saved(), vec![expected]);
}

#[tokio::test]
async fn test_malformed_update_returns_parse_error_and_keeps_config() {
    let (app, storage) = app_with(initial_config(), Arc::new(ScriptedTransport::always_ok())).await;

    let response = router(app.state().clone())
        .oneshot(
            Request::post("/settings")
                .body(Body::from(r#"{"panels": "nope"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_string(response).await;
    assert!(body.contains("invalid type"), "unexpected body: {}", body);
    assert_eq!(*app.state().store.snapshot(), initial_config());
    assert!(storage.saved().is_empty());
}

#[tokio::test]
async fn test_stored_message_hook_dispatches_in_background() {
    let transport = Arc::new(ScriptedTransport::always_ok());
    let (app, _storage) = app_with(initial_config(), transport.clone()).await;

    let response = router(app.state().clone())
        .oneshot(
            Request::post("/hooks/receive-save-after")
                .body(Body::from(r#"{"id": "msg-42"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(
        wait_until(Duration::from_secs(2), || transport.attempts_for("http://panel.test/one") == 1)
            .await
    );
}

#[tokio::test]
async fn test_stored_message_hook_accepts_empty_body() {
    let transport = Arc::new(ScriptedTransport::always_ok());
    let (app, _storage) = app_with(initial_config(), transport.clone()).await;

    let response = router(app.state().clone())
        .oneshot(
            Request::post("/hooks/receive-save-after")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(wait_until(Duration::from_secs(2), || !transport.attempts().is_empty()).await);
}

#[tokio::test]
async fn test_stored_message_hook_rejects_garbage_event() {
    let transport = Arc::new(ScriptedTransport::always_ok());
    let (app, _storage) = app_with(initial_config(), transport.clone()).await;

    let response = router(app.state().clone())
        .oneshot(
            Request::post("/hooks/receive-save-after")
                .body(Body::from("[1, 2"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(transport.attempts().is_empty());
}

#[tokio::test]
async fn test_in_flight_dispatch_keeps_its_snapshot() {
    // The first panel keeps failing, so the dispatch is still retrying when
    // the update lands.
    let transport = Arc::new(
        ScriptedTransport::always_ok().fail_first("http://slow.test", 200),
    );
    let initial = DispatchConfig::new(
        vec![
            PanelConfig::new("http://slow.test").with_infinite_retry(true),
            PanelConfig::new("http://after.test"),
        ],
        true,
    );
    let (app, _storage) = app_with(initial, transport.clone()).await;
    let state = app.state().clone();

    state.message_stored(panelhook::MailEvent::new("in-flight"));
    assert!(wait_until(Duration::from_secs(2), || transport.attempts_for("http://slow.test") >= 1).await);

    state
        .store
        .apply_update(r#"{"panels": [], "allow-retry": false}"#)
        .await
        .unwrap();

    // The old snapshot still drives the running dispatch to its end.
    assert!(
        wait_until(Duration::from_secs(5), || transport.attempts_for("http://after.test") == 1)
            .await
    );
    assert_eq!(transport.attempts_for("http://slow.test"), 201);
}

#[tokio::test]
async fn test_event_after_shutdown_starts_no_dispatch() {
    let transport = Arc::new(ScriptedTransport::always_ok());
    let (app, _storage) = app_with(initial_config(), transport.clone()).await;
    app.state().tasks.trigger_shutdown();

    let response = router(app.state().clone())
        .oneshot(
            Request::post("/hooks/receive-save-after")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(app.state().tasks.active(), 0);
    assert!(transport.attempts().is_empty());
}
