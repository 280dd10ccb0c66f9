// tests/rate_limit_tests.rs

mod common;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use common::{RecordingMailer, spawn_app_with, test_config, test_pool};
use exam_backend::{config::Config, routes, state::AppState};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn forgot_password(client_ip: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/authentication/forgot-password")
        .header("content-type", "application/json")
        .header("x-forwarded-for", client_ip)
        .body(Body::from(json!({ "email": "nobody@example.com" }).to_string()))
        .unwrap()
}

fn limited_config(max_requests: u32, trust_proxy: bool) -> Config {
    let mut config = test_config();
    config.rate_limit_max_requests = max_requests;
    config.trust_proxy = trust_proxy;
    config
}

#[tokio::test]
async fn requests_over_budget_get_429() {
    let app = spawn_app_with(limited_config(3, false)).await;
    let client = reqwest::Client::new();

    // A rotating forwarded header must not buy a fresh budget
    for i in 0..3 {
        let response = client
            .post(app.url("/api/authentication/forgot-password"))
            .header("x-forwarded-for", format!("1.1.1.{}", i))
            .json(&json!({ "email": "nobody@example.com" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }

    let response = client
        .post(app.url("/api/authentication/forgot-password"))
        .header("x-forwarded-for", "1.1.1.99")
        .json(&json!({ "email": "nobody@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 429);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(
        body["message"],
        "Too many requests. Please try again after 10 seconds."
    );
}

#[tokio::test]
async fn trusted_proxy_keys_on_forwarded_client() {
    let state = AppState::new(
        test_pool().await,
        limited_config(3, true),
        Arc::new(RecordingMailer::default()),
    );
    let app = routes::create_router(state);

    for _ in 0..3 {
        let response = app.clone().oneshot(forgot_password("10.0.0.1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.clone().oneshot(forgot_password("10.0.0.1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["success"], false);

    // Another forwarded client still has its own budget
    let response = app
        .clone()
        .oneshot(forgot_password("10.0.0.2, 172.16.0.1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
