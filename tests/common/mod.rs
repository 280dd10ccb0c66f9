// tests/common/mod.rs

#![allow(dead_code)]

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{ServiceExt, extract::Request};
use async_trait::async_trait;
use exam_backend::{
    config::Config,
    error::AppError,
    models::user::Role,
    routes,
    services::credentials::{self, NewUser},
    state::AppState,
    utils::mailer::{Email, Mailer},
};
use serde_json::{Value, json};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

pub const PASSWORD: &str = "password123";

/// Keeps every email instead of delivering it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Email>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_to(&self, to: &str) -> Option<Email> {
        self.sent().into_iter().rev().find(|email| email.to == to)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: Email) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        port: 0,
        frontend_url: "http://localhost:3000".to_string(),
        cookie_secure: false,
        mail_from: "Exam System <no-reply@localhost>".to_string(),
        mail_webhook_url: None,
        rate_limit_window_secs: 10,
        rate_limit_max_requests: 10_000,
        trust_proxy: false,
        admin_email: None,
        admin_password: None,
    }
}

/// Fresh in-memory database with migrations applied.
///
/// A single connection that never expires, so every query sees the same database.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    pool
}

/// Helper function to spawn the app on a random port for testing.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config()).await
}

pub async fn spawn_app_with(config: Config) -> TestApp {
    let pool = test_pool().await;
    let mailer = Arc::new(RecordingMailer::default());

    let state = AppState::new(pool.clone(), config, mailer.clone());
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(
            listener,
            ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
        )
        .await
        .unwrap();
    });

    TestApp {
        address,
        pool,
        mailer,
    }
}

pub fn unique_email(prefix: &str) -> String {
    format!("{}_{}@example.com", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

/// Client that keeps the `accessToken` cookie between requests.
pub fn cookie_client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to build client")
}

pub async fn insert_user(pool: &SqlitePool, email: &str, role: Role) -> i64 {
    credentials::create_user(
        pool,
        NewUser {
            name: "Test User",
            email,
            password: PASSWORD,
            role,
            email_verified: false,
        },
    )
    .await
    .expect("Failed to insert user")
    .id
}

/// Logs in through the API and returns a client carrying the access cookie.
pub async fn login(app: &TestApp, email: &str) -> reqwest::Client {
    let client = cookie_client();
    let response = client
        .post(app.url("/api/authentication/login"))
        .json(&json!({ "email": email, "password": PASSWORD }))
        .send()
        .await
        .expect("Login failed");
    assert_eq!(response.status().as_u16(), 200, "login should succeed");
    client
}

pub async fn admin_client(app: &TestApp) -> reqwest::Client {
    let email = unique_email("admin");
    insert_user(&app.pool, &email, Role::Admin).await;
    login(app, &email).await
}

/// Registers an exam taker through the API; returns the signed-in client and its email.
pub async fn exam_taker_client(app: &TestApp) -> (reqwest::Client, String) {
    let client = cookie_client();
    let email = unique_email("taker");
    let response = client
        .post(app.url("/api/authentication/register"))
        .json(&json!({ "name": "Taker", "email": email, "password": PASSWORD }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(response.status().as_u16(), 201);
    (client, email)
}

/// A group created through the API.
pub struct SeededGroup {
    pub id: i64,
    /// `(question id, correct option id, wrong option id)` per question.
    pub questions: Vec<(i64, i64, i64)>,
}

/// Creates a group with `count` two-option questions; the first option is correct.
pub async fn seed_group(app: &TestApp, admin: &reqwest::Client, count: usize) -> SeededGroup {
    let group: Value = admin
        .post(app.url("/api/group-questions"))
        .json(&json!({
            "title": format!("Group {}", uuid::Uuid::new_v4()),
            "description": "Seeded group",
        }))
        .send()
        .await
        .expect("Create group failed")
        .json()
        .await
        .unwrap();
    let group_id = group["group"]["id"].as_i64().expect("group id");

    if count == 0 {
        return SeededGroup {
            id: group_id,
            questions: Vec::new(),
        };
    }

    let questions: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "question": format!("Question {}", i),
                "description": "Because.",
                "options": [
                    { "text": "Right", "isCorrect": true },
                    { "text": "Wrong", "isCorrect": false },
                ],
            })
        })
        .collect();

    let created: Value = admin
        .post(app.url("/api/questions/upload-questions"))
        .json(&json!({ "groupId": group_id, "questions": questions }))
        .send()
        .await
        .expect("Upload questions failed")
        .json()
        .await
        .unwrap();

    let questions = created["data"]
        .as_array()
        .expect("created questions")
        .iter()
        .map(|q| {
            let options = q["options"].as_array().unwrap();
            let correct = options.iter().find(|o| o["isCorrect"] == true).unwrap();
            let wrong = options.iter().find(|o| o["isCorrect"] == false).unwrap();
            (
                q["id"].as_i64().unwrap(),
                correct["id"].as_i64().unwrap(),
                wrong["id"].as_i64().unwrap(),
            )
        })
        .collect();

    SeededGroup {
        id: group_id,
        questions,
    }
}
