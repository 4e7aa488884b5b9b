// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use anatomy_backend::{
    config::Config,
    models::Role,
    routes,
    state::AppState,
    store::{DynStore, MemoryStore, PgStore},
    utils::hash::hash_password,
};
use serde_json::{Value, json};
use sqlx::{Executor, postgres::PgPoolOptions};

pub const ADMIN_USERNAME: &str = "admin_test";
pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub store: DynStore,
    pub admin_token: String,
}

pub fn test_config() -> Config {
    Config {
        database_url: std::env::var("DATABASE_URL").unwrap_or_else(|_| "memory://".to_string()),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        admin_username: None,
        admin_password: None,
        default_passing_score: 60,
    }
}

/// Migrated Postgres store living in its own fresh schema, so every app
/// starts from an empty database even when tests share one server.
async fn pg_store(database_url: &str) -> PgStore {
    let schema = format!("test_{}", uuid::Uuid::new_v4().simple());

    let setup = PgPoolOptions::new()
        .max_connections(1)
        .connect(database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");
    setup
        .execute(format!("CREATE SCHEMA {}", schema).as_str())
        .await
        .expect("Failed to create test schema");
    setup.close().await;

    let search_path = format!("SET search_path TO {}", schema);
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .after_connect(move |conn, _meta| {
            let search_path = search_path.clone();
            Box::pin(async move {
                conn.execute(search_path.as_str()).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    PgStore::new(pool)
}

/// Spawns the app on a random port with one admin account.
///
/// Runs over Postgres when DATABASE_URL is set, otherwise over `MemoryStore`.
pub async fn spawn_app() -> TestApp {
    let store: DynStore = match std::env::var("DATABASE_URL") {
        Ok(database_url) => Arc::new(pg_store(&database_url).await),
        Err(_) => Arc::new(MemoryStore::new()),
    };

    let hashed = hash_password(PASSWORD).expect("Failed to hash password");
    store
        .create_user(ADMIN_USERNAME, &hashed, Role::Admin)
        .await
        .expect("Failed to seed admin");

    let state = AppState {
        store: store.clone(),
        config: test_config(),
    };
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let admin_token = login(&client, &address, ADMIN_USERNAME).await;

    TestApp {
        address,
        client,
        store,
        admin_token,
    }
}

pub async fn login(client: &reqwest::Client, address: &str, username: &str) -> String {
    let resp: Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({ "username": username, "password": PASSWORD }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Failed to parse login json");

    resp["token"].as_str().expect("Token not found").to_string()
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.address, path)
    }

    /// Registers a fresh student and returns their token.
    pub async fn student(&self) -> String {
        // Truncate UUID to keep the username short
        let username = format!("s_{}", &uuid::Uuid::new_v4().to_string()[..8]);
        let resp = self
            .client
            .post(self.url("/auth/register"))
            .json(&json!({ "username": username, "password": PASSWORD }))
            .send()
            .await
            .expect("Register failed");
        assert_eq!(resp.status().as_u16(), 201);
        login(&self.client, &self.address, &username).await
    }

    pub async fn post(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Seeds a short-answer question whose correct answer is `answer`.
    pub async fn seed_question(&self, topic: &str, difficulty: &str, answer: &str) -> i64 {
        let resp = self
            .post(
                &self.admin_token,
                "/admin/questions",
                json!({
                    "type": "short_answer",
                    "difficulty": difficulty,
                    "topic": topic,
                    "content": format!("Name structure {}", answer),
                    "correctAnswer": answer,
                    "explanation": "See the atlas."
                }),
            )
            .await;
        assert_eq!(resp.status().as_u16(), 201);
        let body: Value = resp.json().await.unwrap();
        body["id"].as_i64().unwrap()
    }

    /// Seeds `count` questions on `topic` (answers `"{topic}-{i}"`) and a module quiz over them.
    pub async fn seed_module(&self, topic: &str, count: i32, passing_score: i32) -> i64 {
        for i in 0..count {
            self.seed_question(topic, "medium", &format!("{}-{}", topic, i)).await;
        }
        let resp = self
            .post(
                &self.admin_token,
                "/admin/modules",
                json!({
                    "title": format!("{} module", topic),
                    "topic": topic,
                    "questionCount": count,
                    "timeLimit": 900,
                    "passingScore": passing_score
                }),
            )
            .await;
        assert_eq!(resp.status().as_u16(), 201);
        let body: Value = resp.json().await.unwrap();
        body["module"]["id"].as_i64().unwrap()
    }

    /// Starts the module quiz; returns (attempt id, [(question id, correct answer)]).
    ///
    /// Correct answers are recovered from the admin question listing.
    pub async fn start_module(&self, token: &str, module_id: i64) -> (i64, Vec<(i64, String)>) {
        let resp = self
            .post(token, &format!("/quiz/module/{}/start", module_id), json!({}))
            .await;
        assert_eq!(resp.status().as_u16(), 201);
        let started: Value = resp.json().await.unwrap();
        let attempt_id = started["attemptId"].as_i64().unwrap();
        (attempt_id, self.attempt_key(token, attempt_id).await)
    }

    pub async fn attempt_key(&self, token: &str, attempt_id: i64) -> Vec<(i64, String)> {
        let detail: Value = self
            .get(token, &format!("/quiz/attempt/{}", attempt_id))
            .await
            .json()
            .await
            .unwrap();
        let bank: Vec<Value> = self
            .get(&self.admin_token, "/admin/questions")
            .await
            .json()
            .await
            .unwrap();

        detail["questions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|q| {
                let id = q["id"].as_i64().unwrap();
                let answer = bank
                    .iter()
                    .find(|b| b["id"].as_i64() == Some(id))
                    .and_then(|b| b["correctAnswer"].as_str())
                    .unwrap()
                    .to_string();
                (id, answer)
            })
            .collect()
    }

    pub async fn answer(&self, token: &str, attempt_id: i64, question_id: i64, answer: &str) -> reqwest::Response {
        self.post(
            token,
            &format!("/quiz/attempt/{}/answer", attempt_id),
            json!({ "questionId": question_id, "answer": answer, "timeSpent": 4 }),
        )
        .await
    }

    /// Ledger rows recorded for one (attempt, question) pair.
    pub async fn ledger_rows(&self, attempt_id: i64, question_id: i64) -> usize {
        self.store
            .answers_for_attempt(attempt_id)
            .await
            .expect("Failed to read ledger")
            .iter()
            .filter(|r| r.question_id == question_id)
            .count()
    }

    pub async fn finish(&self, token: &str, attempt_id: i64) -> reqwest::Response {
        self.post(token, &format!("/quiz/attempt/{}/finish", attempt_id), json!({}))
            .await
    }
}
