// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Passing threshold applied to quizzes created without an explicit one.
pub const DEFAULT_PASSING_SCORE: i32 = 60;

/// Points awarded per question when a quiz is populated automatically.
pub const DEFAULT_QUESTION_POINTS: i32 = 1;

/// Time limit (seconds) for adaptive tests started without one.
pub const DEFAULT_TIME_LIMIT_SECS: i32 = 1800;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub default_passing_score: i32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let default_passing_score = env::var("DEFAULT_PASSING_SCORE")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|v| (0..=100).contains(v))
            .unwrap_or(DEFAULT_PASSING_SCORE);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            bind_addr,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            default_passing_score,
        }
    }
}
