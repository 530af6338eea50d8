// src/config.rs

use std::env;
use std::net::SocketAddr;

use dotenvy::dotenv;

/// Number of questions in every daily set.
pub const DAILY_SET_SIZE: usize = 25;

/// Trailing window (in days) the diagnostic report looks at.
pub const DIAGNOSTIC_WINDOW_DAYS: i64 = 30;

/// Maximum number of attempts returned by the history endpoint.
pub const HISTORY_LIMIT: i64 = 30;

pub const LEADERBOARD_LIMIT: usize = 10;

pub const RECENT_PERFORMANCE_LIMIT: usize = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub bind_addr: SocketAddr,
    pub db_max_connections: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .ok()
            .and_then(|addr| addr.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|n| n.parse().ok())
            .unwrap_or(5);

        Self {
            database_url,
            jwt_secret,
            rust_log,
            bind_addr,
            db_max_connections,
        }
    }
}
