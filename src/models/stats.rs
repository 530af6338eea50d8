// src/models/stats.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Platform-wide aggregates as read from the store.
#[derive(Debug, Clone, Default, PartialEq, FromRow)]
pub struct PlatformTotals {
    pub total_users: i64,
    pub total_tests_taken: i64,
    pub tests_today: i64,
    /// Mean percentage across completed attempts, unrounded.
    pub average_percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformStats {
    pub total_users: i64,
    pub total_tests_taken: i64,
    pub tests_today: i64,
    pub average_platform_score: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonalStats {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_tests_completed: usize,
    pub average_score: i64,
    pub best_score: i64,
    pub last_test_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub platform: PlatformStats,
    pub personal: PersonalStats,
}

/// Aggregated struct for displaying the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub name: String,
    pub score: i32,
    pub total_questions: i32,
    pub percentage: f64,
    pub is_current_user: bool,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub date: NaiveDate,
    pub entries: Vec<LeaderboardEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardParams {
    pub date: Option<NaiveDate>,
}
