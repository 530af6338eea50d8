// src/models/attempt.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{
    models::question::{OptionLetter, PublicQuestion},
    utils::rounding::percentage,
};

/// Represents the 'test_attempts' table in the database.
/// One user's single pass through one date's question set.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct TestAttempt {
    pub id: i64,
    pub user_id: String,
    pub test_date: NaiveDate,
    pub started_at: DateTime<Utc>,
    /// Null until the attempt is submitted.
    pub completed_at: Option<DateTime<Utc>>,
    /// Null until the attempt is submitted.
    pub score: Option<i32>,
    pub total_questions: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl AttemptStatus {
    /// Status of the caller's attempt for a date, if they have one.
    pub fn of(attempt: Option<&TestAttempt>) -> Self {
        attempt.map_or(AttemptStatus::NotStarted, TestAttempt::status)
    }
}

impl TestAttempt {
    pub fn status(&self) -> AttemptStatus {
        if self.completed_at.is_some() {
            AttemptStatus::Completed
        } else {
            AttemptStatus::InProgress
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status() == AttemptStatus::Completed
    }

    /// `round(score / total * 100)`; 0 while in progress.
    pub fn percentage(&self) -> i64 {
        percentage(self.score.unwrap_or(0) as i64, self.total_questions as i64)
    }
}

/// A completed attempt as consumed by the analytics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedAttempt {
    pub id: i64,
    pub user_id: String,
    pub test_date: NaiveDate,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub score: i32,
    pub total_questions: i32,
}

impl CompletedAttempt {
    pub fn percentage(&self) -> i64 {
        percentage(self.score as i64, self.total_questions as i64)
    }

    /// Fraction of questions answered correctly, in `0.0..=100.0`.
    pub fn raw_percentage(&self) -> f64 {
        if self.total_questions <= 0 {
            return 0.0;
        }
        self.score as f64 / self.total_questions as f64 * 100.0
    }
}

impl TryFrom<TestAttempt> for CompletedAttempt {
    type Error = TestAttempt;

    /// Fails (handing the attempt back) when it is still in progress.
    fn try_from(attempt: TestAttempt) -> Result<Self, Self::Error> {
        match attempt.completed_at {
            Some(completed_at) => Ok(CompletedAttempt {
                id: attempt.id,
                score: attempt.score.unwrap_or(0),
                user_id: attempt.user_id,
                test_date: attempt.test_date,
                started_at: attempt.started_at,
                completed_at,
                total_questions: attempt.total_questions,
            }),
            None => Err(attempt),
        }
    }
}

/// DTO for beginning an attempt. The date defaults to today.
#[derive(Debug, Default, Deserialize)]
pub struct StartAttemptRequest {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct StartAttemptResponse {
    pub attempt_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAttemptRequest {
    pub attempt_id: i64,
}

/// One row of the post-submit review: the question, the correct answer and
/// what the user chose (null when unanswered).
#[derive(Debug, Clone, Serialize)]
pub struct ReviewItem {
    pub question_id: i64,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: OptionLetter,
    pub explanation: Option<String>,
    pub subject: String,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub video_type: Option<String>,
    pub user_answer: Option<OptionLetter>,
    pub is_correct: bool,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub attempt_id: i64,
    pub score: i32,
    pub total_questions: i32,
    pub percentage: i64,
    pub test_date: NaiveDate,
    pub completed_at: DateTime<Utc>,
    pub results: Vec<ReviewItem>,
}

/// Today's set as seen by one user.
#[derive(Debug, Serialize)]
pub struct TodayResponse {
    pub questions: Vec<PublicQuestion>,
    pub attempt_id: Option<i64>,
    pub status: AttemptStatus,
    pub is_completed: bool,
    pub score: Option<i32>,
    pub test_date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub test_date: NaiveDate,
    pub score: i32,
    pub total_questions: i32,
    pub percentage: i64,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub tests: Vec<HistoryEntry>,
}

impl From<CompletedAttempt> for HistoryEntry {
    fn from(attempt: CompletedAttempt) -> Self {
        HistoryEntry {
            id: attempt.id,
            test_date: attempt.test_date,
            score: attempt.score,
            total_questions: attempt.total_questions,
            percentage: attempt.percentage(),
            submitted_at: attempt.completed_at,
        }
    }
}
