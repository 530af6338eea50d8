// src/store/mod.rs

//! Persistence seams of the engine.
//!
//! `Catalog` is the read-only question bank, `Store` owns daily sets,
//! attempts and answers, and `IdentityDirectory` resolves display names.
//! `PgStore` backs all three with Postgres; `MemoryStore` keeps everything in
//! process and is used by tests and local runs.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::{
    error::AppError,
    models::{
        answer::{AnswerWrite, UserAnswer},
        attempt::{CompletedAttempt, TestAttempt},
        daily_set::DailyQuestionSet,
        question::Question,
        stats::PlatformTotals,
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn question_count(&self) -> Result<i64, AppError>;

    /// Up to `count` distinct question ids drawn uniformly at random.
    async fn random_question_ids(&self, count: usize) -> Result<Vec<i64>, AppError>;

    async fn question(&self, id: i64) -> Result<Option<Question>, AppError>;

    /// Questions for `ids`, in no particular order. Unknown ids are skipped.
    async fn questions_by_ids(&self, ids: &[i64]) -> Result<Vec<Question>, AppError>;
}

#[async_trait]
pub trait Store: Catalog {
    async fn daily_set(&self, date: NaiveDate) -> Result<Option<DailyQuestionSet>, AppError>;

    /// Inserts `set` unless one already exists for its date.
    /// Returns `false` when another writer got there first.
    async fn insert_daily_set(&self, set: &DailyQuestionSet) -> Result<bool, AppError>;

    async fn attempt_for_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<TestAttempt>, AppError>;

    /// Creates an in-progress attempt. Returns `None` when the user already
    /// has an attempt for `date`.
    async fn insert_attempt(
        &self,
        user_id: &str,
        date: NaiveDate,
        started_at: DateTime<Utc>,
        total_questions: i32,
    ) -> Result<Option<TestAttempt>, AppError>;

    /// The attempt, only if it belongs to `user_id`.
    async fn attempt_for_user(
        &self,
        attempt_id: i64,
        user_id: &str,
    ) -> Result<Option<TestAttempt>, AppError>;

    /// Upserts the answer for (attempt, question), atomically re-checking
    /// that the attempt is still in progress.
    async fn write_answer(&self, answer: &UserAnswer) -> Result<AnswerWrite, AppError>;

    async fn answers_for_attempt(&self, attempt_id: i64) -> Result<Vec<UserAnswer>, AppError>;

    /// Scores and completes the attempt unless it is already completed, in
    /// which case the stored row is returned untouched. `None` if the attempt
    /// does not exist.
    async fn complete_attempt(
        &self,
        attempt_id: i64,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<TestAttempt>, AppError>;

    /// Completed attempts of a user, newest test date first.
    async fn completed_attempts_for_user(
        &self,
        user_id: &str,
        since: Option<NaiveDate>,
        limit: Option<i64>,
    ) -> Result<Vec<CompletedAttempt>, AppError>;

    async fn completed_attempts_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<CompletedAttempt>, AppError>;

    async fn platform_totals(&self, today: NaiveDate) -> Result<PlatformTotals, AppError>;
}

#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn display_name(&self, user_id: &str) -> Result<Option<String>, AppError>;
}

pub(crate) fn into_completed(attempt: TestAttempt) -> Result<CompletedAttempt, AppError> {
    CompletedAttempt::try_from(attempt).map_err(|a| {
        AppError::DataIntegrity(format!("Attempt {} was expected to be completed", a.id))
    })
}
