// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, types::Json};

use crate::{
    error::AppError,
    models::{
        answer::{AnswerRow, AnswerWrite, UserAnswer},
        attempt::{CompletedAttempt, TestAttempt},
        daily_set::{DailyQuestionSet, DailySetRow},
        question::{Question, QuestionRow},
        stats::PlatformTotals,
    },
    store::{Catalog, IdentityDirectory, Store, into_completed},
};

const QUESTION_COLUMNS: &str = r#"
    id, question_text, option_a, option_b, option_c, option_d,
    correct_answer, explanation, subject, difficulty,
    image_url, video_url, video_type
"#;

const ATTEMPT_COLUMNS: &str =
    "id, user_id, test_date, started_at, completed_at, score, total_questions";

/// Postgres-backed store. Uniqueness constraints on `daily_question_sets.test_date`,
/// `test_attempts (user_id, test_date)` and `user_answers (attempt_id, question_id)`
/// carry the concurrency control.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Catalog for PgStore {
    async fn question_count(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM questions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn random_question_ids(&self, count: usize) -> Result<Vec<i64>, AppError> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM questions ORDER BY RANDOM() LIMIT $1",
        )
        .bind(count as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to draw random questions: {:?}", e);
            AppError::from(e)
        })?;
        Ok(ids)
    }

    async fn question(&self, id: i64) -> Result<Option<Question>, AppError> {
        let sql = format!("SELECT {} FROM questions WHERE id = $1", QUESTION_COLUMNS);
        let row = sqlx::query_as::<_, QuestionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Question::try_from).transpose()
    }

    async fn questions_by_ids(&self, ids: &[i64]) -> Result<Vec<Question>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {} FROM questions WHERE id = ANY($1)", QUESTION_COLUMNS);
        let rows = sqlx::query_as::<_, QuestionRow>(&sql)
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Question::try_from).collect()
    }
}

#[async_trait]
impl Store for PgStore {
    async fn daily_set(&self, date: NaiveDate) -> Result<Option<DailyQuestionSet>, AppError> {
        let row = sqlx::query_as::<_, DailySetRow>(
            "SELECT test_date, question_ids, created_at FROM daily_question_sets WHERE test_date = $1",
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        row.map(DailyQuestionSet::try_from).transpose()
    }

    async fn insert_daily_set(&self, set: &DailyQuestionSet) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO daily_question_sets (test_date, question_ids, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (test_date) DO NOTHING
            "#,
        )
        .bind(set.test_date)
        .bind(Json(&set.question_ids))
        .bind(set.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert daily set for {}: {:?}", set.test_date, e);
            AppError::from(e)
        })?;

        Ok(result.rows_affected() == 1)
    }

    async fn attempt_for_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<TestAttempt>, AppError> {
        let sql = format!(
            "SELECT {} FROM test_attempts WHERE user_id = $1 AND test_date = $2",
            ATTEMPT_COLUMNS
        );
        let attempt = sqlx::query_as::<_, TestAttempt>(&sql)
            .bind(user_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;
        Ok(attempt)
    }

    async fn insert_attempt(
        &self,
        user_id: &str,
        date: NaiveDate,
        started_at: DateTime<Utc>,
        total_questions: i32,
    ) -> Result<Option<TestAttempt>, AppError> {
        let sql = format!(
            r#"
            INSERT INTO test_attempts (user_id, test_date, started_at, total_questions)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, test_date) DO NOTHING
            RETURNING {}
            "#,
            ATTEMPT_COLUMNS
        );
        let attempt = sqlx::query_as::<_, TestAttempt>(&sql)
            .bind(user_id)
            .bind(date)
            .bind(started_at)
            .bind(total_questions)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to insert attempt: {:?}", e);
                AppError::from(e)
            })?;
        Ok(attempt)
    }

    async fn attempt_for_user(
        &self,
        attempt_id: i64,
        user_id: &str,
    ) -> Result<Option<TestAttempt>, AppError> {
        let sql = format!(
            "SELECT {} FROM test_attempts WHERE id = $1 AND user_id = $2",
            ATTEMPT_COLUMNS
        );
        let attempt = sqlx::query_as::<_, TestAttempt>(&sql)
            .bind(attempt_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(attempt)
    }

    async fn write_answer(&self, answer: &UserAnswer) -> Result<AnswerWrite, AppError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serialises this write against a concurrent submit.
        let state = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            "SELECT completed_at FROM test_attempts WHERE id = $1 FOR UPDATE",
        )
        .bind(answer.attempt_id)
        .fetch_optional(&mut *tx)
        .await?;

        match state {
            None => return Ok(AnswerWrite::AttemptMissing),
            Some(Some(_)) => return Ok(AnswerWrite::AttemptCompleted),
            Some(None) => {}
        }

        sqlx::query(
            r#"
            INSERT INTO user_answers (attempt_id, question_id, user_answer, is_correct, answered_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (attempt_id, question_id) DO UPDATE SET
                user_answer = EXCLUDED.user_answer,
                is_correct = EXCLUDED.is_correct,
                answered_at = EXCLUDED.answered_at
            "#,
        )
        .bind(answer.attempt_id)
        .bind(answer.question_id)
        .bind(answer.user_answer.as_str())
        .bind(answer.is_correct)
        .bind(answer.answered_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to upsert answer: {:?}", e);
            AppError::from(e)
        })?;

        tx.commit().await?;
        Ok(AnswerWrite::Written)
    }

    async fn answers_for_attempt(&self, attempt_id: i64) -> Result<Vec<UserAnswer>, AppError> {
        let rows = sqlx::query_as::<_, AnswerRow>(
            r#"
            SELECT attempt_id, question_id, user_answer, is_correct, answered_at
            FROM user_answers
            WHERE attempt_id = $1
            "#,
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(UserAnswer::try_from).collect()
    }

    async fn complete_attempt(
        &self,
        attempt_id: i64,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<TestAttempt>, AppError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "SELECT {} FROM test_attempts WHERE id = $1 FOR UPDATE",
            ATTEMPT_COLUMNS
        );
        let current = sqlx::query_as::<_, TestAttempt>(&sql)
            .bind(attempt_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(current) = current else {
            return Ok(None);
        };
        if current.is_completed() {
            tx.commit().await?;
            return Ok(Some(current));
        }

        let sql = format!(
            r#"
            UPDATE test_attempts SET
                completed_at = $2,
                score = (
                    SELECT COUNT(*) FROM user_answers
                    WHERE attempt_id = $1 AND is_correct
                )::INTEGER
            WHERE id = $1 AND completed_at IS NULL
            RETURNING {}
            "#,
            ATTEMPT_COLUMNS
        );
        let completed = sqlx::query_as::<_, TestAttempt>(&sql)
            .bind(attempt_id)
            .bind(completed_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to complete attempt {}: {:?}", attempt_id, e);
                AppError::from(e)
            })?;

        tx.commit().await?;
        Ok(Some(completed))
    }

    async fn completed_attempts_for_user(
        &self,
        user_id: &str,
        since: Option<NaiveDate>,
        limit: Option<i64>,
    ) -> Result<Vec<CompletedAttempt>, AppError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM test_attempts
            WHERE user_id = $1
              AND completed_at IS NOT NULL
              AND ($2::DATE IS NULL OR test_date >= $2)
            ORDER BY test_date DESC, completed_at DESC, id DESC
            LIMIT $3
            "#,
            ATTEMPT_COLUMNS
        );
        let attempts = sqlx::query_as::<_, TestAttempt>(&sql)
            .bind(user_id)
            .bind(since)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        attempts.into_iter().map(into_completed).collect()
    }

    async fn completed_attempts_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<CompletedAttempt>, AppError> {
        let sql = format!(
            "SELECT {} FROM test_attempts WHERE test_date = $1 AND completed_at IS NOT NULL",
            ATTEMPT_COLUMNS
        );
        let attempts = sqlx::query_as::<_, TestAttempt>(&sql)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;
        attempts.into_iter().map(into_completed).collect()
    }

    async fn platform_totals(&self, today: NaiveDate) -> Result<PlatformTotals, AppError> {
        let totals = sqlx::query_as::<_, PlatformTotals>(
            r#"
            SELECT
                (SELECT COUNT(DISTINCT user_id) FROM test_attempts) AS total_users,
                (SELECT COUNT(*) FROM test_attempts WHERE completed_at IS NOT NULL) AS total_tests_taken,
                (SELECT COUNT(*) FROM test_attempts
                    WHERE completed_at IS NOT NULL AND test_date = $1) AS tests_today,
                (SELECT AVG(score::FLOAT8 / NULLIF(total_questions, 0) * 100)
                    FROM test_attempts WHERE completed_at IS NOT NULL) AS average_percentage
            "#,
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await?;
        Ok(totals)
    }
}

#[async_trait]
impl IdentityDirectory for PgStore {
    async fn display_name(&self, user_id: &str) -> Result<Option<String>, AppError> {
        let name = sqlx::query_scalar::<_, String>(
            "SELECT display_name FROM user_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(name)
    }
}
