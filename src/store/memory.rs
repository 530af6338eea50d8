// src/store/memory.rs

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rand::{rng, seq::SliceRandom};
use tokio::sync::Mutex;

use crate::{
    error::AppError,
    models::{
        answer::{AnswerWrite, UserAnswer},
        attempt::{CompletedAttempt, TestAttempt},
        daily_set::DailyQuestionSet,
        question::Question,
        stats::PlatformTotals,
    },
    store::{Catalog, IdentityDirectory, Store, into_completed},
};

#[derive(Default)]
struct Tables {
    questions: BTreeMap<i64, Question>,
    daily_sets: HashMap<NaiveDate, DailyQuestionSet>,
    attempts: BTreeMap<i64, TestAttempt>,
    answers: HashMap<(i64, i64), UserAnswer>,
    profiles: HashMap<String, String>,
    next_attempt_id: i64,
}

/// In-process store. A single lock around all tables makes every trait
/// method atomic, mirroring the guarantees of the Postgres store.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_questions(questions: impl IntoIterator<Item = Question>) -> Self {
        let tables = Tables {
            questions: questions.into_iter().map(|q| (q.id, q)).collect(),
            ..Tables::default()
        };
        Self {
            tables: Mutex::new(tables),
        }
    }

    pub async fn set_display_name(&self, user_id: &str, display_name: &str) {
        self.tables
            .lock()
            .await
            .profiles
            .insert(user_id.to_string(), display_name.to_string());
    }
}

#[async_trait]
impl Catalog for MemoryStore {
    async fn question_count(&self) -> Result<i64, AppError> {
        Ok(self.tables.lock().await.questions.len() as i64)
    }

    async fn random_question_ids(&self, count: usize) -> Result<Vec<i64>, AppError> {
        let mut ids: Vec<i64> = self.tables.lock().await.questions.keys().copied().collect();
        ids.shuffle(&mut rng());
        ids.truncate(count);
        Ok(ids)
    }

    async fn question(&self, id: i64) -> Result<Option<Question>, AppError> {
        Ok(self.tables.lock().await.questions.get(&id).cloned())
    }

    async fn questions_by_ids(&self, ids: &[i64]) -> Result<Vec<Question>, AppError> {
        let tables = self.tables.lock().await;
        let wanted: HashSet<i64> = ids.iter().copied().collect();
        Ok(wanted
            .into_iter()
            .filter_map(|id| tables.questions.get(&id).cloned())
            .collect())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn daily_set(&self, date: NaiveDate) -> Result<Option<DailyQuestionSet>, AppError> {
        Ok(self.tables.lock().await.daily_sets.get(&date).cloned())
    }

    async fn insert_daily_set(&self, set: &DailyQuestionSet) -> Result<bool, AppError> {
        let mut tables = self.tables.lock().await;
        if tables.daily_sets.contains_key(&set.test_date) {
            return Ok(false);
        }
        tables.daily_sets.insert(set.test_date, set.clone());
        Ok(true)
    }

    async fn attempt_for_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<TestAttempt>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .attempts
            .values()
            .find(|a| a.user_id == user_id && a.test_date == date)
            .cloned())
    }

    async fn insert_attempt(
        &self,
        user_id: &str,
        date: NaiveDate,
        started_at: DateTime<Utc>,
        total_questions: i32,
    ) -> Result<Option<TestAttempt>, AppError> {
        let mut tables = self.tables.lock().await;
        if tables
            .attempts
            .values()
            .any(|a| a.user_id == user_id && a.test_date == date)
        {
            return Ok(None);
        }

        tables.next_attempt_id += 1;
        let attempt = TestAttempt {
            id: tables.next_attempt_id,
            user_id: user_id.to_string(),
            test_date: date,
            started_at,
            completed_at: None,
            score: None,
            total_questions,
        };
        tables.attempts.insert(attempt.id, attempt.clone());
        Ok(Some(attempt))
    }

    async fn attempt_for_user(
        &self,
        attempt_id: i64,
        user_id: &str,
    ) -> Result<Option<TestAttempt>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .attempts
            .get(&attempt_id)
            .filter(|a| a.user_id == user_id)
            .cloned())
    }

    async fn write_answer(&self, answer: &UserAnswer) -> Result<AnswerWrite, AppError> {
        let mut tables = self.tables.lock().await;
        match tables.attempts.get(&answer.attempt_id) {
            None => return Ok(AnswerWrite::AttemptMissing),
            Some(a) if a.is_completed() => return Ok(AnswerWrite::AttemptCompleted),
            Some(_) => {}
        }
        tables
            .answers
            .insert((answer.attempt_id, answer.question_id), answer.clone());
        Ok(AnswerWrite::Written)
    }

    async fn answers_for_attempt(&self, attempt_id: i64) -> Result<Vec<UserAnswer>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .answers
            .values()
            .filter(|a| a.attempt_id == attempt_id)
            .cloned()
            .collect())
    }

    async fn complete_attempt(
        &self,
        attempt_id: i64,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<TestAttempt>, AppError> {
        let mut tables = self.tables.lock().await;
        let score = tables
            .answers
            .values()
            .filter(|a| a.attempt_id == attempt_id && a.is_correct)
            .count() as i32;

        let Some(attempt) = tables.attempts.get_mut(&attempt_id) else {
            return Ok(None);
        };
        if attempt.completed_at.is_none() {
            attempt.completed_at = Some(completed_at);
            attempt.score = Some(score);
        }
        Ok(Some(attempt.clone()))
    }

    async fn completed_attempts_for_user(
        &self,
        user_id: &str,
        since: Option<NaiveDate>,
        limit: Option<i64>,
    ) -> Result<Vec<CompletedAttempt>, AppError> {
        let tables = self.tables.lock().await;
        let mut attempts: Vec<TestAttempt> = tables
            .attempts
            .values()
            .filter(|a| a.user_id == user_id && a.is_completed())
            .filter(|a| since.is_none_or(|s| a.test_date >= s))
            .cloned()
            .collect();
        attempts.sort_by(|a, b| {
            b.test_date
                .cmp(&a.test_date)
                .then(b.completed_at.cmp(&a.completed_at))
                .then(b.id.cmp(&a.id))
        });
        if let Some(limit) = limit {
            attempts.truncate(limit.max(0) as usize);
        }
        attempts.into_iter().map(into_completed).collect()
    }

    async fn completed_attempts_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<CompletedAttempt>, AppError> {
        let tables = self.tables.lock().await;
        tables
            .attempts
            .values()
            .filter(|a| a.test_date == date && a.is_completed())
            .cloned()
            .map(into_completed)
            .collect()
    }

    async fn platform_totals(&self, today: NaiveDate) -> Result<PlatformTotals, AppError> {
        let tables = self.tables.lock().await;
        let users: HashSet<&str> = tables.attempts.values().map(|a| a.user_id.as_str()).collect();
        let completed: Vec<&TestAttempt> =
            tables.attempts.values().filter(|a| a.is_completed()).collect();

        let percentages: Vec<f64> = completed
            .iter()
            .filter(|a| a.total_questions > 0)
            .map(|a| a.score.unwrap_or(0) as f64 / a.total_questions as f64 * 100.0)
            .collect();
        let average_percentage = if percentages.is_empty() {
            None
        } else {
            Some(percentages.iter().sum::<f64>() / percentages.len() as f64)
        };

        Ok(PlatformTotals {
            total_users: users.len() as i64,
            total_tests_taken: completed.len() as i64,
            tests_today: completed.iter().filter(|a| a.test_date == today).count() as i64,
            average_percentage,
        })
    }
}

#[async_trait]
impl IdentityDirectory for MemoryStore {
    async fn display_name(&self, user_id: &str) -> Result<Option<String>, AppError> {
        Ok(self.tables.lock().await.profiles.get(user_id).cloned())
    }
}
