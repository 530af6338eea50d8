// src/models/daily_set.rs

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, types::Json};

use crate::{config::DAILY_SET_SIZE, error::AppError};

/// Represents the 'daily_question_sets' table as read from the database.
#[derive(Debug, Clone, FromRow)]
pub struct DailySetRow {
    pub test_date: NaiveDate,
    /// Ordered question ids, stored as a JSON array.
    pub question_ids: Json<Vec<i64>>,
    pub created_at: DateTime<Utc>,
}

/// The fixed question assignment for one calendar day, shared by all users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyQuestionSet {
    pub test_date: NaiveDate,
    pub question_ids: Vec<i64>,
    pub created_at: DateTime<Utc>,
}

impl DailyQuestionSet {
    /// Builds a set, checking it holds exactly `DAILY_SET_SIZE` distinct ids.
    pub fn new(
        test_date: NaiveDate,
        question_ids: Vec<i64>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, AppError> {
        if question_ids.len() != DAILY_SET_SIZE {
            return Err(AppError::DataIntegrity(format!(
                "Daily set for {} has {} questions, expected {}",
                test_date,
                question_ids.len(),
                DAILY_SET_SIZE
            )));
        }

        let distinct: HashSet<i64> = question_ids.iter().copied().collect();
        if distinct.len() != question_ids.len() {
            return Err(AppError::DataIntegrity(format!(
                "Daily set for {} contains duplicate questions",
                test_date
            )));
        }

        Ok(Self {
            test_date,
            question_ids,
            created_at,
        })
    }

    pub fn contains(&self, question_id: i64) -> bool {
        self.question_ids.contains(&question_id)
    }

    pub fn len(&self) -> usize {
        self.question_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.question_ids.is_empty()
    }
}

impl TryFrom<DailySetRow> for DailyQuestionSet {
    type Error = AppError;

    fn try_from(row: DailySetRow) -> Result<Self, Self::Error> {
        DailyQuestionSet::new(row.test_date, row.question_ids.0, row.created_at)
    }
}
