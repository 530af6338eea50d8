// src/models/answer.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::{error::AppError, models::question::OptionLetter};

/// Represents the 'user_answers' table as read from the database.
#[derive(Debug, Clone, FromRow)]
pub struct AnswerRow {
    pub attempt_id: i64,
    pub question_id: i64,
    pub user_answer: String,
    pub is_correct: bool,
    pub answered_at: DateTime<Utc>,
}

/// The latest answer recorded for one question of one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserAnswer {
    pub attempt_id: i64,
    pub question_id: i64,
    pub user_answer: OptionLetter,
    /// Derived from the catalog's correct answer when the answer is written.
    pub is_correct: bool,
    pub answered_at: DateTime<Utc>,
}

impl TryFrom<AnswerRow> for UserAnswer {
    type Error = AppError;

    fn try_from(row: AnswerRow) -> Result<Self, Self::Error> {
        let user_answer = row.user_answer.parse::<OptionLetter>().map_err(|_| {
            AppError::DataIntegrity(format!(
                "Answer for attempt {} / question {} has invalid letter '{}'",
                row.attempt_id, row.question_id, row.user_answer
            ))
        })?;

        Ok(UserAnswer {
            attempt_id: row.attempt_id,
            question_id: row.question_id,
            user_answer,
            is_correct: row.is_correct,
            answered_at: row.answered_at,
        })
    }
}

/// Result of a guarded answer write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerWrite {
    Written,
    AttemptCompleted,
    AttemptMissing,
}

/// DTO for recording an answer.
#[derive(Debug, Deserialize, Validate)]
pub struct RecordAnswerRequest {
    #[validate(range(min = 1))]
    pub attempt_id: i64,
    #[validate(range(min = 1))]
    pub question_id: i64,
    #[validate(custom(function = validate_option_letter))]
    pub answer: String,
}

fn validate_option_letter(answer: &str) -> Result<(), validator::ValidationError> {
    if answer.parse::<OptionLetter>().is_err() {
        return Err(validator::ValidationError::new("invalid_option_letter"));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct RecordAnswerResponse {
    pub success: bool,
    pub is_correct: bool,
}
