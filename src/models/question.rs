// src/models/question.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

/// One of the four answer slots of a multiple-choice question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionLetter {
    A,
    B,
    C,
    D,
}

impl OptionLetter {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionLetter::A => "A",
            OptionLetter::B => "B",
            OptionLetter::C => "C",
            OptionLetter::D => "D",
        }
    }
}

impl fmt::Display for OptionLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionLetter {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(OptionLetter::A),
            "B" | "b" => Ok(OptionLetter::B),
            "C" | "c" => Ok(OptionLetter::C),
            "D" | "d" => Ok(OptionLetter::D),
            other => Err(AppError::Validation(format!(
                "'{}' is not a valid option letter (expected A, B, C or D)",
                other
            ))),
        }
    }
}

/// Represents the 'questions' table as read from the database.
#[derive(Debug, Clone, FromRow)]
pub struct QuestionRow {
    pub id: i64,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: String,
    pub explanation: Option<String>,
    pub subject: String,
    pub difficulty: String,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub video_type: Option<String>,
}

/// A catalog question. Owned by the catalog; never written by the engine.
#[derive(Debug, Clone, Serialize)]
pub struct Question {
    pub id: i64,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: OptionLetter,
    pub explanation: Option<String>,
    pub subject: String,
    pub difficulty: String,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub video_type: Option<String>,
}

impl Question {
    pub fn is_correct(&self, answer: OptionLetter) -> bool {
        self.correct_answer == answer
    }
}

impl TryFrom<QuestionRow> for Question {
    type Error = AppError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let correct_answer = row.correct_answer.parse::<OptionLetter>().map_err(|_| {
            AppError::DataIntegrity(format!(
                "Question {} has an invalid correct answer '{}'",
                row.id, row.correct_answer
            ))
        })?;

        Ok(Question {
            id: row.id,
            question_text: row.question_text,
            option_a: row.option_a,
            option_b: row.option_b,
            option_c: row.option_c,
            option_d: row.option_d,
            correct_answer,
            explanation: row.explanation,
            subject: row.subject,
            difficulty: row.difficulty,
            image_url: row.image_url,
            video_url: row.video_url,
            video_type: row.video_type,
        })
    }
}

/// DTO for sending question to client (excludes answer and explanation).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub subject: String,
    pub difficulty: String,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub video_type: Option<String>,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        PublicQuestion {
            id: q.id,
            question_text: q.question_text,
            option_a: q.option_a,
            option_b: q.option_b,
            option_c: q.option_c,
            option_d: q.option_d,
            subject: q.subject,
            difficulty: q.difficulty,
            image_url: q.image_url,
            video_url: q.video_url,
            video_type: q.video_type,
        }
    }
}
