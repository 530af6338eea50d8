// src/models/diagnostic.rs

use chrono::NaiveDate;
use serde::Serialize;

/// Per-subject results of the most recent attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectStats {
    pub subject: String,
    pub correct: i64,
    /// Answered but wrong. Unanswered questions count only towards `total`.
    pub incorrect: i64,
    pub total: i64,
    /// Correct out of every question of the subject.
    pub percentage: i64,
    /// Correct out of the answered questions of the subject.
    pub accuracy: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaceClass {
    Balanced,
    TooFast,
    TooSlow,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeedAnalysis {
    pub questions_per_minute: f64,
    pub accuracy_vs_speed: PaceClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Issue {
    Concepts,
    Speed,
    Accuracy,
    Balanced,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptVsSpeed {
    pub issue: Issue,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentPerformance {
    pub date: NaiveDate,
    pub score: i32,
    pub total: i32,
    pub percentage: i64,
}

/// Diagnostic report over a user's trailing window of completed attempts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticReport {
    pub overall_accuracy: i64,
    pub total_attempts: usize,
    pub total_questions: i32,
    pub total_answered: usize,
    pub avg_time_per_question: i64,
    pub average_score: i64,
    pub trend: i64,
    pub subject_breakdown: Vec<SubjectStats>,
    pub weakest_subject: String,
    pub strongest_subject: String,
    pub speed_analysis: SpeedAnalysis,
    pub concept_vs_speed: ConceptVsSpeed,
    pub recent_performance: Vec<RecentPerformance>,
}
