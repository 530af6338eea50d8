// src/services/diagnostic.rs

//! Performance diagnostics over a user's recent completed attempts.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Days, NaiveDate};

use crate::{
    config::{DIAGNOSTIC_WINDOW_DAYS, RECENT_PERFORMANCE_LIMIT},
    error::AppError,
    models::{
        answer::UserAnswer,
        attempt::CompletedAttempt,
        diagnostic::{
            ConceptVsSpeed, DiagnosticReport, Issue, PaceClass, RecentPerformance, SpeedAnalysis,
            SubjectStats,
        },
        question::Question,
    },
    store::Store,
    utils::{
        clock::Clock,
        rounding::{percentage, round_half_up, round_one_decimal},
    },
};

const NO_SUBJECT: &str = "None";

/// Pace and accuracy of the most recent attempt, as seen by the diagnosis rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaceSnapshot {
    /// Percentage correct, unrounded.
    pub accuracy: f64,
    pub questions_per_minute: f64,
    pub pace: PaceClass,
}

/// One entry of the diagnosis table. Rules are tried in order; the first
/// whose predicate holds decides the issue and its recommendation.
pub struct DiagnosisRule {
    pub issue: Issue,
    pub applies: fn(&PaceSnapshot) -> bool,
    pub recommend: fn(&PaceSnapshot, &str) -> String,
}

pub const DIAGNOSIS_RULES: &[DiagnosisRule] = &[
    DiagnosisRule {
        issue: Issue::Concepts,
        applies: weak_concepts,
        recommend: recommend_concepts,
    },
    DiagnosisRule {
        issue: Issue::Speed,
        applies: slow_and_unsure,
        recommend: recommend_speed,
    },
    DiagnosisRule {
        issue: Issue::Accuracy,
        applies: rushing,
        recommend: recommend_slow_down,
    },
    DiagnosisRule {
        issue: Issue::Balanced,
        applies: balanced,
        recommend: recommend_balanced,
    },
    DiagnosisRule {
        issue: Issue::Accuracy,
        applies: always,
        recommend: recommend_accuracy,
    },
];

fn weak_concepts(s: &PaceSnapshot) -> bool {
    s.accuracy < 60.0
}

fn slow_and_unsure(s: &PaceSnapshot) -> bool {
    s.questions_per_minute > 0.0 && s.questions_per_minute < 0.7 && s.accuracy < 80.0
}

fn rushing(s: &PaceSnapshot) -> bool {
    s.pace == PaceClass::TooFast
}

fn balanced(s: &PaceSnapshot) -> bool {
    s.accuracy >= 80.0 && s.questions_per_minute >= 0.8
}

fn always(_: &PaceSnapshot) -> bool {
    true
}

fn recommend_concepts(s: &PaceSnapshot, weakest: &str) -> String {
    format!(
        "Your accuracy is {}%. Strengthen the fundamentals of {} and revisit the core concepts before attempting more questions.",
        round_half_up(s.accuracy),
        weakest
    )
}

fn recommend_speed(_: &PaceSnapshot, _: &str) -> String {
    "You are spending too long on each question. Timed practice sessions will build your pace while keeping accuracy steady.".to_string()
}

fn recommend_slow_down(_: &PaceSnapshot, _: &str) -> String {
    "You are rushing through the questions. Slow down and read each one carefully; accuracy matters more than speed.".to_string()
}

fn recommend_balanced(_: &PaceSnapshot, weakest: &str) -> String {
    format!(
        "Well balanced performance. Keep practising for consistency and focus on {} to push past 90%.",
        weakest
    )
}

fn recommend_accuracy(_: &PaceSnapshot, weakest: &str) -> String {
    format!(
        "Work on accuracy in {}. Review the questions you missed and understand why each answer was wrong.",
        weakest
    )
}

/// Applies the first matching rule of `DIAGNOSIS_RULES`.
pub fn diagnose(snapshot: &PaceSnapshot, weakest_subject: &str) -> ConceptVsSpeed {
    let rule = DIAGNOSIS_RULES
        .iter()
        .find(|rule| (rule.applies)(snapshot))
        .unwrap_or(&DIAGNOSIS_RULES[DIAGNOSIS_RULES.len() - 1]);

    ConceptVsSpeed {
        issue: rule.issue,
        recommendation: (rule.recommend)(snapshot, weakest_subject),
    }
}

/// Classifies the pace of an attempt given its rounded rate and accuracy.
/// A rate that rounds to 0 (a multi-hour attempt) is slow.
pub fn classify_pace(questions_per_minute: f64, accuracy: f64) -> PaceClass {
    if questions_per_minute > 1.5 && accuracy < 70.0 {
        PaceClass::TooFast
    } else if questions_per_minute < 0.5 && accuracy < 70.0 {
        PaceClass::TooSlow
    } else {
        PaceClass::Balanced
    }
}

/// Returns `(questions_per_minute, avg_seconds_per_question)`, or `None` when
/// the attempt has no positive duration.
pub fn pace_of(attempt: &CompletedAttempt) -> Option<(f64, i64)> {
    let elapsed_ms = (attempt.completed_at - attempt.started_at).num_milliseconds();
    if elapsed_ms <= 0 || attempt.total_questions <= 0 {
        return None;
    }
    let total = attempt.total_questions as f64;
    let seconds = elapsed_ms as f64 / 1000.0;
    let minutes = seconds / 60.0;
    Some((round_one_decimal(total / minutes), round_half_up(seconds / total)))
}

/// `round(mean% of the 3 most recent - mean% of the next 3)`, or 0 with fewer
/// than 4 attempts. `attempts` is ordered most recent first.
pub fn trend(attempts: &[CompletedAttempt]) -> i64 {
    if attempts.len() < 4 {
        return 0;
    }
    let mean = |slice: &[CompletedAttempt]| {
        slice.iter().map(CompletedAttempt::raw_percentage).sum::<f64>() / slice.len() as f64
    };
    let recent = &attempts[..3];
    let previous = &attempts[3..attempts.len().min(6)];
    round_half_up(mean(recent) - mean(previous))
}

/// Groups every question of the attempt's set by subject.
/// Subjects come out in name order.
pub fn subject_breakdown(questions: &[Question], answers: &[UserAnswer]) -> Vec<SubjectStats> {
    let answers: HashMap<i64, &UserAnswer> = answers.iter().map(|a| (a.question_id, a)).collect();

    // subject -> (correct, incorrect, total)
    let mut groups: BTreeMap<&str, (i64, i64, i64)> = BTreeMap::new();
    for question in questions {
        let entry = groups.entry(question.subject.as_str()).or_default();
        entry.2 += 1;
        match answers.get(&question.id) {
            Some(a) if a.is_correct => entry.0 += 1,
            Some(_) => entry.1 += 1,
            None => {}
        }
    }

    groups
        .into_iter()
        .map(|(subject, (correct, incorrect, total))| SubjectStats {
            subject: subject.to_string(),
            correct,
            incorrect,
            total,
            percentage: percentage(correct, total),
            accuracy: percentage(correct, correct + incorrect),
        })
        .collect()
}

/// `(weakest, strongest)` by percentage. On ties the weakest is the first
/// such subject in name order and the strongest the last.
pub fn weakest_and_strongest(breakdown: &[SubjectStats]) -> (String, String) {
    let mut weakest: Option<&SubjectStats> = None;
    let mut strongest: Option<&SubjectStats> = None;
    for stats in breakdown {
        if weakest.is_none_or(|w| stats.percentage < w.percentage) {
            weakest = Some(stats);
        }
        if strongest.is_none_or(|s| stats.percentage >= s.percentage) {
            strongest = Some(stats);
        }
    }
    let name = |s: Option<&SubjectStats>| s.map_or(NO_SUBJECT.to_string(), |s| s.subject.clone());
    (name(weakest), name(strongest))
}

/// Keeps the first attempt seen for each test date.
fn dedupe_by_date(attempts: Vec<CompletedAttempt>) -> Vec<CompletedAttempt> {
    let mut seen: HashSet<NaiveDate> = HashSet::new();
    attempts
        .into_iter()
        .filter(|a| seen.insert(a.test_date))
        .collect()
}

/// The most recent attempt's questions and answers.
pub struct LatestAttemptDetail {
    pub questions: Vec<Question>,
    pub answers: Vec<UserAnswer>,
}

/// Builds the report from attempts ordered most recent first.
pub fn analyze(
    attempts: &[CompletedAttempt],
    latest_detail: &LatestAttemptDetail,
) -> Result<DiagnosticReport, AppError> {
    let latest = attempts.first().ok_or_else(|| {
        AppError::NoHistory("Complete at least one test to see your diagnostic analysis".into())
    })?;

    let total_score: i64 = attempts.iter().map(|a| a.score as i64).sum();
    let total_questions: i64 = attempts.iter().map(|a| a.total_questions as i64).sum();
    let overall_accuracy = percentage(total_score, total_questions);
    let average_score = round_half_up(total_score as f64 / attempts.len() as f64);

    let subject_breakdown = subject_breakdown(&latest_detail.questions, &latest_detail.answers);
    let (weakest_subject, strongest_subject) = weakest_and_strongest(&subject_breakdown);

    let accuracy = latest.raw_percentage();
    let (questions_per_minute, avg_time_per_question, pace) = match pace_of(latest) {
        Some((qpm, avg)) => (qpm, avg, classify_pace(qpm, accuracy)),
        None => (0.0, 0, PaceClass::Balanced),
    };
    let snapshot = PaceSnapshot {
        accuracy,
        questions_per_minute,
        pace,
    };

    let recent_performance = attempts
        .iter()
        .take(RECENT_PERFORMANCE_LIMIT)
        .map(|a| RecentPerformance {
            date: a.test_date,
            score: a.score,
            total: a.total_questions,
            percentage: a.percentage(),
        })
        .collect();

    Ok(DiagnosticReport {
        overall_accuracy,
        total_attempts: attempts.len(),
        total_questions: latest.total_questions,
        total_answered: latest_detail.answers.len(),
        avg_time_per_question,
        average_score,
        trend: trend(attempts),
        concept_vs_speed: diagnose(&snapshot, &weakest_subject),
        subject_breakdown,
        weakest_subject,
        strongest_subject,
        speed_analysis: SpeedAnalysis {
            questions_per_minute,
            accuracy_vs_speed: pace,
        },
        recent_performance,
    })
}

/// Loads the trailing window for `user_id` and analyzes it.
pub async fn build_report(
    store: &dyn Store,
    clock: &dyn Clock,
    user_id: &str,
) -> Result<DiagnosticReport, AppError> {
    let today = clock.today();
    let since = today
        .checked_sub_days(Days::new(DIAGNOSTIC_WINDOW_DAYS as u64))
        .unwrap_or(NaiveDate::MIN);

    let attempts = dedupe_by_date(
        store
            .completed_attempts_for_user(user_id, Some(since), None)
            .await?,
    );
    let Some(latest) = attempts.first() else {
        return Err(AppError::NoHistory(
            "Complete at least one test to see your diagnostic analysis".into(),
        ));
    };

    let set = store.daily_set(latest.test_date).await?.ok_or_else(|| {
        AppError::DataIntegrity(format!(
            "No daily question set exists for {}",
            latest.test_date
        ))
    })?;
    let detail = LatestAttemptDetail {
        questions: store.questions_by_ids(&set.question_ids).await?,
        answers: store.answers_for_attempt(latest.id).await?,
    };

    tracing::debug!(
        "Diagnostic for {} over {} attempts since {}",
        user_id,
        attempts.len(),
        since
    );
    analyze(&attempts, &detail)
}
