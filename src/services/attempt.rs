// src/services/attempt.rs

//! Attempt lifecycle: `NotStarted -> InProgress -> Completed`.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::{
    config::HISTORY_LIMIT,
    error::AppError,
    models::{
        answer::{AnswerWrite, UserAnswer},
        attempt::{
            AttemptStatus, HistoryEntry, HistoryResponse, ReviewItem, SubmitResponse, TestAttempt, TodayResponse,
        },
        daily_set::DailyQuestionSet,
        question::{OptionLetter, PublicQuestion, Question},
    },
    services::daily_set::ensure_daily_set,
    store::Store,
    utils::{clock::Clock, rounding::percentage},
};

#[derive(Debug, Clone)]
pub struct StartOutcome {
    pub attempt: TestAttempt,
    /// `false` when an existing attempt was returned.
    pub created: bool,
}

fn attempt_not_found(attempt_id: i64) -> AppError {
    AppError::NotFound(format!("Attempt {} not found", attempt_id))
}

async fn required_daily_set(
    store: &dyn Store,
    date: NaiveDate,
) -> Result<DailyQuestionSet, AppError> {
    store.daily_set(date).await?.ok_or_else(|| {
        AppError::DataIntegrity(format!("No daily question set exists for {}", date))
    })
}

/// Begins (or resumes) the user's attempt for `date`, defaulting to today.
pub async fn start(
    store: &dyn Store,
    clock: &dyn Clock,
    user_id: &str,
    date: Option<NaiveDate>,
) -> Result<StartOutcome, AppError> {
    let today = clock.today();
    let date = date.unwrap_or(today);
    if date > today {
        return Err(AppError::Validation(format!(
            "Cannot start the test for {} before that day",
            date
        )));
    }

    if let Some(attempt) = store.attempt_for_date(user_id, date).await? {
        return Ok(StartOutcome {
            attempt,
            created: false,
        });
    }

    let set = ensure_daily_set(store, clock, date).await?;

    if let Some(attempt) = store
        .insert_attempt(user_id, date, clock.now(), set.len() as i32)
        .await?
    {
        tracing::info!("User {} started attempt {} for {}", user_id, attempt.id, date);
        return Ok(StartOutcome {
            attempt,
            created: true,
        });
    }

    // Lost a race against another start for the same (user, date).
    let attempt = store
        .attempt_for_date(user_id, date)
        .await?
        .ok_or_else(|| {
            AppError::DataIntegrity(format!(
                "Attempt for {} on {} vanished after a conflicting insert",
                user_id, date
            ))
        })?;
    Ok(StartOutcome {
        attempt,
        created: false,
    })
}

/// Records (or replaces) the user's answer to one question of an in-progress
/// attempt. Returns whether the answer is correct.
pub async fn record_answer(
    store: &dyn Store,
    clock: &dyn Clock,
    attempt_id: i64,
    user_id: &str,
    question_id: i64,
    answer: OptionLetter,
) -> Result<bool, AppError> {
    let attempt = store
        .attempt_for_user(attempt_id, user_id)
        .await?
        .ok_or_else(|| attempt_not_found(attempt_id))?;

    if attempt.is_completed() {
        return Err(AppError::StateConflict(format!(
            "Attempt {} is already completed",
            attempt_id
        )));
    }

    let set = required_daily_set(store, attempt.test_date).await?;
    if !set.contains(question_id) {
        return Err(AppError::NotFound(format!(
            "Question {} is not part of the {} set",
            question_id, attempt.test_date
        )));
    }

    let question = store
        .question(question_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Question {} not found", question_id)))?;

    let is_correct = question.is_correct(answer);
    let write = store
        .write_answer(&UserAnswer {
            attempt_id,
            question_id,
            user_answer: answer,
            is_correct,
            answered_at: clock.now(),
        })
        .await?;

    match write {
        AnswerWrite::Written => Ok(is_correct),
        AnswerWrite::AttemptCompleted => Err(AppError::StateConflict(format!(
            "Attempt {} is already completed",
            attempt_id
        ))),
        AnswerWrite::AttemptMissing => Err(attempt_not_found(attempt_id)),
    }
}

/// Completes the attempt on first call and returns the full review.
/// Later calls replay the stored score without touching it.
pub async fn submit(
    store: &dyn Store,
    clock: &dyn Clock,
    attempt_id: i64,
    user_id: &str,
) -> Result<SubmitResponse, AppError> {
    let attempt = store
        .attempt_for_user(attempt_id, user_id)
        .await?
        .ok_or_else(|| attempt_not_found(attempt_id))?;

    let set = required_daily_set(store, attempt.test_date).await?;

    let attempt = if attempt.is_completed() {
        attempt
    } else {
        let completed = store
            .complete_attempt(attempt_id, clock.now())
            .await?
            .ok_or_else(|| attempt_not_found(attempt_id))?;
        tracing::info!(
            "Attempt {} submitted with score {:?}/{}",
            attempt_id,
            completed.score,
            completed.total_questions
        );
        completed
    };

    let completed_at = attempt.completed_at.ok_or_else(|| {
        AppError::DataIntegrity(format!("Attempt {} has no completion time", attempt_id))
    })?;

    let answers = store.answers_for_attempt(attempt_id).await?;
    let questions = store.questions_by_ids(&set.question_ids).await?;
    let results = build_review(&set, questions, answers);

    let score = attempt.score.unwrap_or(0);
    Ok(SubmitResponse {
        attempt_id,
        score,
        total_questions: attempt.total_questions,
        percentage: percentage(score as i64, attempt.total_questions as i64),
        test_date: attempt.test_date,
        completed_at,
        results,
    })
}

/// Left-joins the set's questions (in set order) against the recorded answers.
fn build_review(
    set: &DailyQuestionSet,
    questions: Vec<Question>,
    answers: Vec<UserAnswer>,
) -> Vec<ReviewItem> {
    let mut questions: HashMap<i64, Question> =
        questions.into_iter().map(|q| (q.id, q)).collect();
    let answers: HashMap<i64, UserAnswer> =
        answers.into_iter().map(|a| (a.question_id, a)).collect();

    set.question_ids
        .iter()
        .filter_map(|id| {
            let Some(q) = questions.remove(id) else {
                tracing::warn!(
                    "Question {} of the {} set is missing from the catalog",
                    id,
                    set.test_date
                );
                return None;
            };
            let answer = answers.get(id);
            Some(ReviewItem {
                question_id: q.id,
                question_text: q.question_text,
                option_a: q.option_a,
                option_b: q.option_b,
                option_c: q.option_c,
                option_d: q.option_d,
                correct_answer: q.correct_answer,
                explanation: q.explanation,
                subject: q.subject,
                image_url: q.image_url,
                video_url: q.video_url,
                video_type: q.video_type,
                user_answer: answer.map(|a| a.user_answer),
                is_correct: answer.is_some_and(|a| a.is_correct),
            })
        })
        .collect()
}

/// Today's questions (without answers) plus the user's attempt state.
pub async fn today(
    store: &dyn Store,
    clock: &dyn Clock,
    user_id: &str,
) -> Result<TodayResponse, AppError> {
    let today = clock.today();
    let set = ensure_daily_set(store, clock, today).await?;

    let mut by_id: HashMap<i64, Question> = store
        .questions_by_ids(&set.question_ids)
        .await?
        .into_iter()
        .map(|q| (q.id, q))
        .collect();
    let questions: Vec<PublicQuestion> = set
        .question_ids
        .iter()
        .filter_map(|id| by_id.remove(id))
        .map(PublicQuestion::from)
        .collect();

    let attempt = store.attempt_for_date(user_id, today).await?;

    Ok(TodayResponse {
        questions,
        attempt_id: attempt.as_ref().map(|a| a.id),
        status: AttemptStatus::of(attempt.as_ref()),
        is_completed: attempt.as_ref().is_some_and(|a| a.is_completed()),
        score: attempt.as_ref().and_then(|a| a.score),
        test_date: today,
    })
}

/// Most recent completed attempts, newest first.
pub async fn history(store: &dyn Store, user_id: &str) -> Result<HistoryResponse, AppError> {
    let tests = store
        .completed_attempts_for_user(user_id, None, Some(HISTORY_LIMIT))
        .await?
        .into_iter()
        .map(HistoryEntry::from)
        .collect();
    Ok(HistoryResponse { tests })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;
    use crate::{
        services::test_support::{clock_at, store_with_questions},
        store::MemoryStore,
    };

    const USER: &str = "user-a";

    async fn started(store: &MemoryStore, clock: &dyn Clock) -> (TestAttempt, DailyQuestionSet) {
        let outcome = start(store, clock, USER, None).await.unwrap();
        let set = store
            .daily_set(outcome.attempt.test_date)
            .await
            .unwrap()
            .unwrap();
        (outcome.attempt, set)
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let store = store_with_questions(40);
        let clock = clock_at(2025, 1, 6);

        let first = start(&store, &clock, USER, None).await.unwrap();
        let second = start(&store, &clock, USER, None).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.attempt.id, second.attempt.id);
        assert_eq!(first.attempt.status(), AttemptStatus::InProgress);
        assert_eq!(first.attempt.total_questions, 25);
    }

    #[tokio::test]
    async fn test_concurrent_starts_share_one_attempt() {
        let store = Arc::new(store_with_questions(40));
        let clock = Arc::new(clock_at(2025, 1, 6));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let clock = clock.clone();
            handles.push(tokio::spawn(async move {
                start(store.as_ref(), clock.as_ref(), USER, None)
                    .await
                    .unwrap()
                    .attempt
                    .id
            }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn test_start_rejects_future_date() {
        let store = store_with_questions(40);
        let clock = clock_at(2025, 1, 6);
        let tomorrow = NaiveDate::from_ymd_opt(2025, 1, 7).unwrap();

        let err = start(&store, &clock, USER, Some(tomorrow)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_start_with_small_catalog_fails() {
        let store = store_with_questions(10);
        let clock = clock_at(2025, 1, 6);

        let err = start(&store, &clock, USER, None).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientCatalog { .. }));
    }

    #[tokio::test]
    async fn test_last_answer_wins() {
        let store = store_with_questions(40);
        let clock = clock_at(2025, 1, 6);
        let (attempt, set) = started(&store, &clock).await;
        let q = set.question_ids[0];

        assert!(record_answer(&store, &clock, attempt.id, USER, q, OptionLetter::A).await.unwrap());
        assert!(!record_answer(&store, &clock, attempt.id, USER, q, OptionLetter::C).await.unwrap());

        let answers = store.answers_for_attempt(attempt.id).await.unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].user_answer, OptionLetter::C);
        assert!(!answers[0].is_correct);
    }

    #[tokio::test]
    async fn test_answer_on_foreign_attempt_is_not_found() {
        let store = store_with_questions(40);
        let clock = clock_at(2025, 1, 6);
        let (attempt, set) = started(&store, &clock).await;

        let err = record_answer(
            &store,
            &clock,
            attempt.id,
            "someone-else",
            set.question_ids[0],
            OptionLetter::A,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_answer_outside_daily_set_is_not_found() {
        let store = store_with_questions(40);
        let clock = clock_at(2025, 1, 6);
        let (attempt, set) = started(&store, &clock).await;
        let outside = (1..=40).find(|id| !set.contains(*id)).unwrap();

        let err = record_answer(&store, &clock, attempt.id, USER, outside, OptionLetter::A)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_score_counts_only_correct_answers() {
        let store = store_with_questions(40);
        let clock = clock_at(2025, 1, 6);
        let (attempt, set) = started(&store, &clock).await;

        // 10 correct, 5 wrong, 10 unanswered
        for q in &set.question_ids[..10] {
            record_answer(&store, &clock, attempt.id, USER, *q, OptionLetter::A).await.unwrap();
        }
        for q in &set.question_ids[10..15] {
            record_answer(&store, &clock, attempt.id, USER, *q, OptionLetter::B).await.unwrap();
        }

        clock.advance(Duration::minutes(20));
        let result = submit(&store, &clock, attempt.id, USER).await.unwrap();

        assert_eq!(result.score, 10);
        assert_eq!(result.total_questions, 25);
        assert_eq!(result.percentage, 40);
        assert_eq!(result.results.len(), 25);

        let review_ids: Vec<i64> = result.results.iter().map(|r| r.question_id).collect();
        assert_eq!(review_ids, set.question_ids);

        let unanswered = &result.results[20];
        assert_eq!(unanswered.user_answer, None);
        assert!(!unanswered.is_correct);
        assert_eq!(result.results[12].user_answer, Some(OptionLetter::B));
    }

    #[tokio::test]
    async fn test_submit_is_replayed_after_completion() {
        let store = store_with_questions(40);
        let clock = clock_at(2025, 1, 6);
        let (attempt, set) = started(&store, &clock).await;
        record_answer(&store, &clock, attempt.id, USER, set.question_ids[0], OptionLetter::A)
            .await
            .unwrap();

        let first = submit(&store, &clock, attempt.id, USER).await.unwrap();

        let err = record_answer(&store, &clock, attempt.id, USER, set.question_ids[1], OptionLetter::A)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StateConflict(_)));

        clock.advance(Duration::hours(1));
        let second = submit(&store, &clock, attempt.id, USER).await.unwrap();

        assert_eq!(first.score, 1);
        assert_eq!(second.score, 1);
        assert_eq!(first.completed_at, second.completed_at);
    }

    #[tokio::test]
    async fn test_replay_ignores_out_of_band_answers() {
        let store = store_with_questions(40);
        let clock = clock_at(2025, 1, 6);
        let (attempt, set) = started(&store, &clock).await;
        let first = submit(&store, &clock, attempt.id, USER).await.unwrap();
        assert_eq!(first.score, 0);

        // Bypass the engine: the store refuses writes to a completed attempt.
        let write = store
            .write_answer(&UserAnswer {
                attempt_id: attempt.id,
                question_id: set.question_ids[0],
                user_answer: OptionLetter::A,
                is_correct: true,
                answered_at: clock.now(),
            })
            .await
            .unwrap();
        assert_eq!(write, AnswerWrite::AttemptCompleted);

        let again = submit(&store, &clock, attempt.id, USER).await.unwrap();
        assert_eq!(again.score, 0);
    }

    #[tokio::test]
    async fn test_submit_foreign_attempt_is_not_found() {
        let store = store_with_questions(40);
        let clock = clock_at(2025, 1, 6);
        let (attempt, _) = started(&store, &clock).await;

        let err = submit(&store, &clock, attempt.id, "intruder").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = submit(&store, &clock, 9999, USER).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_submit_without_daily_set_is_integrity_error() {
        let store = store_with_questions(40);
        let clock = clock_at(2025, 1, 6);
        let date = clock.today();
        let attempt = store
            .insert_attempt(USER, date, clock.now(), 25)
            .await
            .unwrap()
            .unwrap();

        let err = submit(&store, &clock, attempt.id, USER).await.unwrap_err();
        assert!(matches!(err, AppError::DataIntegrity(_)));
    }

    #[tokio::test]
    async fn test_today_hides_answers_and_tracks_attempt() {
        let store = store_with_questions(40);
        let clock = clock_at(2025, 1, 6);

        let before = today(&store, &clock, USER).await.unwrap();
        assert_eq!(before.questions.len(), 25);
        assert_eq!(before.attempt_id, None);
        assert_eq!(before.status, AttemptStatus::NotStarted);
        assert!(!before.is_completed);

        let (attempt, set) = started(&store, &clock).await;
        let shown: Vec<i64> = before.questions.iter().map(|q| q.id).collect();
        assert_eq!(shown, set.question_ids);
        let during = today(&store, &clock, USER).await.unwrap();
        assert_eq!(during.status, AttemptStatus::InProgress);

        submit(&store, &clock, attempt.id, USER).await.unwrap();
        let after = today(&store, &clock, USER).await.unwrap();
        assert_eq!(after.attempt_id, Some(attempt.id));
        assert_eq!(after.status, AttemptStatus::Completed);
        assert!(after.is_completed);
        assert_eq!(after.score, Some(0));
    }

    #[tokio::test]
    async fn test_history_lists_completed_attempts_newest_first() {
        let store = store_with_questions(40);
        let clock = clock_at(2025, 1, 6);

        for day in 0..3 {
            let outcome = start(&store, &clock, USER, None).await.unwrap();
            if day != 1 {
                submit(&store, &clock, outcome.attempt.id, USER).await.unwrap();
            }
            clock.advance(Duration::days(1));
        }

        let history = history(&store, USER).await.unwrap();
        let dates: Vec<String> = history.tests.iter().map(|t| t.test_date.to_string()).collect();
        assert_eq!(dates, vec!["2025-01-08", "2025-01-06"]);
    }
}
