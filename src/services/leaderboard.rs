// src/services/leaderboard.rs

use chrono::NaiveDate;

use crate::{
    config::LEADERBOARD_LIMIT,
    error::AppError,
    models::{
        attempt::CompletedAttempt,
        stats::{LeaderboardEntry, LeaderboardResponse},
    },
    store::{IdentityDirectory, Store},
    utils::{clock::Clock, rounding::round_one_decimal},
};

pub const ANONYMOUS: &str = "Anonymous";

/// Orders attempts by score (high first), then by who finished first, then
/// by attempt id, and keeps the top `limit`.
pub fn rank_attempts(mut attempts: Vec<CompletedAttempt>, limit: usize) -> Vec<CompletedAttempt> {
    attempts.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(a.completed_at.cmp(&b.completed_at))
            .then(a.id.cmp(&b.id))
    });
    attempts.truncate(limit);
    attempts
}

async fn resolve_name(identity: &dyn IdentityDirectory, user_id: &str) -> String {
    match identity.display_name(user_id).await {
        Ok(Some(name)) => name,
        Ok(None) => ANONYMOUS.to_string(),
        Err(e) => {
            tracing::warn!("Failed to resolve display name for {}: {}", user_id, e);
            ANONYMOUS.to_string()
        }
    }
}

/// Top scores of a past date (yesterday by default).
pub async fn leaderboard(
    store: &dyn Store,
    identity: &dyn IdentityDirectory,
    clock: &dyn Clock,
    user_id: &str,
    date: Option<NaiveDate>,
) -> Result<LeaderboardResponse, AppError> {
    let date = date.unwrap_or_else(|| clock.yesterday());
    if date >= clock.today() {
        return Err(AppError::Validation(format!(
            "The leaderboard for {} is not final yet",
            date
        )));
    }

    let ranked = rank_attempts(
        store.completed_attempts_for_date(date).await?,
        LEADERBOARD_LIMIT,
    );

    let mut entries = Vec::with_capacity(ranked.len());
    for (index, attempt) in ranked.into_iter().enumerate() {
        entries.push(LeaderboardEntry {
            rank: index + 1,
            name: resolve_name(identity, &attempt.user_id).await,
            score: attempt.score,
            total_questions: attempt.total_questions,
            percentage: round_one_decimal(attempt.raw_percentage()),
            is_current_user: attempt.user_id == user_id,
            submitted_at: attempt.completed_at,
        });
    }

    Ok(LeaderboardResponse { date, entries })
}
