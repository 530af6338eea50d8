// src/services/stats.rs

use crate::{
    error::AppError,
    models::stats::{PersonalStats, PlatformStats, StatsResponse},
    services::streak::calculate_streaks,
    store::Store,
    utils::{
        clock::Clock,
        rounding::{percentage, round_half_up},
    },
};

/// Platform aggregates plus the caller's streaks and personal totals.
pub async fn stats(
    store: &dyn Store,
    clock: &dyn Clock,
    user_id: &str,
) -> Result<StatsResponse, AppError> {
    let today = clock.today();

    let totals = store.platform_totals(today).await?;
    let platform = PlatformStats {
        total_users: totals.total_users,
        total_tests_taken: totals.total_tests_taken,
        tests_today: totals.tests_today,
        average_platform_score: round_half_up(totals.average_percentage.unwrap_or(0.0)),
    };

    let attempts = store.completed_attempts_for_user(user_id, None, None).await?;
    let dates: Vec<_> = attempts.iter().map(|a| a.test_date).collect();
    let streaks = calculate_streaks(&dates, today);

    let total_score: i64 = attempts.iter().map(|a| a.score as i64).sum();
    let total_questions: i64 = attempts.iter().map(|a| a.total_questions as i64).sum();

    let personal = PersonalStats {
        current_streak: streaks.current_streak,
        longest_streak: streaks.longest_streak,
        total_tests_completed: attempts.len(),
        average_score: percentage(total_score, total_questions),
        best_score: attempts.iter().map(|a| a.percentage()).max().unwrap_or(0),
        last_test_date: attempts.first().map(|a| a.test_date),
    };

    Ok(StatsResponse { platform, personal })
}
