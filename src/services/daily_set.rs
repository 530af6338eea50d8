// src/services/daily_set.rs

use chrono::NaiveDate;

use crate::{
    config::DAILY_SET_SIZE,
    error::AppError,
    models::daily_set::DailyQuestionSet,
    store::Store,
    utils::clock::Clock,
};

/// Returns the question set for `date`, generating it on first use.
///
/// Concurrent first callers may all draw a candidate set; the store keeps
/// exactly one per date and the losers read back the winner's set.
pub async fn ensure_daily_set(
    store: &dyn Store,
    clock: &dyn Clock,
    date: NaiveDate,
) -> Result<DailyQuestionSet, AppError> {
    if let Some(set) = store.daily_set(date).await? {
        return Ok(set);
    }

    let available = store.question_count().await?;
    if available < DAILY_SET_SIZE as i64 {
        tracing::warn!(
            "Cannot build daily set for {}: catalog holds {} questions",
            date,
            available
        );
        return Err(AppError::InsufficientCatalog {
            available,
            required: DAILY_SET_SIZE,
        });
    }

    let question_ids = store.random_question_ids(DAILY_SET_SIZE).await?;
    if question_ids.len() < DAILY_SET_SIZE {
        return Err(AppError::InsufficientCatalog {
            available: question_ids.len() as i64,
            required: DAILY_SET_SIZE,
        });
    }

    let candidate = DailyQuestionSet::new(date, question_ids, clock.now())?;
    if store.insert_daily_set(&candidate).await? {
        tracing::info!("Created daily question set for {}", date);
        return Ok(candidate);
    }

    tracing::info!("Daily set for {} was created concurrently, re-reading", date);
    store.daily_set(date).await?.ok_or_else(|| {
        AppError::DataIntegrity(format!(
            "Daily set for {} vanished after a conflicting insert",
            date
        ))
    })
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Arc};

    use super::*;
    use crate::{
        services::test_support::{clock_at, store_with_questions},
        store::MemoryStore,
    };

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
    }

    #[tokio::test]
    async fn test_creates_25_distinct_questions() {
        let store = store_with_questions(60);
        let clock = clock_at(2025, 1, 6);

        let set = ensure_daily_set(&store, &clock, date()).await.unwrap();

        assert_eq!(set.len(), DAILY_SET_SIZE);
        let distinct: HashSet<i64> = set.question_ids.iter().copied().collect();
        assert_eq!(distinct.len(), DAILY_SET_SIZE);
        assert!(set.question_ids.iter().all(|id| (1..=60).contains(id)));
    }

    #[tokio::test]
    async fn test_second_call_returns_same_order() {
        let store = store_with_questions(60);
        let clock = clock_at(2025, 1, 6);

        let first = ensure_daily_set(&store, &clock, date()).await.unwrap();
        let second = ensure_daily_set(&store, &clock, date()).await.unwrap();

        assert_eq!(first.question_ids, second.question_ids);
    }

    #[tokio::test]
    async fn test_different_dates_get_their_own_sets() {
        let store = store_with_questions(60);
        let clock = clock_at(2025, 1, 6);
        let next = date().succ_opt().unwrap();

        let a = ensure_daily_set(&store, &clock, date()).await.unwrap();
        let b = ensure_daily_set(&store, &clock, next).await.unwrap();

        assert_eq!(a.test_date, date());
        assert_eq!(b.test_date, next);
    }

    #[tokio::test]
    async fn test_small_catalog_is_rejected() {
        let store = store_with_questions(24);
        let clock = clock_at(2025, 1, 6);

        let err = ensure_daily_set(&store, &clock, date()).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientCatalog {
                available: 24,
                required: 25
            }
        ));
        assert!(store.daily_set(date()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exactly_25_questions_is_enough() {
        let store = store_with_questions(25);
        let clock = clock_at(2025, 1, 6);

        let set = ensure_daily_set(&store, &clock, date()).await.unwrap();
        let mut ids = set.question_ids.clone();
        ids.sort();
        assert_eq!(ids, (1..=25).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn test_concurrent_callers_observe_one_set() {
        let store: Arc<MemoryStore> = Arc::new(store_with_questions(200));
        let clock = Arc::new(clock_at(2025, 1, 6));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            let clock = clock.clone();
            handles.push(tokio::spawn(async move {
                ensure_daily_set(store.as_ref(), clock.as_ref(), date())
                    .await
                    .unwrap()
            }));
        }

        let mut sets = Vec::new();
        for handle in handles {
            sets.push(handle.await.unwrap());
        }

        let persisted = store.daily_set(date()).await.unwrap().unwrap();
        assert!(sets.iter().all(|s| s.question_ids == persisted.question_ids));
    }
}
