// tests/postgres_tests.rs

//! Store tests against a live database.
//! Run with `DATABASE_URL=... cargo test -- --ignored`.

use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use daily_practice::{
    config::DAILY_SET_SIZE,
    error::AppError,
    models::question::OptionLetter,
    services::{attempt, daily_set::ensure_daily_set},
    store::{Catalog, PgStore, Store},
    utils::clock::FixedClock,
};
use sqlx::postgres::PgPoolOptions;

async fn connect() -> PgStore {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    // Make sure the catalog can fill a daily set.
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
        .fetch_one(&pool)
        .await
        .unwrap();
    for i in existing..(DAILY_SET_SIZE as i64 + 5) {
        sqlx::query(
            r#"
            INSERT INTO questions
                (question_text, option_a, option_b, option_c, option_d, correct_answer, subject)
            VALUES ($1, 'first', 'second', 'third', 'fourth', 'A', 'Comprehension')
            "#,
        )
        .bind(format!("Seeded question {}", i))
        .execute(&pool)
        .await
        .unwrap();
    }

    PgStore::new(pool)
}

fn clock() -> FixedClock {
    FixedClock::new(Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap())
}

fn new_user() -> String {
    format!("pg-test-{}", uuid::Uuid::new_v4())
}

#[tokio::test]
#[ignore]
async fn concurrent_daily_set_creation_agrees() {
    let store = Arc::new(connect().await);
    let clock = Arc::new(clock());
    let date = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        let clock = clock.clone();
        handles.push(tokio::spawn(async move {
            ensure_daily_set(store.as_ref(), clock.as_ref(), date)
                .await
                .unwrap()
        }));
    }

    let mut sets = Vec::new();
    for handle in handles {
        sets.push(handle.await.unwrap());
    }
    assert_eq!(sets[0].len(), DAILY_SET_SIZE);
    assert!(sets.iter().all(|s| s.question_ids == sets[0].question_ids));
    assert!(store.question_count().await.unwrap() >= DAILY_SET_SIZE as i64);
}

#[tokio::test]
#[ignore]
async fn concurrent_starts_share_one_attempt() {
    let store = Arc::new(connect().await);
    let clock = Arc::new(clock());
    let user = new_user();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        let clock = clock.clone();
        let user = user.clone();
        handles.push(tokio::spawn(async move {
            attempt::start(store.as_ref(), clock.as_ref(), &user, None)
                .await
                .unwrap()
        }));
    }

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }
    assert_eq!(outcomes.iter().filter(|o| o.created).count(), 1);
    assert!(outcomes.iter().all(|o| o.attempt.id == outcomes[0].attempt.id));
}

#[tokio::test]
#[ignore]
async fn submit_scores_and_locks_the_attempt() {
    let store = connect().await;
    let clock = clock();
    let user = new_user();

    let started = attempt::start(&store, &clock, &user, None).await.unwrap();
    let set = store.daily_set(started.attempt.test_date).await.unwrap().unwrap();

    for q in &set.question_ids[..3] {
        attempt::record_answer(&store, &clock, started.attempt.id, &user, *q, OptionLetter::B)
            .await
            .unwrap();
    }
    // The last answer for a question wins.
    attempt::record_answer(
        &store,
        &clock,
        started.attempt.id,
        &user,
        set.question_ids[0],
        OptionLetter::A,
    )
    .await
    .unwrap();

    let first = attempt::submit(&store, &clock, started.attempt.id, &user)
        .await
        .unwrap();
    let again = attempt::submit(&store, &clock, started.attempt.id, &user)
        .await
        .unwrap();

    let answers = store.answers_for_attempt(started.attempt.id).await.unwrap();
    assert_eq!(answers.len(), 3);
    assert_eq!(first.score, again.score);
    assert_eq!(first.completed_at, again.completed_at);

    let late = attempt::record_answer(
        &store,
        &clock,
        started.attempt.id,
        &user,
        set.question_ids[1],
        OptionLetter::A,
    )
    .await;
    assert!(matches!(late, Err(AppError::StateConflict(_))));
}
