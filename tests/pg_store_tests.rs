// tests/pg_store_tests.rs

//! Exercises the Postgres store directly. Skipped unless DATABASE_URL is set.

use anatomy_backend::{
    models::{
        Role,
        attempt::NewAnswer,
        question::{Difficulty, NewQuestion, QuestionType},
        quiz::{NewModule, SelectionCriteria},
    },
    store::{CatalogStore, LedgerStore, PgStore, UserStore},
};
use sqlx::postgres::PgPoolOptions;

async fn connect() -> Option<PgStore> {
    let database_url = std::env::var("DATABASE_URL").ok()?;

    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    Some(PgStore::new(pool))
}

fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..12])
}

#[tokio::test]
async fn test_ledger_upsert_and_single_completion() {
    let Some(store) = connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };

    let student = store
        .create_user(&unique("pg_student"), "not-a-real-hash", Role::Student)
        .await
        .unwrap();

    let topic = unique("topic");
    for i in 0..2 {
        store
            .create_question(NewQuestion {
                question_type: QuestionType::ShortAnswer,
                difficulty: Difficulty::Medium,
                topic: topic.clone(),
                content: format!("Question {}", i),
                options: None,
                correct_answer: format!("answer-{}", i),
                explanation: None,
            })
            .await
            .unwrap();
    }

    let (module, quiz) = store
        .create_module(NewModule {
            title: "Store test".to_string(),
            topic: topic.clone(),
            description: None,
            question_count: 2,
            time_limit: 600,
            passing_score: 60,
        })
        .await
        .unwrap();
    assert_eq!(quiz.module_id, Some(module.id));

    let criteria = SelectionCriteria {
        topic: Some(topic.clone()),
        difficulty: None,
        count: 2,
        points: 1,
    };
    let items = store.populate_quiz(quiz.id, &criteria).await.unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i.question.topic == topic));

    // Second population returns the frozen set
    let again = store.populate_quiz(quiz.id, &criteria).await.unwrap();
    let ids: Vec<i64> = items.iter().map(|i| i.question.id).collect();
    let again_ids: Vec<i64> = again.iter().map(|i| i.question.id).collect();
    assert_eq!(ids, again_ids);

    let attempt = store.create_attempt(student.id, quiz.id).await.unwrap();
    let question_id = items[0].question.id;

    for (answer, correct) in [("wrong", false), ("answer-x", true)] {
        store
            .upsert_answer(NewAnswer {
                attempt_id: attempt.id,
                question_id,
                submitted_answer: answer.to_string(),
                is_correct: correct,
                points_earned: i32::from(correct),
                time_spent: 3,
            })
            .await
            .unwrap();
    }

    let ledger = store.answers_for_attempt(attempt.id).await.unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].submitted_answer, "answer-x");
    assert!(ledger[0].is_correct);

    let completed = store.complete_attempt(attempt.id, 50).await.unwrap();
    assert_eq!(completed.and_then(|a| a.score), Some(50));
    assert!(store.complete_attempt(attempt.id, 100).await.unwrap().is_none());

    let reloaded = store.find_attempt(attempt.id).await.unwrap().unwrap();
    assert_eq!(reloaded.score, Some(50));
    assert!(reloaded.end_time.is_some());
}

#[tokio::test]
async fn test_duplicate_username_is_conflict() {
    let Some(store) = connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };

    let name = unique("pg_dup");
    store.create_user(&name, "hash", Role::Student).await.unwrap();
    let err = store.create_user(&name, "hash", Role::Student).await.unwrap_err();
    assert_eq!(err.code(), "conflict");
}
