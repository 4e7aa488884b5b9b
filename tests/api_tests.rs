// tests/api_tests.rs

mod common;

use std::sync::Arc;

use anatomy_backend::{
    routes,
    state::AppState,
    store::MemoryStore,
};
use axum::{body::Body, http::Request};
use serde_json::{Value, json};
use tower::ServiceExt;

use common::{PASSWORD, spawn_app};

#[tokio::test]
async fn test_unknown_path_is_404() {
    let state = AppState::new(MemoryStore::new(), common::test_config());
    let app = routes::create_router(state);

    let response = app
        .oneshot(Request::builder().uri("/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn test_register_validation_and_duplicate() {
    let app = spawn_app().await;

    let ok = app
        .client
        .post(app.url("/auth/register"))
        .json(&json!({ "username": "femur_fan", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status().as_u16(), 201);
    let user: Value = ok.json().await.unwrap();
    assert_eq!(user["role"], "student");
    assert!(user.get("password").is_none());

    let short = app
        .client
        .post(app.url("/auth/register"))
        .json(&json!({ "username": "ab", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(short.status().as_u16(), 400);

    let dup = app
        .client
        .post(app.url("/auth/register"))
        .json(&json!({ "username": "femur_fan", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(dup.status().as_u16(), 409);
    let body: Value = dup.json().await.unwrap();
    assert_eq!(body["code"], "conflict");
}

#[tokio::test]
async fn test_quiz_routes_require_auth() {
    let app = spawn_app().await;

    let resp = app.client.get(app.url("/quiz/attempts")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    let resp = app.get("not-a-token", "/quiz/analytics").await;
    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn test_students_cannot_use_admin_routes() {
    let app = spawn_app().await;
    let token = app.student().await;

    let resp = app.get(&token, "/admin/questions").await;
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn test_resubmitting_keeps_one_ledger_row() {
    let app = spawn_app().await;
    let module_id = app.seed_module("skeletal", 10, 60).await;
    let token = app.student().await;
    let (attempt_id, key) = app.start_module(&token, module_id).await;
    assert_eq!(key.len(), 10);

    let (first_id, first_answer) = &key[0];
    let wrong = app.answer(&token, attempt_id, *first_id, "not it").await;
    assert_eq!(wrong.status().as_u16(), 200);
    let wrong: Value = wrong.json().await.unwrap();
    assert_eq!(wrong["isCorrect"], false);
    assert_eq!(wrong["pointsEarned"], 0);

    for (question_id, answer) in &key {
        let resp = app.answer(&token, attempt_id, *question_id, answer).await;
        assert_eq!(resp.status().as_u16(), 200);
    }
    // Correct answer twice more on the same question
    app.answer(&token, attempt_id, *first_id, first_answer).await;

    assert_eq!(app.ledger_rows(attempt_id, *first_id).await, 1);

    let resp = app.finish(&token, attempt_id).await;
    assert_eq!(resp.status().as_u16(), 200);
    let result: Value = resp.json().await.unwrap();
    assert_eq!(result["score"], 100);
    assert_eq!(result["passed"], true);
    assert_eq!(result["totalQuestions"], 10);
    assert_eq!(result["answeredQuestions"], 10);
    assert_eq!(result["totalPointsEarned"], 10);
    assert_eq!(result["totalPossiblePoints"], 10);
}

#[tokio::test]
async fn test_unanswered_questions_count_against_score() {
    let app = spawn_app().await;
    let module_id = app.seed_module("muscular", 10, 60).await;
    let token = app.student().await;
    let (attempt_id, key) = app.start_module(&token, module_id).await;

    for (question_id, answer) in key.iter().take(5) {
        app.answer(&token, attempt_id, *question_id, answer).await;
    }

    let result: Value = app.finish(&token, attempt_id).await.json().await.unwrap();
    assert_eq!(result["score"], 50);
    assert_eq!(result["passed"], false);
    assert_eq!(result["answeredQuestions"], 5);
    assert_eq!(result["totalPointsEarned"], 5);
    assert_eq!(result["totalPossiblePoints"], 10);
}

#[tokio::test]
async fn test_finish_twice_is_invalid_state() {
    let app = spawn_app().await;
    let module_id = app.seed_module("nervous", 4, 50).await;
    let token = app.student().await;
    let (attempt_id, key) = app.start_module(&token, module_id).await;

    for (question_id, answer) in key.iter().take(3) {
        app.answer(&token, attempt_id, *question_id, answer).await;
    }
    let first: Value = app.finish(&token, attempt_id).await.json().await.unwrap();
    assert_eq!(first["score"], 75);

    let second = app.finish(&token, attempt_id).await;
    assert_eq!(second.status().as_u16(), 400);
    let body: Value = second.json().await.unwrap();
    assert_eq!(body["code"], "invalid_state");

    let detail: Value = app
        .get(&token, &format!("/quiz/attempt/{}", attempt_id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(detail["status"], "completed");
    assert_eq!(detail["score"], 75);
    assert_eq!(detail["passed"], true);
}

#[tokio::test]
async fn test_answer_rules() {
    let app = spawn_app().await;
    let module_id = app.seed_module("cardio", 3, 60).await;
    let outsider = app.seed_question("renal", "easy", "kidney").await;
    let token = app.student().await;
    let other = app.student().await;
    let (attempt_id, key) = app.start_module(&token, module_id).await;

    // Question outside the attempt's quiz
    let resp = app.answer(&token, attempt_id, outsider, "kidney").await;
    assert_eq!(resp.status().as_u16(), 404);

    // Someone else's attempt looks missing
    let resp = app.answer(&other, attempt_id, key[0].0, &key[0].1).await;
    assert_eq!(resp.status().as_u16(), 404);
    let resp = app.get(&other, &format!("/quiz/attempt/{}/progress", attempt_id)).await;
    assert_eq!(resp.status().as_u16(), 404);

    let resp = app
        .post(
            &token,
            &format!("/quiz/attempt/{}/answer", attempt_id),
            json!({ "questionId": key[0].0, "answer": "x", "timeSpent": -1 }),
        )
        .await;
    assert_eq!(resp.status().as_u16(), 400);

    app.finish(&token, attempt_id).await;

    let resp = app.answer(&token, attempt_id, key[0].0, &key[0].1).await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "invalid_state");
    assert_eq!(app.ledger_rows(attempt_id, key[0].0).await, 0);
}

#[tokio::test]
async fn test_progress_only_grows() {
    let app = spawn_app().await;
    let module_id = app.seed_module("respiratory", 4, 60).await;
    let token = app.student().await;
    let (attempt_id, key) = app.start_module(&token, module_id).await;
    let path = format!("/quiz/attempt/{}/progress", attempt_id);

    let progress: Value = app.get(&token, &path).await.json().await.unwrap();
    assert_eq!(progress["answeredQuestions"], 0);
    assert_eq!(progress["progressPercentage"], 0);
    assert_eq!(progress["status"], "in_progress");

    app.answer(&token, attempt_id, key[0].0, "wrong").await;
    let progress: Value = app.get(&token, &path).await.json().await.unwrap();
    assert_eq!(progress["answeredQuestions"], 1);
    assert_eq!(progress["progressPercentage"], 25);

    // Correcting an answer does not count twice
    app.answer(&token, attempt_id, key[0].0, &key[0].1).await;
    app.answer(&token, attempt_id, key[1].0, &key[1].1).await;
    let progress: Value = app.get(&token, &path).await.json().await.unwrap();
    assert_eq!(progress["answeredQuestions"], 2);
    assert_eq!(progress["progressPercentage"], 50);

    let questions = progress["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 4);
    assert_eq!(questions.iter().filter(|q| q["answered"] == true).count(), 2);
}

#[tokio::test]
async fn test_attempt_detail_hides_answers_until_completed() {
    let app = spawn_app().await;
    let module_id = app.seed_module("digestive", 2, 60).await;
    let token = app.student().await;
    let (attempt_id, key) = app.start_module(&token, module_id).await;
    let path = format!("/quiz/attempt/{}", attempt_id);

    let open: Value = app.get(&token, &path).await.json().await.unwrap();
    for q in open["questions"].as_array().unwrap() {
        assert!(q["correctAnswer"].is_null());
        assert!(q["explanation"].is_null());
    }

    app.answer(&token, attempt_id, key[0].0, &key[0].1).await;
    app.finish(&token, attempt_id).await;

    let done: Value = app.get(&token, &path).await.json().await.unwrap();
    let first = done["questions"]
        .as_array()
        .unwrap()
        .iter()
        .find(|q| q["id"].as_i64() == Some(key[0].0))
        .unwrap();
    assert_eq!(first["correctAnswer"], key[0].1.as_str());
    assert_eq!(first["answer"]["isCorrect"], true);
}

#[tokio::test]
async fn test_timed_exam_question_count() {
    let app = spawn_app().await;
    for i in 0..3 {
        app.seed_question("skeletal", "easy", &format!("bone-{}", i)).await;
    }
    let token = app.student().await;

    for count in [0, 4] {
        let resp = app
            .post(
                &token,
                "/quiz/timed-exam/start",
                json!({ "timeLimit": 600, "questionCount": count }),
            )
            .await;
        assert_eq!(resp.status().as_u16(), 400);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["code"], "invalid_input");
    }

    let resp = app
        .post(
            &token,
            "/quiz/timed-exam/start",
            json!({ "timeLimit": 600, "questionCount": 3 }),
        )
        .await;
    assert_eq!(resp.status().as_u16(), 201);
    let started: Value = resp.json().await.unwrap();
    assert_eq!(started["totalQuestions"], 3);
    assert_eq!(started["timeLimit"], 600);
    assert_eq!(started["passingScore"], 60);
}

#[tokio::test]
async fn test_adaptive_prefers_target_difficulty() {
    let app = spawn_app().await;
    for i in 0..3 {
        app.seed_question("skeletal", "hard", &format!("hard-{}", i)).await;
        app.seed_question("skeletal", "easy", &format!("easy-{}", i)).await;
    }
    let token = app.student().await;

    let resp = app
        .post(
            &token,
            "/quiz/adaptive/start",
            json!({ "targetDifficulty": "hard", "questionCount": 3 }),
        )
        .await;
    assert_eq!(resp.status().as_u16(), 201);
    let started: Value = resp.json().await.unwrap();
    let attempt_id = started["attemptId"].as_i64().unwrap();

    let detail: Value = app
        .get(&token, &format!("/quiz/attempt/{}", attempt_id))
        .await
        .json()
        .await
        .unwrap();
    let questions = detail["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 3);
    assert!(questions.iter().all(|q| q["difficulty"] == "hard"));
}

#[tokio::test]
async fn test_history_and_analytics() {
    let app = spawn_app().await;
    let module_id = app.seed_module("lymphatic", 4, 60).await;
    let token = app.student().await;

    let (first, key) = app.start_module(&token, module_id).await;
    for (question_id, answer) in &key {
        app.answer(&token, first, *question_id, answer).await;
    }
    app.finish(&token, first).await;

    let (second, key) = app.start_module(&token, module_id).await;
    app.answer(&token, second, key[0].0, &key[0].1).await;
    app.finish(&token, second).await;

    let history: Vec<Value> = app.get(&token, "/quiz/attempts").await.json().await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["id"].as_i64(), Some(second));
    assert_eq!(history[0]["passed"], false);
    assert_eq!(history[1]["passed"], true);

    let analytics: Value = app.get(&token, "/quiz/analytics").await.json().await.unwrap();
    assert_eq!(analytics["completedAttempts"], 2);
    assert_eq!(analytics["passedAttempts"], 1);
    assert_eq!(analytics["bestScore"], 100);
    let topics = analytics["topics"].as_array().unwrap();
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0]["topic"], "lymphatic");
    assert_eq!(topics[0]["answered"], 5);
    assert_eq!(topics[0]["correct"], 5);
}

#[tokio::test]
async fn test_instructor_quiz_stats() {
    let app = spawn_app().await;
    let module_id = app.seed_module("endocrine", 2, 60).await;
    let token = app.student().await;

    let started: Value = app
        .post(&token, &format!("/quiz/module/{}/start", module_id), json!({}))
        .await
        .json()
        .await
        .unwrap();
    let attempt_id = started["attemptId"].as_i64().unwrap();
    let quiz_id = started["quizId"].as_i64().unwrap();
    let key = app.attempt_key(&token, attempt_id).await;
    app.answer(&token, attempt_id, key[0].0, &key[0].1).await;
    app.finish(&token, attempt_id).await;

    let path = format!("/instructor/quizzes/{}/stats", quiz_id);
    assert_eq!(app.get(&token, &path).await.status().as_u16(), 403);

    let resp = app
        .post(
            &app.admin_token,
            "/admin/users",
            json!({ "username": "dr_gray", "password": PASSWORD, "role": "instructor" }),
        )
        .await;
    assert_eq!(resp.status().as_u16(), 201);
    let instructor = common::login(&app.client, &app.address, "dr_gray").await;

    let resp = app.get(&instructor, &path).await;
    assert_eq!(resp.status().as_u16(), 200);
    let stats: Value = resp.json().await.unwrap();
    assert_eq!(stats["completedAttempts"], 1);
    assert_eq!(stats["averageScore"], 50.0);
    assert_eq!(stats["passRate"], 0);
    assert_eq!(stats["questions"].as_array().unwrap().len(), 2);

    let missing = app.get(&instructor, "/instructor/quizzes/9999/stats").await;
    assert_eq!(missing.status().as_u16(), 404);
}

#[tokio::test]
async fn test_module_listing_and_frozen_composition() {
    let app = spawn_app().await;
    let module_id = app.seed_module("integumentary", 2, 70).await;
    let extra = app.seed_question("integumentary", "easy", "dermis").await;

    let token = app.student().await;
    let modules: Vec<Value> = app.get(&token, "/modules").await.json().await.unwrap();
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0]["id"].as_i64(), Some(module_id));

    let started: Value = app
        .post(&token, &format!("/quiz/module/{}/start", module_id), json!({}))
        .await
        .json()
        .await
        .unwrap();
    let quiz_id = started["quizId"].as_i64().unwrap();

    let resp = app
        .post(
            &app.admin_token,
            &format!("/admin/quizzes/{}/questions", quiz_id),
            json!({ "questionId": extra, "points": 2, "position": 3 }),
        )
        .await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "invalid_state");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_and_finishes() {
    let app = Arc::new(spawn_app().await);
    let module_id = app.seed_module("skeletal", 2, 60).await;
    let token = app.student().await;
    let (attempt_id, key) = app.start_module(&token, module_id).await;
    let (question_id, answer) = key[0].clone();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let app = app.clone();
        let token = token.clone();
        let answer = answer.clone();
        handles.push(tokio::spawn(async move {
            app.answer(&token, attempt_id, question_id, &answer).await.status().as_u16()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), 200);
    }
    assert_eq!(app.ledger_rows(attempt_id, question_id).await, 1);

    let mut handles = Vec::new();
    for _ in 0..4 {
        let app = app.clone();
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            app.finish(&token, attempt_id).await.status().as_u16()
        }));
    }
    let mut statuses = Vec::new();
    for handle in handles {
        statuses.push(handle.await.unwrap());
    }
    assert_eq!(statuses.iter().filter(|s| **s == 200).count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == 400).count(), 3);
}

#[tokio::test]
async fn test_only_students_take_quizzes() {
    let app = spawn_app().await;
    let module_id = app.seed_module("skeletal", 2, 60).await;

    let resp = app
        .post(
            &app.admin_token,
            "/admin/users",
            json!({ "username": "dr_vesalius", "password": PASSWORD, "role": "instructor" }),
        )
        .await;
    assert_eq!(resp.status().as_u16(), 201);
    let instructor = common::login(&app.client, &app.address, "dr_vesalius").await;

    let path = format!("/quiz/module/{}/start", module_id);
    for token in [&instructor, &app.admin_token] {
        let resp = app.post(token, &path, json!({})).await;
        assert_eq!(resp.status().as_u16(), 403);
        let resp = app.get(token, "/quiz/attempts").await;
        assert_eq!(resp.status().as_u16(), 403);
    }

    let student = app.student().await;
    let resp = app.post(&student, &path, json!({})).await;
    assert_eq!(resp.status().as_u16(), 201);
}

#[tokio::test]
async fn test_malformed_input_is_invalid_input() {
    let app = spawn_app().await;
    let token = app.student().await;

    let resp = app
        .post(
            &token,
            "/quiz/timed-exam/start",
            json!({ "timeLimit": 600, "questionCount": "five" }),
        )
        .await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "invalid_input");

    let resp = app.get(&token, "/quiz/attempt/abc/progress").await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "invalid_input");

    let resp = app
        .client
        .post(app.url("/quiz/attempt/1/answer"))
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "invalid_input");
}

#[tokio::test]
async fn test_question_options_are_sanitized() {
    let app = spawn_app().await;

    let resp = app
        .post(
            &app.admin_token,
            "/admin/questions",
            json!({
                "type": "multiple_choice",
                "difficulty": "easy",
                "topic": "skeletal",
                "content": "Longest bone?",
                "options": ["Femur<script>alert(1)</script>", "Tibia"],
                "correctAnswer": "Femur<script>alert(1)</script>"
            }),
        )
        .await;
    assert_eq!(resp.status().as_u16(), 201);
    let question: Value = resp.json().await.unwrap();
    assert_eq!(question["options"], json!(["Femur", "Tibia"]));
    assert_eq!(question["correctAnswer"], "Femur");
}
