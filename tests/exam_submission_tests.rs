// tests/exam_submission_tests.rs

mod common;

use common::{admin_client, exam_taker_client, insert_user, seed_group, spawn_app, test_pool, unique_email};
use exam_backend::{
    models::{exam_submission::SubmittedAnswer, user::Role},
    services::submissions::record_submission,
};
use serde_json::{Value, json};
use sqlx::SqlitePool;

async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn submission_is_scored_on_the_server() {
    let app = spawn_app().await;
    let admin = admin_client(&app).await;
    let group = seed_group(&app, &admin, 2).await;
    let (q1, q1_correct, _) = group.questions[0];
    let (q2, _, q2_wrong) = group.questions[1];
    let (taker, _) = exam_taker_client(&app).await;

    // Q1 answered correctly (as a number), Q2 incorrectly (as a string)
    let response = taker
        .post(app.url("/api/exam-result"))
        .json(&json!({
            "questionGroupId": group.id,
            "completedTimeframe": "0h 12m 3s",
            "totalScore": 1,
            "answers": [
                { "questionId": q1, "selectedOption": q1_correct },
                { "questionId": q2, "selectedOption": q2_wrong.to_string() },
            ],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    let data = &body["data"];
    assert_eq!(data["summary"]["totalQuestions"], 2);
    assert_eq!(data["summary"]["correctCount"], 1);
    assert_eq!(data["summary"]["incorrectCount"], 1);
    assert_eq!(data["summary"]["completedTimeframe"], "0h 12m 3s");

    let review = data["review"].as_array().unwrap();
    assert_eq!(review.len(), 2);
    assert_eq!(review[0]["questionId"], q1);
    assert_eq!(review[0]["isCorrect"], true);
    assert_eq!(review[1]["isCorrect"], false);
    assert_eq!(review[1]["correctOptionId"], group.questions[1].1);

    let stored: i64 = sqlx::query_scalar("SELECT total_score FROM exam_submissions WHERE id = ?")
        .bind(data["submissionId"].as_i64().unwrap())
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(stored, 1);
    assert_eq!(count(&app.pool, "exam_submission_answers").await, 2);
}

#[tokio::test]
async fn client_score_does_not_override_computed_score() {
    let app = spawn_app().await;
    let admin = admin_client(&app).await;
    let group = seed_group(&app, &admin, 2).await;
    let (q1, _, q1_wrong) = group.questions[0];

    let body: Value = admin
        .post(app.url("/api/exam-result"))
        .json(&json!({
            "questionGroupId": group.id,
            "completedTimeframe": "0h 1m 0s",
            "totalScore": 2,
            "answers": [{ "questionId": q1, "selectedOption": q1_wrong }],
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let stored: i64 = sqlx::query_scalar("SELECT total_score FROM exam_submissions WHERE id = ?")
        .bind(body["data"]["submissionId"].as_i64().unwrap())
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(stored, 0);
}

#[tokio::test]
async fn malformed_submission_persists_nothing() {
    let app = spawn_app().await;
    let admin = admin_client(&app).await;
    let group = seed_group(&app, &admin, 1).await;
    let other = seed_group(&app, &admin, 1).await;
    let (q, correct, _) = group.questions[0];
    let (foreign_q, foreign_correct, _) = other.questions[0];
    let (taker, _) = exam_taker_client(&app).await;

    // Question from another group
    let response = taker
        .post(app.url("/api/exam-result"))
        .json(&json!({
            "questionGroupId": group.id,
            "completedTimeframe": "0h 1m 0s",
            "answers": [
                { "questionId": q, "selectedOption": correct },
                { "questionId": foreign_q, "selectedOption": foreign_correct },
            ],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 422);

    // Same question twice
    let response = taker
        .post(app.url("/api/exam-result"))
        .json(&json!({
            "questionGroupId": group.id,
            "completedTimeframe": "0h 1m 0s",
            "answers": [
                { "questionId": q, "selectedOption": correct },
                { "questionId": q, "selectedOption": correct },
            ],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 422);

    assert_eq!(count(&app.pool, "exam_submissions").await, 0);
    assert_eq!(count(&app.pool, "exam_submission_answers").await, 0);
}

#[tokio::test]
async fn submission_requires_group_and_answers() {
    let app = spawn_app().await;
    let (taker, _) = exam_taker_client(&app).await;

    let response = taker
        .post(app.url("/api/exam-result"))
        .json(&json!({ "completedTimeframe": "0h 1m 0s", "answers": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = taker
        .post(app.url("/api/exam-result"))
        .json(&json!({ "questionGroupId": 1, "completedTimeframe": "0h 1m 0s" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = taker
        .post(app.url("/api/exam-result"))
        .json(&json!({ "questionGroupId": 99999, "completedTimeframe": "0h 1m 0s", "answers": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn failed_answer_insert_rolls_back_the_submission() {
    let pool = test_pool().await;
    let user_id = insert_user(&pool, &unique_email("atomic"), Role::ExamTaker).await;

    let group_id: i64 = sqlx::query_scalar(
        "INSERT INTO question_groups (title, description, created_by, created_at, updated_at)
         VALUES ('Atomic', '', ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
         RETURNING id",
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await
    .unwrap();

    // No such question: the answer row violates its foreign key
    let answers = vec![SubmittedAnswer {
        question_id: 424242,
        selected_option: "1".to_string(),
    }];

    let mut tx = pool.begin().await.unwrap();
    let result = record_submission(&mut tx, user_id, group_id, 0, "0h 0m 1s", &answers).await;
    assert!(result.is_err());
    drop(tx);

    assert_eq!(count(&pool, "exam_submissions").await, 0);
    assert_eq!(count(&pool, "exam_submission_answers").await, 0);
}

#[tokio::test]
async fn admin_can_list_read_update_and_delete() {
    let app = spawn_app().await;
    let admin = admin_client(&app).await;
    let group = seed_group(&app, &admin, 1).await;
    let (q, correct, _) = group.questions[0];
    let (taker, taker_email) = exam_taker_client(&app).await;

    let mut ids = Vec::new();
    for _ in 0..3 {
        let body: Value = taker
            .post(app.url("/api/exam-result"))
            .json(&json!({
                "questionGroupId": group.id,
                "completedTimeframe": "0h 2m 0s",
                "answers": [{ "questionId": q, "selectedOption": correct }],
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        ids.push(body["data"]["submissionId"].as_i64().unwrap());
    }

    // Exam takers cannot read results
    let response = taker.get(app.url("/api/exam-result")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 403);

    // Pagination, most recent first
    let page: Value = admin
        .get(app.url("/api/exam-result?page=2&limit=2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["pagination"]["total"], 3);
    assert_eq!(page["pagination"]["page"], 2);
    assert_eq!(page["pagination"]["limit"], 2);
    assert_eq!(page["pagination"]["totalPages"], 2);
    let data = page["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["id"], ids[0]);
    assert_eq!(data[0]["user"]["email"], taker_email.as_str());

    // Detail with answers and their questions
    let detail: Value = admin
        .get(app.url(&format!("/api/exam-result/{}", ids[2])))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["data"]["questionGroup"]["id"], group.id);
    assert_eq!(detail["data"]["answers"][0]["question"]["id"], q);
    assert_eq!(detail["data"]["totalScore"], 1);

    // Update
    let response = admin
        .put(app.url(&format!("/api/exam-result/{}", ids[2])))
        .json(&json!({ "totalScore": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let detail: Value = admin
        .get(app.url(&format!("/api/exam-result/{}", ids[2])))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["data"]["totalScore"], 0);
    assert_eq!(detail["data"]["completedTimeframe"], "0h 2m 0s");

    // Delete
    let response = admin
        .delete(app.url(&format!("/api/exam-result/{}", ids[2])))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(count(&app.pool, "exam_submissions").await, 2);
    assert_eq!(count(&app.pool, "exam_submission_answers").await, 2);

    let missing = admin
        .get(app.url(&format!("/api/exam-result/{}", ids[2])))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);

    let missing = admin
        .put(app.url(&format!("/api/exam-result/{}", ids[2])))
        .json(&json!({ "totalScore": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}

#[tokio::test]
async fn trailing_slash_reaches_the_same_routes() {
    let app = spawn_app().await;
    let admin = admin_client(&app).await;
    let group = seed_group(&app, &admin, 1).await;
    let (q, correct, _) = group.questions[0];

    let response = admin
        .post(app.url("/api/exam-result/"))
        .json(&json!({
            "questionGroupId": group.id,
            "completedTimeframe": "0h 1m 0s",
            "answers": [{ "questionId": q, "selectedOption": correct }],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    let page: Value = admin
        .get(app.url("/api/exam-result/?page=1&limit=10"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["pagination"]["total"], 1);
}

#[tokio::test]
async fn malformed_input_gets_a_json_400() {
    let app = spawn_app().await;
    let admin = admin_client(&app).await;

    // Wrong field type in the body
    let response = admin
        .post(app.url("/api/exam-result"))
        .json(&json!({
            "questionGroupId": "abc",
            "completedTimeframe": "0h 1m 0s",
            "answers": [],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());

    // Body that is not JSON at all
    let response = admin
        .post(app.url("/api/exam-result"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);

    // Non-numeric id in the path
    let response = admin
        .get(app.url("/api/exam-result/abc"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);

    // Non-numeric pagination
    let response = admin
        .get(app.url("/api/exam-result?page=two"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}
