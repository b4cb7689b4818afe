use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

mod common;

use quizground_api::models::item::QuizItem;

struct StartedSession {
    session_id: String,
    items: Vec<QuizItem>,
    token: String,
}

async fn start_session(test: &common::TestApp, item_count: usize) -> StartedSession {
    let course_id = Uuid::new_v4().to_string();
    let user_id = Uuid::new_v4().to_string();
    let token = common::auth_token(&user_id);
    let items = common::seed_items(&test.mongo, &course_id, item_count).await;

    let (status, body) = common::post_json(
        &test.app,
        &format!("/api/v1/quizzes/{}/start", course_id),
        &token,
        json!({ "difficulty": "medium", "count": item_count }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "body: {}", body);

    StartedSession {
        session_id: body["session"]["id"].as_str().unwrap().to_string(),
        items,
        token,
    }
}

fn score_uri(session_id: &str) -> String {
    format!("/api/v1/quiz-sessions/{}/score", session_id)
}

#[tokio::test]
async fn two_batches_accumulate_and_complete_the_session() {
    let Some(test) = common::try_create_test_app().await else {
        return;
    };

    // Snapshot [A, B, C]; batch 1 answers A correctly, batch 2 answers B
    // wrong and C correctly.
    let started = start_session(&test, 3).await;
    let [a, b, c] = [&started.items[0], &started.items[1], &started.items[2]];

    let (status, summary) = common::post_json(
        &test.app,
        &score_uri(&started.session_id),
        &started.token,
        json!({
            "submissions": [
                { "item_id": a.id, "selected_answer_text": a.correct_answer },
            ],
            "elapsed_seconds": 12.0,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {}", summary);
    assert_eq!(summary["batch_submitted"], 1);
    assert_eq!(summary["batch_correct"], 1);
    assert_eq!(summary["score_percentage"], 100.0);
    assert_eq!(summary["total_submitted"], 1);
    assert_eq!(summary["total_correct"], 1);
    assert_eq!(summary["is_completed"], false);

    let (status, summary) = common::post_json(
        &test.app,
        &score_uri(&started.session_id),
        &started.token,
        json!({
            "submissions": [
                { "item_id": b.id, "selected_answer_text": "definitely wrong" },
                { "item_id": c.id, "selected_answer_text": c.correct_answer },
            ],
            "elapsed_seconds": 20.0,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {}", summary);
    assert_eq!(summary["batch_submitted"], 2);
    assert_eq!(summary["batch_correct"], 1);
    assert_eq!(summary["score_percentage"], 50.0);
    assert_eq!(summary["total_submitted"], 3);
    assert_eq!(summary["total_correct"], 2);
    assert_eq!(summary["total_time_seconds"], 32.0);
    assert_eq!(summary["is_completed"], true);

    // Attempt history becomes visible once completed.
    let (status, detail) = common::get_json(
        &test.app,
        &format!("/api/v1/quiz-sessions/{}", started.session_id),
        &started.token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["session"]["is_completed"], true);
    assert_eq!(detail["attempts"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn out_of_snapshot_submission_rejects_the_whole_batch() {
    let Some(test) = common::try_create_test_app().await else {
        return;
    };

    let started = start_session(&test, 2).await;
    let a = &started.items[0];

    let (status, body) = common::post_json(
        &test.app,
        &score_uri(&started.session_id),
        &started.token,
        json!({
            "submissions": [
                { "item_id": a.id, "selected_answer_text": a.correct_answer },
                { "item_id": Uuid::new_v4().to_string(), "selected_answer_text": "anything" },
            ],
            "elapsed_seconds": 5.0,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);

    // Nothing was applied: counters are untouched and no attempts exist.
    let (_, detail) = common::get_json(
        &test.app,
        &format!("/api/v1/quiz-sessions/{}", started.session_id),
        &started.token,
    )
    .await;
    assert_eq!(detail["session"]["total_submitted"], 0);
    assert_eq!(detail["session"]["is_completed"], false);
}

#[tokio::test]
async fn replayed_item_is_rejected_and_never_double_counted() {
    let Some(test) = common::try_create_test_app().await else {
        return;
    };

    let started = start_session(&test, 2).await;
    let a = &started.items[0];

    let body = json!({
        "submissions": [
            { "item_id": a.id, "selected_answer_text": a.correct_answer },
        ],
        "elapsed_seconds": 3.0,
    });

    let (status, summary) = common::post_json(
        &test.app,
        &score_uri(&started.session_id),
        &started.token,
        body.clone(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_submitted"], 1);

    let (status, summary) = common::post_json(
        &test.app,
        &score_uri(&started.session_id),
        &started.token,
        body,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {}", summary);
    assert_eq!(summary["batch_submitted"], 0);
    assert_eq!(summary["rejected"].as_array().unwrap().len(), 1);
    assert_eq!(summary["rejected"][0]["item_id"], a.id.as_str());
    assert_eq!(summary["total_submitted"], 1);
}

#[tokio::test]
async fn comparison_is_whitespace_and_case_insensitive() {
    let Some(test) = common::try_create_test_app().await else {
        return;
    };

    let started = start_session(&test, 1).await;
    let a = &started.items[0];

    let (status, summary) = common::post_json(
        &test.app,
        &score_uri(&started.session_id),
        &started.token,
        json!({
            "submissions": [
                {
                    "item_id": a.id,
                    "selected_answer_text": format!("  {}  ", a.correct_answer.to_uppercase()),
                },
            ],
            "elapsed_seconds": 2.0,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {}", summary);
    assert_eq!(summary["batch_correct"], 1);
    assert_eq!(summary["results"][0]["is_correct"], true);
}

#[tokio::test]
async fn blank_answer_text_rejects_the_batch() {
    let Some(test) = common::try_create_test_app().await else {
        return;
    };

    let started = start_session(&test, 1).await;
    let a = &started.items[0];

    let (status, _) = common::post_json(
        &test.app,
        &score_uri(&started.session_id),
        &started.token,
        json!({
            "submissions": [
                { "item_id": a.id, "selected_answer_text": "   " },
            ],
            "elapsed_seconds": 2.0,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let Some(test) = common::try_create_test_app().await else {
        return;
    };

    let started = start_session(&test, 1).await;

    let (status, _) = common::post_json(
        &test.app,
        &score_uri(&started.session_id),
        &started.token,
        json!({ "submissions": [], "elapsed_seconds": 0.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn completed_session_refuses_further_scoring() {
    let Some(test) = common::try_create_test_app().await else {
        return;
    };

    let started = start_session(&test, 1).await;
    let a = &started.items[0];

    let body = json!({
        "submissions": [
            { "item_id": a.id, "selected_answer_text": a.correct_answer },
        ],
        "elapsed_seconds": 1.0,
    });

    let (status, summary) = common::post_json(
        &test.app,
        &score_uri(&started.session_id),
        &started.token,
        body.clone(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["is_completed"], true);

    let (status, _) = common::post_json(
        &test.app,
        &score_uri(&started.session_id),
        &started.token,
        body,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn foreign_user_cannot_score() {
    let Some(test) = common::try_create_test_app().await else {
        return;
    };

    let started = start_session(&test, 1).await;
    let a = &started.items[0];
    let stranger_token = common::auth_token(&Uuid::new_v4().to_string());

    let (status, _) = common::post_json(
        &test.app,
        &score_uri(&started.session_id),
        &stranger_token,
        json!({
            "submissions": [
                { "item_id": a.id, "selected_answer_text": a.correct_answer },
            ],
            "elapsed_seconds": 1.0,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let Some(test) = common::try_create_test_app().await else {
        return;
    };

    let token = common::auth_token(&Uuid::new_v4().to_string());

    let (status, _) = common::post_json(
        &test.app,
        &score_uri(&Uuid::new_v4().to_string()),
        &token,
        json!({
            "submissions": [
                { "item_id": "whatever", "selected_answer_text": "whatever" },
            ],
            "elapsed_seconds": 1.0,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
