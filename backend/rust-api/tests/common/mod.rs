#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use quizground_api::middlewares::auth::{JwtClaims, JwtService};
use quizground_api::models::item::QuizItem;
use quizground_api::models::Difficulty;
use quizground_api::{config::Config, create_router, services::AppState};

const TEST_JWT_SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub app: Router,
    pub mongo: mongodb::Database,
}

/// Builds the app against the MongoDB named by TEST_MONGO_URI (a replica
/// set, since scoring runs multi-document transactions). Returns None when
/// the variable is unset so the suite skips cleanly on machines without a
/// test database.
pub async fn try_create_test_app() -> Option<TestApp> {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    dotenvy::from_filename(".env.test").ok();

    let Ok(mongo_uri) = std::env::var("TEST_MONGO_URI") else {
        eprintln!("TEST_MONGO_URI not set; skipping integration test");
        return None;
    };

    let config = Config {
        mongo_uri: mongo_uri.clone(),
        mongo_database: "quizground_test".to_string(),
        jwt_secret: TEST_JWT_SECRET.to_string(),
    };

    let mongo_client = mongodb::Client::with_uri_str(&mongo_uri)
        .await
        .expect("Failed to connect to test MongoDB");

    let mongo = mongo_client.database(&config.mongo_database);

    let app_state = Arc::new(
        AppState::new(config, mongo_client)
            .await
            .expect("Failed to initialize test app state"),
    );

    let app = create_router(app_state);

    Some(TestApp { app, mongo })
}

/// Seeds `count` bank items for a course, oldest first, with known correct
/// answers `answer-0..answer-{count-1}`. Returns the items in selection
/// order.
pub async fn seed_items(mongo: &mongodb::Database, course_id: &str, count: usize) -> Vec<QuizItem> {
    let collection = mongo.collection::<QuizItem>("quiz_items");
    let base = Utc::now() - Duration::seconds(count as i64);

    let items: Vec<QuizItem> = (0..count)
        .map(|i| QuizItem {
            id: Uuid::new_v4().to_string(),
            course_id: course_id.to_string(),
            quiz_text: format!("Question number {}?", i),
            correct_answer: format!("answer-{}", i),
            distractor_1: format!("distractor-{}-1", i),
            distractor_2: format!("distractor-{}-2", i),
            distractor_3: format!("distractor-{}-3", i),
            topic: "integration".to_string(),
            difficulty: Difficulty::Medium,
            source_chunk_id: Uuid::new_v4().to_string(),
            created_at: base + Duration::seconds(i as i64),
        })
        .collect();

    collection
        .insert_many(&items)
        .await
        .expect("Failed to seed quiz items");

    items
}

pub fn auth_token(user_id: &str) -> String {
    let now = Utc::now().timestamp() as usize;
    let claims = JwtClaims {
        sub: user_id.to_string(),
        is_superuser: false,
        exp: now + 3600,
        iat: now,
    };
    JwtService::new(TEST_JWT_SECRET)
        .generate_token(claims)
        .expect("Failed to mint test token")
}

pub async fn post_json(
    app: &Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, json)
}

pub async fn get_json(app: &Router, uri: &str, token: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, json)
}
