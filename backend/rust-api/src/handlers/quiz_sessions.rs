use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;

use crate::{
    error::EngineError,
    extractors::AppJson,
    middlewares::auth::JwtClaims,
    models::{
        scoring::SubmissionBatch, SessionDetail, SessionSummary, SessionsList,
        StartSessionRequest, StartSessionResponse,
    },
    services::{
        presenter_service::PresenterService, scoring_service::ScoringService,
        session_service::SessionService, AppState,
    },
};

/// POST /api/v1/quizzes/{course_id}/start — creates the immutable session
/// snapshot and returns it together with the first presentation of the
/// questions.
pub async fn start_session(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
    AppJson(req): AppJson<StartSessionRequest>,
) -> Result<impl IntoResponse, EngineError> {
    tracing::info!(
        "Starting quiz session: user={}, course={}, difficulty={}, count={}",
        claims.sub,
        course_id,
        req.difficulty.as_str(),
        req.count
    );

    let sessions = SessionService::new(state.mongo.clone());
    let session = sessions.start_session(&claims.sub, &course_id, &req).await?;

    let presenter = PresenterService::new(state.mongo.clone());
    let questions = presenter.present(&session.item_ids).await?;

    let response = StartSessionResponse {
        session: SessionSummary::from(&session),
        questions,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/quizzes/{course_id}/incomplete — the caller's resumable
/// sessions for the course, most recently touched first.
pub async fn list_incomplete_sessions(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
) -> Result<Json<SessionsList>, EngineError> {
    let sessions = SessionService::new(state.mongo.clone());
    let data = sessions.list_incomplete(&claims.sub, &course_id).await?;

    Ok(Json(SessionsList { data }))
}

/// GET /api/v1/quiz-sessions/{id} — session state plus a fresh
/// presentation of its snapshot; the attempt history is attached only
/// once the session is completed.
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionDetail>, EngineError> {
    let sessions = SessionService::new(state.mongo.clone());
    let session = sessions
        .get_owned_session(&session_id, &claims.sub, claims.is_superuser)
        .await?;

    let presenter = PresenterService::new(state.mongo.clone());
    let questions = presenter.present(&session.item_ids).await?;

    let attempts = if session.is_completed {
        Some(sessions.attempts_for(&session.id).await?)
    } else {
        None
    };

    Ok(Json(SessionDetail {
        session: SessionSummary::from(&session),
        questions,
        attempts,
    }))
}

/// POST /api/v1/quiz-sessions/{id}/score — scores one batch of answers
/// against the session snapshot.
pub async fn score_batch(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(session_id): Path<String>,
    AppJson(batch): AppJson<SubmissionBatch>,
) -> Result<impl IntoResponse, EngineError> {
    tracing::info!(
        "Scoring batch: session={}, user={}, submissions={}",
        session_id,
        claims.sub,
        batch.submissions.len()
    );

    let scorer = ScoringService::new(state.mongo.clone());
    let summary = scorer.score_batch(&session_id, &claims.sub, &batch).await?;

    Ok(Json(summary))
}
