// src/handlers/assessment.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        answers::RawAnswers,
        progress::{ProgressSnapshot, SaveProgressRequest, UserProgressResponse},
        question::PublicQuestion,
        result::{SubmitRequest, SubmitResponse},
    },
    state::AppState,
    utils::jwt::Claims,
};

/// Returns the questions ordered by id, without the answer key.
///
/// An empty key is not an error here: the candidate simply gets an empty list.
pub async fn list_questions(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let key = state.storage.questions.answer_key().await.map_err(|e| {
        tracing::error!("Failed to fetch questions: {:?}", e);
        AppError::from(e)
    })?;

    if key.is_empty() {
        tracing::warn!("Questions requested but the answer key is empty");
    }

    let questions: Vec<PublicQuestion> = key.iter().map(PublicQuestion::from).collect();
    Ok(Json(questions))
}

/// Autosaves the candidate's position, remaining time and partial answers.
///
/// Storage failures are swallowed so the candidate can keep going; the
/// response reports whether this tick was persisted. Once the assessment is
/// submitted or its time has run out, saves are rejected with 409.
pub async fn save_progress(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, AppError> {
    let req: SaveProgressRequest = serde_json::from_value(body)?;
    req.validate()?;

    let saved = state
        .finalizer()
        .autosave(
            &claims.sub,
            req.current_question_index,
            req.time_remaining,
            req.answers.selections(),
        )
        .await?;

    Ok(Json(json!({
        "saved": saved,
        "message": if saved { "Progress saved" } else { "Progress not saved, will retry" }
    })))
}

/// Returns the candidate's resumable state with server-computed remaining time.
///
/// When the timer has run out, the last saved answers are submitted through the
/// normal submit path and the outcome is returned alongside.
pub async fn get_user_progress(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = state.tracker().load_progress(&claims.sub).await.map_err(|e| {
        tracing::error!("Failed to load progress: {:?}", e);
        AppError::from(e)
    })?;

    if !(snapshot.has_progress && snapshot.time_remaining == 0) {
        return Ok(Json(UserProgressResponse {
            progress: snapshot,
            auto_submitted: false,
            result: None,
        }));
    }

    tracing::info!(email = %claims.sub, "Time expired, submitting saved answers");
    let summary = state
        .finalizer()
        .submit(
            &claims.sub,
            claims.display_name(),
            &RawAnswers::from(&snapshot.answers),
        )
        .await?;

    Ok(Json(UserProgressResponse {
        progress: ProgressSnapshot::empty(0),
        auto_submitted: true,
        result: Some(summary),
    }))
}

/// Submits the candidate's answers for marking.
///
/// Safe to retry: a repeated submit overwrites the single result record.
/// After the timer has run out, the last saved answers are marked instead.
pub async fn submit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, AppError> {
    let req: SubmitRequest = serde_json::from_value(body)?;

    let summary = state
        .finalizer()
        .submit(&claims.sub, claims.display_name(), &req.answers)
        .await?;

    Ok(Json(SubmitResponse {
        message: "Assessment submitted".to_string(),
        summary,
    }))
}
