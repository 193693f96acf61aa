// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::admin::{BulkDeleteOutcome, BulkDeleteRequest},
    repository::{Storage, StorageError},
    services::answer_key,
    state::AppState,
};

/// Lists all candidates, most recent login first.
/// Admin only.
pub async fn list_users(State(storage): State<Storage>) -> Result<impl IntoResponse, AppError> {
    let users = storage.candidates.list().await.map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(users))
}

/// Removes a candidate with their progress and results.
/// Returns whether anything existed.
async fn remove_candidate(storage: &Storage, email: &str) -> Result<bool, StorageError> {
    let (user, progress, result) = tokio::try_join!(
        storage.candidates.delete(email),
        storage.progress.delete(email),
        storage.results.delete(email),
    )?;
    Ok(user || progress || result)
}

/// Deletes a candidate by email, including progress and result records.
/// Admin only.
pub async fn delete_user(
    State(storage): State<Storage>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let existed = remove_candidate(&storage, &email).await.map_err(|e| {
        tracing::error!("Failed to delete user {}: {:?}", email, e);
        AppError::from(e)
    })?;

    if !existed {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!(email = %email, "Candidate deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Deletes several candidates. Each row reports its own outcome, so one
/// failure does not hide the others.
/// Admin only.
pub async fn bulk_delete_users(
    State(storage): State<Storage>,
    Json(payload): Json<BulkDeleteRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut outcomes = Vec::with_capacity(payload.emails.len());
    for email in payload.emails {
        let outcome = match remove_candidate(&storage, &email).await {
            Ok(true) => BulkDeleteOutcome {
                email,
                deleted: true,
                error: None,
            },
            Ok(false) => BulkDeleteOutcome {
                email,
                deleted: false,
                error: Some("User not found".to_string()),
            },
            Err(e) => {
                tracing::error!("Bulk delete failed for {}: {:?}", email, e);
                BulkDeleteOutcome {
                    email,
                    deleted: false,
                    error: Some(e.to_string()),
                }
            }
        };
        outcomes.push(outcome);
    }

    Ok(Json(outcomes))
}

/// Lists finalized results, newest first.
/// Admin only.
pub async fn list_results(State(storage): State<Storage>) -> Result<impl IntoResponse, AppError> {
    let results = storage.results.list().await.map_err(|e| {
        tracing::error!("Failed to list results: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(results))
}

/// Deletes the result record of one candidate.
/// Admin only.
pub async fn delete_result(
    State(storage): State<Storage>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !storage.results.delete(&email).await? {
        return Err(AppError::NotFound("Result not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Lists admin sign-ins, newest first.
/// Admin only.
pub async fn list_admin_logs(
    State(storage): State<Storage>,
) -> Result<impl IntoResponse, AppError> {
    let logs = storage.admin_logs.list().await.map_err(|e| {
        tracing::error!("Failed to fetch audit logs: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(logs))
}

/// Deletes an audit log entry by ID.
/// Admin only.
pub async fn delete_admin_log(
    State(storage): State<Storage>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !storage.admin_logs.delete(id).await? {
        return Err(AppError::NotFound("Log entry not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Reloads the answer key from the configured questions file.
/// Admin only.
pub async fn reseed_questions(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let count =
        answer_key::reseed(state.storage.questions.as_ref(), &state.config.questions_path).await?;

    Ok(Json(serde_json::json!({ "count": count })))
}
