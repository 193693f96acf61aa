// src/handlers/auth.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::{admin::AdminLoginRequest, user::LoginRequest},
    state::AppState,
    utils::{
        hash::verify_password,
        jwt::{ROLE_ADMIN, ROLE_CANDIDATE, sign_jwt},
    },
};

/// Candidate login.
///
/// Records the candidate (creating it on first login, refreshing name and last
/// login otherwise), opens a progress record if the assessment is not yet
/// submitted, and returns a bearer token whose subject is the email.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let email = payload.email.trim().to_lowercase();
    let name = payload.name.trim();

    let candidate = state
        .storage
        .candidates
        .record_login(&email, name, state.clock.now())
        .await
        .map_err(|e| {
            tracing::error!("Failed to record login: {:?}", e);
            AppError::from(e)
        })?;

    if !candidate.test_submitted {
        let created = state.tracker().start(&email).await?;
        if created {
            tracing::info!(email = %email, "Assessment started");
        }
    }

    let token = sign_jwt(
        &email,
        Some(name),
        ROLE_CANDIDATE,
        &state.config.jwt_secret,
        state.config.candidate_token_ttl_secs,
    )?;

    Ok(Json(json!({
        "message": "Login recorded",
        "token": token,
        "testSubmitted": candidate.test_submitted
    })))
}

/// Authenticates an admin and returns a JWT token.
///
/// Every successful sign-in is appended to the admin audit log.
pub async fn admin_login(
    State(state): State<AppState>,
    Json(payload): Json<AdminLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let admin = state
        .storage
        .admins
        .find_by_email(&payload.email)
        .await?
        .ok_or_else(|| AppError::AuthError("Invalid credentials".to_string()))?;

    if !verify_password(&payload.password, &admin.password)? {
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    }

    state
        .storage
        .admin_logs
        .append(&admin.email, state.clock.now())
        .await
        .map_err(|e| {
            tracing::error!("Failed to write admin audit log: {:?}", e);
            AppError::from(e)
        })?;

    let token = sign_jwt(
        &admin.email,
        Some(&admin.username),
        ROLE_ADMIN,
        &state.config.jwt_secret,
        state.config.admin_token_ttl_secs,
    )?;

    Ok(Json(json!({
        "message": "Admin login successful",
        "token": token,
        "user": { "email": admin.email, "role": admin.role }
    })))
}
