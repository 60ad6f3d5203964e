//! `/user` handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header::AUTHORIZATION, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{hash_password, verify_password};
use crate::domain::{NewUser, RecordKind, UserUpdate};
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::storage::StoreError;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub pass: String,
}

impl RegisterRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::BadRequest("name is required".to_string()));
        }
        validate_credentials(&self.email, &self.pass)
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub pass: String,
}

fn validate_credentials(email: &str, pass: &str) -> Result<(), ApiError> {
    if !email.contains('@') {
        return Err(ApiError::BadRequest("a valid email is required".to_string()));
    }
    if pass.is_empty() {
        return Err(ApiError::BadRequest("pass is required".to_string()));
    }
    Ok(())
}

/// Response carrying a fresh token in the `authorization` header.
fn with_token(token: String, body: serde_json::Value) -> Result<Response, ApiError> {
    let header = HeaderValue::from_str(&token)
        .map_err(|e| ApiError::Internal(format!("unusable token: {e}")))?;
    Ok(([(AUTHORIZATION, header)], Json(body)).into_response())
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload?;
    req.validate()?;

    let pass_hash = hash_password(&req.pass)?;
    let uid = state
        .store
        .save_user(NewUser {
            name: req.name,
            email: req.email,
            pass_hash,
        })
        .await?;
    let token = state.tokens.issue(&uid)?;

    tracing::info!(uid = %uid, "User registered");
    with_token(token, json!({ "message": "user registered", "uid": uid }))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload?;
    validate_credentials(&req.email, &req.pass)?;

    let user = state.store.user_by_email(&req.email).await?;
    if !verify_password(&req.pass, &user.pass_hash)? {
        return Err(StoreError::InvalidCredentials.into());
    }
    let token = state.tokens.issue(&user.uid)?;

    tracing::debug!(uid = %user.uid, "User authenticated");
    with_token(token, json!({ "message": "user authenticated", "uid": user.uid }))
}

pub async fn all_users(State(state): State<AppState>) -> Result<Response, ApiError> {
    match state.store.users().await {
        Ok(users) => Ok(Json(users).into_response()),
        Err(StoreError::Empty(_)) => Ok(StatusCode::NO_CONTENT.into_response()),
        Err(e) => Err(e.into()),
    }
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(req) = payload?;
    req.validate()?;

    let pass_hash = hash_password(&req.pass)?;
    state
        .store
        .update_user(
            &uid,
            UserUpdate {
                name: req.name,
                email: req.email,
                pass_hash,
            },
        )
        .await?;

    tracing::info!(uid = %uid, "User updated");
    Ok(Json(json!({ "message": "user updated" })))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.mark_deleted(RecordKind::Users, &uid).await?;
    state.signals.signal(RecordKind::Users);

    tracing::info!(uid = %uid, "User soft-deleted");
    Ok(Json(json!({ "message": "user deleted" })))
}
