//! `/book` handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::domain::{Book, NewBook, RecordKind};
use crate::http::error::ApiError;
use crate::http::extract::AuthUser;
use crate::http::server::AppState;
use crate::storage::{StoreError, StoreResult};

#[derive(Debug, Deserialize)]
pub struct AddBookRequest {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub author: String,
}

/// 200 with the list, or 204 when nothing is visible.
fn book_list(result: StoreResult<Vec<Book>>) -> Result<Response, ApiError> {
    match result {
        Ok(books) => Ok(Json(books).into_response()),
        Err(StoreError::Empty(_)) => Ok(StatusCode::NO_CONTENT.into_response()),
        Err(e) => Err(e.into()),
    }
}

pub async fn my_books(
    State(state): State<AppState>,
    AuthUser(uid): AuthUser,
) -> Result<Response, ApiError> {
    book_list(state.store.books_by_user(&uid).await)
}

pub async fn all_books(State(state): State<AppState>) -> Result<Response, ApiError> {
    book_list(state.store.books().await)
}

pub async fn book(
    State(state): State<AppState>,
    Path(bid): Path<String>,
) -> Result<Json<Book>, ApiError> {
    Ok(Json(state.store.book(&bid).await?))
}

pub async fn add_book(
    State(state): State<AppState>,
    AuthUser(uid): AuthUser,
    payload: Result<Json<AddBookRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload?;
    if req.label.trim().is_empty() || req.author.trim().is_empty() {
        return Err(ApiError::BadRequest("label and author are required".to_string()));
    }

    let bid = state
        .store
        .save_book(NewBook {
            label: req.label,
            author: req.author,
            user_uid: uid.clone(),
        })
        .await?;

    tracing::info!(bid = %bid, owner = %uid, "Book saved");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "book saved", "bid": bid })),
    )
        .into_response())
}

pub async fn delete_book(
    State(state): State<AppState>,
    Path(bid): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.mark_deleted(RecordKind::Books, &bid).await?;
    state.signals.signal(RecordKind::Books);

    tracing::info!(bid = %bid, "Book soft-deleted");
    Ok(Json(json!({ "message": "book deleted" })))
}
