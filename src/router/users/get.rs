//! Get users.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;

use crate::AppState;
use crate::ServerError;
use crate::i18n::Message;
use crate::user::User;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    limit: Option<i64>,
    offset: Option<i64>,
}

/// List users, most recently joined first.
pub async fn list(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<User>>, ServerError> {
    let limit = page.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = page.offset.unwrap_or_default().max(0);

    Ok(Json(state.db.users.list(limit, offset).await?))
}

/// Public profile of `username`.
pub async fn handler(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<User>, ServerError> {
    state
        .db
        .users
        .find_by_username(&username)
        .await?
        .filter(|user| user.is_active)
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(Message::UserNotFound.translate(state.config.language)))
}

/// Profile of authenticated user.
pub async fn me(Extension(user): Extension<User>) -> Json<User> {
    Json(user)
}
