//! Upload avatar of authenticated user.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, header};
use axum::{Extension, Json};
use uuid::Uuid;

use crate::i18n::Message;
use crate::user::User;
use crate::{AppState, ServerError};

/// File extension matching an image `Content-Type`.
fn extension(headers: &HeaderMap) -> Option<&'static str> {
    let content_type = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;

    match content_type.split(';').next()?.trim() {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Store raw image bytes and set them as avatar.
pub async fn handler(
    State(state): State<AppState>,
    Extension(mut user): Extension<User>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<User>, ServerError> {
    let Some(ext) = extension(&headers).filter(|_| !body.is_empty()) else {
        return Err(ServerError::field(
            "avatar",
            Message::UnsupportedImage.to_error(state.config.language),
        ));
    };

    let filename = format!("{}.{ext}", Uuid::new_v4());
    let directory = state.config.media.root.join(user.avatar_prefix());
    tokio::fs::create_dir_all(&directory).await?;
    tokio::fs::write(directory.join(&filename), &body).await?;

    tracing::debug!(user_id = user.id, %filename, size = body.len(), "avatar stored");

    user.avatar = Some(user.avatar_path(&filename));
    Ok(Json(state.users().save(user).await?))
}
