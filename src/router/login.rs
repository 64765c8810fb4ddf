use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::i18n::Message;
use crate::router::Valid;
use crate::user::User;

pub const TOKEN_TYPE: &str = "Bearer";

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct Body {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub token_type: String,
    pub token: String,
    pub user: User,
}

/// Handler to log in user.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<Json<Response>> {
    let locale = state.config.language;

    let (username, password) = match (body.username, body.password) {
        (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
            (username, password)
        },
        _ => {
            return Err(ServerError::non_field(
                Message::CredentialsRequired.to_error(locale),
            ));
        },
    };

    if !state.limiter.check(format!("login:{username}")) {
        return Err(ServerError::RateLimited);
    }

    let Some(mut user) = state.users().authenticate(&username, &password).await? else {
        tracing::debug!(%username, "login refused");
        return Err(ServerError::non_field(
            Message::InvalidCredentials.to_error(locale),
        ));
    };

    let token = state.users().login(&mut user).await?;

    Ok(Json(Response {
        token_type: TOKEN_TYPE.to_owned(),
        token,
        user,
    }))
}
