//! Delete user.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::router::Valid;
use crate::user::User;
use crate::{AppState, ServerError};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(length(min = 1, message = "This field may not be blank."))]
    password: String,
}

/// Delete authenticated user, with its reset tokens and sessions.
pub async fn handler(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Valid(body): Valid<Body>,
) -> Result<StatusCode, ServerError> {
    state.users().delete(&user, &body.password).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::router::tests::{PASSWORD, signed_in, state};
    use crate::*;

    #[tokio::test]
    async fn test_delete_handler() {
        let state = state();
        let (user, token) = signed_in(&state, "jane").await;
        let reset = state
            .users()
            .issue_reset_token("jane@example.com")
            .await
            .unwrap();

        let body = json!({ "password": "wrong" }).to_string();
        let response =
            make_request(Some(&token), app(state.clone()), Method::DELETE, "/users/@me", body)
                .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json!({ "password": PASSWORD }).to_string();
        let response =
            make_request(Some(&token), app(state.clone()), Method::DELETE, "/users/@me", body)
                .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        assert!(state.db.users.find_by_id(user.id).await.unwrap().is_none());
        assert!(state.db.sessions.find_user_id(&token).await.unwrap().is_none());
        assert!(state.db.reset_tokens.find_by_token(reset.token).await.unwrap().is_none());

        let response =
            make_request(Some(&token), app(state), Method::GET, "/users/@me", String::default())
                .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
