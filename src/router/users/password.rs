//! Change password of authenticated user.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::config::Configuration;
use crate::error::NON_FIELD_ERRORS;
use crate::i18n::Message;
use crate::router::{ValidWithState, ValidateObject};
use crate::user::User;
use crate::{AppState, ServerError};

#[derive(Debug, Serialize, Deserialize, Validate)]
#[validate(context = Configuration)]
pub struct Body {
    #[validate(length(min = 1, message = "This field may not be blank."))]
    old_password: String,
    #[validate(length(min = 1, message = "This field may not be blank."))]
    new_password: String,
}

impl ValidateObject for Body {
    fn validate_object(&self, config: &Configuration) -> Result<(), ValidationErrors> {
        if self.new_password == self.old_password {
            let mut errors = ValidationErrors::new();
            errors.add(
                NON_FIELD_ERRORS,
                Message::SamePassword.to_error(config.language),
            );
            return Err(errors);
        }

        Ok(())
    }
}

pub async fn handler(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    ValidWithState(body): ValidWithState<Body>,
) -> Result<StatusCode, ServerError> {
    state
        .users()
        .change_password(user, &body.old_password, &body.new_password)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::error::NON_FIELD_ERRORS;
    use crate::router::tests::{PASSWORD, errors, json, signed_in, state};
    use crate::*;

    const PATH: &str = "/users/@me/password";

    #[tokio::test]
    async fn test_change_password_handler() {
        let state = state();
        let (_, token) = signed_in(&state, "jane").await;

        let body = json!({ "old_password": PASSWORD, "new_password": "An0ther-Str0ng-One" });
        let response =
            make_request(Some(&token), app(state.clone()), Method::POST, PATH, body.to_string())
                .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        assert!(
            state
                .users()
                .authenticate("jane", "An0ther-Str0ng-One")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_same_password() {
        let state = state();
        let (_, token) = signed_in(&state, "jane").await;

        let body = json!({ "old_password": PASSWORD, "new_password": PASSWORD });
        let response =
            make_request(Some(&token), app(state), Method::POST, PATH, body.to_string()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            errors(&json(response).await),
            vec![(
                NON_FIELD_ERRORS.to_owned(),
                "New and old passwords must not be the same.".to_owned()
            )]
        );
    }

    #[tokio::test]
    async fn test_weak_new_password() {
        let state = state();
        let (_, token) = signed_in(&state, "jane").await;

        let body = json!({ "old_password": PASSWORD, "new_password": "password" });
        let response =
            make_request(Some(&token), app(state), Method::POST, PATH, body.to_string()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let errors = errors(&json(response).await);
        assert!(!errors.is_empty());
        assert!(errors.iter().all(|(field, _)| field == "new_password"));
    }

    #[tokio::test]
    async fn test_wrong_old_password() {
        let state = state();
        let (_, token) = signed_in(&state, "jane").await;

        let body = json!({ "old_password": "Wrong-0ld-Pass", "new_password": "An0ther-Str0ng-One" });
        let response =
            make_request(Some(&token), app(state), Method::POST, PATH, body.to_string()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(errors(&json(response).await)[0].0, "old_password");
    }
}
