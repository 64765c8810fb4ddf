use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::config::Configuration;
use crate::error::Result;
use crate::router::{ValidWithState, ValidateObject};
use crate::user::User;

#[derive(Debug, Serialize, Deserialize, Validate)]
#[validate(context = Configuration)]
pub struct Body {
    #[validate(
        length(min = 1, max = 150),
        custom(function = "crate::router::validate_username", use_context)
    )]
    pub username: String,
    #[validate(length(min = 1, max = 150, message = "This field may not be blank."))]
    pub first_name: String,
    #[validate(length(min = 1, max = 150, message = "This field may not be blank."))]
    pub last_name: String,
    #[validate(length(max = 30))]
    pub middle_name: Option<String>,
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254)
    )]
    pub email: Option<String>,
    pub password: String,
}

impl ValidateObject for Body {}

/// Handler to create user.
pub async fn handler(
    State(state): State<AppState>,
    ValidWithState(body): ValidWithState<Body>,
) -> Result<(StatusCode, Json<User>)> {
    let user = User {
        first_name: body.first_name,
        last_name: body.last_name,
        middle_name: body.middle_name.filter(|name| !name.is_empty()),
        email: body.email.unwrap_or_default(),
        ..User::new(body.username)
    };

    let user = state.users().register(user, &body.password).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::router::tests::{PASSWORD, errors, json, state};
    use crate::*;

    fn body(username: &str, password: &str) -> String {
        json!({
            "username": username,
            "first_name": "Jane",
            "last_name": "Doe",
            "email": "jane@example.com",
            "password": password,
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_register_handler() {
        let state = state();
        let app = app(state.clone());

        let response = make_request(None, app, Method::POST, "/register", body("jane", PASSWORD)).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = json(response).await;
        assert_eq!(body["username"], "jane");
        assert_eq!(body["first_name"], "Jane");
        assert!(body.get("password").is_none());

        let saved = state.db.users.find_by_username("jane").await.unwrap().unwrap();
        assert!(saved.password.starts_with("$argon2id$"));
        assert!(saved.is_active);
        assert_eq!(saved.birth_year, None);
    }

    #[tokio::test]
    async fn test_register_weak_password() {
        let app = app(state());

        let response = make_request(None, app, Method::POST, "/register", body("jane", "12345")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let errors = errors(&json(response).await);
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().all(|(field, _)| field == "password"));
        assert_eq!(errors[1].1, "This password is entirely numeric.");
    }

    #[tokio::test]
    async fn test_register_taken_username() {
        let state = state();

        let response =
            make_request(None, app(state.clone()), Method::POST, "/register", body("jane", PASSWORD)).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response =
            make_request(None, app(state), Method::POST, "/register", body("jane", PASSWORD)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            errors(&json(response).await),
            vec![(
                "username".to_owned(),
                "A user with that username already exists.".to_owned()
            )]
        );
    }

    #[tokio::test]
    async fn test_register_invalid_fields() {
        let app = app(state());

        let body = json!({
            "username": "jane doe",
            "first_name": "",
            "last_name": "Doe",
            "password": PASSWORD,
        })
        .to_string();
        let response = make_request(None, app, Method::POST, "/register", body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let fields: Vec<String> = errors(&json(response).await)
            .into_iter()
            .map(|(field, _)| field)
            .collect();
        assert_eq!(fields, vec!["first_name", "username"]);
    }

    #[tokio::test]
    async fn test_register_dots_only_username() {
        let state = state();

        let response =
            make_request(None, app(state.clone()), Method::POST, "/register", body("..", PASSWORD)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(errors(&json(response).await)[0].0, "username");
        assert!(!state.db.users.username_exists("..").await.unwrap());
    }
}
