//! HTTP handlers and request extractors.

pub mod login;
pub mod password;
pub mod register;
pub mod status;
pub mod users;

use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use validator::{Validate, ValidateArgs, ValidationError, ValidationErrors};

use crate::AppState;
use crate::config::Configuration;
use crate::error::ServerError;
use crate::i18n::Message;
use crate::user::is_valid_username;

/// JSON body checked with [`Validate`].
pub struct Valid<T>(pub T);

impl<S, T> FromRequest<S> for Valid<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Valid(value))
    }
}

/// JSON body checked against the running [`Configuration`].
///
/// Field rules run first; [`ValidateObject`] only runs once every field is
/// valid.
pub struct ValidWithState<T>(pub T);

impl<T> FromRequest<AppState> for ValidWithState<T>
where
    T: DeserializeOwned
        + for<'v> ValidateArgs<'v, Args = &'v Configuration>
        + ValidateObject,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate_with_args(state.config.as_ref())?;
        value.validate_object(state.config.as_ref())?;
        Ok(ValidWithState(value))
    }
}

/// Checks spanning the whole body rather than one field.
pub trait ValidateObject {
    fn validate_object(&self, _config: &Configuration) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

/// Tell an explicit `null` apart from a missing field.
///
/// Use with `#[serde(default)]`: missing is `None`, `null` is `Some(None)`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Birth year must lie strictly inside configured range.
pub fn validate_birth_year(year: i32, config: &Configuration) -> Result<(), ValidationError> {
    config.birth_year.check(year, config.language)
}

pub fn validate_username(username: &str, config: &Configuration) -> Result<(), ValidationError> {
    if is_valid_username(username) {
        Ok(())
    } else {
        Err(Message::InvalidUsername.to_error(config.language))
    }
}

#[cfg(test)]
pub mod tests {
    use std::sync::Arc;

    use http_body_util::BodyExt;

    use crate::AppState;
    use crate::config::{Argon2, Configuration};
    use crate::crypto::Crypto;
    use crate::database::Database;
    use crate::limiter::RateLimiter;
    use crate::user::{BirthYearRange, User};

    /// Password accepted by the default policy.
    pub const PASSWORD: &str = "Tr0ub4dor&3-Zebra!";

    /// In-memory state with cheap Argon2 parameters.
    pub fn state() -> AppState {
        let config = Configuration {
            name: "accounts".into(),
            url: "https://accounts.example.com/".into(),
            birth_year: BirthYearRange::new(1900, 2010),
            ..Default::default()
        };

        AppState {
            db: Database::memory(config.birth_year),
            limiter: Arc::new(RateLimiter::from(&config.rate_limit)),
            config: Arc::new(config),
            crypto: Arc::new(
                Crypto::new(Some(Argon2 {
                    memory_cost: 1024,
                    iterations: 1,
                    parallelism: 1,
                    hash_length: 32,
                }))
                .unwrap(),
            ),
            metrics: None,
        }
    }

    /// Register `username` and open a session, returning user and token.
    pub async fn signed_in(state: &AppState, username: &str) -> (User, String) {
        let user = User {
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            email: format!("{username}@example.com"),
            ..User::new(username)
        };
        let mut user = state.users().register(user, PASSWORD).await.unwrap();
        let token = state.users().login(&mut user).await.unwrap();

        (user, token)
    }

    pub async fn json(response: axum::response::Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    /// `(field, message)` pairs of a problem document.
    pub fn errors(body: &serde_json::Value) -> Vec<(String, String)> {
        body["errors"]
            .as_array()
            .map(|errors| {
                errors
                    .iter()
                    .map(|e| {
                        (
                            e["field"].as_str().unwrap_or_default().to_owned(),
                            e["message"].as_str().unwrap_or_default().to_owned(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
