//! Update user profile.

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::config::Configuration;
use crate::i18n::Message;
use crate::router::{ValidWithState, ValidateObject};
use crate::user::User;
use crate::{AppState, ServerError};

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
#[validate(context = Configuration)]
pub struct Body {
    #[validate(length(min = 1, max = 150, message = "This field may not be blank."))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 150, message = "This field may not be blank."))]
    pub last_name: Option<String>,
    #[validate(length(max = 30))]
    pub middle_name: Option<String>,
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254)
    )]
    pub email: Option<String>,
    pub avatar: Option<String>,
    /// `null` clears the birth year.
    #[serde(default, deserialize_with = "crate::router::nullable")]
    #[validate(custom(function = "crate::router::validate_birth_year", use_context))]
    pub birth_year: Option<Option<i32>>,
}

impl ValidateObject for Body {
    fn validate_object(&self, config: &Configuration) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(Some(year)) = self.birth_year {
            if let Err(err) = config.birth_year.check(year, config.language) {
                errors.add("birth_year", err);
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

pub async fn handler(
    State(state): State<AppState>,
    Extension(mut user): Extension<User>,
    ValidWithState(body): ValidWithState<Body>,
) -> Result<Json<User>, ServerError> {
    if let Some(avatar) = body.avatar {
        // Avatars are uploaded through `PUT /users/@me/avatar` first.
        if !avatar.starts_with(&user.avatar_prefix()) || avatar.contains("..") {
            return Err(ServerError::field(
                "avatar",
                Message::InvalidAvatar.to_error(state.config.language),
            ));
        }
        user.avatar = Some(avatar);
    }

    if let Some(first_name) = body.first_name {
        user.first_name = first_name;
    }
    if let Some(last_name) = body.last_name {
        user.last_name = last_name;
    }
    if let Some(middle_name) = body.middle_name {
        user.middle_name = Some(middle_name).filter(|name| !name.is_empty());
    }
    if let Some(email) = body.email {
        user.email = email;
    }
    if let Some(birth_year) = body.birth_year {
        user.birth_year = birth_year;
    }

    Ok(Json(state.users().save(user).await?))
}
