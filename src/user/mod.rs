mod birth_year;
mod reset_token;
mod service;

pub use birth_year::*;
pub use reset_token::*;
pub use service::*;

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use validator::{ValidationError, ValidationErrors};

use crate::config::Configuration;
use crate::i18n::Message;

pub const USERNAME_MAX_LENGTH: usize = 150;
pub const NAME_MAX_LENGTH: usize = 150;
pub const MIDDLE_NAME_MAX_LENGTH: usize = 30;
pub const EMAIL_MAX_LENGTH: usize = 254;
/// Directory, relative to media root, holding avatars.
pub const AVATAR_UPLOAD_DIR: &str = "avatars";

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid username regex"));

/// Whether `username` only holds letters, digits and `@.+-_`.
///
/// Names made of dots only are refused, they would escape avatar directory.
pub fn is_valid_username(username: &str) -> bool {
    USERNAME_RE.is_match(username) && !username.chars().all(|c| c == '.')
}

/// User as saved on database.
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow,
)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub email: String,
    #[serde(skip)]
    pub password: String,
    pub avatar: Option<String>,
    pub birth_year: Option<i32>,
    #[serde(skip)]
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub date_joined: DateTime<Utc>,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first_name, self.last_name)
    }
}

impl User {
    /// Create a new active [`User`], not yet saved.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            is_active: true,
            date_joined: Utc::now(),
            ..Default::default()
        }
    }

    /// Whether user was never saved.
    pub fn is_new(&self) -> bool {
        self.id == 0
    }

    /// Entity-level validation: birth year must be inside configured range.
    pub fn clean(&self, config: &Configuration) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(year) = self.birth_year {
            if let Err(err) = config.birth_year.check(year, config.language) {
                errors.add("birth_year", err);
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Run column validators, then [`Self::clean`].
    ///
    /// Column errors are reported first; `clean` only runs once columns are
    /// valid.
    pub fn full_clean(&self, config: &Configuration) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.username.is_empty() || self.username.chars().count() > USERNAME_MAX_LENGTH {
            errors.add("username", length_error(1, USERNAME_MAX_LENGTH));
        } else if !is_valid_username(&self.username) {
            errors.add("username", Message::InvalidUsername.to_error(config.language));
        }

        if self.first_name.chars().count() > NAME_MAX_LENGTH {
            errors.add("first_name", length_error(0, NAME_MAX_LENGTH));
        }
        if self.last_name.chars().count() > NAME_MAX_LENGTH {
            errors.add("last_name", length_error(0, NAME_MAX_LENGTH));
        }
        if self
            .middle_name
            .as_ref()
            .is_some_and(|name| name.chars().count() > MIDDLE_NAME_MAX_LENGTH)
        {
            errors.add("middle_name", length_error(0, MIDDLE_NAME_MAX_LENGTH));
        }
        if self.email.chars().count() > EMAIL_MAX_LENGTH {
            errors.add("email", length_error(0, EMAIL_MAX_LENGTH));
        }

        if let Some(year) = self.birth_year {
            for bound in config.birth_year.field_validators() {
                if let Err(err) = bound.check(year) {
                    errors.add("birth_year", err);
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        self.clean(config)
    }

    /// Values a password should not resemble.
    pub fn attributes(&self) -> Vec<&str> {
        let mut inputs = vec![
            self.username.as_str(),
            self.first_name.as_str(),
            self.last_name.as_str(),
            self.email.as_str(),
        ];
        if let Some(middle_name) = &self.middle_name {
            inputs.push(middle_name);
        }
        inputs.retain(|input| !input.is_empty());
        inputs
    }

    /// Path prefix under which this user's avatars are stored.
    pub fn avatar_prefix(&self) -> String {
        format!("{AVATAR_UPLOAD_DIR}/{}/", self.username)
    }

    /// Relative reference for a newly uploaded avatar file.
    pub fn avatar_path(&self, filename: &str) -> String {
        format!("{}{filename}", self.avatar_prefix())
    }
}

fn length_error(min: usize, max: usize) -> ValidationError {
    let mut err = ValidationError::new("length").with_message(
        format!("Ensure this field has between {min} and {max} characters.").into(),
    );
    err.add_param("min".into(), &min);
    err.add_param("max".into(), &max);
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Configuration {
        Configuration {
            birth_year: BirthYearRange::new(1900, 2010),
            ..Default::default()
        }
    }

    fn user(birth_year: Option<i32>) -> User {
        User {
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            birth_year,
            ..User::new("jane")
        }
    }

    #[test]
    fn test_valid_username() {
        for username in ["jane", "jane.doe", "j@ne+1", "_", "..jane"] {
            assert!(is_valid_username(username), "{username}");
        }
        for username in ["", ".", "..", "...", "jane doe", "jane/..", "ja/ne"] {
            assert!(!is_valid_username(username), "{username}");
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(user(None).to_string(), "Jane Doe");
    }

    #[test]
    fn test_clean_birth_year() {
        let config = config();
        let middle = (config.birth_year.min + config.birth_year.max) / 2;

        assert!(user(None).clean(&config).is_ok());
        assert!(user(Some(middle)).clean(&config).is_ok());
        assert!(user(Some(1955)).full_clean(&config).is_ok());

        for year in [1899, 1900, 2010, 2011] {
            let errors = user(Some(year)).clean(&config).unwrap_err();
            let field = errors.field_errors();
            let issues = field.get("birth_year").expect("birth_year error");
            assert_eq!(issues[0].code, BIRTH_YEAR_ERROR_MSG.code());
        }
    }

    #[test]
    fn test_full_clean_reports_inclusive_bounds_first() {
        let config = config();

        let errors = user(Some(1899)).full_clean(&config).unwrap_err();
        assert_eq!(errors.field_errors()["birth_year"][0].code, "min_value");

        // Passes inclusive bound, rejected by exclusive clean.
        let errors = user(Some(1900)).full_clean(&config).unwrap_err();
        assert_eq!(
            errors.field_errors()["birth_year"][0].code,
            BIRTH_YEAR_ERROR_MSG.code()
        );
    }

    #[test]
    fn test_full_clean_columns() {
        let config = config();

        let mut bad = user(None);
        bad.username = "bad name!".into();
        bad.middle_name = Some("x".repeat(31));
        let errors = bad.full_clean(&config).unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("middle_name"));

        let mut good = user(None);
        good.username = "jane.doe+1@home".into();
        assert!(good.full_clean(&config).is_ok());
    }

    #[test]
    fn test_avatar_path() {
        let user = user(None);
        assert_eq!(user.avatar_prefix(), "avatars/jane/");
        assert_eq!(user.avatar_path("a.png"), "avatars/jane/a.png");
    }

    #[test]
    fn test_attributes() {
        let mut user = user(None);
        user.email = "jane@example.com".into();
        assert_eq!(user.attributes(), vec!["jane", "Jane", "Doe", "jane@example.com"]);
    }
}
