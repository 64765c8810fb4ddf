use chrono::Utc;
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

use crate::config::Configuration;
use crate::crypto::Crypto;
use crate::database::Database;
use crate::error::{Result, ServerError};
use crate::i18n::Message;
use crate::schema::{CHECK_BIRTH_YEAR_RANGE, USERNAME_UNIQUE};
use crate::totp;
use crate::user::{PasswordResetToken, User};

/// User manager.
///
/// Borrows the application state for the duration of one request.
#[derive(Clone, Copy)]
pub struct UserService<'a> {
    pub config: &'a Configuration,
    pub db: &'a Database,
    pub crypto: &'a Crypto,
}

impl<'a> UserService<'a> {
    /// Create a new [`UserService`].
    pub fn new(config: &'a Configuration, db: &'a Database, crypto: &'a Crypto) -> Self {
        Self { config, db, crypto }
    }

    fn error(&self, field: &'static str, message: Message) -> ServerError {
        ServerError::field(field, message.to_error(self.config.language))
    }

    /// Translate a violated database constraint into a field error.
    fn constraint_error(&self, err: ServerError) -> ServerError {
        match err {
            ServerError::Constraint(name) if name == CHECK_BIRTH_YEAR_RANGE => {
                self.error("birth_year", Message::BirthYearOutOfRange)
            },
            ServerError::Constraint(name) if name == USERNAME_UNIQUE => {
                self.error("username", Message::UsernameTaken)
            },
            err => err,
        }
    }

    /// Validate `user` with [`User::full_clean`] then persist it.
    pub async fn save(&self, user: User) -> Result<User> {
        user.full_clean(self.config)?;

        let user = if user.is_new() {
            self.db.users.insert(&user).await
        } else {
            self.db.users.update(&user).await.map(|_| user)
        };

        user.map_err(|err| self.constraint_error(err))
    }

    /// Check `password` against the password policy then hash it on `user`.
    ///
    /// Every failed rule is reported under `field`.
    pub fn set_password(&self, user: &mut User, field: &'static str, password: &str) -> Result<()> {
        if let Err(failures) = self.config.password.check(password, &user.attributes()) {
            let mut errors = ValidationErrors::new();
            for failure in failures {
                errors.add(field, failure.to_error(self.config.language));
            }
            return Err(errors.into());
        }

        user.password = self.crypto.pwd.hash_password(password)?;
        Ok(())
    }

    /// Create a new account.
    pub async fn register(&self, mut user: User, password: &str) -> Result<User> {
        if self.db.users.username_exists(&user.username).await? {
            return Err(self.error("username", Message::UsernameTaken));
        }

        self.set_password(&mut user, "password", password)?;
        let user = self.save(user).await?;

        tracing::info!(user_id = user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Find an active user matching both credentials.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>> {
        let user = match self.db.users.find_by_username(username).await? {
            Some(user) if user.is_active => user,
            _ => {
                self.crypto.pwd.dummy_verify(password);
                return Ok(None);
            },
        };

        if self.crypto.pwd.verify_password(password, &user.password) {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    /// Open a new session for `user`, returning its bearer token.
    pub async fn login(&self, user: &mut User) -> Result<String> {
        let token = self.crypto.session_token();
        self.db.sessions.insert(&token, user.id).await?;

        user.last_login = Some(Utc::now());
        self.db.users.update(user).await?;

        Ok(token)
    }

    /// Resolve an active user from a session token.
    pub async fn from_session(&self, token: &str) -> Result<Option<User>> {
        let Some(user_id) = self.db.sessions.find_user_id(token).await? else {
            return Ok(None);
        };

        Ok(self
            .db
            .users
            .find_by_id(user_id)
            .await?
            .filter(|user| user.is_active))
    }

    /// Replace password of an authenticated user.
    pub async fn change_password(&self, mut user: User, old: &str, new: &str) -> Result<()> {
        if !self.crypto.pwd.verify_password(old, &user.password) {
            return Err(self.error("old_password", Message::WrongOldPassword));
        }

        self.set_password(&mut user, "new_password", new)?;
        self.save(user).await?;

        Ok(())
    }

    /// Delete user after checking its password.
    pub async fn delete(&self, user: &User, password: &str) -> Result<()> {
        if !self.crypto.pwd.verify_password(password, &user.password) {
            return Err(self.error("password", Message::InvalidCredentials));
        }

        self.db.users.delete(user.id).await?;

        tracing::info!(user_id = user.id, "user deleted");
        Ok(())
    }

    /// Issue a new unverified reset token to the owner of `email`.
    pub async fn issue_reset_token(&self, email: &str) -> Result<PasswordResetToken> {
        let Some(user) = self.db.users.find_by_email(email).await? else {
            return Err(ServerError::NotFound(
                Message::EmailNotFound.translate(self.config.language),
            ));
        };

        let token = PasswordResetToken::new(user.id, totp::generate_secret());
        self.db.reset_tokens.insert(&token).await
    }

    /// Confirm the OTP code of the latest token issued to `email`.
    pub async fn verify_reset_code(&self, email: &str, code: &str) -> Result<PasswordResetToken> {
        let invalid_code = || self.error("otp_code", Message::InvalidOtpCode);

        let Some(user) = self.db.users.find_by_email(email).await? else {
            return Err(ServerError::NotFound(
                Message::EmailNotFound.translate(self.config.language),
            ));
        };

        let mut token = match self.db.reset_tokens.find_latest_for_user(user.id).await? {
            Some(token) if !token.is_expired() => token,
            _ => return Err(invalid_code()),
        };

        if !totp::verify(&token.otp_secret, code)? {
            return Err(invalid_code());
        }

        self.db.reset_tokens.mark_verified(token.id).await?;
        token.verified = true;

        Ok(token)
    }

    /// Set a new password using a verified, unexpired reset token.
    ///
    /// The token is consumed and every session of the user is revoked.
    pub async fn reset_password(&self, token: Uuid, password: &str) -> Result<()> {
        let token_error = |message: Message| {
            let err: ValidationError = message.to_error(self.config.language);
            ServerError::field("token", err)
        };

        let Some(token) = self.db.reset_tokens.find_by_token(token).await? else {
            return Err(token_error(Message::InvalidResetToken));
        };
        if !token.verified {
            return Err(token_error(Message::ResetTokenNotVerified));
        }
        if token.is_expired() {
            return Err(token_error(Message::ResetTokenExpired));
        }

        let Some(mut user) = self.db.users.find_by_id(token.user_id).await? else {
            return Err(token_error(Message::InvalidResetToken));
        };

        self.set_password(&mut user, "password", password)?;
        let user = self.save(user).await?;

        self.db.reset_tokens.delete(token.id).await?;
        self.db.sessions.revoke_all_for_user(user.id).await?;

        tracing::info!(user_id = user.id, "password reset");
        Ok(())
    }
}
