//! Password reset tokens issued by the forgot-password flow.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifetime of a [`PasswordResetToken`].
pub const EXPIRATION_TIME: TimeDelta = TimeDelta::minutes(2);

/// Reset token bound to one user. A user may own many tokens.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PasswordResetToken {
    pub id: i64,
    pub user_id: i64,
    pub token: Uuid,
    #[serde(skip)]
    pub otp_secret: String,
    pub created_at: DateTime<Utc>,
    pub verified: bool,
}

impl PasswordResetToken {
    /// Create a new unverified [`PasswordResetToken`] with a random UUID.
    pub fn new(user_id: i64, otp_secret: impl Into<String>) -> Self {
        Self {
            id: 0,
            user_id,
            token: Uuid::new_v4(),
            otp_secret: otp_secret.into(),
            created_at: Utc::now(),
            verified: false,
        }
    }

    /// Whether token was expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at >= EXPIRATION_TIME
    }

    /// Whether token is expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}
