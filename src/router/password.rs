//! Forgotten password recovery.
//!
//! `forgot` issues a reset token and its OTP secret, `verify` confirms the
//! OTP code and returns the token, `reset` consumes the verified token.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::router::Valid;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ForgotBody {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ForgotResponse {
    pub email: String,
    /// Only sent when `password_reset.expose_otp_secret` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp_secret: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct VerifyBody {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub otp_code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub token: Uuid,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ResetBody {
    pub token: Uuid,
    #[validate(length(min = 8, message = "Ensure this field has at least 8 characters."))]
    pub password: String,
}

/// Handler to request a password reset.
pub async fn forgot(
    State(state): State<AppState>,
    Valid(body): Valid<ForgotBody>,
) -> Result<Json<ForgotResponse>> {
    if !state.limiter.check(format!("forgot:{}", body.email)) {
        return Err(ServerError::RateLimited);
    }

    let token = state.users().issue_reset_token(&body.email).await?;

    Ok(Json(ForgotResponse {
        email: body.email,
        otp_secret: state
            .config
            .password_reset
            .expose_otp_secret
            .then_some(token.otp_secret),
    }))
}

/// Handler to check the OTP code of a password reset.
pub async fn verify(
    State(state): State<AppState>,
    Valid(body): Valid<VerifyBody>,
) -> Result<Json<VerifyResponse>> {
    if !state.limiter.check(format!("verify:{}", body.email)) {
        return Err(ServerError::RateLimited);
    }

    let token = state
        .users()
        .verify_reset_code(&body.email, &body.otp_code)
        .await?;

    Ok(Json(VerifyResponse { token: token.token }))
}

/// Handler to set a new password.
pub async fn reset(
    State(state): State<AppState>,
    Valid(body): Valid<ResetBody>,
) -> Result<StatusCode> {
    state
        .users()
        .reset_password(body.token, &body.password)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
