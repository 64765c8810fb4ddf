//! Error handler for accounts.

use std::borrow::Cow;

use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use sqlx::{Error as SQLxError, postgres::PgDatabaseError};
use thiserror::Error;
use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

pub type Result<T> = std::result::Result<T, ServerError>;

/// Key used for errors not related to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Enum representing server-side errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("validation error occurred")]
    Validation(#[from] ValidationErrors),

    #[error("{0}")]
    NotFound(Cow<'static, str>),

    #[error(transparent)]
    Axum(#[from] JsonRejection),

    #[error("SQL request failed: {0}")]
    Sql(#[from] SQLxError),

    #[error("constraint `{0}` violated")]
    Constraint(String),

    #[error(transparent)]
    Crypto(#[from] crate::crypto::CryptoError),

    #[error("file storage failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal server error, {details}")]
    Internal {
        details: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("invalid 'Authorization' header")]
    Unauthorized,

    #[error("too many attempts, retry later")]
    RateLimited,
}

impl ServerError {
    /// Single validation error on `field`.
    pub fn field(field: &'static str, error: ValidationError) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, error);
        Self::Validation(errors)
    }

    /// Validation error not bound to a field.
    pub fn non_field(error: ValidationError) -> Self {
        Self::field(NON_FIELD_ERRORS, error)
    }
}

/// Structure for detailed error responses.
#[derive(Debug, Serialize)]
pub struct ResponseError {
    r#type: Option<String>,
    title: String,
    status: u16,
    detail: String,
    instance: Option<String>,
    errors: Option<Vec<FieldError>>,
}

impl ResponseError {
    /// Update error status code.
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code.as_u16();
        self
    }

    /// Update `title` field.
    pub fn title(mut self, title: &str) -> Self {
        self.title = title.into();
        self
    }

    /// Add detailed error.
    pub fn details(mut self, description: &str) -> Self {
        self.detail = description.into();
        self
    }

    /// Automatically add errors field.
    pub fn errors(mut self, errors: &ValidationErrors) -> Self {
        self.errors = Some(parse_validation_errors(errors));
        self
    }

    /// Transform [`ResponseError`] into axum [`Response`].
    pub fn into_response(self) -> std::result::Result<Response, axum::http::Error> {
        if let Ok(body) = serde_json::to_string(&self) {
            Response::builder()
                .status(self.status)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
        } else {
            Ok(internal_server_error())
        }
    }
}

impl Default for ResponseError {
    fn default() -> Self {
        Self {
            r#type: None,
            title: "Internal server error.".to_owned(),
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            detail: String::default(),
            instance: None,
            errors: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct FieldError {
    field: String,
    message: String,
}

fn parse_validation_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut fields: Vec<FieldError> = errors
        .errors()
        .iter()
        .flat_map(|(field, kind)| {
            let issues: &[ValidationError] = match kind {
                ValidationErrorsKind::Field(issues) => issues,
                _ => &[],
            };
            issues.iter().map(move |issue| FieldError {
                field: field.to_string(),
                message: issue
                    .message
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| issue.to_string()),
            })
        })
        .collect();

    // HashMap order is random.
    fields.sort_by(|a, b| a.field.cmp(&b.field));
    fields
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let response = ResponseError::default()
            .title("There were validation errors with your request.")
            .details(&self.to_string())
            .status(StatusCode::BAD_REQUEST);

        let response = match &self {
            ServerError::Validation(validation_errors) => response.errors(validation_errors),

            ServerError::NotFound(_) => response
                .title("Resource not found.")
                .status(StatusCode::NOT_FOUND),

            ServerError::Sql(SQLxError::RowNotFound) => response
                .title("Resource not found.")
                .status(StatusCode::NOT_FOUND),

            ServerError::Sql(err) => {
                tracing::error!(error = %err, "database request failed");

                ResponseError::default().details(
                    err.as_database_error()
                        .and_then(|e| e.try_downcast_ref::<PgDatabaseError>())
                        .and_then(|e| e.detail())
                        .unwrap_or_default(),
                )
            },

            ServerError::Unauthorized => response
                .title("Missing or invalid 'Authorization' header.")
                .status(StatusCode::UNAUTHORIZED),

            ServerError::RateLimited => response
                .title("Too many requests.")
                .status(StatusCode::TOO_MANY_REQUESTS),

            ServerError::Crypto(err) => {
                tracing::error!(error = %err, "cryptographic operation failed");

                ResponseError::default()
            },

            ServerError::Io(err) => {
                tracing::error!(error = %err, "file storage failed");

                ResponseError::default()
            },

            ServerError::Internal { details, source } => {
                tracing::error!(err = ?source, %details, "server returned 500 status");

                ResponseError::default()
            },

            _ => response,
        };

        response
            .into_response()
            .unwrap_or_else(|_| internal_server_error())
    }
}

fn internal_server_error() -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/json")
        .body(
            serde_json::json!({
                "type": null,
                "title": "Internal server error.",
                "status": StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                "detail": null,
                "instance": null,
                "errors": null,
            })
            .to_string()
            .into(),
        )
        .unwrap_or_else(|_| Response::new("Internal server error".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_response() {
        let mut errors = ValidationErrors::new();
        errors.add(
            "password",
            ValidationError::new("short").with_message("too short".into()),
        );
        errors.add(
            "password",
            ValidationError::new("numeric").with_message("numeric".into()),
        );
        errors.add("birth_year", ValidationError::new("range"));

        let response = ServerError::Validation(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body(response).await;
        assert_eq!(body["status"], 400);
        let fields = body["errors"].as_array().unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0]["field"], "birth_year");
        assert_eq!(fields[1]["field"], "password");
        assert_eq!(fields[1]["message"], "too short");
        assert_eq!(fields[2]["message"], "numeric");
    }

    #[tokio::test]
    async fn test_not_found_response() {
        let response = ServerError::NotFound("missing".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(response).await["detail"], "missing");
    }

    #[tokio::test]
    async fn test_internal_response_hides_details() {
        let response = ServerError::Internal {
            details: "secret".into(),
            source: None,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(response).await["detail"], "");
    }
}
