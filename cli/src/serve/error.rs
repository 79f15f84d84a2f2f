use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::*;

use engine::DomainError;

pub type FieldErrors = BTreeMap<&'static str, String>;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{message}")]
    Unprocessable {
        message: String,
        errors: FieldErrors,
    },
    #[error("Invalid credentials.")]
    InvalidCredentials,
    #[error("Not authenticated.")]
    NotAuthenticated,
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn unprocessable(message: &str, errors: FieldErrors) -> Self {
        Self::Unprocessable {
            message: message.to_owned(),
            errors,
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(source: DomainError) -> Self {
        match source {
            DomainError::NotFound(message) => ApiError::NotFound(message),
            DomainError::AlreadyExists(message) => ApiError::unprocessable(
                "User signup failed due to validation errors.",
                FieldErrors::from([("email", message)]),
            ),
            DomainError::InvalidCredentials => ApiError::InvalidCredentials,
            e => {
                warn!("domain: {:?}", e);
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let message = self.to_string();

        let (status, body) = match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, json!({ "message": message })),
            ApiError::Unprocessable { errors, .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "message": message, "errors": errors }),
            ),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                json!({
                    "message": message,
                    "errors": { "credentials": "Invalid email or password entered." }
                }),
            ),
            ApiError::NotAuthenticated => {
                (StatusCode::UNAUTHORIZED, json!({ "message": message }))
            }
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "message": message }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
