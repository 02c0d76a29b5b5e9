use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::envelope::Envelope;
use crate::schema::{FieldErrors, SchemaError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rejected request body: {1}")]
    Rejected(StatusCode, String),
}

impl AppError {
    /// Maps a unique-constraint violation to `Conflict`, leaving other
    /// database errors untouched.
    pub fn on_unique_violation(message: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
        move |err| {
            if let sqlx::Error::Database(db_err) = &err {
                if db_err.is_unique_violation() {
                    return AppError::Conflict(message.to_string());
                }
            }
            AppError::Database(err)
        }
    }
}

impl From<SchemaError> for AppError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::Empty => AppError::BadRequest(SchemaError::Empty.to_string()),
            SchemaError::Invalid(errors) => AppError::Validation(errors),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(_) => {
                AppError::BadRequest(SchemaError::Empty.to_string())
            }
            other => AppError::Rejected(other.status(), other.body_text()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let envelope = match self {
            AppError::NotFound(resource) => {
                Envelope::error(StatusCode::NOT_FOUND, format!("{} not found", resource))
            }
            AppError::BadRequest(msg) => Envelope::error(StatusCode::BAD_REQUEST, msg),
            AppError::Validation(details) => {
                Envelope::error(StatusCode::BAD_REQUEST, "Validation failed").with_details(details)
            }
            AppError::Conflict(msg) => Envelope::error(StatusCode::CONFLICT, msg),
            AppError::Rejected(status, msg) => Envelope::error(status, msg),
            AppError::Database(e) => {
                error!("database error: {}", e);
                Envelope::error(StatusCode::INTERNAL_SERVER_ERROR, "Database error occurred")
            }
        };

        envelope.into_response()
    }
}
