use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use validator::ValidationErrors;

/// BlogError
///
/// Every failure the repository, mailer and handlers can produce.
/// `Validation` and `NotFound` are user-facing and end up in a flash message;
/// the rest are infrastructure failures rendered as a 500.
#[derive(Debug, Error)]
pub enum BlogError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("password hashing failed: {0}")]
    Password(String),

    #[error("session token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("mail delivery failed: {0}")]
    Mail(String),

    #[error("template rendering failed: {0}")]
    Template(#[from] askama::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub type BlogResult<T> = Result<T, BlogError>;

impl BlogError {
    /// Splits recoverable errors (shown to the user) from infrastructure errors.
    ///
    /// Returns `Ok(message)` for `Validation` and `NotFound`, and hands every other
    /// variant back so the handler can propagate it with `?`.
    pub fn into_flash(self) -> BlogResult<String> {
        match self {
            BlogError::Validation(msg) => Ok(msg),
            BlogError::NotFound(_) => Ok(self.to_string()),
            other => Err(other),
        }
    }
}

impl From<ValidationErrors> for BlogError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|field| field.to_string())
            .collect();
        fields.sort();
        BlogError::Validation(format!(
            "Please correct the following fields: {}",
            fields.join(", ")
        ))
    }
}

impl IntoResponse for BlogError {
    fn into_response(self) -> Response {
        match self {
            BlogError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg).into_response(),
            BlogError::NotFound(what) => {
                (StatusCode::NOT_FOUND, format!("{what} not found")).into_response()
            }
            other => {
                tracing::error!(error = %other, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}
