//! Error types for Biblioteca server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Numeric error codes reported alongside the HTTP status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    DbFailure = 3,
    NoSuchBook = 5,
    NoSuchLoan = 6,
    BookAlreadyLoaned = 7,
    DuplicateIsbn = 8,
    NotificationFailure = 9,
    AlreadyTerminal = 10,
    BookHasActiveLoan = 11,
    BadValue = 18,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("ISBN already registered: {0}")]
    DuplicateIsbn(String),

    #[error("Book not found: {0}")]
    BookNotFound(String),

    #[error("Loan with id {0} not found")]
    LoanNotFound(i64),

    #[error("Book already loaned: {0}")]
    BookAlreadyLoaned(String),

    #[error("Loan {0} is already returned")]
    AlreadyTerminal(i64),

    #[error("Book {0} has an active loan")]
    BookHasActiveLoan(i64),

    #[error("Validation error: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Business-rule violations, as opposed to infrastructure failures
    pub fn is_business(&self) -> bool {
        !matches!(
            self,
            AppError::Database(_) | AppError::Notification(_) | AppError::Internal(_)
        )
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        messages.sort();
        AppError::Validation(messages)
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
    /// Human-readable messages, one per violated rule
    pub errors: Vec<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_business() {
            tracing::info!(error = %self, "Request rejected");
        }

        let (status, code) = match &self {
            AppError::DuplicateIsbn(_) => (StatusCode::BAD_REQUEST, ErrorCode::DuplicateIsbn),
            AppError::BookNotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchBook),
            AppError::LoanNotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchLoan),
            AppError::BookAlreadyLoaned(_) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BookAlreadyLoaned)
            }
            AppError::AlreadyTerminal(_) => (StatusCode::CONFLICT, ErrorCode::AlreadyTerminal),
            AppError::BookHasActiveLoan(_) => {
                (StatusCode::CONFLICT, ErrorCode::BookHasActiveLoan)
            }
            AppError::Validation(_) | AppError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue)
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DbFailure)
            }
            AppError::Notification(msg) => {
                tracing::error!("Notification error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::NotificationFailure)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Failure)
            }
        };

        let errors = match self {
            AppError::Validation(messages) => messages,
            AppError::Database(_) => vec!["Database error".to_string()],
            AppError::Notification(_) | AppError::Internal(_) => {
                vec!["Internal server error".to_string()]
            }
            other => vec![other.to_string()],
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message: errors.join("; "),
            errors,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

/// Map a unique-constraint violation onto a business error, passing other
/// database errors through untouched.
pub(crate) fn map_unique_violation(err: sqlx::Error, on_conflict: impl FnOnce() -> AppError) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return on_conflict();
        }
    }
    AppError::Database(err)
}

/// Fail with one message per field that is empty once trimmed
pub(crate) fn require_non_blank(fields: &[(&str, &str)]) -> AppResult<()> {
    let missing: Vec<String> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| format!("{} must not be empty", field))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(missing))
    }
}
