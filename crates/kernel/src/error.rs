//! Application error types.
//!
//! Every error renders as the JSON envelope
//! `{"statusCode": n, "error": "...", "message": ["..."]}`. Validation and
//! criteria failures map to 400, missing entities and missing category
//! references to 404, and everything unexpected to a generic 400 carrying
//! whatever detail the storage layer provides. Unique-constraint violations
//! are translated into a `{field} {value} already exists` message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::criteria::CriteriaError;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed criteria tree; carries no per-node detail.
    #[error("Invalid criterias")]
    InvalidCriterias,

    /// Request-level validation failure with its own message.
    #[error("{0}")]
    Validation(String),

    /// A criterion referenced a category that does not exist.
    #[error("Category not found by field: {0}")]
    CategoryNotFound(String),

    /// Category references form a cycle.
    #[error("cyclic category reference via '{0}'")]
    CyclicReference(String),

    /// A requested entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<CriteriaError> for AppError {
    fn from(err: CriteriaError) -> Self {
        match err {
            CriteriaError::Invalid => AppError::InvalidCriterias,
            CriteriaError::CategoryNotFound(name) => AppError::CategoryNotFound(name),
            CriteriaError::CyclicReference(name) => AppError::CyclicReference(name),
            CriteriaError::Lookup(e) => AppError::Internal(e),
            other => AppError::Validation(other.to_string()),
        }
    }
}

/// JSON error envelope.
#[derive(Serialize)]
struct ErrorBody {
    #[serde(rename = "statusCode")]
    status_code: u16,
    error: &'static str,
    message: Vec<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::InvalidCriterias
            | AppError::Validation(_)
            | AppError::CyclicReference(_) => (StatusCode::BAD_REQUEST, self.to_string()),

            AppError::CategoryNotFound(_) | AppError::NotFound(_) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }

            AppError::Database(e) => {
                tracing::error!(error = %e, "database error");
                (StatusCode::BAD_REQUEST, storage_message(e))
            }

            AppError::Internal(e) => match e.downcast_ref::<sqlx::Error>() {
                Some(db) => {
                    tracing::error!(error = %e, "database error");
                    (StatusCode::BAD_REQUEST, storage_message(db))
                }
                None => {
                    tracing::error!(error = %e, "unexpected error");
                    (StatusCode::BAD_REQUEST, format!("Error 500: {e}"))
                }
            },
        };

        let error = match status {
            StatusCode::NOT_FOUND => "Not Found",
            _ => "Bad Request",
        };

        let body = ErrorBody {
            status_code: status.as_u16(),
            error,
            message: vec![message],
        };

        (status, Json(body)).into_response()
    }
}

/// Message for a storage failure, special-casing unique violations.
fn storage_message(err: &sqlx::Error) -> String {
    if let sqlx::Error::Database(db) = err {
        if db.code().as_deref() == Some("23505") {
            if let Some((field, value)) = db
                .try_downcast_ref::<sqlx::postgres::PgDatabaseError>()
                .and_then(|pg| pg.detail())
                .and_then(parse_unique_detail)
            {
                return format!("{field} {value} already exists");
            }
            return "duplicate value violates a unique constraint".to_string();
        }
        return format!("Error 500: {db}");
    }
    format!("Error 500: {err}")
}

/// Extract `(field, value)` from a Postgres 23505 detail string of the form
/// `Key (name)=(nike) already exists.`
fn parse_unique_detail(detail: &str) -> Option<(String, String)> {
    let re = Regex::new(r"\(([^)]+)\)=\(([^)]+)\)").ok()?;
    let caps = re.captures(detail)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;
