//! Typed error handling for the tours API
//!
//! Every failure is classified into one of three kinds, each with a fixed
//! HTTP status:
//!
//! - [`TourError::NotFound`]: no visible tour matches the identifier (404)
//! - [`TourError::Validation`]: the client sent something unacceptable (400)
//! - [`TourError::Internal`]: the storage layer or serialization failed (500)
//!
//! # Example
//!
//! ```rust,ignore
//! use tours::prelude::*;
//!
//! async fn load(store: &dyn TourStore, id: Uuid) -> TourResult<Tour> {
//!     store
//!         .find_one(&TourQuery::by_id(id))
//!         .await?
//!         .ok_or(TourError::NotFound { id })
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::core::query::QueryParamsError;

/// The main error type for the tours API
#[derive(Debug)]
pub enum TourError {
    /// No visible tour with this id
    NotFound { id: Uuid },

    /// Client input was rejected
    Validation(ValidationError),

    /// Storage or serialization failure
    Internal(String),
}

impl fmt::Display for TourError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TourError::NotFound { id } => write!(f, "No tour found with id '{}'", id),
            TourError::Validation(e) => write!(f, "{}", e),
            TourError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for TourError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TourError::Validation(e) => Some(e),
            _ => None,
        }
    }
}

/// Failure envelope returned to clients
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Always `"fail"`
    pub status: &'static str,
    /// Human-readable error message
    pub message: String,
    /// Per-field validation failures, when there are any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldValidationError>>,
}

impl TourError {
    /// Build an internal error from anything displayable
    pub fn internal(message: impl fmt::Display) -> Self {
        TourError::Internal(message.to_string())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            TourError::NotFound { .. } => StatusCode::NOT_FOUND,
            TourError::Validation(_) => StatusCode::BAD_REQUEST,
            TourError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            TourError::NotFound { .. } => "TOUR_NOT_FOUND",
            TourError::Validation(e) => e.error_code(),
            TourError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to a failure envelope
    pub fn to_response(&self) -> ErrorResponse {
        let errors = match self {
            TourError::Validation(ValidationError::FieldErrors(errors)) => Some(errors.clone()),
            _ => None,
        };

        ErrorResponse {
            status: "fail",
            message: self.to_string(),
            errors,
        }
    }
}

impl IntoResponse for TourError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), "{}", self);
        } else {
            tracing::warn!(code = self.error_code(), "{}", self);
        }

        (status, Json(self.to_response())).into_response()
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors caused by client input
#[derive(Debug)]
pub enum ValidationError {
    /// One or more fields failed their validators
    FieldErrors(Vec<FieldValidationError>),

    /// The request body is not a valid tour document
    InvalidBody { message: String },

    /// The query string could not be turned into a query
    InvalidQuery { message: String },

    /// The path identifier is not a valid tour id
    InvalidId { value: String },

    /// Another tour already uses this name
    DuplicateName { name: String },
}

/// A single field validation error
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::FieldErrors(errors) => {
                let msgs: Vec<String> = errors
                    .iter()
                    .map(|e| format!("{}: {}", e.field, e.message))
                    .collect();
                write!(f, "Invalid input data. {}", msgs.join(", "))
            }
            ValidationError::InvalidBody { message } => {
                write!(f, "Invalid request body: {}", message)
            }
            ValidationError::InvalidQuery { message } => {
                write!(f, "Invalid query: {}", message)
            }
            ValidationError::InvalidId { value } => {
                write!(f, "Invalid tour id: '{}'", value)
            }
            ValidationError::DuplicateName { name } => {
                write!(f, "A tour named '{}' already exists", name)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::FieldErrors(_) => "VALIDATION_ERROR",
            ValidationError::InvalidBody { .. } => "INVALID_BODY",
            ValidationError::InvalidQuery { .. } => "INVALID_QUERY",
            ValidationError::InvalidId { .. } => "INVALID_ID",
            ValidationError::DuplicateName { .. } => "DUPLICATE_NAME",
        }
    }
}

impl From<ValidationError> for TourError {
    fn from(err: ValidationError) -> Self {
        TourError::Validation(err)
    }
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<validator::ValidationErrors> for TourError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldValidationError> = Vec::new();

        for (field, kind) in errors.errors() {
            let validator::ValidationErrorsKind::Field(field_errors) = kind else {
                continue;
            };
            for err in field_errors {
                // Struct-level checks carry the offending field in their code
                let name = if field.to_string() == "__all__" {
                    err.code.to_string()
                } else {
                    camel_case(&field.to_string())
                };
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("failed '{}' check", err.code));
                fields.push(FieldValidationError {
                    field: name,
                    message,
                });
            }
        }

        fields.sort_by(|a, b| a.field.cmp(&b.field).then(a.message.cmp(&b.message)));
        TourError::Validation(ValidationError::FieldErrors(fields))
    }
}

impl From<serde_json::Error> for TourError {
    fn from(err: serde_json::Error) -> Self {
        TourError::Validation(ValidationError::InvalidBody {
            message: err.to_string(),
        })
    }
}

impl From<QueryParamsError> for TourError {
    fn from(err: QueryParamsError) -> Self {
        TourError::Validation(ValidationError::InvalidQuery {
            message: err.to_string(),
        })
    }
}

/// `ratings_average` → `ratingsAverage`
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

// =============================================================================
// Result type alias
// =============================================================================

/// A specialized Result type for tour operations
pub type TourResult<T> = Result<T, TourError>;
