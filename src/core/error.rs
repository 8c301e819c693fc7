//! Typed error handling for the slate backend
//!
//! Every failure a controller or handler can produce is a member of
//! [`CmsError`], so storage engines, validators, and the permission
//! layer all surface the same taxonomy regardless of backend.
//!
//! # HTTP mapping
//!
//! - `Validation`, `Duplicate*`, `NotModified`, `NotDeleted` → 400
//! - `AccessDenied`, `BadCredentials` → 401
//! - `NotFound` → 404
//! - `StorageContractViolation`, `UnexpectedStorage` → 500
//!
//! The wire body for every failure is `{ "error": "<message>" }`.
//! Engine-native error objects never reach the response layer.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::fmt;

/// Which unique key a storage engine reported a collision on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKind {
    Slug,
    Username,
    Email,
}

impl fmt::Display for DuplicateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateKind::Slug => write!(f, "slug"),
            DuplicateKind::Username => write!(f, "username"),
            DuplicateKind::Email => write!(f, "email"),
        }
    }
}

/// The main error type for the slate backend.
#[derive(Debug)]
pub enum CmsError {
    /// Input payload failed shape or constraint checks.
    /// Always names the rejected field.
    Validation { field: String, message: String },

    /// The actor's role lacks the required capability.
    /// Deliberately carries no detail about the target resource.
    AccessDenied,

    /// Lookup failed (or the record is invisible to this actor).
    NotFound { kind: &'static str },

    /// A uniqueness constraint was violated at the storage engine.
    Duplicate { kind: DuplicateKind },

    /// An update matched a record at lookup time but affected zero rows.
    NotModified,

    /// A delete matched a record at lookup time but affected zero rows.
    NotDeleted,

    /// Login credentials did not verify.
    BadCredentials,

    /// The storage engine returned a response shape the adapter does
    /// not recognize. Fatal to the request, never retried.
    StorageContractViolation { detail: String },

    /// Engine-level failure not otherwise classified.
    UnexpectedStorage { detail: String },

    /// Internal failure outside the storage layer (should not happen
    /// in normal operation).
    Internal(String),
}

impl fmt::Display for CmsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CmsError::Validation { field, message } => {
                write!(f, "Invalid field '{}': {}", field, message)
            }
            CmsError::AccessDenied => write!(f, "Access denied"),
            CmsError::NotFound { kind } => write!(f, "{} not found", kind),
            CmsError::Duplicate { kind } => {
                write!(f, "A record with this {} already exists", kind)
            }
            CmsError::NotModified => write!(f, "The update affected no records"),
            CmsError::NotDeleted => write!(f, "The delete affected no records"),
            CmsError::BadCredentials => write!(f, "Invalid username or password"),
            CmsError::StorageContractViolation { detail } => {
                write!(f, "Storage returned an unexpected response: {}", detail)
            }
            CmsError::UnexpectedStorage { detail } => {
                write!(f, "Storage failure: {}", detail)
            }
            CmsError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for CmsError {}

impl CmsError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CmsError::Validation { .. } => StatusCode::BAD_REQUEST,
            CmsError::AccessDenied => StatusCode::UNAUTHORIZED,
            CmsError::NotFound { .. } => StatusCode::NOT_FOUND,
            CmsError::Duplicate { .. } => StatusCode::BAD_REQUEST,
            CmsError::NotModified => StatusCode::BAD_REQUEST,
            CmsError::NotDeleted => StatusCode::BAD_REQUEST,
            CmsError::BadCredentials => StatusCode::UNAUTHORIZED,
            CmsError::StorageContractViolation { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            CmsError::UnexpectedStorage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            CmsError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a stable machine-readable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            CmsError::Validation { .. } => "VALIDATION_ERROR",
            CmsError::AccessDenied => "ACCESS_DENIED",
            CmsError::NotFound { .. } => "NOT_FOUND",
            CmsError::Duplicate { kind } => match kind {
                DuplicateKind::Slug => "DUPLICATE_SLUG",
                DuplicateKind::Username => "DUPLICATE_USERNAME",
                DuplicateKind::Email => "DUPLICATE_EMAIL",
            },
            CmsError::NotModified => "NOT_MODIFIED",
            CmsError::NotDeleted => "NOT_DELETED",
            CmsError::BadCredentials => "BAD_CREDENTIALS",
            CmsError::StorageContractViolation { .. } => "STORAGE_CONTRACT_VIOLATION",
            CmsError::UnexpectedStorage { .. } => "STORAGE_ERROR",
            CmsError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Shorthand for a single-field validation rejection.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CmsError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl IntoResponse for CmsError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(code = self.error_code(), "request failed: {}", self);
        }
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

/// A specialized Result type for slate operations.
pub type CmsResult<T> = Result<T, CmsError>;
