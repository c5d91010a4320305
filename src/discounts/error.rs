// Error types for discount rule evaluation and rule lifecycle operations

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::ErrorResponse;

/// Main error type for the discount system
///
/// Each variant maps to one client-facing category: bad request, not found,
/// conflict, or internal failure. None of them are retried automatically.
#[derive(Debug, Error)]
pub enum DiscountError {
    /// The caller did not supply a tenant scope
    #[error("Tenant id is required")]
    MissingTenant,

    /// Field-level request validation failed
    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// A field required by the rule type is absent or out of range
    #[error("Invalid discount rule: {0}")]
    InvalidRule(String),

    /// The JSON body could not be read into the request type
    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),

    /// A calculated discount does not fit the decimal range
    #[error("Discount amount exceeds the supported range")]
    AmountOverflow,

    /// Invalid list/query parameters
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Rule does not exist within the tenant
    #[error("Discount rule {0} not found")]
    RuleNotFound(Uuid),

    /// Another rule of the tenant already uses this name
    #[error("Discount rule with name '{0}' already exists")]
    DuplicateName(String),

    /// Rule has been redeemed and can only be deactivated
    #[error("Discount rule {id} has been used {times_used} times and cannot be deleted; deactivate it instead")]
    RuleInUse { id: Uuid, times_used: i32 },

    /// Underlying storage failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type alias for discount operations
pub type DiscountResult<T> = Result<T, DiscountError>;

impl DiscountError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            DiscountError::MissingTenant
            | DiscountError::Validation(_)
            | DiscountError::InvalidRule(_)
            | DiscountError::InvalidQuery(_)
            | DiscountError::AmountOverflow => StatusCode::BAD_REQUEST,
            DiscountError::InvalidBody(rejection) => rejection.status(),
            DiscountError::RuleNotFound(_) => StatusCode::NOT_FOUND,
            DiscountError::DuplicateName(_) | DiscountError::RuleInUse { .. } => {
                StatusCode::CONFLICT
            }
            DiscountError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            DiscountError::MissingTenant => "MISSING_TENANT",
            DiscountError::Validation(_) => "VALIDATION_ERROR",
            DiscountError::InvalidRule(_) => "INVALID_RULE",
            DiscountError::InvalidBody(_) => "INVALID_BODY",
            DiscountError::AmountOverflow => "AMOUNT_OUT_OF_RANGE",
            DiscountError::InvalidQuery(_) => "INVALID_QUERY",
            DiscountError::RuleNotFound(_) => "NOT_FOUND",
            DiscountError::DuplicateName(_) => "DUPLICATE_NAME",
            DiscountError::RuleInUse { .. } => "RULE_IN_USE",
            DiscountError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Convert to the client-facing body, logging at a level matching severity
    ///
    /// Storage errors are logged in full but reach the client as a generic message.
    fn to_error_response(&self) -> ErrorResponse {
        match self {
            DiscountError::Validation(errors) => {
                debug!("Validation error: {:?}", errors);
                ErrorResponse::new(self.error_code(), "Request validation failed").with_details(
                    serde_json::to_value(errors).unwrap_or_else(|_| serde_json::json!({})),
                )
            }
            DiscountError::Database(db_error) => {
                error!("Database error: {:?}", db_error);
                ErrorResponse::new(self.error_code(), "A database error occurred")
            }
            DiscountError::DuplicateName(_) | DiscountError::RuleInUse { .. } => {
                warn!("Conflict error: {}", self);
                ErrorResponse::new(self.error_code(), self.to_string())
            }
            _ => {
                debug!("Client error: {}", self);
                ErrorResponse::new(self.error_code(), self.to_string())
            }
        }
    }
}

impl IntoResponse for DiscountError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self.to_error_response())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let id = Uuid::nil();
        assert_eq!(DiscountError::MissingTenant.to_string(), "Tenant id is required");
        assert_eq!(
            DiscountError::DuplicateName("Summer".to_string()).to_string(),
            "Discount rule with name 'Summer' already exists"
        );
        assert_eq!(
            DiscountError::RuleNotFound(id).to_string(),
            format!("Discount rule {} not found", id)
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(DiscountError::MissingTenant.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            DiscountError::InvalidRule("x".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(DiscountError::AmountOverflow.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(DiscountError::AmountOverflow.error_code(), "AMOUNT_OUT_OF_RANGE");
        assert_eq!(
            DiscountError::RuleNotFound(Uuid::nil()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            DiscountError::DuplicateName("x".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            DiscountError::RuleInUse { id: Uuid::nil(), times_used: 3 }.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            DiscountError::Database(sqlx::Error::PoolTimedOut).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_from_sqlx() {
        let err: DiscountError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DiscountError::Database(_)));
    }

    #[test]
    fn test_database_error_hides_details() {
        let err = DiscountError::Database(sqlx::Error::PoolTimedOut);
        let body = err.to_error_response();
        assert_eq!(body.error_code, "DATABASE_ERROR");
        assert_eq!(body.message, "A database error occurred");
    }
}
