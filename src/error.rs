use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, SqlErr};
use serde_json::json;

/// Reasons a subscriber write is rejected by the validation hooks.
///
/// Every variant aborts the save; none is retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Ownership without approval: the product is owned but no approved
    /// transaction backs it.
    #[error("product status can't be owned if an approved transaction is not present")]
    InconsistentState,

    #[error(
        "subscriber product plan id {plan_id} is different than transaction plan id {}",
        .purchased.as_deref().unwrap_or("(none)")
    )]
    PlanMismatch {
        plan_id: String,
        purchased: Option<String>,
    },

    #[error("subscription id is not provided")]
    MissingSubscriptionId,

    /// The cause is logged where it happens and deliberately not carried here.
    #[error("error verifying purchase. Check if the purchase token is valid")]
    PurchaseVerification,
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InconsistentState => "INCONSISTENT_STATE",
            Self::PlanMismatch { .. } => "PLAN_MISMATCH",
            Self::MissingSubscriptionId => "MISSING_SUBSCRIPTION_ID",
            Self::PurchaseVerification => "PURCHASE_VERIFICATION_FAILED",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(DbErr),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        // Unique indexes back the userId, country and plan identifier constraints
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => ApiError::Conflict(detail),
            _ => ApiError::Database(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "An internal database error occurred".to_string(),
                )
            }
            ApiError::Validation(ref e) => {
                (StatusCode::UNPROCESSABLE_ENTITY, e.code(), e.to_string())
            }
            ApiError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::NotFound(ref msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            ApiError::Conflict(ref msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            ApiError::Internal(ref e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message,
            }
        });

        (status, Json(body)).into_response()
    }
}

// Helper type for results
pub type Result<T> = std::result::Result<T, ApiError>;
