use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CampaignError {
    #[error("Campaign not found: {0}")]
    NotFound(Uuid),

    #[error("Recipient not found: {0}")]
    RecipientNotFound(Uuid),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type CampaignResult<T> = Result<T, CampaignError>;

impl From<sea_orm::DbErr> for CampaignError {
    fn from(err: sea_orm::DbErr) -> Self {
        CampaignError::Internal(format!("Database error: {}", err))
    }
}

/// Standard error response body
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
}

impl IntoResponse for CampaignError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            CampaignError::NotFound(_) | CampaignError::RecipientNotFound(_) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND")
            }
            CampaignError::Validation(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            CampaignError::Template(_) => (StatusCode::BAD_REQUEST, "TEMPLATE_ERROR"),
            CampaignError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR")
            }
        };

        let body = Json(ErrorBody {
            error: error.to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}
