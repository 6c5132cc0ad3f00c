use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{
    ai_reviewer::AiReviewError, assistant::AssistantError, claude::ClaudeError,
    ordering::OrderingError, review_threads::ReviewThreadError,
};
use thiserror::Error;
use tracing::error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Ordering(#[from] OrderingError),
    #[error(transparent)]
    ReviewThread(#[from] ReviewThreadError),
    #[error(transparent)]
    AiReview(#[from] AiReviewError),
    #[error(transparent)]
    Assistant(#[from] AssistantError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::ReviewThread(ReviewThreadError::ThreadNotFound) => StatusCode::NOT_FOUND,
            Self::AiReview(AiReviewError::NoQuestions) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::AiReview(AiReviewError::Claude(ClaudeError::MissingApiKey)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::AiReview(AiReviewError::Claude(_)) | Self::Assistant(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(ApiResponse::<()>::error(self.to_string()))).into_response()
    }
}
