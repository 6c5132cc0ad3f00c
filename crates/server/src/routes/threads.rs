//! Review thread listing, creation, status toggling, and replies.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    question::Question,
    review::{CreateReview, Review},
    survey::Survey,
    thread::{CreateReviewThread, ReviewThread, ThreadWithReviews},
};
use serde::Deserialize;
use services::services::review_threads::{
    ReviewThreadService, StatusFilter, ThreadToggleView, TypeFilter, filter_threads,
};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ThreadListQuery {
    #[serde(rename = "type")]
    pub thread_type: Option<TypeFilter>,
    pub status: Option<StatusFilter>,
}

/// Threads for a survey, run through the pure filter projection. A survey
/// with no persisted threads gets the sample fallback set.
pub async fn list_threads(
    State(state): State<AppState>,
    Path(survey_id): Path<Uuid>,
    Query(query): Query<ThreadListQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<ThreadWithReviews>>>, ApiError> {
    Survey::find_by_id(&state.db().pool, survey_id)
        .await?
        .ok_or(ApiError::NotFound("survey"))?;

    let service = ReviewThreadService::new(state.db().pool.clone());
    let threads = service.list(survey_id).await?;

    let type_filter = query.thread_type.unwrap_or_default();
    let status_filter = query.status.unwrap_or_default();
    let filtered = filter_threads(&threads, &type_filter, &status_filter);

    Ok(ResponseJson(ApiResponse::success(filtered)))
}

pub async fn create_thread(
    State(state): State<AppState>,
    Path(survey_id): Path<Uuid>,
    axum::Json(payload): axum::Json<CreateReviewThread>,
) -> Result<ResponseJson<ApiResponse<ReviewThread>>, ApiError> {
    Survey::find_by_id(&state.db().pool, survey_id)
        .await?
        .ok_or(ApiError::NotFound("survey"))?;
    Question::find_by_id(&state.db().pool, payload.question_id)
        .await?
        .ok_or(ApiError::NotFound("question"))?;

    let service = ReviewThreadService::new(state.db().pool.clone());
    let thread = service.create(survey_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(thread)))
}

/// Flip a thread's resolution state through the session overlay.
pub async fn toggle_thread(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<ThreadToggleView>>, ApiError> {
    let service = ReviewThreadService::new(state.db().pool.clone());
    let view = service.toggle_status(state.sessions(), thread_id).await?;
    Ok(ResponseJson(ApiResponse::success(view)))
}

pub async fn append_review(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
    axum::Json(payload): axum::Json<CreateReview>,
) -> Result<ResponseJson<ApiResponse<Review>>, ApiError> {
    let service = ReviewThreadService::new(state.db().pool.clone());
    let review = service.append_review(thread_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(review)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/surveys/{survey_id}/threads",
            get(list_threads).post(create_thread),
        )
        .route("/threads/{thread_id}/toggle", post(toggle_thread))
        .route("/threads/{thread_id}/reviews", post(append_review))
}
