//! AI review pipeline routes: kick off a run, poll its status.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{ai_review::SurveyAiReview, survey::Survey};
use services::services::ai_reviewer::AiReviewerService;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// Queue an AI review of the survey's questions. Findings arrive as
/// `ai`-typed threads once the background run completes.
pub async fn start_ai_review(
    State(state): State<AppState>,
    Path(survey_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<SurveyAiReview>>, ApiError> {
    Survey::find_by_id(&state.db().pool, survey_id)
        .await?
        .ok_or(ApiError::NotFound("survey"))?;

    let reviewer = AiReviewerService::new(state.db().pool.clone())?;
    let record = reviewer.start(survey_id).await?;
    Ok(ResponseJson(ApiResponse::success(record)))
}

/// Status polling works without an API key; only starting a run needs one.
pub async fn get_ai_review(
    State(state): State<AppState>,
    Path(survey_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Option<SurveyAiReview>>>, ApiError> {
    Survey::find_by_id(&state.db().pool, survey_id)
        .await?
        .ok_or(ApiError::NotFound("survey"))?;

    let record = SurveyAiReview::find_latest_by_survey(&state.db().pool, survey_id).await?;
    Ok(ResponseJson(ApiResponse::success(record)))
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/surveys/{survey_id}/ai-review",
        get(get_ai_review).post(start_ai_review),
    )
}
