//! Simulated test-run routes gating the review hand-off.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::survey::Survey;
use services::services::test_run::TestRunStatus;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

pub async fn start_test_run(
    State(state): State<AppState>,
    Path(survey_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<TestRunStatus>>, ApiError> {
    Survey::find_by_id(&state.db().pool, survey_id)
        .await?
        .ok_or(ApiError::NotFound("survey"))?;

    let status = state.test_runs().start(survey_id);
    Ok(ResponseJson(ApiResponse::success(status)))
}

pub async fn get_test_run(
    State(state): State<AppState>,
    Path(survey_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<TestRunStatus>>, ApiError> {
    let status = state.test_runs().status(survey_id);
    Ok(ResponseJson(ApiResponse::success(status)))
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/surveys/{survey_id}/test-run",
        get(get_test_run).post(start_test_run),
    )
}
