//! Survey CRUD routes.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::survey::{CreateSurvey, Survey, SurveyWithSections, UpdateSurvey};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

fn validate_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::Validation("survey title is required".to_string()));
    }
    Ok(())
}

pub async fn create_survey(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<CreateSurvey>,
) -> Result<ResponseJson<ApiResponse<Survey>>, ApiError> {
    validate_title(&payload.title)?;
    let survey = Survey::create(&state.db().pool, &payload, Uuid::new_v4()).await?;
    Ok(ResponseJson(ApiResponse::success(survey)))
}

pub async fn list_surveys(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Survey>>>, ApiError> {
    let surveys = Survey::find_all(&state.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(surveys)))
}

/// Full editing payload: the survey plus both phase trees.
pub async fn get_survey(
    State(state): State<AppState>,
    Path(survey_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<SurveyWithSections>>, ApiError> {
    let survey = Survey::find_by_id(&state.db().pool, survey_id)
        .await?
        .ok_or(ApiError::NotFound("survey"))?;
    let tree = SurveyWithSections::load(&state.db().pool, survey).await?;
    Ok(ResponseJson(ApiResponse::success(tree)))
}

pub async fn update_survey(
    State(state): State<AppState>,
    Path(survey_id): Path<Uuid>,
    axum::Json(payload): axum::Json<UpdateSurvey>,
) -> Result<ResponseJson<ApiResponse<Survey>>, ApiError> {
    let existing = Survey::find_by_id(&state.db().pool, survey_id)
        .await?
        .ok_or(ApiError::NotFound("survey"))?;

    let title = payload.title.unwrap_or(existing.title);
    validate_title(&title)?;
    let description = payload.description.or(existing.description);

    let survey = Survey::update(&state.db().pool, survey_id, title, description).await?;
    Ok(ResponseJson(ApiResponse::success(survey)))
}

pub async fn delete_survey(
    State(state): State<AppState>,
    Path(survey_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let deleted = Survey::delete(&state.db().pool, survey_id).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound("survey"));
    }
    // The editor session has nothing to point at any more.
    state.sessions().close(survey_id);
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/surveys", get(list_surveys).post(create_survey))
        .route(
            "/surveys/{survey_id}",
            get(get_survey).put(update_survey).delete(delete_survey),
        )
}
