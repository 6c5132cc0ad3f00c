//! Section CRUD and drag-and-drop reordering.

use std::str::FromStr;

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{post, put},
};
use db::models::{
    section::{CreateSection, Section, SurveyPhase, UpdateSection},
    survey::Survey,
};
use services::services::ordering::{ReorderRequest, ReorderResult, SurveyOrderingService};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

fn parse_phase(raw: &str) -> Result<SurveyPhase, ApiError> {
    SurveyPhase::from_str(raw)
        .map_err(|_| ApiError::Validation(format!("unknown phase: {raw}")))
}

pub async fn create_section(
    State(state): State<AppState>,
    Path(survey_id): Path<Uuid>,
    axum::Json(payload): axum::Json<CreateSection>,
) -> Result<ResponseJson<ApiResponse<Section>>, ApiError> {
    Survey::find_by_id(&state.db().pool, survey_id)
        .await?
        .ok_or(ApiError::NotFound("survey"))?;

    let section = Section::create(&state.db().pool, survey_id, &payload, Uuid::new_v4()).await?;
    Ok(ResponseJson(ApiResponse::success(section)))
}

pub async fn update_section(
    State(state): State<AppState>,
    Path(section_id): Path<Uuid>,
    axum::Json(payload): axum::Json<UpdateSection>,
) -> Result<ResponseJson<ApiResponse<Section>>, ApiError> {
    Section::find_by_id(&state.db().pool, section_id)
        .await?
        .ok_or(ApiError::NotFound("section"))?;

    let section = Section::rename(&state.db().pool, section_id, payload.title).await?;
    Ok(ResponseJson(ApiResponse::success(section)))
}

/// Deleting a section drops its questions with it, so the phase is
/// renumbered afterwards.
pub async fn delete_section(
    State(state): State<AppState>,
    Path(section_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let section = Section::find_by_id(&state.db().pool, section_id)
        .await?
        .ok_or(ApiError::NotFound("section"))?;

    Section::delete(&state.db().pool, section_id).await?;

    let ordering = SurveyOrderingService::new(state.db().pool.clone());
    ordering
        .renumber_phase(section.survey_id, &section.phase)
        .await?;

    Ok(ResponseJson(ApiResponse::success(())))
}

/// Apply a drag-end event to one phase's section list. Ignored events come
/// back with the unchanged layout and the reason, never an error status.
pub async fn reorder_phase(
    State(state): State<AppState>,
    Path((survey_id, phase)): Path<(Uuid, String)>,
    axum::Json(payload): axum::Json<ReorderRequest>,
) -> Result<ResponseJson<ApiResponse<ReorderResult>>, ApiError> {
    let phase = parse_phase(&phase)?;
    Survey::find_by_id(&state.db().pool, survey_id)
        .await?
        .ok_or(ApiError::NotFound("survey"))?;

    let ordering = SurveyOrderingService::new(state.db().pool.clone());
    let result = ordering.reorder(survey_id, &phase, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(result)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/surveys/{survey_id}/sections", post(create_section))
        .route(
            "/sections/{section_id}",
            put(update_section).delete(delete_section),
        )
        .route(
            "/surveys/{survey_id}/phases/{phase}/reorder",
            post(reorder_phase),
        )
}
