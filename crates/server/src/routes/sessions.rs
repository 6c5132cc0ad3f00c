//! Editor session lifecycle: open-or-get, selection, filters, close.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, put},
};
use db::models::survey::Survey;
use serde::Deserialize;
use services::services::{
    review_threads::{StatusFilter, TypeFilter},
    session::EditorSession,
};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize, TS)]
pub struct SetSelection {
    /// Absent clears the selection.
    pub thread_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, TS)]
pub struct SetFilters {
    #[serde(rename = "type")]
    pub thread_type: TypeFilter,
    pub status: StatusFilter,
}

/// Open (or return the already-open) editor session for a survey.
pub async fn get_session(
    State(state): State<AppState>,
    Path(survey_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<EditorSession>>, ApiError> {
    Survey::find_by_id(&state.db().pool, survey_id)
        .await?
        .ok_or(ApiError::NotFound("survey"))?;

    Ok(ResponseJson(ApiResponse::success(
        state.sessions().open(survey_id),
    )))
}

/// Discard the session and everything in it (selection, chat, overlays).
pub async fn close_session(
    State(state): State<AppState>,
    Path(survey_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<bool>>, ApiError> {
    let closed = state.sessions().close(survey_id);
    Ok(ResponseJson(ApiResponse::success(closed)))
}

pub async fn set_selection(
    State(state): State<AppState>,
    Path(survey_id): Path<Uuid>,
    axum::Json(payload): axum::Json<SetSelection>,
) -> Result<ResponseJson<ApiResponse<EditorSession>>, ApiError> {
    let session = state.sessions().with(survey_id, |session| {
        match payload.thread_id {
            Some(thread_id) => session.select_thread(thread_id),
            None => session.clear_selection(),
        }
        session.clone()
    });
    Ok(ResponseJson(ApiResponse::success(session)))
}

pub async fn set_filters(
    State(state): State<AppState>,
    Path(survey_id): Path<Uuid>,
    axum::Json(payload): axum::Json<SetFilters>,
) -> Result<ResponseJson<ApiResponse<EditorSession>>, ApiError> {
    let session = state.sessions().with(survey_id, |session| {
        session.set_filters(payload.thread_type.clone(), payload.status.clone());
        session.clone()
    });
    Ok(ResponseJson(ApiResponse::success(session)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/surveys/{survey_id}/session",
            get(get_session).delete(close_session),
        )
        .route("/surveys/{survey_id}/session/selection", put(set_selection))
        .route("/surveys/{survey_id}/session/filters", put(set_filters))
}
