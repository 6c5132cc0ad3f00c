//! Chat panel routes. The transcript lives in the editor session.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{section::SectionWithQuestions, survey::Survey};
use serde::Deserialize;
use services::services::session::{ChatMessage, ChatRole};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize, TS)]
pub struct SendChatMessage {
    pub message: String,
}

pub async fn get_transcript(
    State(state): State<AppState>,
    Path(survey_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<ChatMessage>>>, ApiError> {
    Survey::find_by_id(&state.db().pool, survey_id)
        .await?
        .ok_or(ApiError::NotFound("survey"))?;

    Ok(ResponseJson(ApiResponse::success(
        state.sessions().open(survey_id).chat,
    )))
}

/// Append the user's message, produce the assistant reply, and return it.
pub async fn send_message(
    State(state): State<AppState>,
    Path(survey_id): Path<Uuid>,
    axum::Json(payload): axum::Json<SendChatMessage>,
) -> Result<ResponseJson<ApiResponse<ChatMessage>>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(ApiError::Validation("message is required".to_string()));
    }

    let survey = Survey::find_by_id(&state.db().pool, survey_id)
        .await?
        .ok_or(ApiError::NotFound("survey"))?;
    let sections = SectionWithQuestions::load_survey(&state.db().pool, survey_id).await?;

    let transcript = state.sessions().with(survey_id, |session| {
        session.push_chat(ChatRole::User, payload.message.clone());
        session.chat.clone()
    });

    let reply = state
        .assistant()
        .reply(&survey.title, &sections, &transcript)
        .await?;

    let message = state
        .sessions()
        .with(survey_id, |session| session.push_chat(ChatRole::Assistant, reply));

    Ok(ResponseJson(ApiResponse::success(message)))
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/surveys/{survey_id}/chat",
        get(get_transcript).post(send_message),
    )
}
