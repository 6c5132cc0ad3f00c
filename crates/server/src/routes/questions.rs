//! Question CRUD routes. Creates and deletes renumber the owning phase.

use std::collections::HashMap;

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::{
    answer_option::AnswerOption,
    question::{CreateQuestion, Question, QuestionWithOptions, UpdateQuestion},
    section::Section,
    survey::Survey,
};
use services::services::ordering::SurveyOrderingService;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

async fn with_options(
    state: &AppState,
    question: Question,
) -> Result<QuestionWithOptions, ApiError> {
    let options = AnswerOption::find_by_question(&state.db().pool, question.id).await?;
    Ok(QuestionWithOptions { question, options })
}

/// Flat question list in section-major order, options attached.
pub async fn list_questions(
    State(state): State<AppState>,
    Path(survey_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<QuestionWithOptions>>>, ApiError> {
    Survey::find_by_id(&state.db().pool, survey_id)
        .await?
        .ok_or(ApiError::NotFound("survey"))?;

    let questions = Question::find_by_survey(&state.db().pool, survey_id).await?;
    let options = AnswerOption::find_by_survey(&state.db().pool, survey_id).await?;

    let mut by_question: HashMap<Uuid, Vec<AnswerOption>> = HashMap::new();
    for option in options {
        by_question.entry(option.question_id).or_default().push(option);
    }

    let listed = questions
        .into_iter()
        .map(|question| {
            let options = by_question.remove(&question.id).unwrap_or_default();
            QuestionWithOptions { question, options }
        })
        .collect();

    Ok(ResponseJson(ApiResponse::success(listed)))
}

pub async fn create_question(
    State(state): State<AppState>,
    Path(section_id): Path<Uuid>,
    axum::Json(payload): axum::Json<CreateQuestion>,
) -> Result<ResponseJson<ApiResponse<QuestionWithOptions>>, ApiError> {
    let section = Section::find_by_id(&state.db().pool, section_id)
        .await?
        .ok_or(ApiError::NotFound("section"))?;

    let question =
        Question::create(&state.db().pool, section_id, &payload, Uuid::new_v4()).await?;
    if let Some(labels) = &payload.options {
        AnswerOption::replace_for_question(&state.db().pool, question.id, labels).await?;
    }

    let ordering = SurveyOrderingService::new(state.db().pool.clone());
    ordering
        .renumber_phase(section.survey_id, &section.phase)
        .await?;

    // Re-read to pick up the freshly assigned number.
    let question = Question::find_by_id(&state.db().pool, question.id)
        .await?
        .ok_or(ApiError::NotFound("question"))?;
    Ok(ResponseJson(ApiResponse::success(
        with_options(&state, question).await?,
    )))
}

pub async fn update_question(
    State(state): State<AppState>,
    Path(question_id): Path<Uuid>,
    axum::Json(payload): axum::Json<UpdateQuestion>,
) -> Result<ResponseJson<ApiResponse<QuestionWithOptions>>, ApiError> {
    let existing = Question::find_by_id(&state.db().pool, question_id)
        .await?
        .ok_or(ApiError::NotFound("question"))?;

    let question_type = payload.question_type.unwrap_or(existing.question_type);
    let text = payload.text.unwrap_or(existing.text);
    let is_required = payload.is_required.unwrap_or(existing.is_required);
    let respondent_condition = payload
        .respondent_condition
        .or(existing.respondent_condition);

    let question = Question::update(
        &state.db().pool,
        question_id,
        question_type,
        text,
        is_required,
        respondent_condition,
    )
    .await?;

    if let Some(labels) = &payload.options {
        AnswerOption::replace_for_question(&state.db().pool, question_id, labels).await?;
    }

    Ok(ResponseJson(ApiResponse::success(
        with_options(&state, question).await?,
    )))
}

pub async fn delete_question(
    State(state): State<AppState>,
    Path(question_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let question = Question::find_by_id(&state.db().pool, question_id)
        .await?
        .ok_or(ApiError::NotFound("question"))?;
    if question.is_fixed {
        return Err(ApiError::Conflict(
            "fixed questions cannot be deleted".to_string(),
        ));
    }

    let section = Section::find_by_id(&state.db().pool, question.section_id)
        .await?
        .ok_or(ApiError::NotFound("section"))?;

    Question::delete(&state.db().pool, question_id).await?;

    let ordering = SurveyOrderingService::new(state.db().pool.clone());
    ordering
        .renumber_phase(section.survey_id, &section.phase)
        .await?;

    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/surveys/{survey_id}/questions", get(list_questions))
        .route("/sections/{section_id}/questions", post(create_question))
        .route(
            "/questions/{question_id}",
            put(update_question).delete(delete_question),
        )
}
