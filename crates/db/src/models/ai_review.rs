use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// Lifecycle of a background AI review run.
#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "ai_review_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AiReviewStatus {
    #[default]
    Pending,
    Analyzing,
    Completed,
    Failed,
}

/// One AI review run over a survey's questions. The findings land as
/// `ai`-typed review threads; this record only tracks pipeline state.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct SurveyAiReview {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub status: AiReviewStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SurveyAiReview {
    pub async fn create(
        pool: &SqlitePool,
        review_id: Uuid,
        survey_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, SurveyAiReview>(
            r#"INSERT INTO survey_ai_reviews (id, survey_id)
               VALUES ($1, $2)
               RETURNING id, survey_id, status, error_message, created_at, updated_at"#,
        )
        .bind(review_id)
        .bind(survey_id)
        .fetch_one(pool)
        .await
    }

    pub async fn find_latest_by_survey(
        pool: &SqlitePool,
        survey_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SurveyAiReview>(
            r#"SELECT id, survey_id, status, error_message, created_at, updated_at
               FROM survey_ai_reviews
               WHERE survey_id = $1
               ORDER BY created_at DESC
               LIMIT 1"#,
        )
        .bind(survey_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn update_status(
        pool: &SqlitePool,
        id: Uuid,
        status: AiReviewStatus,
        error_message: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"UPDATE survey_ai_reviews
               SET status = $2, error_message = $3, updated_at = datetime('now', 'subsec')
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(status)
        .bind(error_message)
        .execute(pool)
        .await?;
        Ok(())
    }
}
