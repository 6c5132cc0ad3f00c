use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::review::Review;

/// Author kind of a review discussion: automated reviewer or a teammate.
#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "thread_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ThreadType {
    Ai,
    #[default]
    Team,
}

/// Discussion attached to one question of a survey.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ReviewThread {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub question_id: Uuid,
    pub thread_type: ThreadType,
    pub created_by: String,
    pub message: String,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateReviewThread {
    pub question_id: Uuid,
    pub message: String,
    pub created_by: String,
    pub thread_type: Option<ThreadType>,
}

/// Thread plus its replies in chronological order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ThreadWithReviews {
    #[serde(flatten)]
    #[ts(flatten)]
    pub thread: ReviewThread,
    pub reviews: Vec<Review>,
}

impl std::ops::Deref for ThreadWithReviews {
    type Target = ReviewThread;
    fn deref(&self) -> &Self::Target {
        &self.thread
    }
}

impl ReviewThread {
    pub async fn create(
        pool: &SqlitePool,
        survey_id: Uuid,
        data: &CreateReviewThread,
        thread_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let thread_type = data.thread_type.clone().unwrap_or_default();
        sqlx::query_as::<_, ReviewThread>(
            r#"INSERT INTO review_threads
                   (id, survey_id, question_id, thread_type, created_by, message)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING id, survey_id, question_id, thread_type, created_by,
                         message, is_completed, created_at, updated_at"#,
        )
        .bind(thread_id)
        .bind(survey_id)
        .bind(data.question_id)
        .bind(thread_type)
        .bind(&data.created_by)
        .bind(&data.message)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ReviewThread>(
            r#"SELECT id, survey_id, question_id, thread_type, created_by,
                      message, is_completed, created_at, updated_at
               FROM review_threads
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_survey(
        pool: &SqlitePool,
        survey_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ReviewThread>(
            r#"SELECT id, survey_id, question_id, thread_type, created_by,
                      message, is_completed, created_at, updated_at
               FROM review_threads
               WHERE survey_id = $1
               ORDER BY created_at ASC, rowid ASC"#,
        )
        .bind(survey_id)
        .fetch_all(pool)
        .await
    }

    pub async fn set_completed(
        pool: &SqlitePool,
        id: Uuid,
        is_completed: bool,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ReviewThread>(
            r#"UPDATE review_threads
               SET is_completed = $2, updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING id, survey_id, question_id, thread_type, created_by,
                         message, is_completed, created_at, updated_at"#,
        )
        .bind(id)
        .bind(is_completed)
        .fetch_one(pool)
        .await
    }
}
